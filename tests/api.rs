use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use corpus::core::config::AppConfig;
use corpus::llm::{
    EmbeddingMode, GenerationOutcome, LlmProvider, ModelSelector, ProviderError, ProviderModel,
};
use corpus::rag::SqliteVectorStore;
use corpus::server::{app_router, launcher_router};
use corpus::state::AppState;
use corpus::themes::{ghost, legal, ThemeConfig};

/// Embeds by keyword so related texts land close together and answers
/// with a fixed reply, or a rate-limit error when `rate_limited` is set.
struct KeywordProvider {
    rate_limited: bool,
}

#[async_trait]
impl LlmProvider for KeywordProvider {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn embed(&self, text: &str, _: EmbeddingMode) -> Result<Vec<f32>, ProviderError> {
        let text = text.to_lowercase();
        Ok(vec![
            if text.contains("rent") { 1.0 } else { 0.0 },
            if text.contains("ghost") { 1.0 } else { 0.0 },
            0.05,
        ])
    }

    async fn generate(&self, model: &str, _: &str) -> Result<GenerationOutcome, ProviderError> {
        if self.rate_limited {
            return Err(ProviderError::RateLimited("quota".to_string()));
        }
        Ok(GenerationOutcome::Text(format!("answered by {}", model)))
    }

    async fn list_models(&self) -> Result<Vec<ProviderModel>, ProviderError> {
        Ok(Vec::new())
    }
}

struct TestApp {
    router: Router,
    _dir: tempfile::TempDir,
}

async fn build_state(
    dir: &tempfile::TempDir,
    theme: ThemeConfig,
    rate_limited: bool,
) -> Arc<AppState> {
    let store = SqliteVectorStore::with_path(dir.path().join("vectors.db"), theme.id.as_str())
        .await
        .unwrap();
    let config = AppConfig::default();
    AppState::new(
        theme,
        Arc::new(KeywordProvider { rate_limited }),
        Arc::new(store),
        Arc::new(ModelSelector::new(vec!["fake-flash".to_string()])),
        &config,
    )
    .unwrap()
}

async fn legal_app(rate_limited: bool) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let state = build_state(&dir, legal::theme(), rate_limited).await;
    TestApp {
        router: app_router(state),
        _dir: dir,
    }
}

fn multipart_request(uri: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let boundary = "corpus-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(router, request).await;
    (status, serde_json::from_str(&body).unwrap())
}

fn sse_events(body: &str) -> Vec<Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).unwrap())
        .collect()
}

async fn upload_text(app: &TestApp, filename: &str, content: &str) -> Vec<Value> {
    let (status, body) = send(
        &app.router,
        multipart_request("/upload", filename, content.as_bytes()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    sse_events(&body)
}

#[tokio::test]
async fn health_reports_theme() {
    let app = legal_app(false).await;
    let (status, body) = send_json(&app.router, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["theme"], "legal");
}

#[tokio::test]
async fn upload_streams_progress_then_lists_document() {
    let app = legal_app(false).await;

    let events = upload_text(&app, "lease.txt", "The tenant pays rent on the first day.").await;
    let stages: Vec<&str> = events
        .iter()
        .filter_map(|e| e["stage"].as_str())
        .collect();
    assert_eq!(stages.first(), Some(&"reading"));
    assert!(stages.contains(&"parsing"));
    assert!(stages.contains(&"vectorizing"));
    assert!(stages.contains(&"finalizing"));

    let complete = events.last().unwrap();
    assert_eq!(complete["stage"], "complete");
    assert_eq!(complete["progress"], 100);
    assert_eq!(complete["filename"], "lease.txt");
    assert_eq!(complete["chunks_processed"], 1);
    assert_eq!(complete["pages"], 1);
    assert_eq!(complete["message"], "Successfully memorized 1 fragments.");

    let (status, body) = send_json(&app.router, get("/documents")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["documents"],
        json!([{"source": "lease.txt", "pages": 1, "chunks": 1}])
    );
}

#[tokio::test]
async fn blank_text_file_reports_error_in_stream() {
    let app = legal_app(false).await;
    let events = upload_text(&app, "blank.txt", "   \n  ").await;

    assert_eq!(
        events.last().unwrap(),
        &json!({"error": "File appears empty"})
    );
}

#[tokio::test]
async fn upload_rejections_happen_before_streaming() {
    let app = legal_app(false).await;

    let (status, body) =
        send_json(&app.router, multipart_request("/upload", "photo.png", b"png")).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["error"], "Unsupported file type");

    let (status, body) = send_json(&app.router, multipart_request("/upload", "", b"data")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No selected file");
}

#[tokio::test]
async fn chat_cites_relevant_sources() {
    let app = legal_app(false).await;
    upload_text(&app, "lease.txt", "The tenant pays rent monthly.").await;
    upload_text(&app, "haunting.txt", "A ghost walks the hall.").await;

    let (status, body) = send_json(
        &app.router,
        json_request("POST", "/chat", json!({"query": "When is rent due?"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["echo"], "answered by fake-flash");
    assert_eq!(body["model"], "fake-flash");
    let sources = body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0]["source"], "lease.txt");
    assert_eq!(sources[0]["page"], 1);
}

#[tokio::test]
async fn chat_source_filter_limits_retrieval() {
    let app = legal_app(false).await;
    upload_text(&app, "lease.txt", "The tenant pays rent monthly.").await;
    upload_text(&app, "haunting.txt", "A ghost walks the hall.").await;

    let (_, body) = send_json(
        &app.router,
        json_request(
            "POST",
            "/chat",
            json!({"query": "rent", "sources": ["haunting.txt"]}),
        ),
    )
    .await;

    let sources = body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0]["source"], "haunting.txt");
}

#[tokio::test]
async fn chat_with_empty_store_still_answers() {
    let app = legal_app(false).await;
    let (status, body) = send_json(
        &app.router,
        json_request("POST", "/chat", json!({"query": "anything?"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sources"], json!([]));
}

#[tokio::test]
async fn chat_without_query_is_bad_request() {
    let app = legal_app(false).await;

    for payload in [json!({}), json!({"query": "   "})] {
        let (status, body) =
            send_json(&app.router, json_request("POST", "/chat", payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No query provided");
    }
}

#[tokio::test]
async fn rate_limited_generation_is_429() {
    let app = legal_app(true).await;
    let (status, body) = send_json(
        &app.router,
        json_request("POST", "/chat", json!({"query": "rent?"})),
    )
    .await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Rate limit exceeded. Please wait 1 minute.");
}

#[tokio::test]
async fn delete_document_reports_removed_chunks() {
    let app = legal_app(false).await;
    upload_text(&app, "lease.txt", "The tenant pays rent monthly.").await;

    let (status, body) = send_json(
        &app.router,
        Request::builder()
            .method("DELETE")
            .uri("/documents/lease.txt")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "deleted_chunks": 1}));

    let (_, body) = send_json(
        &app.router,
        Request::builder()
            .method("DELETE")
            .uri("/documents/missing.txt")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(body["deleted_chunks"], 0);

    let (_, body) = send_json(&app.router, get("/documents")).await;
    assert_eq!(body["documents"], json!([]));
}

#[tokio::test]
async fn launcher_nests_both_themes() {
    let dir = tempfile::tempdir().unwrap();
    let legal_state = build_state(&dir, legal::theme(), false).await;
    let ghost_state = build_state(&dir, ghost::theme(), false).await;
    let router = launcher_router(&[legal_state, ghost_state]);

    let (status, html) = send(&router, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("href=\"/legal/\""));
    assert!(html.contains("href=\"/ghost/\""));

    let (_, body) = send_json(&router, get("/legal/health")).await;
    assert_eq!(body["theme"], "legal");
    let (_, body) = send_json(&router, get("/ghost/health")).await;
    assert_eq!(body["theme"], "ghost");

    for uri in ["/ghost", "/ghost/"] {
        let (status, html) = send(&router, get(uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Ouija Board"));
    }
    let (status, html) = send(&router, get("/legal/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Legal Eagle"));
}
