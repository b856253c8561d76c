//! Document upload with server-sent progress events.
//!
//! Requests that cannot be processed at all (no file, unsupported type,
//! oversize) are rejected with a JSON error before the stream opens. Once
//! streaming starts, every event is a JSON `data:` line carrying either
//! `{progress, stage}` or `{error}`.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use futures_util::Stream;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::extract;
use crate::rag::{IngestProgress, Metadata};
use crate::state::AppState;

const PROGRESS_READING: u32 = 10;
const PROGRESS_PARSING: u32 = 20;
const PROGRESS_PARSED: u32 = 50;
const PROGRESS_VECTORIZING: u32 = 60;
const PROGRESS_FINALIZING: u32 = 90;
const PROGRESS_COMPLETE: u32 = 100;

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let upload = read_file_field(&mut multipart).await?;
    extract::precheck(
        &upload.filename,
        upload.bytes.len() as u64,
        state.upload.max_bytes,
    )?;

    let (tx, mut rx) = mpsc::channel::<Value>(32);
    // the task outlives a disconnected client; ingestion always finishes
    tokio::spawn(process_upload(state, upload, tx));

    let stream = async_stream::stream! {
        while let Some(payload) = rx.recv().await {
            yield Ok(Event::default().data(payload.to_string()));
        }
    };

    Ok(Sse::new(stream))
}

async fn read_file_field(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("No selected file".to_string()))?;
        let bytes = field.bytes().await.map_err(multipart_error)?;

        return Ok(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::BadRequest("No file part".to_string()))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

fn stage(progress: u32, stage: &str) -> Value {
    json!({ "progress": progress, "stage": stage })
}

async fn process_upload(state: Arc<AppState>, upload: Upload, tx: mpsc::Sender<Value>) {
    let upload_id = Uuid::new_v4();
    let filename = upload.filename.clone();
    info!(
        %upload_id,
        theme = %state.theme.id,
        document = %filename,
        bytes = upload.bytes.len(),
        "upload accepted"
    );

    if let Err(err) = run_upload(&state, upload, &tx).await {
        error!(%upload_id, document = %filename, error = %err, "upload failed");
        let _ = tx.send(json!({ "error": err.public_message() })).await;
    }
}

async fn run_upload(
    state: &AppState,
    upload: Upload,
    tx: &mpsc::Sender<Value>,
) -> Result<(), ApiError> {
    // a closed channel only means the client left
    let emit = |value: Value| async move {
        let _ = tx.send(value).await;
    };

    emit(stage(PROGRESS_READING, "reading")).await;

    let Upload { filename, bytes } = upload;
    let base_metadata = base_metadata(&filename, &bytes);

    emit(stage(PROGRESS_PARSING, "parsing")).await;
    let max_bytes = state.upload.max_bytes;
    let name = filename.clone();
    let pages = run_blocking(move || extract::extract_pages(&name, &bytes, max_bytes)).await??;
    emit(stage(PROGRESS_PARSED, "parsing")).await;

    info!(
        theme = %state.theme.id,
        document = %filename,
        pages = pages.len(),
        "document extracted"
    );
    emit(stage(PROGRESS_VECTORIZING, "vectorizing")).await;

    let (progress_tx, mut progress_rx) = mpsc::channel::<IngestProgress>(16);
    let forward = {
        let tx = tx.clone();
        tokio::spawn(async move {
            while let Some(update) = progress_rx.recv().await {
                let _ = tx.send(vectorizing_event(update)).await;
            }
        })
    };

    let ingested = state
        .retrieval
        .ingest(&filename, &pages, base_metadata, Some(&progress_tx))
        .await;
    drop(progress_tx);
    let _ = forward.await;
    let chunks = ingested?;

    emit(stage(PROGRESS_FINALIZING, "finalizing")).await;
    emit(json!({
        "progress": PROGRESS_COMPLETE,
        "stage": "complete",
        "filename": filename,
        "chunks_processed": chunks,
        "pages": pages.len(),
        "message": format!("Successfully memorized {} fragments.", chunks),
    }))
    .await;

    Ok(())
}

/// Runs CPU-bound work off the async workers. A panicked or cancelled task
/// is an internal failure, not a problem with the uploaded file.
async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::internal(format!("extraction task failed: {}", e)))
}

/// Maps per-page ingestion progress into the 60..90 band.
fn vectorizing_event(update: IngestProgress) -> Value {
    let span = (PROGRESS_FINALIZING - PROGRESS_VECTORIZING) as usize;
    let progress = PROGRESS_VECTORIZING as usize
        + span * update.pages_done / update.pages_total.max(1);
    json!({
        "progress": progress.min(PROGRESS_FINALIZING as usize - 1),
        "stage": "vectorizing",
        "page": update.page,
        "chunks": update.chunks_so_far,
    })
}

fn base_metadata(filename: &str, bytes: &[u8]) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("filename".to_string(), json!(filename));
    metadata.insert(
        "content_sha256".to_string(),
        json!(hex::encode(Sha256::digest(bytes))),
    );
    metadata.insert(
        "uploaded_at".to_string(),
        json!(chrono::Utc::now().to_rfc3339()),
    );
    metadata
}
