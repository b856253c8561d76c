use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::response::Html;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{chat, documents, health, pages, upload};
use crate::state::AppState;

// multipart framing on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Routes of a single themed app, without middleware.
pub fn theme_routes(state: Arc<AppState>) -> Router {
    let body_limit = usize::try_from(state.upload.max_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(pages::index))
        .route("/health", get(health::health))
        .route(
            "/upload",
            post(upload::upload).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/documents", get(documents::list_documents))
        .route("/documents/*source", delete(documents::delete_document))
        .route("/chat", post(chat::chat))
        .with_state(state)
}

/// A single theme served at the root, as the standalone binaries do.
pub fn app_router(state: Arc<AppState>) -> Router {
    let origins = state.cors_allowed_origins.clone();
    with_middleware(theme_routes(state), &origins)
}

/// Landing page at `/` with every theme nested under its mount path.
pub fn launcher_router(states: &[Arc<AppState>]) -> Router {
    let themes: Vec<_> = states.iter().map(|s| s.theme.as_ref()).collect();
    let landing = pages::render_landing(&themes);

    let mut router = Router::new().route("/", get(move || async move { Html(landing) }));
    for state in states {
        let mount = state.theme.mount_path.trim_end_matches('/');
        // nesting only matches the bare mount path for the index
        router = router
            .route(
                &format!("{}/", mount),
                get(pages::index).with_state(state.clone()),
            )
            .nest(mount, theme_routes(state.clone()));
    }

    let origins = states
        .first()
        .map(|s| s.cors_allowed_origins.clone())
        .unwrap_or_default();
    with_middleware(router, &origins)
}

fn with_middleware(router: Router, origins: &[String]) -> Router {
    router
        .layer(build_cors_layer(origins))
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}
