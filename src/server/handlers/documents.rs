use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let documents = state.retrieval.list_documents().await?;
    Ok(Json(json!({ "documents": documents })))
}

pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.retrieval.delete_document(&source).await?;
    Ok(Json(json!({
        "success": true,
        "deleted_chunks": deleted,
    })))
}
