use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub query: Option<String>,
    /// Restricts retrieval to these documents; absent or empty means all.
    #[serde(default)]
    pub sources: Option<Vec<String>>,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let query = request
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No query provided".to_string()))?;

    let context = state
        .retrieval
        .relevant_context(query, request.sources.as_deref())
        .await?;
    let answer = state.answers.answer(query, &context).await?;

    info!(
        theme = %state.theme.id,
        model = %answer.model,
        context_chunks = context.matches.len(),
        "chat answered"
    );

    Ok(Json(json!({
        "status": "success",
        "echo": answer.text,
        "sources": answer.sources,
        "model": answer.model,
    })))
}
