use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use crate::extractors::ValidJson;
use crate::models::chat::ChatRequest;
use crate::services::AppState;

pub async fn chat(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<ChatRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::info!(
        "Chat message received (user_id={})",
        req.user_id.as_deref().unwrap_or("anonymous")
    );

    match state.responder.respond(&req.message).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            tracing::error!("Responder failed: {:#}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
