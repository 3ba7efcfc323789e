use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::error::EngineError;
use crate::metrics;
use crate::services::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "practice-engine-api",
            "version": env!("CARGO_PKG_VERSION"),
            "catalog_questions": state.catalog.len(),
            "users": state.engines.user_count(),
        })),
    )
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

/// JSON error body for engine failures.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::DuplicateEvent { .. } => StatusCode::CONFLICT,
            EngineError::UnknownQuestion(_) | EngineError::UnknownSession(_) => {
                StatusCode::NOT_FOUND
            }
        };

        if status.is_client_error() {
            tracing::warn!("Request rejected: {}", self.0);
        }

        (
            status,
            Json(json!({
                "message": self.0.to_string(),
                "status": status.as_u16(),
                "duplicate": self.0.is_duplicate(),
            })),
        )
            .into_response()
    }
}

pub mod catalog;
pub mod chat;
pub mod practice;
pub mod sessions;
