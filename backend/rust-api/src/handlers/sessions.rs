use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::error::EngineError;
use crate::handlers::ApiError;
use crate::services::AppState;

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Creating session for user_id={}", user_id);

    let summary = state.engines.with_engine(&user_id, |engine| engine.start_session());

    Ok((StatusCode::CREATED, Json(summary)))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path((user_id, session_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Getting session: user_id={}, session={}", user_id, session_id);

    let summary = state
        .engines
        .with_existing(&user_id, |engine| engine.session(&session_id))
        .unwrap_or_else(|| Err(EngineError::UnknownSession(session_id.clone())))?;

    Ok(Json(summary))
}

pub async fn complete_session(
    State(state): State<Arc<AppState>>,
    Path((user_id, session_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Completing session: user_id={}, session={}", user_id, session_id);

    let summary = state
        .engines
        .with_existing(&user_id, |engine| engine.complete_session(&session_id))
        .unwrap_or_else(|| Err(EngineError::UnknownSession(session_id.clone())))?;

    Ok(Json(summary))
}
