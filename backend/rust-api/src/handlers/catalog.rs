use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::error::EngineError;
use crate::extractors::AppJson;
use crate::handlers::ApiError;
use crate::models::question::{LoadQuestionsRequest, LoadQuestionsResponse};
use crate::services::AppState;

/// Loads a batch of questions. One invalid question rejects the whole batch.
pub async fn load_questions(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoadQuestionsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Loading {} questions into catalog", req.questions.len());

    let loaded = state.catalog.load(req.questions)?;

    Ok((
        StatusCode::CREATED,
        Json(LoadQuestionsResponse {
            loaded,
            total: state.catalog.len(),
        }),
    ))
}

pub async fn get_question(
    State(state): State<Arc<AppState>>,
    Path(question_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let question = state
        .catalog
        .question(&question_id)
        .ok_or(EngineError::UnknownQuestion(question_id))?;

    Ok(Json(state.catalog.present(&question)))
}
