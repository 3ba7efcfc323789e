use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::error::EngineError;
use crate::extractors::{AppJson, ValidJson};
use crate::handlers::ApiError;
use crate::models::answer::{
    ClearReviewResponse, ImportLedgerResponse, LedgerExport, LedgerQuery, SubmitAnswerRequest,
    SubmitAnswerResponse,
};
use crate::models::mastery::MasteryReport;
use crate::models::selection::{NextBatchQuery, NextBatchResponse};
use crate::models::BatchRequest;
use crate::services::AppState;

pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    ValidJson(req): ValidJson<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(
        "Submitting answer: user_id={}, question={}, session={:?}",
        user_id,
        req.question_id,
        req.session_id
    );

    let outcome = state
        .engines
        .with_engine(&user_id, |engine| engine.record(req.into()))?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitAnswerResponse {
            correct_answer: outcome.question.correct_answer.clone(),
            explanation: outcome.question.explanation.clone(),
            event: outcome.event,
            mastery: outcome.mastery,
            session: outcome.session,
        }),
    ))
}

pub async fn next_batch(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<NextBatchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let policy = state.engines.selection_policy();

    if let (Some(min), Some(max)) = (query.min_difficulty, query.max_difficulty) {
        if min > max {
            return Err(EngineError::validation(format!(
                "min_difficulty {} exceeds max_difficulty {}",
                min, max
            ))
            .into());
        }
    }

    let request = BatchRequest {
        count: policy.batch_size(query.count),
        exclude_recent_n: query
            .exclude_recent
            .unwrap_or(policy.default_exclude_recent),
        subject: query.subject,
        min_difficulty: query.min_difficulty,
        max_difficulty: query.max_difficulty,
    };

    let questions = state
        .engines
        .with_engine(&user_id, |engine| engine.next_batch(&request));

    tracing::info!(
        "Serving batch: user_id={}, requested={}, returned={}",
        user_id,
        request.count,
        questions.len()
    );

    Ok(Json(NextBatchResponse {
        user_id,
        requested: request.count,
        questions,
    }))
}

pub async fn wrong_questions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let questions = state
        .engines
        .with_existing(&user_id, |engine| engine.wrong_questions())
        .unwrap_or_default();

    Ok(Json(questions))
}

pub async fn clear_review_queue(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Clearing review queue for user_id={}", user_id);

    let outcome = state
        .engines
        .with_existing(&user_id, |engine| engine.clear_review_queue())
        .unwrap_or_default();

    Ok(Json(ClearReviewResponse {
        purged_events: outcome.purged_events,
        cleared_questions: outcome.cleared_questions,
    }))
}

pub async fn mastery_report(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .engines
        .with_existing(&user_id, |engine| engine.mastery_report())
        .unwrap_or_else(|| MasteryReport::empty(user_id.as_str()));

    Ok(Json(report))
}

pub async fn export_ledger(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<LedgerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let events = state
        .engines
        .with_existing(&user_id, |engine| engine.events(query.since))
        .unwrap_or_default();

    Ok(Json(LedgerExport { user_id, events }))
}

/// Replays exported events into the user's engine, all or nothing.
pub async fn import_ledger(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    AppJson(export): AppJson<LedgerExport>,
) -> Result<impl IntoResponse, ApiError> {
    if export.user_id != user_id {
        return Err(EngineError::validation(format!(
            "ledger belongs to {}, not {}",
            export.user_id, user_id
        ))
        .into());
    }

    tracing::info!(
        "Importing {} events for user_id={}",
        export.events.len(),
        user_id
    );

    let (imported, ledger_size) = state.engines.with_engine(&user_id, |engine| {
        engine
            .import(export.events)
            .map(|imported| (imported, engine.ledger().len()))
    })?;

    Ok((
        StatusCode::CREATED,
        Json(ImportLedgerResponse {
            imported,
            ledger_size,
        }),
    ))
}
