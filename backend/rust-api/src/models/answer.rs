use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::mastery::MasteryScore;
use super::session::CounterSnapshot;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1, max = 128))]
    pub question_id: String,
    #[validate(length(min = 1, max = 16))]
    pub chosen: String,
    pub latency_ms: i64,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Input to `PracticeEngine::record`. Correctness is derived, never supplied.
#[derive(Debug, Clone)]
pub struct AnswerSubmission {
    pub question_id: String,
    pub chosen: String,
    pub latency_ms: i64,
    pub session_id: Option<String>,
}

impl From<SubmitAnswerRequest> for AnswerSubmission {
    fn from(req: SubmitAnswerRequest) -> Self {
        Self {
            question_id: req.question_id,
            chosen: req.chosen,
            latency_ms: req.latency_ms,
            session_id: req.session_id,
        }
    }
}

/// One immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerEvent {
    /// Per-user ordering key, strictly increasing.
    pub sequence: u64,
    pub user_id: String,
    pub question_id: String,
    pub chosen: String,
    pub correct: bool,
    pub latency_ms: u64,
    pub answered_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitAnswerResponse {
    pub event: AnswerEvent,
    pub correct_answer: String,
    pub explanation: String,
    pub mastery: Vec<MasteryScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<CounterSnapshot>,
}

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LedgerExport {
    pub user_id: String,
    pub events: Vec<AnswerEvent>,
}

#[derive(Debug, Serialize)]
pub struct ClearReviewResponse {
    pub purged_events: usize,
    pub cleared_questions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportLedgerResponse {
    pub imported: usize,
    pub ledger_size: usize,
}
