use thiserror::Error;

/// Errors surfaced by the practice engine.
///
/// None of these are fatal: a failed call leaves the ledger, the mastery model
/// and the session counters exactly as they were before the call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Malformed question or answer rejected at the boundary.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The (user, question, session) triple was already answered.
    #[error("answer already recorded for user={user_id}, question={question_id}, session={session_id}")]
    DuplicateEvent {
        user_id: String,
        question_id: String,
        session_id: String,
    },

    #[error("question {0} not found")]
    UnknownQuestion(String),

    #[error("session {0} not found")]
    UnknownSession(String),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateEvent { .. })
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
