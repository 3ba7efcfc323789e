use serde::{Deserialize, Serialize};

use super::question::Question;

/// Parameters for one `next_batch` call.
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    pub count: usize,
    pub exclude_recent_n: usize,
    pub subject: Option<String>,
    pub min_difficulty: Option<u8>,
    pub max_difficulty: Option<u8>,
}

impl BatchRequest {
    pub fn new(count: usize, exclude_recent_n: usize) -> Self {
        Self {
            count,
            exclude_recent_n,
            ..Default::default()
        }
    }

    pub fn admits(&self, question: &Question) -> bool {
        if let Some(subject) = &self.subject {
            if &question.subject != subject {
                return false;
            }
        }
        if let Some(min) = self.min_difficulty {
            if question.difficulty < min {
                return false;
            }
        }
        if let Some(max) = self.max_difficulty {
            if question.difficulty > max {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Deserialize)]
pub struct NextBatchQuery {
    pub count: Option<usize>,
    pub exclude_recent: Option<usize>,
    pub subject: Option<String>,
    pub min_difficulty: Option<u8>,
    pub max_difficulty: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    /// Latest answer was wrong and has not been corrected.
    Review,
    /// Average mastery of the tagged knowledge points is below the weak threshold.
    WeakPoint,
    /// User has no history yet.
    NewUser,
    Practice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedQuestion {
    pub question: Question,
    pub weight: f64,
    pub reason: SelectionReason,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NextBatchResponse {
    pub user_id: String,
    pub requested: usize,
    pub questions: Vec<SelectedQuestion>,
}
