use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryScore {
    pub knowledge_point: String,
    pub score: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MasteryReport {
    pub user_id: String,
    pub scores: Vec<MasteryScore>,
    /// Knowledge points below the weak threshold, weakest first.
    pub weak_points: Vec<MasteryScore>,
}

impl MasteryReport {
    /// Report for a user with no recorded answers.
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            scores: Vec::new(),
            weak_points: Vec::new(),
        }
    }
}
