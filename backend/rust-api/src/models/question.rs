use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use validator::{Validate, ValidationError};

use crate::error::{EngineError, EngineResult};

/// A single answer option, keyed by a stable label such as "A".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub key: String,
    pub text: String,
}

/// Aggregate usage statistics maintained by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QuestionStats {
    pub usage_count: u64,
    pub correct_rate: f64,
}

/// Exam question as supplied by the catalog loader.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_question_shape"))]
pub struct Question {
    #[validate(length(min = 1, max = 128))]
    pub id: String,
    #[validate(length(min = 1))]
    pub content: String,
    #[validate(length(min = 1, message = "question must have at least one option"))]
    pub options: Vec<AnswerOption>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
    #[validate(range(min = 1, max = 5))]
    pub difficulty: u8,
    #[validate(length(min = 1))]
    pub subject: String,
    pub knowledge_points: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<QuestionStats>,
}

impl Question {
    /// Validates the loader contract and maps failures to `EngineError::Validation`.
    pub fn check(&self) -> EngineResult<()> {
        self.validate()
            .map_err(|e| EngineError::validation(format!("question {}: {}", self.id, e)))
    }

    pub fn has_option(&self, key: &str) -> bool {
        self.options.iter().any(|opt| opt.key == key)
    }

    pub fn is_correct(&self, chosen: &str) -> bool {
        self.correct_answer == chosen
    }
}

#[derive(Debug, Deserialize)]
pub struct LoadQuestionsRequest {
    pub questions: Vec<Question>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoadQuestionsResponse {
    pub loaded: usize,
    pub total: usize,
}

fn validate_question_shape(question: &Question) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for option in &question.options {
        if option.key.trim().is_empty() {
            return Err(shape_error("blank_option_key", "option key must not be blank"));
        }
        if !seen.insert(option.key.as_str()) {
            return Err(shape_error(
                "duplicate_option_key",
                format!("option key {} appears more than once", option.key),
            ));
        }
    }

    if !question.has_option(&question.correct_answer) {
        return Err(shape_error(
            "correct_answer_not_in_options",
            format!(
                "correct answer {} is not one of the option keys",
                question.correct_answer
            ),
        ));
    }

    if question.knowledge_points.is_empty() {
        return Err(shape_error(
            "missing_knowledge_points",
            "question must be tagged with at least one knowledge point",
        ));
    }
    if question.knowledge_points.iter().any(|kp| kp.trim().is_empty()) {
        return Err(shape_error(
            "blank_knowledge_point",
            "knowledge point tags must not be blank",
        ));
    }

    Ok(())
}

fn shape_error(code: &'static str, message: impl Into<String>) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into().into());
    err
}


#[cfg(test)]
mod tests {
    use super::fixtures::question;
    use super::*;

    #[test]
    fn well_formed_question_passes() {
        assert!(question("q1", &["K1"]).check().is_ok());
    }

    #[test]
    fn rejects_empty_options() {
        let mut q = question("q1", &["K1"]);
        q.options.clear();
        assert!(matches!(q.check(), Err(EngineError::Validation(_))));
    }

    #[test]
    fn rejects_correct_answer_outside_options() {
        let mut q = question("q1", &["K1"]);
        q.correct_answer = "E".to_string();
        let err = q.check().unwrap_err();
        assert!(matches!(err, EngineError::Validation(ref msg) if msg.starts_with("question q1")));
    }

    #[test]
    fn rejects_missing_knowledge_points() {
        let q = question("q1", &[]);
        assert!(q.check().is_err());
    }

    #[test]
    fn rejects_duplicate_option_keys() {
        let mut q = question("q1", &["K1"]);
        q.options[1].key = "A".to_string();
        assert!(q.check().is_err());
    }

    #[test]
    fn rejects_difficulty_out_of_range() {
        let mut q = question("q1", &["K1"]);
        q.difficulty = 6;
        assert!(q.check().is_err());
        q.difficulty = 0;
        assert!(q.check().is_err());
    }

    #[test]
    fn correctness_compares_option_keys() {
        let q = question("q1", &["K1"]);
        assert!(q.is_correct("A"));
        assert!(!q.is_correct("B"));
    }
}
