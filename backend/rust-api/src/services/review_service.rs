use std::collections::HashSet;

use crate::models::AnswerEvent;
use crate::services::ledger_service::AnswerLedger;

/// Question ids whose latest answer is incorrect, most recently missed first.
///
/// Always derived from the ledger; nothing about the review queue is stored.
pub fn wrong_question_ids(ledger: &AnswerLedger) -> Vec<String> {
    let mut missed: Vec<&AnswerEvent> = ledger
        .latest_by_question()
        .into_values()
        .filter(|event| !event.correct)
        .collect();
    missed.sort_by(|a, b| b.sequence.cmp(&a.sequence));
    missed
        .into_iter()
        .map(|event| event.question_id.clone())
        .collect()
}

pub fn review_set(ledger: &AnswerLedger) -> HashSet<String> {
    wrong_question_ids(ledger).into_iter().collect()
}
