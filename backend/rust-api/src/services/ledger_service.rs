use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

use crate::error::{EngineError, EngineResult};
use crate::models::AnswerEvent;

/// Append-only answer log for one user; the source of truth for every
/// derived view (mastery, review queue, session counters).
#[derive(Debug, Clone)]
pub struct AnswerLedger {
    user_id: String,
    events: Vec<AnswerEvent>,
    /// (question, session) pairs already answered. Sessionless events are not keyed.
    keys: HashSet<(String, String)>,
}

impl AnswerLedger {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            events: Vec::new(),
            keys: HashSet::new(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn next_sequence(&self) -> u64 {
        self.events.last().map(|e| e.sequence + 1).unwrap_or(1)
    }

    /// Timestamp for a new event: wall clock, never earlier than the last event.
    pub fn next_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.events.last() {
            Some(last) if last.answered_at > now => last.answered_at,
            _ => now,
        }
    }

    pub fn is_answered(&self, question_id: &str, session_id: Option<&str>) -> bool {
        match session_id {
            Some(session) => self
                .keys
                .contains(&(question_id.to_string(), session.to_string())),
            None => false,
        }
    }

    /// Checks everything `append` checks without appending.
    pub fn check(&self, event: &AnswerEvent) -> EngineResult<()> {
        if event.user_id != self.user_id {
            return Err(EngineError::validation(format!(
                "event for user {} offered to ledger of {}",
                event.user_id, self.user_id
            )));
        }

        if let Some(last) = self.events.last() {
            if event.sequence <= last.sequence || event.answered_at < last.answered_at {
                return Err(EngineError::validation(format!(
                    "event {} is out of order (last sequence {})",
                    event.sequence, last.sequence
                )));
            }
        }

        if self.is_answered(&event.question_id, event.session_id.as_deref()) {
            return Err(EngineError::DuplicateEvent {
                user_id: event.user_id.clone(),
                question_id: event.question_id.clone(),
                session_id: event.session_id.clone().unwrap_or_default(),
            });
        }

        Ok(())
    }

    /// Duplicate check and append in one step; the caller holds the user's guard.
    pub fn append(&mut self, event: AnswerEvent) -> EngineResult<AnswerEvent> {
        self.check(&event)?;

        if let Some(session) = &event.session_id {
            self.keys.insert((event.question_id.clone(), session.clone()));
        }
        self.events.push(event.clone());

        Ok(event)
    }

    /// Events in ascending order, optionally only those at or after `since`.
    /// Each call returns a fresh iterator, so replays can be repeated.
    pub fn query(&self, since: Option<DateTime<Utc>>) -> impl Iterator<Item = &AnswerEvent> + '_ {
        self.events
            .iter()
            .filter(move |event| since.map_or(true, |since| event.answered_at >= since))
    }

    pub fn events(&self) -> &[AnswerEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The most recent `n` events, oldest first.
    pub fn last_n(&self, n: usize) -> &[AnswerEvent] {
        let start = self.events.len().saturating_sub(n);
        &self.events[start..]
    }

    /// Latest event per question.
    pub fn latest_by_question(&self) -> HashMap<&str, &AnswerEvent> {
        let mut latest = HashMap::new();
        for event in &self.events {
            latest.insert(event.question_id.as_str(), event);
        }
        latest
    }

    pub fn session_events<'a>(
        &'a self,
        session_id: &'a str,
    ) -> impl Iterator<Item = &'a AnswerEvent> + 'a {
        self.events
            .iter()
            .filter(move |event| event.session_id.as_deref() == Some(session_id))
    }

    /// Removes every event of the given questions. Only used by the explicit
    /// review-queue purge.
    pub fn purge_questions(&mut self, question_ids: &HashSet<String>) -> usize {
        let before = self.events.len();
        self.events
            .retain(|event| !question_ids.contains(&event.question_id));
        self.keys
            .retain(|(question_id, _)| !question_ids.contains(question_id));
        before - self.events.len()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::event;
    use super::*;

    #[test]
    fn duplicate_in_same_session_rejected() {
        let mut ledger = AnswerLedger::new("u1");
        ledger.append(event("u1", 1, "q1", true, Some("s1"))).unwrap();

        let err = ledger
            .append(event("u1", 2, "q1", false, Some("s1")))
            .unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn same_question_in_another_session_is_allowed() {
        let mut ledger = AnswerLedger::new("u1");
        ledger.append(event("u1", 1, "q1", false, Some("s1"))).unwrap();
        ledger.append(event("u1", 2, "q1", true, Some("s2"))).unwrap();
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn sessionless_events_are_not_deduplicated() {
        let mut ledger = AnswerLedger::new("u1");
        ledger.append(event("u1", 1, "q1", false, None)).unwrap();
        ledger.append(event("u1", 2, "q1", true, None)).unwrap();
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn rejects_out_of_order_and_foreign_events() {
        let mut ledger = AnswerLedger::new("u1");
        ledger.append(event("u1", 5, "q1", true, None)).unwrap();
        assert!(ledger.append(event("u1", 5, "q2", true, None)).is_err());
        assert!(ledger.append(event("u1", 3, "q2", true, None)).is_err());
        assert!(ledger.append(event("u2", 6, "q2", true, None)).is_err());
        assert_eq!(ledger.next_sequence(), 6);
    }

    #[test]
    fn query_is_restartable_and_filters_since() {
        let mut ledger = AnswerLedger::new("u1");
        for seq in 1..=4 {
            ledger
                .append(event("u1", seq, &format!("q{}", seq), true, None))
                .unwrap();
        }

        let first: Vec<u64> = ledger.query(None).map(|e| e.sequence).collect();
        let second: Vec<u64> = ledger.query(None).map(|e| e.sequence).collect();
        assert_eq!(first, vec![1, 2, 3, 4]);
        assert_eq!(first, second);

        let since = ledger.events()[2].answered_at;
        let tail: Vec<u64> = ledger.query(Some(since)).map(|e| e.sequence).collect();
        assert_eq!(tail, vec![3, 4]);
    }

    #[test]
    fn purge_removes_keys_too() {
        let mut ledger = AnswerLedger::new("u1");
        ledger.append(event("u1", 1, "q1", false, Some("s1"))).unwrap();
        ledger.append(event("u1", 2, "q2", true, Some("s1"))).unwrap();

        let purged = ledger.purge_questions(&HashSet::from(["q1".to_string()]));
        assert_eq!(purged, 1);
        assert!(!ledger.is_answered("q1", Some("s1")));
        assert!(ledger.is_answered("q2", Some("s1")));
    }

    #[test]
    fn last_n_saturates() {
        let mut ledger = AnswerLedger::new("u1");
        ledger.append(event("u1", 1, "q1", true, None)).unwrap();
        assert_eq!(ledger.last_n(10).len(), 1);
        assert!(ledger.last_n(0).is_empty());
    }
}
