use chrono::{DateTime, Utc};

use crate::models::{AnswerEvent, CounterSnapshot, SessionStatus, SessionSummary};

/// Streak and accuracy counters for one practice session.
///
/// Holds nothing that cannot be rebuilt by replaying the session's events
/// in order through `record`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounters {
    answered: u32,
    correct: u32,
    streak: u32,
    longest_streak: u32,
}

impl SessionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replay<'a>(events: impl IntoIterator<Item = &'a AnswerEvent>) -> Self {
        let mut counters = Self::new();
        for event in events {
            counters.record(event.correct);
        }
        counters
    }

    pub fn record(&mut self, correct: bool) {
        self.answered += 1;
        if correct {
            self.correct += 1;
            self.streak += 1;
            self.longest_streak = self.longest_streak.max(self.streak);
        } else {
            self.streak = 0;
        }
    }

    pub fn record_in_session(&mut self, event: &AnswerEvent) {
        self.record(event.correct);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            answered: self.answered,
            correct: self.correct,
            streak: self.streak,
            longest_streak: self.longest_streak,
            accuracy: if self.answered == 0 {
                0.0
            } else {
                self.correct as f64 / self.answered as f64
            },
        }
    }
}

/// Lifecycle wrapper around the counters of one session.
#[derive(Debug, Clone)]
pub struct PracticeSession {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub counters: SessionCounters,
}

impl PracticeSession {
    pub fn start(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            started_at: now,
            completed_at: None,
            counters: SessionCounters::new(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        if self.completed_at.is_some() {
            SessionStatus::Completed
        } else {
            SessionStatus::Active
        }
    }

    pub fn is_active(&self) -> bool {
        self.completed_at.is_none()
    }

    pub fn complete(&mut self, now: DateTime<Utc>) {
        if self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
    }

    /// Counts the answer and returns the updated counters.
    pub fn record_event(&mut self, event: &AnswerEvent) -> CounterSnapshot {
        self.counters.record_in_session(event);
        self.counters.snapshot()
    }

    pub fn summary(&self, user_id: &str) -> SessionSummary {
        SessionSummary {
            session_id: self.id.clone(),
            user_id: user_id.to_string(),
            status: self.status(),
            started_at: self.started_at,
            completed_at: self.completed_at,
            counters: self.counters.snapshot(),
        }
    }
}
