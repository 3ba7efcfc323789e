use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::metrics::{
    ANSWERS_RECORDED_TOTAL, BATCHES_SERVED_TOTAL, BATCH_SIZE, DUPLICATE_ANSWERS_TOTAL,
    REVIEW_QUEUE_CLEARED_TOTAL, SESSIONS_ACTIVE, SESSIONS_TOTAL,
};
use crate::models::mastery::{MasteryReport, MasteryScore};
use crate::models::{
    AnswerEvent, AnswerSubmission, BatchRequest, CounterSnapshot, Question, SelectedQuestion,
    SessionSummary,
};
use crate::services::catalog_service::QuestionCatalog;
use crate::services::ledger_service::AnswerLedger;
use crate::services::mastery_service::{MasteryModel, MasteryPolicy};
use crate::services::review_service::wrong_question_ids;
use crate::services::selection_service::{SelectionEngine, SelectionPolicy};
use crate::services::session_service::{PracticeSession, SessionCounters};

/// Result of a successful `record`.
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub event: AnswerEvent,
    pub question: Arc<Question>,
    pub mastery: Vec<MasteryScore>,
    pub session: Option<CounterSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClearOutcome {
    pub purged_events: usize,
    pub cleared_questions: Vec<String>,
}

/// All practice state for one user: the ledger and its projections.
///
/// The mastery model and session counters are caches of the ledger; every
/// mutation goes through `record`, `clear_review_queue` or `import`, and each
/// of those leaves the projections equal to a full replay.
pub struct PracticeEngine {
    user_id: String,
    catalog: Arc<QuestionCatalog>,
    ledger: AnswerLedger,
    mastery: MasteryModel,
    sessions: HashMap<String, PracticeSession>,
    selector: SelectionEngine,
    rng: StdRng,
}

impl PracticeEngine {
    pub fn new(
        user_id: impl Into<String>,
        catalog: Arc<QuestionCatalog>,
        mastery_policy: MasteryPolicy,
        selection_policy: SelectionPolicy,
    ) -> Self {
        let user_id = user_id.into();
        let rng = match selection_policy.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ user_seed(&user_id)),
            None => StdRng::from_os_rng(),
        };

        Self {
            ledger: AnswerLedger::new(user_id.clone()),
            user_id,
            catalog,
            mastery: MasteryModel::new(mastery_policy),
            sessions: HashMap::new(),
            selector: SelectionEngine::new(selection_policy),
            rng,
        }
    }

    /// Builds an engine by replaying `events` in order.
    pub fn restore(
        user_id: impl Into<String>,
        catalog: Arc<QuestionCatalog>,
        mastery_policy: MasteryPolicy,
        selection_policy: SelectionPolicy,
        events: impl IntoIterator<Item = AnswerEvent>,
    ) -> EngineResult<Self> {
        let mut engine = Self::new(user_id, catalog, mastery_policy, selection_policy);
        for event in events {
            engine.apply_replayed(event)?;
        }
        Ok(engine)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn ledger(&self) -> &AnswerLedger {
        &self.ledger
    }

    pub fn mastery_model(&self) -> &MasteryModel {
        &self.mastery
    }

    /// Validates, appends and projects one answer. On any error nothing changes.
    pub fn record(&mut self, submission: AnswerSubmission) -> EngineResult<RecordOutcome> {
        if submission.latency_ms < 0 {
            return Err(EngineError::validation(format!(
                "latency must be non-negative, got {}",
                submission.latency_ms
            )));
        }

        let question = self.catalog.question(&submission.question_id).ok_or_else(|| {
            EngineError::validation(format!("unknown question {}", submission.question_id))
        })?;

        if !question.has_option(&submission.chosen) {
            return Err(EngineError::validation(format!(
                "option {} is not offered by question {}",
                submission.chosen, question.id
            )));
        }

        if let Some(session_id) = &submission.session_id {
            if let Some(session) = self.sessions.get(session_id) {
                if !session.is_active() {
                    return Err(EngineError::validation(format!(
                        "session {} is already completed",
                        session_id
                    )));
                }
            }
        }

        let now = Utc::now();
        let event = AnswerEvent {
            sequence: self.ledger.next_sequence(),
            user_id: self.user_id.clone(),
            question_id: question.id.clone(),
            correct: question.is_correct(&submission.chosen),
            chosen: submission.chosen,
            latency_ms: submission.latency_ms as u64,
            answered_at: self.ledger.next_timestamp(now),
            session_id: submission.session_id,
        };

        let event = match self.ledger.append(event) {
            Ok(event) => event,
            Err(err) => {
                if err.is_duplicate() {
                    DUPLICATE_ANSWERS_TOTAL.inc();
                    tracing::info!(
                        "Ignoring duplicate answer: user={}, question={}",
                        self.user_id,
                        question.id
                    );
                }
                return Err(err);
            }
        };

        self.mastery.update(&question, event.correct);
        let session = event
            .session_id
            .as_ref()
            .map(|session_id| self.session_entry(session_id, now).record_event(&event));
        self.catalog.record_outcome(&question.id, event.correct);

        ANSWERS_RECORDED_TOTAL
            .with_label_values(&[if event.correct { "true" } else { "false" }])
            .inc();

        tracing::info!(
            "Answer recorded: user={}, question={}, correct={}, sequence={}",
            self.user_id,
            question.id,
            event.correct,
            event.sequence
        );

        Ok(RecordOutcome {
            mastery: self.mastery.scores_for(&question),
            event,
            question,
            session,
        })
    }

    pub fn next_batch(&mut self, request: &BatchRequest) -> Vec<SelectedQuestion> {
        let questions = self.catalog.questions();
        let picks = self.selector.next_batch(
            &questions,
            &self.mastery,
            &self.ledger,
            request,
            &mut self.rng,
        );

        BATCHES_SERVED_TOTAL.inc();
        BATCH_SIZE.observe(picks.len() as f64);

        if picks.len() < request.count {
            tracing::debug!(
                "Batch for user={} short: requested={}, returned={}",
                self.user_id,
                request.count,
                picks.len()
            );
        }

        picks
            .into_iter()
            .map(|pick| SelectedQuestion {
                question: self.catalog.present(&pick.question),
                weight: pick.weight,
                reason: pick.reason,
            })
            .collect()
    }

    /// Questions whose latest answer is wrong, most recently missed first.
    pub fn wrong_questions(&self) -> Vec<Question> {
        wrong_question_ids(&self.ledger)
            .iter()
            .filter_map(|id| self.catalog.question(id))
            .map(|q| self.catalog.present(&q))
            .collect()
    }

    /// Purges every ledger entry of the questions currently in review, then
    /// rebuilds the projections from what remains. Idempotent.
    pub fn clear_review_queue(&mut self) -> ClearOutcome {
        let cleared = wrong_question_ids(&self.ledger);
        if cleared.is_empty() {
            return ClearOutcome::default();
        }

        let ids: HashSet<String> = cleared.iter().cloned().collect();
        let purged_events = self.ledger.purge_questions(&ids);
        self.rebuild_projections();

        REVIEW_QUEUE_CLEARED_TOTAL.inc();
        tracing::info!(
            "Review queue cleared: user={}, questions={}, events_purged={}",
            self.user_id,
            cleared.len(),
            purged_events
        );

        ClearOutcome {
            purged_events,
            cleared_questions: cleared,
        }
    }

    pub fn mastery(&self, knowledge_point: &str) -> f64 {
        self.mastery.get(knowledge_point)
    }

    pub fn mastery_report(&self) -> MasteryReport {
        MasteryReport {
            user_id: self.user_id.clone(),
            scores: self.mastery.scores(),
            weak_points: self.mastery.weak_points(),
        }
    }

    pub fn start_session(&mut self) -> SessionSummary {
        let session_id = Uuid::new_v4().to_string();
        let user_id = self.user_id.clone();
        let summary = self
            .session_entry(&session_id, Utc::now())
            .summary(&user_id);
        tracing::info!(
            "Session started: user={}, session={}",
            self.user_id,
            session_id
        );
        summary
    }

    pub fn session(&self, session_id: &str) -> EngineResult<SessionSummary> {
        self.sessions
            .get(session_id)
            .map(|session| session.summary(&self.user_id))
            .ok_or_else(|| EngineError::UnknownSession(session_id.to_string()))
    }

    /// Marks the session completed and returns its final counters.
    pub fn complete_session(&mut self, session_id: &str) -> EngineResult<SessionSummary> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| EngineError::UnknownSession(session_id.to_string()))?;

        if session.is_active() {
            session.complete(Utc::now());
            SESSIONS_TOTAL.with_label_values(&["completed"]).inc();
            SESSIONS_ACTIVE.dec();
            tracing::info!(
                "Session completed: user={}, session={}, answered={}",
                self.user_id,
                session_id,
                session.counters.snapshot().answered
            );
        }

        Ok(session.summary(&self.user_id))
    }

    pub fn events(&self, since: Option<chrono::DateTime<Utc>>) -> Vec<AnswerEvent> {
        self.ledger.query(since).cloned().collect()
    }

    /// Appends previously exported events after the current ledger. The
    /// import is all-or-nothing, and completed sessions accept no new events.
    pub fn import(&mut self, events: Vec<AnswerEvent>) -> EngineResult<usize> {
        if let Some(session_id) = events
            .iter()
            .filter_map(|event| event.session_id.as_deref())
            .find(|id| self.sessions.get(*id).is_some_and(|s| !s.is_active()))
        {
            return Err(EngineError::validation(format!(
                "session {} is already completed",
                session_id
            )));
        }

        let imported = events.len();
        let mut staged = Self::restore(
            self.user_id.clone(),
            self.catalog.clone(),
            *self.mastery.policy(),
            *self.selector.policy(),
            self.ledger.events().iter().cloned().chain(events),
        )?;

        // Keep lifecycle metadata of sessions this engine already knew about.
        for (id, session) in &self.sessions {
            if let Some(replayed) = staged.sessions.get_mut(id) {
                replayed.started_at = session.started_at;
                replayed.completed_at = session.completed_at;
            } else {
                let mut kept = session.clone();
                kept.counters = SessionCounters::new();
                staged.sessions.insert(id.clone(), kept);
            }
        }

        self.ledger = staged.ledger;
        self.mastery = staged.mastery;
        self.sessions = staged.sessions;

        tracing::info!(
            "Imported {} events for user={} (ledger size {})",
            imported,
            self.user_id,
            self.ledger.len()
        );
        Ok(imported)
    }

    fn apply_replayed(&mut self, event: AnswerEvent) -> EngineResult<()> {
        let question = self.catalog.question(&event.question_id).ok_or_else(|| {
            EngineError::validation(format!("unknown question {}", event.question_id))
        })?;
        if question.is_correct(&event.chosen) != event.correct {
            return Err(EngineError::validation(format!(
                "event {} correctness does not match question {}",
                event.sequence, question.id
            )));
        }

        let event = self.ledger.append(event)?;
        self.mastery.update(&question, event.correct);
        if let Some(session_id) = &event.session_id {
            self.sessions
                .entry(session_id.clone())
                .or_insert_with(|| PracticeSession::start(session_id.as_str(), event.answered_at))
                .record_event(&event);
        }
        Ok(())
    }

    fn rebuild_projections(&mut self) {
        // The catalog is append-only and every ledger event was validated
        // against it, so each question id resolves.
        self.mastery.reset();
        for event in self.ledger.events() {
            let question = self.catalog.question(&event.question_id);
            debug_assert!(
                question.is_some(),
                "ledger references question {} missing from the catalog",
                event.question_id
            );
            match question {
                Some(question) => self.mastery.update(&question, event.correct),
                None => tracing::error!(
                    "Ledger event {} references unknown question {} for user={}",
                    event.sequence,
                    event.question_id,
                    self.user_id
                ),
            }
        }

        for (session_id, session) in self.sessions.iter_mut() {
            session.counters = SessionCounters::replay(self.ledger.session_events(session_id));
        }
    }

    fn session_entry(
        &mut self,
        session_id: &str,
        now: chrono::DateTime<Utc>,
    ) -> &mut PracticeSession {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                SESSIONS_TOTAL.with_label_values(&["created"]).inc();
                SESSIONS_ACTIVE.inc();
                PracticeSession::start(session_id, now)
            })
    }
}

/// FNV-1a over the user id, so a fixed seed still gives each user its own stream.
fn user_seed(user_id: &str) -> u64 {
    user_id.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x0100_0000_01b3)
    })
}

/// Per-user engines. Each user has an independent guard; the map lock is
/// only held long enough to find or create a slot.
pub struct EngineRegistry {
    catalog: Arc<QuestionCatalog>,
    mastery_policy: MasteryPolicy,
    selection_policy: SelectionPolicy,
    engines: RwLock<HashMap<String, Arc<Mutex<PracticeEngine>>>>,
}

impl EngineRegistry {
    pub fn new(
        catalog: Arc<QuestionCatalog>,
        mastery_policy: MasteryPolicy,
        selection_policy: SelectionPolicy,
    ) -> Self {
        Self {
            catalog,
            mastery_policy,
            selection_policy,
            engines: RwLock::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &Arc<QuestionCatalog> {
        &self.catalog
    }

    pub fn selection_policy(&self) -> &SelectionPolicy {
        &self.selection_policy
    }

    pub fn engine(&self, user_id: &str) -> Arc<Mutex<PracticeEngine>> {
        if let Some(engine) = self.engines.read().get(user_id) {
            return engine.clone();
        }

        self.engines
            .write()
            .entry(user_id.to_string())
            .or_insert_with(|| {
                tracing::debug!("Creating practice engine for user={}", user_id);
                Arc::new(Mutex::new(PracticeEngine::new(
                    user_id,
                    self.catalog.clone(),
                    self.mastery_policy,
                    self.selection_policy,
                )))
            })
            .clone()
    }

    /// Looks up an engine without creating one.
    pub fn existing(&self, user_id: &str) -> Option<Arc<Mutex<PracticeEngine>>> {
        self.engines.read().get(user_id).cloned()
    }

    /// Runs `f` under the user's guard, creating the engine on first use.
    pub fn with_engine<T>(&self, user_id: &str, f: impl FnOnce(&mut PracticeEngine) -> T) -> T {
        let engine = self.engine(user_id);
        let mut guard = engine.lock();
        f(&mut guard)
    }

    /// Runs `f` against the user's engine if one exists. Users that never
    /// wrote anything get `None` and leave the registry untouched.
    pub fn with_existing<T>(
        &self,
        user_id: &str,
        f: impl FnOnce(&mut PracticeEngine) -> T,
    ) -> Option<T> {
        let engine = self.existing(user_id)?;
        let mut guard = engine.lock();
        Some(f(&mut guard))
    }

    pub fn user_count(&self) -> usize {
        self.engines.read().len()
    }
}
