use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::metrics::CATALOG_QUESTIONS;
use crate::models::{Question, QuestionStats};

struct CatalogEntry {
    question: Arc<Question>,
    usage: AtomicU64,
    correct: AtomicU64,
}

#[derive(Default)]
struct CatalogInner {
    entries: HashMap<String, CatalogEntry>,
    order: Vec<String>,
}

/// Appendable, shared set of questions.
///
/// Question content never changes after load; only the usage counters move,
/// and those are atomics so recording answers only needs the read lock.
#[derive(Default)]
pub struct QuestionCatalog {
    inner: RwLock<CatalogInner>,
}

impl QuestionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_questions(questions: Vec<Question>) -> EngineResult<Self> {
        let catalog = Self::new();
        catalog.load(questions)?;
        Ok(catalog)
    }

    /// Appends a batch of questions. The whole batch is rejected if any
    /// question breaks the loader contract or reuses an existing id.
    pub fn load(&self, questions: Vec<Question>) -> EngineResult<usize> {
        let mut inner = self.inner.write();

        let mut batch_ids = HashSet::new();
        for question in &questions {
            question.check()?;
            if inner.entries.contains_key(&question.id) || !batch_ids.insert(question.id.as_str())
            {
                return Err(EngineError::validation(format!(
                    "question id {} is already in the catalog",
                    question.id
                )));
            }
        }

        let loaded = questions.len();
        for question in questions {
            let (usage, correct) = question
                .stats
                .map(|s| {
                    let correct = (s.correct_rate.clamp(0.0, 1.0) * s.usage_count as f64).round();
                    (s.usage_count, correct as u64)
                })
                .unwrap_or((0, 0));

            inner.order.push(question.id.clone());
            inner.entries.insert(
                question.id.clone(),
                CatalogEntry {
                    question: Arc::new(question),
                    usage: AtomicU64::new(usage),
                    correct: AtomicU64::new(correct),
                },
            );
        }

        CATALOG_QUESTIONS.set(inner.order.len() as i64);
        tracing::info!(
            "Catalog loaded {} questions (total={})",
            loaded,
            inner.order.len()
        );
        Ok(loaded)
    }

    pub fn question(&self, id: &str) -> Option<Arc<Question>> {
        self.inner
            .read()
            .entries
            .get(id)
            .map(|entry| entry.question.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().entries.contains_key(id)
    }

    /// All questions in load order.
    pub fn questions(&self) -> Vec<Arc<Question>> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.entries.get(id).map(|e| e.question.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn record_outcome(&self, id: &str, correct: bool) {
        let inner = self.inner.read();
        if let Some(entry) = inner.entries.get(id) {
            entry.usage.fetch_add(1, Ordering::Relaxed);
            if correct {
                entry.correct.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn stats(&self, id: &str) -> Option<QuestionStats> {
        let inner = self.inner.read();
        inner.entries.get(id).map(|entry| {
            let usage = entry.usage.load(Ordering::Relaxed);
            let correct = entry.correct.load(Ordering::Relaxed);
            QuestionStats {
                usage_count: usage,
                correct_rate: if usage == 0 {
                    0.0
                } else {
                    correct as f64 / usage as f64
                },
            }
        })
    }

    /// Copy of the question with live statistics, for presentation.
    pub fn present(&self, question: &Question) -> Question {
        let mut presented = question.clone();
        presented.stats = self.stats(&question.id);
        presented
    }
}
