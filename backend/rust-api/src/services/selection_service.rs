use rand::Rng;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::models::{BatchRequest, Question, SelectionReason};
use crate::services::ledger_service::AnswerLedger;
use crate::services::mastery_service::MasteryModel;
use crate::services::review_service::review_set;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SelectionPolicy {
    /// Weight is `weight_offset - average mastery`, floored at `weight_floor`.
    pub weight_offset: f64,
    pub weight_floor: f64,
    pub default_batch_size: usize,
    pub max_batch_size: usize,
    pub default_exclude_recent: usize,
    /// Users with an empty ledger see harder questions less often.
    pub cold_start_max_difficulty: u8,
    pub cold_start_penalty: f64,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            weight_offset: 1.5,
            weight_floor: 0.1,
            default_batch_size: 10,
            max_batch_size: 50,
            default_exclude_recent: 5,
            cold_start_max_difficulty: 3,
            cold_start_penalty: 0.25,
            seed: None,
        }
    }
}

impl SelectionPolicy {
    pub fn check(&self) -> Result<(), String> {
        if !(self.weight_floor > 0.0 && self.weight_floor.is_finite()) {
            return Err(format!(
                "selection.weight_floor must be positive, got {}",
                self.weight_floor
            ));
        }
        if !self.weight_offset.is_finite() {
            return Err("selection.weight_offset must be finite".to_string());
        }
        if self.max_batch_size == 0 || self.default_batch_size > self.max_batch_size {
            return Err(format!(
                "selection batch sizes invalid: default={} max={}",
                self.default_batch_size, self.max_batch_size
            ));
        }
        if !(self.cold_start_penalty > 0.0 && self.cold_start_penalty <= 1.0) {
            return Err(format!(
                "selection.cold_start_penalty {} outside (0, 1]",
                self.cold_start_penalty
            ));
        }
        Ok(())
    }

    /// Clamps a caller-supplied batch size to the configured bounds.
    pub fn batch_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_batch_size)
            .min(self.max_batch_size)
    }
}

/// A question chosen for the next batch.
#[derive(Debug, Clone)]
pub struct Pick {
    pub question: Arc<Question>,
    pub weight: f64,
    pub reason: SelectionReason,
}

pub struct SelectionEngine {
    policy: SelectionPolicy,
}

impl SelectionEngine {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    pub fn weight(&self, average_mastery: f64) -> f64 {
        (self.policy.weight_offset - average_mastery).max(self.policy.weight_floor)
    }

    /// Weighted sampling without replacement over the eligible questions.
    ///
    /// Questions answered correctly within the last `exclude_recent_n` events
    /// are skipped unless they are in the review set. Returns fewer than
    /// `count` items when not enough questions are eligible.
    pub fn next_batch<R: Rng + ?Sized>(
        &self,
        questions: &[Arc<Question>],
        mastery: &MasteryModel,
        ledger: &AnswerLedger,
        request: &BatchRequest,
        rng: &mut R,
    ) -> Vec<Pick> {
        let review = review_set(ledger);
        let recently_correct: HashSet<&str> = ledger
            .last_n(request.exclude_recent_n)
            .iter()
            .filter(|event| event.correct)
            .map(|event| event.question_id.as_str())
            .filter(|id| !review.contains(*id))
            .collect();
        let cold_start = ledger.is_empty();

        let mut pool: Vec<Pick> = questions
            .iter()
            .filter(|q| request.admits(q))
            .filter(|q| !recently_correct.contains(q.id.as_str()))
            .map(|q| {
                let average = mastery.average_for(q);
                let mut weight = self.weight(average);
                if cold_start && q.difficulty > self.policy.cold_start_max_difficulty {
                    weight = (weight * self.policy.cold_start_penalty).max(self.policy.weight_floor);
                }

                let reason = if review.contains(&q.id) {
                    SelectionReason::Review
                } else if cold_start {
                    SelectionReason::NewUser
                } else if mastery.is_weak(average) {
                    SelectionReason::WeakPoint
                } else {
                    SelectionReason::Practice
                };

                Pick {
                    question: q.clone(),
                    weight,
                    reason,
                }
            })
            .collect();

        tracing::debug!(
            user = ledger.user_id(),
            eligible = pool.len(),
            excluded_recent = recently_correct.len(),
            review = review.len(),
            "selecting next batch"
        );

        let take = request.count.min(pool.len());
        let mut picked = Vec::with_capacity(take);
        while picked.len() < take {
            let index = roulette(&pool, rng);
            picked.push(pool.swap_remove(index));
        }
        picked
    }
}

/// Roulette-wheel draw over the remaining pool. `pool` must be non-empty.
fn roulette<R: Rng + ?Sized>(pool: &[Pick], rng: &mut R) -> usize {
    let total: f64 = pool.iter().map(|p| p.weight).sum();
    let mut point = rng.random::<f64>() * total;
    for (i, pick) in pool.iter().enumerate() {
        if point < pick.weight {
            return i;
        }
        point -= pick.weight;
    }
    // Rounding can leave a sliver past the last bucket.
    pool.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::fixtures::question;
    use crate::services::ledger_service::fixtures::event;
    use crate::services::mastery_service::MasteryPolicy;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn catalog(specs: &[(&str, &str)]) -> Vec<Arc<Question>> {
        specs
            .iter()
            .map(|(id, kp)| Arc::new(question(id, &[kp])))
            .collect()
    }

    fn ids(picks: &[Pick]) -> HashSet<String> {
        picks.iter().map(|p| p.question.id.clone()).collect()
    }

    #[test]
    fn weight_is_floored() {
        let engine = SelectionEngine::new(SelectionPolicy::default());
        assert!((engine.weight(0.5) - 1.0).abs() < 1e-12);
        assert!((engine.weight(1.0) - 0.5).abs() < 1e-12);
        let steep = SelectionEngine::new(SelectionPolicy {
            weight_offset: 1.0,
            ..SelectionPolicy::default()
        });
        assert_eq!(steep.weight(1.0), 0.1);
    }

    #[test]
    fn returns_all_eligible_when_short() {
        let engine = SelectionEngine::new(SelectionPolicy::default());
        let questions = catalog(&[("q1", "K1"), ("q2", "K2")]);
        let mastery = MasteryModel::new(MasteryPolicy::default());
        let ledger = AnswerLedger::new("u1");
        let mut rng = StdRng::seed_from_u64(7);

        let picks = engine.next_batch(
            &questions,
            &mastery,
            &ledger,
            &BatchRequest::new(10, 0),
            &mut rng,
        );
        assert_eq!(picks.len(), 2);
    }

    #[test]
    fn empty_catalog_yields_empty_batch() {
        let engine = SelectionEngine::new(SelectionPolicy::default());
        let mastery = MasteryModel::new(MasteryPolicy::default());
        let ledger = AnswerLedger::new("u1");
        let mut rng = StdRng::seed_from_u64(7);
        assert!(engine
            .next_batch(&[], &mastery, &ledger, &BatchRequest::new(5, 2), &mut rng)
            .is_empty());
    }

    #[test]
    fn recent_correct_answers_are_excluded() {
        let engine = SelectionEngine::new(SelectionPolicy::default());
        let questions = catalog(&[
            ("q1", "K1"),
            ("q2", "K1"),
            ("q3", "K2"),
            ("q4", "K2"),
            ("q5", "K3"),
        ]);
        let mastery = MasteryModel::new(MasteryPolicy::default());
        let mut ledger = AnswerLedger::new("u1");
        for (seq, id) in ["q1", "q2", "q3"].iter().enumerate() {
            ledger
                .append(event("u1", seq as u64 + 1, id, true, None))
                .unwrap();
        }

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picks = engine.next_batch(
                &questions,
                &mastery,
                &ledger,
                &BatchRequest::new(5, 3),
                &mut rng,
            );
            assert_eq!(
                ids(&picks),
                HashSet::from(["q4".to_string(), "q5".to_string()])
            );
        }

        // Only the last two events fall in the window now; q1 is eligible again.
        let mut rng = StdRng::seed_from_u64(1);
        let picks = engine.next_batch(
            &questions,
            &mastery,
            &ledger,
            &BatchRequest::new(5, 2),
            &mut rng,
        );
        assert_eq!(
            ids(&picks),
            HashSet::from(["q1".to_string(), "q4".to_string(), "q5".to_string()])
        );
    }

    #[test]
    fn review_items_are_never_excluded() {
        let engine = SelectionEngine::new(SelectionPolicy::default());
        let questions = catalog(&[("q1", "K1"), ("q2", "K2")]);
        let mastery = MasteryModel::new(MasteryPolicy::default());
        let mut ledger = AnswerLedger::new("u1");
        ledger.append(event("u1", 1, "q1", true, Some("s1"))).unwrap();
        ledger.append(event("u1", 2, "q1", false, Some("s2"))).unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let picks = engine.next_batch(
            &questions,
            &mastery,
            &ledger,
            &BatchRequest::new(2, 10),
            &mut rng,
        );
        let q1 = picks.iter().find(|p| p.question.id == "q1").unwrap();
        assert_eq!(q1.reason, SelectionReason::Review);
    }

    #[test]
    fn no_duplicates_within_a_batch() {
        let engine = SelectionEngine::new(SelectionPolicy::default());
        let specs: Vec<(String, String)> = (0..20)
            .map(|i| (format!("q{}", i), format!("K{}", i % 4)))
            .collect();
        let questions: Vec<Arc<Question>> = specs
            .iter()
            .map(|(id, kp)| Arc::new(question(id, &[kp.as_str()])))
            .collect();
        let mastery = MasteryModel::new(MasteryPolicy::default());
        let ledger = AnswerLedger::new("u1");
        let mut rng = StdRng::seed_from_u64(11);

        let picks = engine.next_batch(
            &questions,
            &mastery,
            &ledger,
            &BatchRequest::new(15, 0),
            &mut rng,
        );
        assert_eq!(picks.len(), 15);
        assert_eq!(ids(&picks).len(), 15);
    }

    #[test]
    fn weak_knowledge_points_are_favoured() {
        let engine = SelectionEngine::new(SelectionPolicy::default());
        let questions = catalog(&[("weak", "K-weak"), ("strong", "K-strong")]);
        let mut mastery = MasteryModel::new(MasteryPolicy::default());
        for _ in 0..10 {
            mastery.update(&question("x", &["K-weak"]), false);
            mastery.update(&question("y", &["K-strong"]), true);
        }
        let mut ledger = AnswerLedger::new("u1");
        ledger.append(event("u1", 1, "other", true, None)).unwrap();

        let mut first: HashMap<String, usize> = HashMap::new();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..2000 {
            let picks = engine.next_batch(
                &questions,
                &mastery,
                &ledger,
                &BatchRequest::new(1, 0),
                &mut rng,
            );
            *first.entry(picks[0].question.id.clone()).or_default() += 1;
        }
        // Weights are 1.5 and 0.5, so "weak" should win roughly 75% of draws.
        let weak = first.get("weak").copied().unwrap_or(0);
        assert!(weak > 1300 && weak < 1700, "weak drawn {} times", weak);
        assert!(first.get("strong").copied().unwrap_or(0) > 0);
    }

    #[test]
    fn filters_restrict_eligibility() {
        let engine = SelectionEngine::new(SelectionPolicy::default());
        let mut hard = question("hard", &["K1"]);
        hard.difficulty = 5;
        let mut other_subject = question("net", &["K1"]);
        other_subject.subject = "networking".to_string();
        let questions = vec![
            Arc::new(question("easy", &["K1"])),
            Arc::new(hard),
            Arc::new(other_subject),
        ];
        let mastery = MasteryModel::new(MasteryPolicy::default());
        let ledger = AnswerLedger::new("u1");
        let mut rng = StdRng::seed_from_u64(5);

        let request = BatchRequest {
            subject: Some("software-design".to_string()),
            max_difficulty: Some(3),
            ..BatchRequest::new(10, 0)
        };
        let picks = engine.next_batch(&questions, &mastery, &ledger, &request, &mut rng);
        assert_eq!(ids(&picks), HashSet::from(["easy".to_string()]));
    }

    #[test]
    fn cold_start_penalises_hard_questions() {
        let engine = SelectionEngine::new(SelectionPolicy::default());
        let mut hard = question("hard", &["K1"]);
        hard.difficulty = 5;
        let questions = vec![Arc::new(question("easy", &["K1"])), Arc::new(hard)];
        let mastery = MasteryModel::new(MasteryPolicy::default());
        let ledger = AnswerLedger::new("u1");
        let mut rng = StdRng::seed_from_u64(9);

        let picks = engine.next_batch(
            &questions,
            &mastery,
            &ledger,
            &BatchRequest::new(2, 0),
            &mut rng,
        );
        let hard_pick = picks.iter().find(|p| p.question.id == "hard").unwrap();
        let easy_pick = picks.iter().find(|p| p.question.id == "easy").unwrap();
        assert!((hard_pick.weight - 0.25).abs() < 1e-12);
        assert!((easy_pick.weight - 1.0).abs() < 1e-12);
        assert_eq!(easy_pick.reason, SelectionReason::NewUser);
    }

    #[test]
    fn batch_size_is_clamped() {
        let policy = SelectionPolicy::default();
        assert_eq!(policy.batch_size(None), 10);
        assert_eq!(policy.batch_size(Some(500)), 50);
        assert_eq!(policy.batch_size(Some(3)), 3);
    }
}
