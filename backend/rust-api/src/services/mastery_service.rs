use serde::Deserialize;
use std::collections::HashMap;

use crate::models::mastery::MasteryScore;
use crate::models::Question;

/// Mastery adjustment constants, read from `mastery.*` configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MasteryPolicy {
    /// Score assigned the first time a knowledge point is seen.
    pub initial: f64,
    pub correct_delta: f64,
    pub incorrect_delta: f64,
    /// Knowledge points strictly below this score are reported as weak.
    pub weak_threshold: f64,
}

impl Default for MasteryPolicy {
    fn default() -> Self {
        Self {
            initial: 0.5,
            correct_delta: 0.10,
            incorrect_delta: 0.05,
            weak_threshold: 0.4,
        }
    }
}

impl MasteryPolicy {
    pub fn check(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.initial) {
            return Err(format!("mastery.initial {} outside [0, 1]", self.initial));
        }
        if !(self.correct_delta >= 0.0 && self.incorrect_delta >= 0.0) {
            return Err("mastery deltas must be non-negative".to_string());
        }
        if !(0.0..=1.0).contains(&self.weak_threshold) {
            return Err(format!(
                "mastery.weak_threshold {} outside [0, 1]",
                self.weak_threshold
            ));
        }
        Ok(())
    }
}

/// Per-user knowledge-point mastery, a projection of the answer ledger.
///
/// Scores only move when an answer is applied; there is no time-based decay.
#[derive(Debug, Clone)]
pub struct MasteryModel {
    policy: MasteryPolicy,
    scores: HashMap<String, f64>,
}

impl MasteryModel {
    pub fn new(policy: MasteryPolicy) -> Self {
        Self {
            policy,
            scores: HashMap::new(),
        }
    }

    pub fn policy(&self) -> &MasteryPolicy {
        &self.policy
    }

    /// Applies one answer outcome to every knowledge point tagged on `question`.
    pub fn update(&mut self, question: &Question, is_correct: bool) {
        let delta = if is_correct {
            self.policy.correct_delta
        } else {
            -self.policy.incorrect_delta
        };

        for kp in &question.knowledge_points {
            let entry = self
                .scores
                .entry(kp.clone())
                .or_insert(self.policy.initial);
            *entry = (*entry + delta).clamp(0.0, 1.0);
        }
    }

    pub fn get(&self, knowledge_point: &str) -> f64 {
        self.scores
            .get(knowledge_point)
            .copied()
            .unwrap_or(self.policy.initial)
    }

    /// Mean score over the question's tags; unseen tags count as the initial score.
    pub fn average_for(&self, question: &Question) -> f64 {
        if question.knowledge_points.is_empty() {
            return self.policy.initial;
        }
        let total: f64 = question
            .knowledge_points
            .iter()
            .map(|kp| self.get(kp))
            .sum();
        total / question.knowledge_points.len() as f64
    }

    pub fn is_weak(&self, score: f64) -> bool {
        score < self.policy.weak_threshold
    }

    /// All seen knowledge points sorted by name.
    pub fn scores(&self) -> Vec<MasteryScore> {
        let mut scores: Vec<MasteryScore> = self
            .scores
            .iter()
            .map(|(kp, score)| MasteryScore {
                knowledge_point: kp.clone(),
                score: *score,
            })
            .collect();
        scores.sort_by(|a, b| a.knowledge_point.cmp(&b.knowledge_point));
        scores
    }

    /// Seen knowledge points below the weak threshold, weakest first.
    pub fn weak_points(&self) -> Vec<MasteryScore> {
        let mut weak: Vec<MasteryScore> = self
            .scores()
            .into_iter()
            .filter(|entry| self.is_weak(entry.score))
            .collect();
        weak.sort_by(|a, b| {
            a.score
                .total_cmp(&b.score)
                .then_with(|| a.knowledge_point.cmp(&b.knowledge_point))
        });
        weak
    }

    pub fn scores_for(&self, question: &Question) -> Vec<MasteryScore> {
        question
            .knowledge_points
            .iter()
            .map(|kp| MasteryScore {
                knowledge_point: kp.clone(),
                score: self.get(kp),
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.scores.clear();
    }
}
