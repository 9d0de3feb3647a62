//! Evaluated trials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::trial_point::TrialPoint;

/// Monotonic per-session trial number, assigned at evaluation time.
pub type TrialSequence = u64;

/// Constraint failure marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Veto {
    pub reason: String,
}

/// Raw outcome of evaluating one trial point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Score per objective name.
    pub scores: BTreeMap<String, f64>,
    /// Soft-constraint violation; zero when feasible.
    pub penalty: f64,
    pub veto: Option<Veto>,
}

impl Evaluation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluation with a single objective score.
    pub fn scored(objective: impl Into<String>, score: f64) -> Self {
        Self::new().with_score(objective, score)
    }

    /// Evaluation rejected by a constraint.
    pub fn vetoed(reason: impl Into<String>) -> Self {
        Self {
            veto: Some(Veto {
                reason: reason.into(),
            }),
            ..Self::default()
        }
    }

    pub fn with_score(mut self, objective: impl Into<String>, score: f64) -> Self {
        self.scores.insert(objective.into(), score);
        self
    }

    pub fn with_penalty(mut self, penalty: f64) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn is_vetoed(&self) -> bool {
        self.veto.is_some()
    }
}

/// A trial point together with its evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub sequence: TrialSequence,
    pub point: TrialPoint,
    pub evaluation: Evaluation,
    /// Label of the algorithm that proposed the point.
    pub algorithm: String,
    pub evaluated_at: DateTime<Utc>,
}

impl Trial {
    pub fn new(
        sequence: TrialSequence,
        point: TrialPoint,
        evaluation: Evaluation,
        algorithm: impl Into<String>,
    ) -> Self {
        Self {
            sequence,
            point,
            evaluation,
            algorithm: algorithm.into(),
            evaluated_at: Utc::now(),
        }
    }

    pub fn point(&self) -> &TrialPoint {
        &self.point
    }

    pub fn score(&self, objective: &str) -> Option<f64> {
        self.evaluation.scores.get(objective).copied()
    }

    pub fn penalty(&self) -> f64 {
        self.evaluation.penalty
    }

    pub fn is_vetoed(&self) -> bool {
        self.evaluation.is_vetoed()
    }

    pub fn veto_reason(&self) -> Option<&str> {
        self.evaluation.veto.as_ref().map(|v| v.reason.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_builders() {
        let eval = Evaluation::scored("f", 1.5).with_score("g", -2.0).with_penalty(0.25);
        assert_eq!(eval.scores.len(), 2);
        assert_eq!(eval.penalty, 0.25);
        assert!(!eval.is_vetoed());

        let vetoed = Evaluation::vetoed("x + y > 8");
        assert!(vetoed.is_vetoed());
        assert!(vetoed.scores.is_empty());
    }

    #[test]
    fn trial_accessors() {
        let point: TrialPoint = [("x", 0.3)].into_iter().collect();
        let trial = Trial::new(7, point.clone(), Evaluation::scored("f", 0.0), "Random Search");
        assert_eq!(trial.sequence, 7);
        assert_eq!(trial.point(), &point);
        assert_eq!(trial.score("f"), Some(0.0));
        assert_eq!(trial.score("g"), None);
        assert_eq!(trial.veto_reason(), None);
        assert_eq!(trial.algorithm, "Random Search");
    }

    #[test]
    fn trial_serde_roundtrip() {
        let point: TrialPoint = [("x", 0.3)].into_iter().collect();
        let trial = Trial::new(1, point, Evaluation::vetoed("infeasible"), "simplex");
        let json = serde_json::to_string(&trial).unwrap();
        let back: Trial = serde_json::from_str(&json).unwrap();
        assert_eq!(back, trial);
        assert_eq!(back.veto_reason(), Some("infeasible"));
    }
}
