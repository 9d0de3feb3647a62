//! Solution judge: keeps the tracked best solutions.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

use ks_types::ranking::{dominates, rank, rank_strict, satisfaction};
use ks_types::{Objective, Trial};

/// How the judge decides which trials to track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgePolicy {
    /// Track the single best trial under the ranking rule.
    #[default]
    Optimal,
    /// Track the non-dominated front.
    Pareto,
}

/// Outcome of judging one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// The trial entered the tracked set.
    Accepted,
    /// The trial was valid but not an improvement.
    Rejected,
    /// The trial failed a constraint.
    Vetoed,
}

/// Maintains the tracked solution set, ordered best first.
#[derive(Debug, Clone)]
pub struct SolutionJudge {
    policy: JudgePolicy,
    objectives: Vec<Objective>,
    solutions: Vec<Arc<Trial>>,
    vetoed: VecDeque<Arc<Trial>>,
    vetoed_total: u64,
    accepted_total: u64,
    diagnostic_capacity: usize,
}

impl SolutionJudge {
    pub fn new(policy: JudgePolicy, objectives: Vec<Objective>) -> Self {
        Self {
            policy,
            objectives,
            solutions: Vec::new(),
            vetoed: VecDeque::new(),
            vetoed_total: 0,
            accepted_total: 0,
            diagnostic_capacity: 64,
        }
    }

    /// Number of vetoed trials kept for diagnostics.
    pub fn with_diagnostic_capacity(mut self, capacity: usize) -> Self {
        self.diagnostic_capacity = capacity;
        self.vetoed.truncate(capacity);
        self
    }

    /// Judge a trial and update the tracked set.
    pub fn judge(&mut self, trial: Arc<Trial>) -> Verdict {
        if trial.is_vetoed() {
            self.record_veto(trial);
            return Verdict::Vetoed;
        }

        if self.solutions.iter().any(|t| t.sequence == trial.sequence) {
            return Verdict::Rejected;
        }

        let accepted = match self.policy {
            JudgePolicy::Optimal => self.judge_optimal(&trial),
            JudgePolicy::Pareto => self.judge_pareto(&trial),
        };

        if accepted {
            debug!(
                "Accepted trial {} from {} ({} tracked)",
                trial.sequence,
                trial.algorithm,
                self.solutions.len()
            );
            self.accepted_total += 1;
            Verdict::Accepted
        } else {
            Verdict::Rejected
        }
    }

    fn judge_optimal(&mut self, trial: &Arc<Trial>) -> bool {
        let improves = match self.solutions.first() {
            None => true,
            Some(best) => rank_strict(&self.objectives, trial, best) == Ordering::Less,
        };
        if improves {
            self.solutions.clear();
            self.solutions.push(trial.clone());
        }
        improves
    }

    fn judge_pareto(&mut self, trial: &Arc<Trial>) -> bool {
        let objectives = &self.objectives;
        // Equal scores are a tie: the earlier sequence holds the slot.
        let tied = |a: &Arc<Trial>, b: &Arc<Trial>| {
            rank(objectives, a, b) == Ordering::Equal && a.sequence < b.sequence
        };
        let blocked = self
            .solutions
            .iter()
            .any(|tracked| dominates(objectives, tracked, trial) || tied(tracked, trial));
        if blocked {
            return false;
        }

        self.solutions
            .retain(|tracked| !dominates(objectives, trial, tracked) && !tied(trial, tracked));
        let position = self
            .solutions
            .partition_point(|tracked| rank_strict(objectives, tracked, trial) == Ordering::Less);
        self.solutions.insert(position, trial.clone());
        true
    }

    fn record_veto(&mut self, trial: Arc<Trial>) {
        if self.vetoed.iter().any(|t| t.sequence == trial.sequence) {
            return;
        }
        self.vetoed_total += 1;
        if self.diagnostic_capacity == 0 {
            return;
        }
        if self.vetoed.len() == self.diagnostic_capacity {
            self.vetoed.pop_front();
        }
        self.vetoed.push_back(trial);
    }

    /// Tracked solutions, best first.
    pub fn solutions(&self) -> &[Arc<Trial>] {
        &self.solutions
    }

    pub fn best(&self) -> Option<&Arc<Trial>> {
        self.solutions.first()
    }

    /// Satisfaction of the best solution.
    pub fn satisfaction(&self) -> Option<f64> {
        self.best().and_then(|best| satisfaction(&self.objectives, best))
    }

    /// Most recent vetoed trials, oldest first.
    pub fn vetoed(&self) -> impl Iterator<Item = &Arc<Trial>> {
        self.vetoed.iter()
    }

    pub fn vetoed_count(&self) -> u64 {
        self.vetoed_total
    }

    pub fn accepted_count(&self) -> u64 {
        self.accepted_total
    }

    pub fn policy(&self) -> JudgePolicy {
        self.policy
    }

    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }
}
