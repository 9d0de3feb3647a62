//! The search algorithm contract and the built-in strategies.

mod pattern;
mod random;
mod simplex;

pub use pattern::{PatternConfig, PatternSearch};
pub use random::RandomSearch;
pub use simplex::{SimplexConfig, SimplexSearch};

use std::sync::Arc;

use ks_types::{KsResult, Trial};

use crate::event::{AlgorithmId, SearchEvent};
use crate::rating::Rating;
use crate::run::AlgorithmRun;

/// Common trait for all search strategies.
///
/// A strategy proposes trial points inside [`SearchAlgorithm::perform_run`]
/// and learns from the outcomes broadcast by the schedule, including trials
/// proposed by other strategies.
pub trait SearchAlgorithm: Send {
    /// Human-readable strategy name.
    fn label(&self) -> &str;

    /// One unit of work: propose and evaluate one or more trial points.
    ///
    /// When an evaluation comes back `Terminated` the strategy stops
    /// proposing and returns `Ok(())`. An `Err` is treated as an internal
    /// fault and removes the strategy from future turns.
    fn perform_run(&mut self, run: &mut AlgorithmRun<'_>) -> KsResult<()>;

    /// Static general-purpose capability.
    fn global_rating(&self) -> Rating;

    /// Current local suitability.
    fn local_rating(&self) -> Rating;

    fn algorithm_available(&mut self, _id: AlgorithmId, _label: &str) {}

    fn algorithm_unavailable(&mut self, _id: AlgorithmId, _label: &str, _reason: &str) {}

    fn trial_scored(&mut self, _trial: &Arc<Trial>) {}

    fn trial_vetoed(&mut self, _trial: &Arc<Trial>) {}

    fn found_new_optimal_solution(&mut self, _solutions: &[Arc<Trial>], _solution: &Arc<Trial>) {
    }

    /// Dispatch a broadcast event to the matching hook.
    fn handle_event(&mut self, event: &SearchEvent) {
        match event {
            SearchEvent::AlgorithmAvailable { id, label } => self.algorithm_available(*id, label),
            SearchEvent::AlgorithmUnavailable { id, label, reason } => {
                self.algorithm_unavailable(*id, label, reason)
            }
            SearchEvent::TrialScored(trial) => self.trial_scored(trial),
            SearchEvent::TrialVetoed(trial) => self.trial_vetoed(trial),
            SearchEvent::NewOptimalSolution {
                solutions,
                solution,
            } => self.found_new_optimal_solution(solutions, solution),
        }
    }
}
