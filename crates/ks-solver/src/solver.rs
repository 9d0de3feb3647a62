//! One-call entry point with the default strategy set.

use tracing::info;

use ks_types::{KsResult, Problem};

use crate::algorithm::{PatternConfig, PatternSearch, RandomSearch, SimplexConfig, SimplexSearch};
use crate::schedule::{AlgorithmSchedule, ScheduleConfig, ScheduleReport};
use crate::stopper::StopCondition;

/// Builds a schedule with random, pattern and simplex search and runs it.
///
/// ```ignore
/// let report = Solver::new(StopCondition::max_evaluations(500)).solve(problem)?;
/// let best = report.best();
/// ```
#[derive(Debug, Clone)]
pub struct Solver {
    condition: StopCondition,
    config: ScheduleConfig,
    pattern: PatternConfig,
    simplex: SimplexConfig,
}

impl Solver {
    pub fn new(condition: StopCondition) -> Self {
        Self {
            condition,
            config: ScheduleConfig::default(),
            pattern: PatternConfig::default(),
            simplex: SimplexConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ScheduleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_pattern_config(mut self, config: PatternConfig) -> Self {
        self.pattern = config;
        self
    }

    pub fn with_simplex_config(mut self, config: SimplexConfig) -> Self {
        self.simplex = config;
        self
    }

    pub fn condition(&self) -> &StopCondition {
        &self.condition
    }

    /// Create the schedule without running it, e.g. to subscribe first.
    pub fn build(&self, problem: Problem) -> KsResult<AlgorithmSchedule> {
        let mut schedule = AlgorithmSchedule::new(problem, self.config.clone())?;
        schedule.add_algorithm(RandomSearch::with_seed(self.config.seed));
        schedule.add_algorithm(PatternSearch::new(self.pattern.clone())?);
        schedule.add_algorithm(SimplexSearch::new(self.simplex.clone())?);
        Ok(schedule)
    }

    pub fn solve(&self, problem: Problem) -> KsResult<ScheduleReport> {
        let mut schedule = self.build(problem)?;
        let report = schedule.run(self.condition.clone())?;
        info!(
            "Solved in {} evaluations, {} tracked solutions",
            report.score.evaluations,
            report.solutions.len()
        );
        Ok(report)
    }
}
