use serde::{Deserialize, Serialize};
use std::sync::Arc;

use ks_types::{AlgorithmError, KsResult, Trial};

use super::SearchAlgorithm;
use crate::rating::Rating;
use crate::run::{AlgorithmRun, EvalOutcome};

/// Step control for [`PatternSearch`]. Steps are fractions of each
/// variable's span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub initial_step: f64,
    /// Step multiplier after a successful move, capped at `initial_step`.
    pub expansion: f64,
    /// Step multiplier after a full unsuccessful poll cycle.
    pub contraction: f64,
    /// Below this step the search restarts around the incumbent.
    pub min_step: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            initial_step: 0.25,
            expansion: 2.0,
            contraction: 0.5,
            min_step: 1e-7,
        }
    }
}

impl PatternConfig {
    pub fn validate(&self) -> KsResult<()> {
        let ok = self.initial_step > 0.0
            && self.initial_step <= 1.0
            && self.expansion >= 1.0
            && self.contraction > 0.0
            && self.contraction < 1.0
            && self.min_step > 0.0
            && self.min_step < self.initial_step;
        if ok {
            Ok(())
        } else {
            Err(AlgorithmError::InvalidConfig {
                message: format!("invalid pattern search configuration: {self:?}"),
            }
            .into())
        }
    }
}

/// Compass search around the incumbent solution.
///
/// Each run polls `±step` along the variable axes, moving to the first
/// strictly better point. A full cycle without improvement shrinks the
/// step. Improvements found by other strategies become the new center.
#[derive(Debug, Clone)]
pub struct PatternSearch {
    config: PatternConfig,
    center: Option<Arc<Trial>>,
    step: f64,
    cursor: usize,
    failures: usize,
    momentum: u8,
    restarts: u32,
}

impl PatternSearch {
    pub fn new(config: PatternConfig) -> KsResult<Self> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: PatternConfig) -> Self {
        Self {
            step: config.initial_step,
            config,
            center: None,
            cursor: 0,
            failures: 0,
            momentum: 5,
            restarts: 0,
        }
    }

    /// Current step as a fraction of span.
    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn center(&self) -> Option<&Arc<Trial>> {
        self.center.as_ref()
    }

    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    fn restart(&mut self) {
        self.step = self.config.initial_step;
        self.failures = 0;
        self.momentum = 0;
        self.restarts += 1;
    }

    fn fail_direction(&mut self, directions: usize) {
        self.cursor = (self.cursor + 1) % directions;
        self.failures += 1;
        if self.failures >= directions {
            self.step *= self.config.contraction;
            self.failures = 0;
            self.momentum = self.momentum.saturating_sub(1);
        }
    }
}

impl Default for PatternSearch {
    fn default() -> Self {
        Self::from_config(PatternConfig::default())
    }
}

impl SearchAlgorithm for PatternSearch {
    fn label(&self) -> &str {
        "Pattern Search"
    }

    fn perform_run(&mut self, run: &mut AlgorithmRun<'_>) -> KsResult<()> {
        let problem = run.problem();

        let center = match &self.center {
            Some(center) => center.clone(),
            None => {
                if let EvalOutcome::Evaluated(trial) =
                    run.evaluate_trial_point(problem.initial_point())?
                {
                    self.center = Some(trial);
                }
                return Ok(());
            }
        };

        if self.step < self.config.min_step {
            self.restart();
        }

        let variables = problem.variables();
        let directions = 2 * variables.len();
        self.cursor %= directions;
        let base = problem.coordinates(center.point());

        for _ in 0..directions {
            let axis = self.cursor / 2;
            let sign = if self.cursor % 2 == 0 { 1.0 } else { -1.0 };
            let variable = &variables[axis];

            let mut coordinates = base.clone();
            coordinates[axis] = variable.clamp(base[axis] + sign * self.step * variable.span());
            if coordinates[axis] == base[axis] {
                // Fixed dimension or pinned at a bound.
                self.fail_direction(directions);
                continue;
            }

            let point = problem.point_from_coordinates(&coordinates)?;
            let trial = match run.evaluate_trial_point(point)? {
                EvalOutcome::Evaluated(trial) => trial,
                EvalOutcome::Terminated => return Ok(()),
            };

            if problem.is_better(&trial, &center) {
                self.center = Some(trial);
                self.step = (self.step * self.config.expansion).min(self.config.initial_step);
                self.failures = 0;
                self.momentum = (self.momentum + 2).min(Rating::MAX.value());
                return Ok(());
            }
            self.fail_direction(directions);
        }
        Ok(())
    }

    fn global_rating(&self) -> Rating {
        Rating::new(5)
    }

    fn local_rating(&self) -> Rating {
        Rating::new(self.momentum)
    }

    fn found_new_optimal_solution(&mut self, solutions: &[Arc<Trial>], _solution: &Arc<Trial>) {
        let Some(best) = solutions.first() else {
            return;
        };
        let same = self
            .center
            .as_ref()
            .is_some_and(|center| center.sequence == best.sequence);
        if !same {
            self.center = Some(best.clone());
            self.failures = 0;
        }
    }
}
