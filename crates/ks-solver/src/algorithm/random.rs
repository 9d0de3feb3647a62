use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use ks_types::{KsResult, Problem, TrialPoint, Variable};

use super::SearchAlgorithm;
use crate::rating::Rating;
use crate::run::AlgorithmRun;

/// Independent uniform sampling across the variable bounds.
///
/// The generator is seeded once at construction, so a fixed seed replays
/// the same sequence of points for the same sequence of runs. It is a
/// fallback explorer: always applicable, never specially favoured.
#[derive(Debug, Clone)]
pub struct RandomSearch {
    seed: u64,
    rng: ChaCha8Rng,
}

impl RandomSearch {
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn sample(&mut self, variable: &Variable) -> f64 {
        let u: f64 = self.rng.random();
        let value = variable.lower() + u * variable.span();
        value.min(variable.upper())
    }

    /// Draw the next point.
    pub fn next_trial_point(&mut self, problem: &Problem) -> TrialPoint {
        problem
            .variables()
            .iter()
            .map(|v| (v.name().to_string(), self.sample(v)))
            .collect()
    }
}

impl Default for RandomSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchAlgorithm for RandomSearch {
    fn label(&self) -> &str {
        "Random Search"
    }

    fn perform_run(&mut self, run: &mut AlgorithmRun<'_>) -> KsResult<()> {
        let point = self.next_trial_point(run.problem());
        run.evaluate_trial_point(point)?;
        Ok(())
    }

    fn global_rating(&self) -> Rating {
        Rating::MAX
    }

    fn local_rating(&self) -> Rating {
        Rating::MIN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ks_types::{Evaluation, Objective};
    use proptest::prelude::*;

    fn sample_problem() -> Problem {
        Problem::new(
            vec![
                Variable::new("short_period", 5.0, 15.0).unwrap(),
                Variable::new("position_size", 0.5, 1.0).unwrap(),
                Variable::fixed("gain", 2.0).unwrap(),
            ],
            vec![Objective::maximize("sharpe")],
            |_: &TrialPoint| Evaluation::scored("sharpe", 0.0),
        )
        .unwrap()
    }

    #[test]
    fn random_search_respects_bounds() {
        let problem = sample_problem();
        let mut rs = RandomSearch::new();
        for _ in 0..200 {
            let point = rs.next_trial_point(&problem);
            assert!(problem.validate(&point).is_ok(), "out of bounds: {point}");
            assert_eq!(point.value("gain"), Some(2.0));
        }
    }

    #[test]
    fn fixed_seed_replays() {
        let problem = sample_problem();
        let mut a = RandomSearch::with_seed(42);
        let mut b = RandomSearch::with_seed(42);
        let mut c = RandomSearch::with_seed(43);
        let first: Vec<TrialPoint> = (0..20).map(|_| a.next_trial_point(&problem)).collect();
        let second: Vec<TrialPoint> = (0..20).map(|_| b.next_trial_point(&problem)).collect();
        let third: Vec<TrialPoint> = (0..20).map(|_| c.next_trial_point(&problem)).collect();
        assert_eq!(first, second);
        assert_ne!(first, third);
    }

    #[test]
    fn ratings_mark_a_fallback_explorer() {
        let rs = RandomSearch::default();
        assert_eq!(rs.global_rating(), Rating::MAX);
        assert_eq!(rs.local_rating(), Rating::MIN);
        assert_eq!(rs.label(), "Random Search");
        assert_eq!(rs.seed(), 0);
    }

    proptest! {
        #[test]
        fn any_bounds_any_seed(seed in any::<u64>(), lower in -1e3f64..1e3, width in 0.0f64..1e3) {
            let problem = Problem::new(
                vec![Variable::new("x", lower, lower + width).unwrap()],
                vec![Objective::minimize("f")],
                |_: &TrialPoint| Evaluation::scored("f", 0.0),
            )
            .unwrap();
            let mut rs = RandomSearch::with_seed(seed);
            for _ in 0..16 {
                let point = rs.next_trial_point(&problem);
                prop_assert!(problem.validate(&point).is_ok());
            }
        }
    }
}
