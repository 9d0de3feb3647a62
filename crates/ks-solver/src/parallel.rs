//! Independent sessions on the rayon pool.

use rayon::prelude::*;
use tracing::info;

use ks_types::KsResult;

use crate::schedule::{AlgorithmSchedule, ScheduleReport};
use crate::stopper::StopCondition;

/// Run every schedule to completion in parallel. Schedules share nothing,
/// so results match running them one after another. Reports come back in
/// input order.
pub fn run_independent(
    schedules: Vec<AlgorithmSchedule>,
    condition: &StopCondition,
) -> Vec<KsResult<ScheduleReport>> {
    info!("Running {} independent sessions", schedules.len());
    schedules
        .into_par_iter()
        .map(|mut schedule| schedule.run(condition.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::RandomSearch;
    use crate::schedule::ScheduleConfig;
    use ks_types::{Evaluation, Objective, Problem, TrialPoint, Variable};

    fn schedule(seed: u64) -> AlgorithmSchedule {
        let problem = Problem::new(
            vec![Variable::new("x", -1.0, 1.0).unwrap()],
            vec![Objective::minimize("f")],
            |p: &TrialPoint| Evaluation::scored("f", p.value("x").unwrap_or_default().abs()),
        )
        .unwrap();
        let mut schedule =
            AlgorithmSchedule::new(problem, ScheduleConfig::default().with_seed(seed)).unwrap();
        schedule.add_algorithm(RandomSearch::with_seed(seed));
        schedule
    }

    #[test]
    fn parallel_matches_sequential() {
        let condition = StopCondition::max_evaluations(100);
        let parallel = run_independent((0..4).map(schedule).collect(), &condition);
        assert_eq!(parallel.len(), 4);

        for (seed, report) in (0..4).zip(parallel) {
            let report = report.unwrap();
            let sequential = schedule(seed).run(condition.clone()).unwrap();
            assert_eq!(report.score.evaluations, 100);
            assert_eq!(
                report.best().map(|t| t.point.clone()),
                sequential.best().map(|t| t.point.clone())
            );
        }
    }

    #[test]
    fn failures_stay_per_session() {
        let empty = {
            let problem = Problem::new(
                vec![Variable::new("x", 0.0, 1.0).unwrap()],
                vec![Objective::minimize("f")],
                |_: &TrialPoint| Evaluation::scored("f", 0.0),
            )
            .unwrap();
            AlgorithmSchedule::new(problem, ScheduleConfig::default()).unwrap()
        };
        let results = run_independent(vec![schedule(1), empty], &StopCondition::max_evaluations(5));
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
