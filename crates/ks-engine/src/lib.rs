//! # ks-engine
//!
//! Benchmark runner for Kestrel: standard test problems, JSON run
//! configuration and session execution behind the `kestrel-bench` binary.

pub mod benchmarks;
pub mod config;

pub use benchmarks::Benchmark;
pub use config::{EngineConfig, SessionConfig, StrategyKind, CONFIG_ENV};

use serde::{Deserialize, Serialize};
use tracing::info;

use ks_solver::{
    run_independent, AlgorithmSchedule, PatternSearch, RandomSearch, ScheduleReport,
    SimplexSearch,
};
use ks_types::KsResult;

/// Outcome of one configured session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub name: String,
    pub benchmark: Benchmark,
    pub dimensions: usize,
    /// Distance of the best first-objective score from the known optimum.
    pub gap: Option<f64>,
    pub report: ScheduleReport,
}

/// Build the schedule for one session with its strategies registered.
pub fn build_schedule(
    session: &SessionConfig,
    config: &EngineConfig,
) -> KsResult<AlgorithmSchedule> {
    let problem = session.benchmark.problem(session.dimensions)?;
    let schedule_config = config.schedule.clone().with_seed(session.seed);
    let mut schedule = AlgorithmSchedule::new(problem, schedule_config)?;
    for strategy in &session.strategies {
        match strategy {
            StrategyKind::Random => {
                schedule.add_algorithm(RandomSearch::with_seed(session.seed));
            }
            StrategyKind::Pattern => {
                schedule.add_algorithm(PatternSearch::new(config.pattern.clone())?);
            }
            StrategyKind::Simplex => {
                schedule.add_algorithm(SimplexSearch::new(config.simplex.clone())?);
            }
        }
    }
    Ok(schedule)
}

/// Run every configured session and collect the reports in config order.
pub fn run_sessions(config: &EngineConfig) -> KsResult<Vec<SessionReport>> {
    config.validate()?;
    let schedules = config
        .sessions
        .iter()
        .map(|session| build_schedule(session, config))
        .collect::<KsResult<Vec<_>>>()?;

    let results = if config.parallel {
        run_independent(schedules, &config.stop)
    } else {
        schedules
            .into_iter()
            .map(|mut schedule| schedule.run(config.stop.clone()))
            .collect()
    };

    config
        .sessions
        .iter()
        .zip(results)
        .map(|(session, result)| {
            let report = result?;
            let name = session.label();
            let gap = gap(session.benchmark, &report);
            info!(
                "Session {} finished ({}): {} evaluations, gap {:?}",
                name, report.stop_reason, report.score.evaluations, gap
            );
            Ok(SessionReport {
                name,
                benchmark: session.benchmark,
                dimensions: session.dimensions,
                gap,
                report,
            })
        })
        .collect()
}

fn gap(benchmark: Benchmark, report: &ScheduleReport) -> Option<f64> {
    let optimum = benchmark.known_optimum()?;
    let best = report.best()?;
    let score = best.score(benchmark.primary_objective())?;
    Some((score - optimum).abs())
}
