//! # ks-solver
//!
//! Search strategies and the adaptive schedule that runs them for Kestrel.
//!
//! Provides the [`SearchAlgorithm`] contract with random, pattern and
//! simplex strategies, the per-run evaluation context, solution judging,
//! stop conditions, the [`AlgorithmSchedule`] itself and parallel
//! execution of independent sessions.

pub mod algorithm;
mod event;
mod judge;
mod parallel;
mod rating;
mod run;
mod schedule;
mod scoreboard;
mod solver;
mod stopper;

pub use algorithm::{
    PatternConfig, PatternSearch, RandomSearch, SearchAlgorithm, SimplexConfig, SimplexSearch,
};
pub use event::{AlgorithmId, SearchEvent};
pub use judge::{JudgePolicy, SolutionJudge, Verdict};
pub use parallel::run_independent;
pub use rating::{Rating, RatingRecord};
pub use run::{AlgorithmRun, EvalOutcome};
pub use schedule::{
    AlgorithmSchedule, AlgorithmState, AlgorithmSummary, ScheduleConfig, ScheduleHandle,
    ScheduleReport, ScheduleState, ScheduleStatus, TurnOutcome,
};
pub use scoreboard::{ScoreBoard, ScoreSummary};
pub use solver::Solver;
pub use stopper::{Progress, StopCondition, StopReason};
