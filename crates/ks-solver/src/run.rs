//! The execution context handed to one `perform_run` invocation.

use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use ks_types::{KsResult, Problem, Trial, TrialPoint};

use crate::event::{publish, SearchEvent};
use crate::judge::{SolutionJudge, Verdict};
use crate::schedule::AlgorithmEntry;
use crate::scoreboard::ScoreBoard;
use crate::stopper::{StopCondition, StopReason};

/// Result of asking the run to evaluate a trial point.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalOutcome {
    /// The point was evaluated, judged and broadcast.
    Evaluated(Arc<Trial>),
    /// The run is over; stop proposing and return.
    Terminated,
}

impl EvalOutcome {
    pub fn trial(&self) -> Option<&Arc<Trial>> {
        match self {
            Self::Evaluated(trial) => Some(trial),
            Self::Terminated => None,
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated)
    }
}

/// Delivers events to every registered algorithm except the running one,
/// and to external subscribers.
pub(crate) struct Broadcast<'a> {
    before: &'a mut [AlgorithmEntry],
    after: &'a mut [AlgorithmEntry],
    subscribers: &'a mut Vec<Sender<SearchEvent>>,
}

impl<'a> Broadcast<'a> {
    pub(crate) fn new(
        before: &'a mut [AlgorithmEntry],
        after: &'a mut [AlgorithmEntry],
        subscribers: &'a mut Vec<Sender<SearchEvent>>,
    ) -> Self {
        Self {
            before,
            after,
            subscribers,
        }
    }

    pub(crate) fn deliver(&mut self, event: &SearchEvent) {
        for entry in self.before.iter_mut().chain(self.after.iter_mut()) {
            entry.notify(event);
        }
        publish(self.subscribers, event);
    }
}

/// Shared session state the run reads and updates.
pub(crate) struct RunScope<'a> {
    pub problem: &'a Problem,
    pub judge: &'a mut SolutionJudge,
    pub scoreboard: &'a mut ScoreBoard,
    pub condition: &'a StopCondition,
    pub stop_flag: &'a AtomicBool,
    pub termination: &'a mut Option<StopReason>,
}

/// What a finished run hands back to the schedule.
#[derive(Debug)]
pub(crate) struct RunSummary {
    pub evaluations: u64,
    pub improved: bool,
    /// Events caused by the running algorithm, owed to itself.
    pub own_events: Vec<SearchEvent>,
}

/// Bounded execution context for one algorithm invocation.
///
/// Every evaluation goes through [`AlgorithmRun::evaluate_trial_point`],
/// which enforces the global stop condition and the per-run limit, judges
/// the trial and broadcasts the outcome.
pub struct AlgorithmRun<'a> {
    scope: RunScope<'a>,
    broadcast: Broadcast<'a>,
    label: String,
    limit: Option<u64>,
    evaluations: u64,
    improved: bool,
    own_events: Vec<SearchEvent>,
}

impl<'a> AlgorithmRun<'a> {
    pub(crate) fn new(
        scope: RunScope<'a>,
        broadcast: Broadcast<'a>,
        label: String,
        limit: Option<u64>,
    ) -> Self {
        Self {
            scope,
            broadcast,
            label,
            limit,
            evaluations: 0,
            improved: false,
            own_events: Vec::new(),
        }
    }

    /// The problem being solved. The reference outlives the run borrow so
    /// strategies can hold it across evaluations.
    pub fn problem(&self) -> &'a Problem {
        self.scope.problem
    }

    /// Label of the algorithm performing this run.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Evaluations performed in this run so far.
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Evaluations left under the per-run limit.
    pub fn remaining(&self) -> Option<u64> {
        self.limit.map(|limit| limit.saturating_sub(self.evaluations))
    }

    /// Whether the schedule has signalled termination.
    pub fn is_terminated(&self) -> bool {
        self.scope.termination.is_some() || self.scope.stop_flag.load(Ordering::Acquire)
    }

    /// Current best tracked solution.
    pub fn best(&self) -> Option<&Arc<Trial>> {
        self.scope.judge.best()
    }

    /// Tracked solutions, best first.
    pub fn solutions(&self) -> &[Arc<Trial>] {
        self.scope.judge.solutions()
    }

    /// Evaluate `point`, judge the trial and broadcast the verdict.
    ///
    /// Returns `Terminated` without evaluating when the schedule is
    /// stopping or this run's evaluation limit is spent. Malformed points
    /// are errors.
    pub fn evaluate_trial_point(&mut self, point: TrialPoint) -> KsResult<EvalOutcome> {
        if self.check_termination() {
            return Ok(EvalOutcome::Terminated);
        }
        if self.remaining() == Some(0) {
            debug!("{} reached its per-run evaluation limit", self.label);
            return Ok(EvalOutcome::Terminated);
        }

        let evaluation = self.scope.problem.evaluate(&point)?;
        let sequence = self.scope.scoreboard.next_sequence();
        let trial = Arc::new(Trial::new(sequence, point, evaluation, self.label.clone()));
        self.scope.scoreboard.record_trial(&trial);
        self.evaluations += 1;

        let verdict = self.scope.judge.judge(trial.clone());
        debug!(
            "Trial {} from {} at {}: {:?}",
            sequence, self.label, trial.point, verdict
        );

        let outcome = if trial.is_vetoed() {
            SearchEvent::TrialVetoed(trial.clone())
        } else {
            SearchEvent::TrialScored(trial.clone())
        };
        self.emit(outcome);

        if verdict == Verdict::Accepted {
            self.improved = true;
            self.scope.scoreboard.record_new_optimal();
            info!(
                "New optimal solution {} from {}: {}",
                sequence, self.label, trial.point
            );
            self.emit(SearchEvent::NewOptimalSolution {
                solutions: self.scope.judge.solutions().to_vec(),
                solution: trial.clone(),
            });
        }

        Ok(EvalOutcome::Evaluated(trial))
    }

    fn check_termination(&mut self) -> bool {
        if self.scope.termination.is_some() {
            return true;
        }
        if self.scope.stop_flag.load(Ordering::Acquire) {
            *self.scope.termination = Some(StopReason::Requested);
            return true;
        }
        let progress = self
            .scope
            .scoreboard
            .progress(self.scope.judge.satisfaction());
        if self.scope.condition.should_stop(&progress) {
            *self.scope.termination = Some(StopReason::ConditionMet);
            return true;
        }
        false
    }

    fn emit(&mut self, event: SearchEvent) {
        self.broadcast.deliver(&event);
        self.own_events.push(event);
    }

    pub(crate) fn finish(self) -> RunSummary {
        RunSummary {
            evaluations: self.evaluations,
            improved: self.improved,
            own_events: self.own_events,
        }
    }
}
