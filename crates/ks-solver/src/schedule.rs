//! Adaptive algorithm schedule.
//!
//! The schedule owns the problem, the solution judge and the registered
//! algorithms, and hands out turns one at a time. Turns are drawn by a
//! weighted lottery over the algorithms' ratings with a starvation guard,
//! and every trial outcome is broadcast to all algorithms so strategies
//! can build on each other's results.

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ks_types::{internal_error, AlgorithmError, KsResult, Problem, ScheduleError, Trial};

use crate::algorithm::SearchAlgorithm;
use crate::event::{publish, AlgorithmId, SearchEvent};
use crate::judge::{JudgePolicy, SolutionJudge};
use crate::rating::{Rating, RatingRecord};
use crate::run::{AlgorithmRun, Broadcast, RunScope};
use crate::scoreboard::{ScoreBoard, ScoreSummary};
use crate::stopper::{StopCondition, StopReason};

/// Lottery weight of a rated algorithm whose only nonzero axis has a zero
/// multiplier.
const MIN_TICKET_WEIGHT: f64 = 0.1;

/// Scheduling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Multiplier on the global rating in the turn weight.
    pub global_weight: f64,
    /// Multiplier on the local rating in the turn weight.
    pub local_weight: f64,
    /// Decay of the success moving average, in `[0, 1)`.
    pub rating_decay: f64,
    /// Turns an eligible algorithm may wait before it is forced in.
    pub max_wait_turns: usize,
    /// Evaluation cap for a single `perform_run`.
    pub max_evaluations_per_run: Option<u64>,
    /// Consecutive turns without any evaluation before the session stalls.
    pub max_idle_turns: u64,
    /// Seed of the turn lottery.
    pub seed: u64,
    pub judge_policy: JudgePolicy,
    /// Vetoed trials kept by the judge for diagnostics.
    pub diagnostic_capacity: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            global_weight: 1.0,
            local_weight: 1.0,
            rating_decay: 0.8,
            max_wait_turns: 16,
            max_evaluations_per_run: None,
            max_idle_turns: 1000,
            seed: 0,
            judge_policy: JudgePolicy::Optimal,
            diagnostic_capacity: 64,
        }
    }
}

impl ScheduleConfig {
    pub fn with_weights(mut self, global_weight: f64, local_weight: f64) -> Self {
        self.global_weight = global_weight;
        self.local_weight = local_weight;
        self
    }

    pub fn with_rating_decay(mut self, decay: f64) -> Self {
        self.rating_decay = decay;
        self
    }

    pub fn with_max_wait_turns(mut self, turns: usize) -> Self {
        self.max_wait_turns = turns;
        self
    }

    pub fn with_max_evaluations_per_run(mut self, limit: u64) -> Self {
        self.max_evaluations_per_run = Some(limit);
        self
    }

    pub fn with_max_idle_turns(mut self, turns: u64) -> Self {
        self.max_idle_turns = turns;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_judge_policy(mut self, policy: JudgePolicy) -> Self {
        self.judge_policy = policy;
        self
    }

    pub fn with_diagnostic_capacity(mut self, capacity: usize) -> Self {
        self.diagnostic_capacity = capacity;
        self
    }

    pub fn validate(&self) -> KsResult<()> {
        let invalid = |message: String| -> KsResult<()> {
            Err(ScheduleError::InvalidConfig { message }.into())
        };
        let weight_ok = |w: f64| w.is_finite() && w >= 0.0;
        if !weight_ok(self.global_weight) || !weight_ok(self.local_weight) {
            return invalid(format!(
                "rating weights must be finite and non-negative, got {} and {}",
                self.global_weight, self.local_weight
            ));
        }
        if self.global_weight == 0.0 && self.local_weight == 0.0 {
            return invalid("at least one rating weight must be positive".into());
        }
        if !(0.0..1.0).contains(&self.rating_decay) {
            return invalid(format!(
                "rating decay must be in [0, 1), got {}",
                self.rating_decay
            ));
        }
        if self.max_wait_turns == 0 {
            return invalid("max_wait_turns must be at least 1".into());
        }
        if self.max_idle_turns == 0 {
            return invalid("max_idle_turns must be at least 1".into());
        }
        if self.max_evaluations_per_run == Some(0) {
            return invalid("max_evaluations_per_run must be at least 1".into());
        }
        Ok(())
    }
}

/// Lifecycle of one registered algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmState {
    Idle,
    Running,
    /// Faulted; never scheduled again.
    Unavailable(String),
}

/// Lifecycle of the schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleState {
    #[default]
    Ready,
    Running,
    Terminated(StopReason),
}

/// Snapshot published through [`ScheduleHandle`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleStatus {
    pub state: ScheduleState,
    pub evaluations: u64,
    pub turns: u64,
    pub best: Option<Arc<Trial>>,
}

/// Cross-thread handle for stopping a schedule and watching its progress.
#[derive(Debug, Clone)]
pub struct ScheduleHandle {
    stop_flag: Arc<AtomicBool>,
    status: Arc<RwLock<ScheduleStatus>>,
}

impl ScheduleHandle {
    /// Ask the schedule to stop. The current evaluation completes first.
    pub fn request_stop(&self) {
        self.stop_flag.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_flag.load(Ordering::Acquire)
    }

    pub fn status(&self) -> ScheduleStatus {
        self.status.read().clone()
    }
}

/// Per-algorithm figures for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmSummary {
    pub id: AlgorithmId,
    pub label: String,
    pub state: AlgorithmState,
    pub global_rating: Rating,
    pub local_rating: Rating,
    pub turns: u64,
    pub evaluations: u64,
}

/// Final outcome of [`AlgorithmSchedule::run`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleReport {
    pub session_id: Uuid,
    pub stop_reason: StopReason,
    pub score: ScoreSummary,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: DateTime<Utc>,
    /// Tracked solutions, best first.
    pub solutions: Vec<Arc<Trial>>,
    pub algorithms: Vec<AlgorithmSummary>,
}

impl ScheduleReport {
    pub fn best(&self) -> Option<&Arc<Trial>> {
        self.solutions.first()
    }
}

/// Result of a single turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// An algorithm ran and the schedule can continue.
    Completed {
        algorithm: AlgorithmId,
        evaluations: u64,
        improved: bool,
        faulted: bool,
    },
    /// The schedule stopped, before or as a result of this turn.
    Terminated(StopReason),
}

pub(crate) struct AlgorithmEntry {
    id: AlgorithmId,
    label: String,
    algorithm: Box<dyn SearchAlgorithm>,
    state: AlgorithmState,
    rating: RatingRecord,
    turns: u64,
    evaluations: u64,
    /// Turns since this entry last ran.
    waiting: usize,
}

impl AlgorithmEntry {
    fn new(id: AlgorithmId, algorithm: Box<dyn SearchAlgorithm>) -> Self {
        let rating = RatingRecord::new(algorithm.global_rating(), algorithm.local_rating());
        Self {
            id,
            label: algorithm.label().to_string(),
            algorithm,
            state: AlgorithmState::Idle,
            rating,
            turns: 0,
            evaluations: 0,
            waiting: 0,
        }
    }

    fn is_available(&self) -> bool {
        !matches!(self.state, AlgorithmState::Unavailable(_))
    }

    /// Forward a broadcast event unless the algorithm has faulted.
    pub(crate) fn notify(&mut self, event: &SearchEvent) {
        if self.is_available() {
            self.algorithm.handle_event(event);
        }
    }

    fn summary(&self) -> AlgorithmSummary {
        AlgorithmSummary {
            id: self.id,
            label: self.label.clone(),
            state: self.state.clone(),
            global_rating: self.rating.global,
            local_rating: self.rating.local,
            turns: self.turns,
            evaluations: self.evaluations,
        }
    }
}

/// Runs registered search algorithms against one problem.
pub struct AlgorithmSchedule {
    session_id: Uuid,
    problem: Problem,
    config: ScheduleConfig,
    entries: Vec<AlgorithmEntry>,
    next_id: usize,
    judge: SolutionJudge,
    scoreboard: ScoreBoard,
    condition: StopCondition,
    subscribers: Vec<Sender<SearchEvent>>,
    rng: ChaCha8Rng,
    stop_flag: Arc<AtomicBool>,
    status: Arc<RwLock<ScheduleStatus>>,
    state: ScheduleState,
    termination: Option<StopReason>,
    idle_turns: u64,
}

impl AlgorithmSchedule {
    pub fn new(problem: Problem, config: ScheduleConfig) -> KsResult<Self> {
        config.validate()?;
        let judge = SolutionJudge::new(config.judge_policy, problem.objectives().to_vec())
            .with_diagnostic_capacity(config.diagnostic_capacity);
        Ok(Self {
            session_id: Uuid::new_v4(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            problem,
            config,
            entries: Vec::new(),
            next_id: 0,
            judge,
            scoreboard: ScoreBoard::new(),
            // Never stops on its own; `run` installs the real condition.
            condition: StopCondition::Any(Vec::new()),
            subscribers: Vec::new(),
            stop_flag: Arc::new(AtomicBool::new(false)),
            status: Arc::new(RwLock::new(ScheduleStatus::default())),
            state: ScheduleState::Ready,
            termination: None,
            idle_turns: 0,
        })
    }

    /// Register an algorithm and announce it to everyone, itself included.
    pub fn add_algorithm(&mut self, algorithm: impl SearchAlgorithm + 'static) -> AlgorithmId {
        self.add_boxed_algorithm(Box::new(algorithm))
    }

    pub fn add_boxed_algorithm(&mut self, algorithm: Box<dyn SearchAlgorithm>) -> AlgorithmId {
        let id = AlgorithmId(self.next_id);
        self.next_id += 1;
        let entry = AlgorithmEntry::new(id, algorithm);
        info!(
            "Registered {} as {} (global rating {})",
            entry.label, id, entry.rating.global
        );
        let event = SearchEvent::AlgorithmAvailable {
            id,
            label: entry.label.clone(),
        };
        self.entries.push(entry);
        self.broadcast(&event, None);
        id
    }

    /// Unregister an algorithm and hand it back.
    pub fn remove_algorithm(&mut self, id: AlgorithmId) -> KsResult<Box<dyn SearchAlgorithm>> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(AlgorithmError::NotFound { id: id.0 })?;
        let entry = self.entries.remove(index);
        info!("Removed {} ({})", entry.label, id);
        let event = SearchEvent::AlgorithmUnavailable {
            id,
            label: entry.label.clone(),
            reason: "removed".into(),
        };
        self.broadcast(&event, None);
        Ok(entry.algorithm)
    }

    /// Receive every event broadcast from now on.
    pub fn subscribe(&mut self) -> Receiver<SearchEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn handle(&self) -> ScheduleHandle {
        ScheduleHandle {
            stop_flag: self.stop_flag.clone(),
            status: self.status.clone(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    pub fn state(&self) -> &ScheduleState {
        &self.state
    }

    pub fn judge(&self) -> &SolutionJudge {
        &self.judge
    }

    pub fn scoreboard(&self) -> &ScoreBoard {
        &self.scoreboard
    }

    /// Tracked solutions, best first.
    pub fn solutions(&self) -> &[Arc<Trial>] {
        self.judge.solutions()
    }

    pub fn best(&self) -> Option<&Arc<Trial>> {
        self.judge.best()
    }

    pub fn algorithms(&self) -> Vec<AlgorithmSummary> {
        self.entries.iter().map(AlgorithmEntry::summary).collect()
    }

    pub fn algorithm_state(&self, id: AlgorithmId) -> Option<&AlgorithmState> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| &entry.state)
    }

    /// Run turns until `condition` holds, a stop is requested, no
    /// algorithm is eligible or the session stalls.
    pub fn run(&mut self, condition: StopCondition) -> KsResult<ScheduleReport> {
        self.ensure_not_terminated()?;
        condition
            .validate()
            .map_err(|message| ScheduleError::InvalidConfig { message })?;
        if condition.uses_satisfaction() {
            let uncurved = self
                .problem
                .objectives()
                .iter()
                .find(|objective| objective.satisfaction.is_none());
            if let Some(objective) = uncurved {
                return Err(ScheduleError::InvalidConfig {
                    message: format!(
                        "stop condition uses satisfaction but objective {} has no satisfaction curve",
                        objective.name
                    ),
                }
                .into());
            }
        }
        if self.entries.is_empty() {
            return Err(ScheduleError::NoAlgorithms.into());
        }
        self.condition = condition;

        let reason = loop {
            if let TurnOutcome::Terminated(reason) = self.run_turn()? {
                break reason;
            }
        };
        Ok(self.report(reason))
    }

    /// Hand out exactly one turn.
    pub fn run_turn(&mut self) -> KsResult<TurnOutcome> {
        self.ensure_not_terminated()?;
        if self.state == ScheduleState::Ready {
            self.scoreboard.start();
            self.state = ScheduleState::Running;
            info!(
                "Session {} started with {} algorithms over {} variables",
                self.session_id,
                self.entries.len(),
                self.problem.dimensions()
            );
        }

        if self.termination.is_none() && self.stop_flag.load(Ordering::Acquire) {
            self.termination = Some(StopReason::Requested);
        }
        if self.termination.is_none() {
            let progress = self.scoreboard.progress(self.judge.satisfaction());
            if self.condition.should_stop(&progress) {
                self.termination = Some(StopReason::ConditionMet);
            }
        }
        if let Some(reason) = self.termination.clone() {
            return Ok(self.terminate(reason));
        }

        let Some(index) = self.select() else {
            return Ok(self.terminate(StopReason::NoEligibleAlgorithms));
        };

        let limit = self.config.max_evaluations_per_run;
        let decay = self.config.rating_decay;
        let (before, rest) = self.entries.split_at_mut(index);
        let Some((current, after)) = rest.split_first_mut() else {
            return Err(internal_error!("selected algorithm index {index} out of range"));
        };
        current.state = AlgorithmState::Running;
        debug!(
            "Turn {} goes to {} ({}, weight {:.1})",
            self.scoreboard.turns(),
            current.label,
            current.id,
            current
                .rating
                .weight(self.config.global_weight, self.config.local_weight)
        );

        let scope = RunScope {
            problem: &self.problem,
            judge: &mut self.judge,
            scoreboard: &mut self.scoreboard,
            condition: &self.condition,
            stop_flag: self.stop_flag.as_ref(),
            termination: &mut self.termination,
        };
        let broadcast = Broadcast::new(before, after, &mut self.subscribers);
        let mut run = AlgorithmRun::new(scope, broadcast, current.label.clone(), limit);
        let result = current.algorithm.perform_run(&mut run);
        let summary = run.finish();

        current.turns += 1;
        current.evaluations += summary.evaluations;
        let fault = match result {
            Ok(()) => {
                for event in &summary.own_events {
                    current.algorithm.handle_event(event);
                }
                let reported = current.algorithm.local_rating();
                current.rating.record_turn(summary.improved, decay, reported);
                current.state = AlgorithmState::Idle;
                None
            }
            Err(err) => {
                warn!("{} ({}) faulted: {}", current.label, current.id, err);
                let reason = err.to_string();
                current.state = AlgorithmState::Unavailable(reason.clone());
                Some(SearchEvent::AlgorithmUnavailable {
                    id: current.id,
                    label: current.label.clone(),
                    reason,
                })
            }
        };
        let id = current.id;

        for (i, entry) in self.entries.iter_mut().enumerate() {
            if i == index {
                entry.waiting = 0;
            } else if entry.is_available() {
                entry.waiting += 1;
            }
        }
        if let Some(event) = &fault {
            self.broadcast(event, Some(index));
        }
        self.scoreboard.record_turn();

        if summary.evaluations == 0 {
            self.idle_turns += 1;
        } else {
            self.idle_turns = 0;
        }
        if self.termination.is_none() && self.idle_turns >= self.config.max_idle_turns {
            warn!(
                "Session {} evaluated nothing for {} turns",
                self.session_id, self.idle_turns
            );
            self.termination = Some(StopReason::Stalled);
        }
        if let Some(reason) = self.termination.clone() {
            return Ok(self.terminate(reason));
        }

        self.publish_status();
        Ok(TurnOutcome::Completed {
            algorithm: id,
            evaluations: summary.evaluations,
            improved: summary.improved,
            faulted: fault.is_some(),
        })
    }

    /// Pick the next algorithm: starvation guard first, then the lottery.
    fn select(&mut self) -> Option<usize> {
        let (gw, lw) = (self.config.global_weight, self.config.local_weight);
        let eligible: Vec<(usize, f64)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_available() && entry.rating.is_rated())
            .map(|(i, entry)| (i, entry.rating.weight(gw, lw).max(MIN_TICKET_WEIGHT)))
            .collect();
        if eligible.is_empty() {
            return None;
        }

        let guard = self.config.max_wait_turns.max(eligible.len());
        let mut starved: Option<usize> = None;
        for &(i, _) in &eligible {
            let waiting = self.entries[i].waiting;
            if waiting >= guard && starved.map_or(true, |s| waiting > self.entries[s].waiting) {
                starved = Some(i);
            }
        }
        if starved.is_some() {
            return starved;
        }

        let total: f64 = eligible.iter().map(|(_, w)| w).sum();
        let mut ticket = self.rng.random::<f64>() * total;
        for &(i, weight) in &eligible {
            if ticket < weight {
                return Some(i);
            }
            ticket -= weight;
        }
        eligible.last().map(|&(i, _)| i)
    }

    /// Deliver to every available algorithm except `skip`, then subscribers.
    fn broadcast(&mut self, event: &SearchEvent, skip: Option<usize>) {
        for (i, entry) in self.entries.iter_mut().enumerate() {
            if Some(i) != skip {
                entry.notify(event);
            }
        }
        publish(&mut self.subscribers, event);
    }

    fn ensure_not_terminated(&self) -> KsResult<()> {
        match &self.state {
            ScheduleState::Terminated(reason) => Err(ScheduleError::AlreadyTerminated {
                reason: reason.to_string(),
            }
            .into()),
            _ => Ok(()),
        }
    }

    fn terminate(&mut self, reason: StopReason) -> TurnOutcome {
        self.termination = Some(reason.clone());
        self.state = ScheduleState::Terminated(reason.clone());
        info!(
            "Session {} stopped ({}) after {} evaluations in {} turns",
            self.session_id,
            reason,
            self.scoreboard.evaluations(),
            self.scoreboard.turns()
        );
        if let Some(best) = self.judge.best() {
            info!("Best trial {}: {}", best.sequence, best.point);
        }
        self.publish_status();
        TurnOutcome::Terminated(reason)
    }

    fn publish_status(&self) {
        *self.status.write() = ScheduleStatus {
            state: self.state.clone(),
            evaluations: self.scoreboard.evaluations(),
            turns: self.scoreboard.turns(),
            best: self.judge.best().cloned(),
        };
    }

    fn report(&self, stop_reason: StopReason) -> ScheduleReport {
        ScheduleReport {
            session_id: self.session_id,
            stop_reason,
            score: self.scoreboard.summary(),
            started_at: self.scoreboard.started_at(),
            finished_at: Utc::now(),
            solutions: self.judge.solutions().to_vec(),
            algorithms: self.algorithms(),
        }
    }
}
