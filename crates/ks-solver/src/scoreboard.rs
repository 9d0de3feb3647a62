//! Session bookkeeping: trial sequence numbers, counters and the clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use ks_types::{Trial, TrialSequence};

use crate::stopper::Progress;

/// Counters for one schedule session.
#[derive(Debug, Clone)]
pub struct ScoreBoard {
    next_sequence: TrialSequence,
    evaluations: u64,
    vetoes: u64,
    new_optimal: u64,
    turns: u64,
    started: Option<Instant>,
    started_at: Option<DateTime<Utc>>,
}

impl ScoreBoard {
    pub fn new() -> Self {
        Self {
            next_sequence: 0,
            evaluations: 0,
            vetoes: 0,
            new_optimal: 0,
            turns: 0,
            started: None,
            started_at: None,
        }
    }

    /// Start the session clock. Later calls keep the first start.
    pub fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
            self.started_at = Some(Utc::now());
        }
    }

    /// Hand out the next trial sequence number.
    pub fn next_sequence(&mut self) -> TrialSequence {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    pub fn record_trial(&mut self, trial: &Trial) {
        self.evaluations += 1;
        if trial.is_vetoed() {
            self.vetoes += 1;
        }
    }

    pub fn record_new_optimal(&mut self) {
        self.new_optimal += 1;
    }

    pub fn record_turn(&mut self) {
        self.turns += 1;
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    pub fn vetoes(&self) -> u64 {
        self.vetoes
    }

    pub fn new_optimal(&self) -> u64 {
        self.new_optimal
    }

    pub fn turns(&self) -> u64 {
        self.turns
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }

    pub fn progress(&self, satisfaction: Option<f64>) -> Progress {
        Progress {
            evaluations: self.evaluations,
            elapsed: self.elapsed(),
            satisfaction,
        }
    }

    pub fn summary(&self) -> ScoreSummary {
        ScoreSummary {
            evaluations: self.evaluations,
            vetoes: self.vetoes,
            new_optimal: self.new_optimal,
            turns: self.turns,
            elapsed_seconds: self.elapsed().as_secs_f64(),
        }
    }
}

impl Default for ScoreBoard {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable counters for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub evaluations: u64,
    pub vetoes: u64,
    pub new_optimal: u64,
    pub turns: u64,
    pub elapsed_seconds: f64,
}
