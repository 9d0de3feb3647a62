//! Search events broadcast to registered algorithms and subscribers.

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use ks_types::Trial;

/// Identifies an algorithm within one schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AlgorithmId(pub usize);

impl std::fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything the schedule tells its algorithms, in delivery order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SearchEvent {
    /// An algorithm joined the schedule.
    AlgorithmAvailable { id: AlgorithmId, label: String },
    /// An algorithm was removed or faulted.
    AlgorithmUnavailable {
        id: AlgorithmId,
        label: String,
        reason: String,
    },
    /// A trial was evaluated and judged (accepted or rejected).
    TrialScored(Arc<Trial>),
    /// A trial failed a constraint.
    TrialVetoed(Arc<Trial>),
    /// The judge accepted a new optimal solution.
    NewOptimalSolution {
        /// Tracked solutions after the update, best first.
        solutions: Vec<Arc<Trial>>,
        solution: Arc<Trial>,
    },
}

impl SearchEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AlgorithmAvailable { .. } => "algorithm_available",
            Self::AlgorithmUnavailable { .. } => "algorithm_unavailable",
            Self::TrialScored(_) => "trial_scored",
            Self::TrialVetoed(_) => "trial_vetoed",
            Self::NewOptimalSolution { .. } => "new_optimal_solution",
        }
    }

    /// The trial carried by the event, if any.
    pub fn trial(&self) -> Option<&Arc<Trial>> {
        match self {
            Self::TrialScored(trial) | Self::TrialVetoed(trial) => Some(trial),
            Self::NewOptimalSolution { solution, .. } => Some(solution),
            _ => None,
        }
    }
}

/// Send `event` to every subscriber, dropping those whose receiver is gone.
pub(crate) fn publish(subscribers: &mut Vec<Sender<SearchEvent>>, event: &SearchEvent) {
    subscribers.retain(|tx| {
        let delivered = tx.send(event.clone()).is_ok();
        if !delivered {
            warn!("Dropping event subscriber with closed receiver");
        }
        delivered
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use ks_types::{Evaluation, TrialPoint};

    #[test]
    fn event_kind_and_trial() {
        let point: TrialPoint = [("x", 1.0)].into_iter().collect();
        let trial = Arc::new(Trial::new(3, point, Evaluation::scored("f", 1.0), "test"));

        let scored = SearchEvent::TrialScored(trial.clone());
        assert_eq!(scored.kind(), "trial_scored");
        assert_eq!(scored.trial().map(|t| t.sequence), Some(3));

        let available = SearchEvent::AlgorithmAvailable {
            id: AlgorithmId(0),
            label: "Random Search".into(),
        };
        assert!(available.trial().is_none());
    }

    #[test]
    fn publish_drops_closed_subscribers() {
        let (live_tx, live_rx) = crossbeam_channel::unbounded();
        let (dead_tx, dead_rx) = crossbeam_channel::unbounded();
        drop(dead_rx);
        let mut subscribers = vec![live_tx, dead_tx];

        let event = SearchEvent::AlgorithmAvailable {
            id: AlgorithmId(1),
            label: "Pattern Search".into(),
        };
        publish(&mut subscribers, &event);

        assert_eq!(subscribers.len(), 1);
        assert_eq!(live_rx.try_recv().unwrap(), event);
    }

    #[test]
    fn event_serialization() {
        let point: TrialPoint = [("x", 1.0)].into_iter().collect();
        let trial = Arc::new(Trial::new(1, point, Evaluation::scored("f", 0.5), "test"));
        let event = SearchEvent::NewOptimalSolution {
            solutions: vec![trial.clone()],
            solution: trial,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: SearchEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
