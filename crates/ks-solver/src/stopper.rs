//! Stop conditions for a schedule run.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Snapshot of search progress that stop conditions are checked against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub evaluations: u64,
    pub elapsed: Duration,
    /// Satisfaction of the current best solution, if it can be computed.
    pub satisfaction: Option<f64>,
}

/// Global stop condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCondition {
    /// Stop once this many trials have been evaluated.
    MaxEvaluations(u64),
    /// Stop once the wall-clock budget is spent.
    MaxElapsed { seconds: f64 },
    /// Stop once the best solution's satisfaction reaches the threshold.
    Satisfaction { threshold: f64 },
    /// Run at least `min_seconds`, at most `max_seconds`, and stop in between
    /// as soon as the satisfaction threshold is met.
    MinMaxTime {
        min_seconds: f64,
        max_seconds: f64,
        threshold: f64,
    },
    /// Stop when any inner condition holds.
    Any(Vec<StopCondition>),
    /// Stop when every inner condition holds.
    All(Vec<StopCondition>),
}

impl StopCondition {
    pub fn max_evaluations(n: u64) -> Self {
        Self::MaxEvaluations(n)
    }

    pub fn max_elapsed(duration: Duration) -> Self {
        Self::MaxElapsed {
            seconds: duration.as_secs_f64(),
        }
    }

    pub fn satisfaction(threshold: f64) -> Self {
        Self::Satisfaction { threshold }
    }

    pub fn or(self, other: StopCondition) -> Self {
        match self {
            Self::Any(mut inner) => {
                inner.push(other);
                Self::Any(inner)
            }
            this => Self::Any(vec![this, other]),
        }
    }

    pub fn should_stop(&self, progress: &Progress) -> bool {
        let elapsed = progress.elapsed.as_secs_f64();
        let satisfied = |threshold: f64| progress.satisfaction.is_some_and(|s| s >= threshold);

        match self {
            Self::MaxEvaluations(n) => progress.evaluations >= *n,
            Self::MaxElapsed { seconds } => elapsed >= *seconds,
            Self::Satisfaction { threshold } => satisfied(*threshold),
            Self::MinMaxTime {
                min_seconds,
                max_seconds,
                threshold,
            } => elapsed >= *max_seconds || (elapsed >= *min_seconds && satisfied(*threshold)),
            Self::Any(inner) => inner.iter().any(|c| c.should_stop(progress)),
            Self::All(inner) => !inner.is_empty() && inner.iter().all(|c| c.should_stop(progress)),
        }
    }

    /// Whether any member depends on the best solution's satisfaction.
    /// Such a condition needs a satisfaction curve on every objective.
    pub fn uses_satisfaction(&self) -> bool {
        match self {
            Self::MaxEvaluations(_) | Self::MaxElapsed { .. } => false,
            Self::Satisfaction { .. } | Self::MinMaxTime { .. } => true,
            Self::Any(inner) | Self::All(inner) => inner.iter().any(Self::uses_satisfaction),
        }
    }

    /// Validate thresholds and budgets.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::MaxEvaluations(_) => Ok(()),
            Self::MaxElapsed { seconds } if !(seconds.is_finite() && *seconds >= 0.0) => {
                Err(format!("elapsed budget must be a non-negative number, got {seconds}"))
            }
            Self::MaxElapsed { .. } => Ok(()),
            Self::Satisfaction { threshold } => check_threshold(*threshold),
            Self::MinMaxTime {
                min_seconds,
                max_seconds,
                threshold,
            } => {
                if !(min_seconds.is_finite() && max_seconds.is_finite())
                    || *min_seconds < 0.0
                    || min_seconds > max_seconds
                {
                    return Err(format!(
                        "invalid time window [{min_seconds}, {max_seconds}]"
                    ));
                }
                check_threshold(*threshold)
            }
            Self::Any(inner) | Self::All(inner) => {
                if inner.is_empty() {
                    return Err("composite stop condition needs at least one member".into());
                }
                inner.iter().try_for_each(|c| c.validate())
            }
        }
    }
}

fn check_threshold(threshold: f64) -> Result<(), String> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(format!("satisfaction threshold must lie in [0, 1], got {threshold}"))
    }
}

/// Why a schedule stopped issuing turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The stop condition was met.
    ConditionMet,
    /// A stop was requested through the schedule handle.
    Requested,
    /// Every algorithm is unavailable or rated 0 on both axes.
    NoEligibleAlgorithms,
    /// Too many consecutive turns evaluated nothing.
    Stalled,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::ConditionMet => "stop condition met",
            Self::Requested => "stop requested",
            Self::NoEligibleAlgorithms => "no eligible algorithms",
            Self::Stalled => "no evaluations in consecutive turns",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(evaluations: u64, secs: f64, satisfaction: Option<f64>) -> Progress {
        Progress {
            evaluations,
            elapsed: Duration::from_secs_f64(secs),
            satisfaction,
        }
    }

    #[test]
    fn max_evaluations() {
        let stop = StopCondition::max_evaluations(10);
        assert!(!stop.should_stop(&progress(9, 0.0, None)));
        assert!(stop.should_stop(&progress(10, 0.0, None)));
    }

    #[test]
    fn satisfaction_needs_a_value() {
        let stop = StopCondition::satisfaction(0.9);
        assert!(!stop.should_stop(&progress(100, 0.0, None)));
        assert!(!stop.should_stop(&progress(100, 0.0, Some(0.5))));
        assert!(stop.should_stop(&progress(100, 0.0, Some(0.95))));
    }

    #[test]
    fn min_max_time_window() {
        let stop = StopCondition::MinMaxTime {
            min_seconds: 1.0,
            max_seconds: 5.0,
            threshold: 0.9,
        };
        assert!(!stop.should_stop(&progress(0, 0.5, Some(1.0))));
        assert!(stop.should_stop(&progress(0, 1.5, Some(1.0))));
        assert!(!stop.should_stop(&progress(0, 3.0, Some(0.1))));
        assert!(stop.should_stop(&progress(0, 5.0, None)));
    }

    #[test]
    fn composite_conditions() {
        let any = StopCondition::max_evaluations(5).or(StopCondition::max_elapsed(Duration::from_secs(60)));
        assert!(any.should_stop(&progress(5, 0.0, None)));
        assert!(any.should_stop(&progress(0, 61.0, None)));
        assert!(!any.should_stop(&progress(1, 1.0, None)));

        let all = StopCondition::All(vec![
            StopCondition::max_evaluations(5),
            StopCondition::satisfaction(0.5),
        ]);
        assert!(!all.should_stop(&progress(5, 0.0, Some(0.1))));
        assert!(all.should_stop(&progress(5, 0.0, Some(0.6))));
    }

    #[test]
    fn validation() {
        assert!(StopCondition::satisfaction(1.5).validate().is_err());
        assert!(StopCondition::Any(vec![]).validate().is_err());
        assert!(StopCondition::MaxElapsed { seconds: -1.0 }.validate().is_err());
        assert!(StopCondition::MinMaxTime {
            min_seconds: 5.0,
            max_seconds: 1.0,
            threshold: 0.5
        }
        .validate()
        .is_err());
        assert!(StopCondition::max_evaluations(3)
            .or(StopCondition::satisfaction(0.99))
            .validate()
            .is_ok());
    }

    #[test]
    fn satisfaction_use_is_found_in_members() {
        assert!(!StopCondition::max_evaluations(3).uses_satisfaction());
        assert!(StopCondition::satisfaction(0.5).uses_satisfaction());
        assert!(StopCondition::All(vec![
            StopCondition::max_evaluations(5),
            StopCondition::MinMaxTime {
                min_seconds: 0.0,
                max_seconds: 1.0,
                threshold: 0.5,
            },
        ])
        .uses_satisfaction());
        assert!(!StopCondition::max_evaluations(3)
            .or(StopCondition::max_elapsed(Duration::from_secs(1)))
            .uses_satisfaction());
    }

    #[test]
    fn serde_shape() {
        let stop = StopCondition::max_evaluations(100).or(StopCondition::satisfaction(0.95));
        let json = serde_json::to_string(&stop).unwrap();
        assert_eq!(
            json,
            r#"{"any":[{"max_evaluations":100},{"satisfaction":{"threshold":0.95}}]}"#
        );
        let back: StopCondition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stop);
    }
}
