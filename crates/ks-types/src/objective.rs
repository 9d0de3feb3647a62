//! Objectives and satisfaction curves.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Whether we are maximizing or minimizing the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveDirection {
    Maximize,
    Minimize,
}

impl Default for ObjectiveDirection {
    fn default() -> Self {
        Self::Maximize
    }
}

/// Maps a raw objective score to a satisfaction in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SatisfactionCurve {
    /// Linear ramp from `worst` (0) to `best` (1), clamped outside.
    /// `best` may be below `worst` for minimized scores.
    Linear { worst: f64, best: f64 },
    /// `1 / (1 + ((score - target) / tolerance)^2)`.
    InverseSquare { target: f64, tolerance: f64 },
    /// 1 once the score reaches `threshold` in the objective's direction.
    Step { threshold: f64 },
}

/// A named objective scored by the problem's evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub name: String,
    pub direction: ObjectiveDirection,
    /// Optional mapping to satisfaction, used by satisfaction stop
    /// conditions.
    pub satisfaction: Option<SatisfactionCurve>,
}

impl Objective {
    pub fn new(name: impl Into<String>, direction: ObjectiveDirection) -> Self {
        Self {
            name: name.into(),
            direction,
            satisfaction: None,
        }
    }

    pub fn minimize(name: impl Into<String>) -> Self {
        Self::new(name, ObjectiveDirection::Minimize)
    }

    pub fn maximize(name: impl Into<String>) -> Self {
        Self::new(name, ObjectiveDirection::Maximize)
    }

    pub fn with_satisfaction(mut self, curve: SatisfactionCurve) -> Self {
        self.satisfaction = Some(curve);
        self
    }

    /// Order two scores of this objective; `Less` means `a` is better.
    pub fn compare(&self, a: f64, b: f64) -> Ordering {
        match self.direction {
            ObjectiveDirection::Maximize => b.total_cmp(&a),
            ObjectiveDirection::Minimize => a.total_cmp(&b),
        }
    }

    /// Satisfaction of `score`, or `None` if no curve is configured.
    pub fn satisfaction(&self, score: f64) -> Option<f64> {
        let curve = self.satisfaction?;
        if !score.is_finite() {
            return Some(0.0);
        }
        let value = match curve {
            SatisfactionCurve::Linear { worst, best } => {
                if worst == best {
                    if self.compare(score, best) == Ordering::Greater {
                        0.0
                    } else {
                        1.0
                    }
                } else {
                    (score - worst) / (best - worst)
                }
            }
            SatisfactionCurve::InverseSquare { target, tolerance } => {
                if tolerance <= 0.0 {
                    if score == target {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    let r = (score - target) / tolerance;
                    1.0 / (1.0 + r * r)
                }
            }
            SatisfactionCurve::Step { threshold } => {
                if self.compare(score, threshold) == Ordering::Greater {
                    0.0
                } else {
                    1.0
                }
            }
        };
        Some(value.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_respects_direction() {
        let max = Objective::maximize("gain");
        let min = Objective::minimize("loss");
        assert_eq!(max.compare(2.0, 1.0), Ordering::Less);
        assert_eq!(min.compare(2.0, 1.0), Ordering::Greater);
        assert_eq!(min.compare(1.0, 1.0), Ordering::Equal);
    }

    #[test]
    fn default_direction_is_maximize() {
        assert_eq!(ObjectiveDirection::default(), ObjectiveDirection::Maximize);
    }

    #[test]
    fn linear_satisfaction_minimizing() {
        let obj = Objective::minimize("err")
            .with_satisfaction(SatisfactionCurve::Linear { worst: 10.0, best: 0.0 });
        assert_eq!(obj.satisfaction(10.0), Some(0.0));
        assert_eq!(obj.satisfaction(5.0), Some(0.5));
        assert_eq!(obj.satisfaction(-3.0), Some(1.0));
        assert_eq!(obj.satisfaction(20.0), Some(0.0));
    }

    #[test]
    fn inverse_square_peaks_at_target() {
        let obj = Objective::minimize("err")
            .with_satisfaction(SatisfactionCurve::InverseSquare { target: 0.0, tolerance: 0.1 });
        assert_eq!(obj.satisfaction(0.0), Some(1.0));
        let half = obj.satisfaction(0.1).unwrap();
        assert!((half - 0.5).abs() < 1e-12);
    }

    #[test]
    fn step_satisfaction() {
        let obj = Objective::maximize("fit")
            .with_satisfaction(SatisfactionCurve::Step { threshold: 0.9 });
        assert_eq!(obj.satisfaction(0.95), Some(1.0));
        assert_eq!(obj.satisfaction(0.5), Some(0.0));
    }

    #[test]
    fn no_curve_means_no_satisfaction() {
        assert_eq!(Objective::minimize("x").satisfaction(0.0), None);
    }

    #[test]
    fn non_finite_scores_are_unsatisfying() {
        let obj = Objective::maximize("fit")
            .with_satisfaction(SatisfactionCurve::Step { threshold: 0.9 });
        assert_eq!(obj.satisfaction(f64::NAN), Some(0.0));
    }

    #[test]
    fn curve_serializes_with_kind_tag() {
        let curve = SatisfactionCurve::Step { threshold: 1.0 };
        let json = serde_json::to_string(&curve).unwrap();
        assert!(json.contains("\"kind\":\"step\""));
        let back: SatisfactionCurve = serde_json::from_str(&json).unwrap();
        assert_eq!(back, curve);
    }
}
