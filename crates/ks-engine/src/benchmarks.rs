//! Standard test functions packaged as [`Problem`]s.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use ks_types::{Evaluation, KsResult, Objective, Problem, TrialPoint, Variable};

/// Built-in benchmark problems. Variables are named `x0`, `x1`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Benchmark {
    /// Minimize `sum(x^2)` on `[-5, 5]`, started from a corner.
    Sphere,
    /// Maximize `-sum((x - 0.3)^2)` on `[0, 1]`.
    ShiftedParabola,
    /// Minimize the Rosenbrock valley on `[-2, 2]`.
    Rosenbrock,
    /// Minimize Rastrigin on `[-5.12, 5.12]`.
    Rastrigin,
    /// Sphere with points where `sum(x) > 4 * n` vetoed.
    ConstrainedSphere,
    /// Two conflicting objectives, `mean(x^2)` and `mean((x - 1)^2)`.
    TradeOff,
}

impl Benchmark {
    pub fn name(self) -> &'static str {
        match self {
            Self::Sphere => "sphere",
            Self::ShiftedParabola => "shifted_parabola",
            Self::Rosenbrock => "rosenbrock",
            Self::Rastrigin => "rastrigin",
            Self::ConstrainedSphere => "constrained_sphere",
            Self::TradeOff => "trade_off",
        }
    }

    /// Name of the first objective.
    pub fn primary_objective(self) -> &'static str {
        match self {
            Self::ShiftedParabola => "fit",
            Self::TradeOff => "near_zero",
            _ => "f",
        }
    }

    /// Best achievable score of the first objective, when a single
    /// optimum exists.
    pub fn known_optimum(self) -> Option<f64> {
        match self {
            Self::TradeOff => None,
            _ => Some(0.0),
        }
    }

    /// Build the problem in `dimensions` variables.
    pub fn problem(self, dimensions: usize) -> KsResult<Problem> {
        match self {
            Self::Sphere => Problem::new(
                variables(dimensions, -5.0, 5.0, Some(-4.0))?,
                vec![Objective::minimize("f")],
                |p: &TrialPoint| Evaluation::scored("f", p.iter().map(|(_, x)| x * x).sum()),
            ),
            Self::ShiftedParabola => Problem::new(
                variables(dimensions, 0.0, 1.0, None)?,
                vec![Objective::maximize("fit")],
                |p: &TrialPoint| {
                    let fit = -p.iter().map(|(_, x)| (x - 0.3).powi(2)).sum::<f64>();
                    Evaluation::scored("fit", fit)
                },
            ),
            Self::Rosenbrock => Problem::new(
                variables(dimensions, -2.0, 2.0, Some(-1.5))?,
                vec![Objective::minimize("f")],
                |p: &TrialPoint| Evaluation::scored("f", rosenbrock(&ordered(p))),
            ),
            Self::Rastrigin => Problem::new(
                variables(dimensions, -5.12, 5.12, None)?,
                vec![Objective::minimize("f")],
                |p: &TrialPoint| {
                    let f = p
                        .iter()
                        .map(|(_, x)| x * x - 10.0 * (2.0 * PI * x).cos() + 10.0)
                        .sum();
                    Evaluation::scored("f", f)
                },
            ),
            Self::ConstrainedSphere => {
                let limit = 4.0 * dimensions as f64;
                Ok(Self::Sphere
                    .problem(dimensions)?
                    .with_constraint("sum(x) <= 4n", move |p: &TrialPoint| {
                        p.iter().map(|(_, x)| x).sum::<f64>() <= limit
                    }))
            }
            Self::TradeOff => Problem::new(
                variables(dimensions, -1.0, 2.0, None)?,
                vec![Objective::minimize("near_zero"), Objective::minimize("near_one")],
                |p: &TrialPoint| {
                    let n = p.len().max(1) as f64;
                    let a = p.iter().map(|(_, x)| x * x).sum::<f64>() / n;
                    let b = p.iter().map(|(_, x)| (x - 1.0).powi(2)).sum::<f64>() / n;
                    Evaluation::scored("near_zero", a).with_score("near_one", b)
                },
            ),
        }
    }
}

impl std::fmt::Display for Benchmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn variables(
    dimensions: usize,
    lower: f64,
    upper: f64,
    initial: Option<f64>,
) -> KsResult<Vec<Variable>> {
    (0..dimensions)
        .map(|i| {
            let variable = Variable::new(format!("x{i}"), lower, upper)?;
            match initial {
                Some(value) => variable.with_initial(value),
                None => Ok(variable),
            }
        })
        .collect()
}

/// Values in variable order. Names sort lexically, so `x10` would come
/// before `x2`; re-key by index.
fn ordered(point: &TrialPoint) -> Vec<f64> {
    let mut indexed: Vec<(usize, f64)> = point
        .iter()
        .filter_map(|(name, x)| Some((name.strip_prefix('x')?.parse().ok()?, x)))
        .collect();
    indexed.sort_by_key(|(i, _)| *i);
    indexed.into_iter().map(|(_, x)| x).collect()
}

fn rosenbrock(x: &[f64]) -> f64 {
    x.windows(2)
        .map(|w| (1.0 - w[0]).powi(2) + 100.0 * (w[1] - w[0] * w[0]).powi(2))
        .sum()
}
