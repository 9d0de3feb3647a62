//! Problem definition: variables, objectives, constraints and the evaluator.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use crate::errors::{KsResult, ProblemError};
use crate::objective::Objective;
use crate::ranking;
use crate::trial::{Evaluation, Trial};
use crate::trial_point::TrialPoint;
use crate::variable::Variable;

/// Caller-supplied objective code.
///
/// This is the only place external code runs during a search. It may be
/// expensive and is treated as synchronous work.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, point: &TrialPoint) -> Evaluation;
}

impl<F> Evaluator for F
where
    F: Fn(&TrialPoint) -> Evaluation + Send + Sync,
{
    fn evaluate(&self, point: &TrialPoint) -> Evaluation {
        self(point)
    }
}

/// A named feasibility predicate. Points failing it are vetoed without
/// calling the evaluator.
pub struct Constraint {
    name: String,
    predicate: Box<dyn Fn(&TrialPoint) -> bool + Send + Sync>,
}

impl Constraint {
    pub fn new(
        name: impl Into<String>,
        predicate: impl Fn(&TrialPoint) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            predicate: Box::new(predicate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_satisfied(&self, point: &TrialPoint) -> bool {
        (self.predicate)(point)
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint").field("name", &self.name).finish()
    }
}

/// The optimization problem handed to a schedule.
pub struct Problem {
    variables: Vec<Variable>,
    objectives: Vec<Objective>,
    constraints: Vec<Constraint>,
    evaluator: Box<dyn Evaluator>,
}

impl Problem {
    pub fn new(
        variables: Vec<Variable>,
        objectives: Vec<Objective>,
        evaluator: impl Evaluator + 'static,
    ) -> KsResult<Self> {
        if variables.is_empty() {
            return Err(ProblemError::NoVariables.into());
        }
        if objectives.is_empty() {
            return Err(ProblemError::NoObjectives.into());
        }

        let mut seen = HashSet::new();
        for variable in &variables {
            if !seen.insert(variable.name()) {
                return Err(ProblemError::DuplicateVariable {
                    name: variable.name().to_string(),
                }
                .into());
            }
        }

        let mut seen = HashSet::new();
        for objective in &objectives {
            if !seen.insert(objective.name.as_str()) {
                return Err(ProblemError::DuplicateObjective {
                    name: objective.name.clone(),
                }
                .into());
            }
        }

        Ok(Self {
            variables,
            objectives,
            constraints: Vec::new(),
            evaluator: Box::new(evaluator),
        })
    }

    pub fn with_constraint(
        mut self,
        name: impl Into<String>,
        predicate: impl Fn(&TrialPoint) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.constraints.push(Constraint::new(name, predicate));
        self
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name() == name)
    }

    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn dimensions(&self) -> usize {
        self.variables.len()
    }

    /// Point made of every variable's initial value.
    pub fn initial_point(&self) -> TrialPoint {
        self.variables
            .iter()
            .map(|v| (v.name().to_string(), v.initial()))
            .collect()
    }

    /// Check that `point` assigns an in-bounds value to every variable and
    /// nothing else.
    pub fn validate(&self, point: &TrialPoint) -> KsResult<()> {
        for (name, _) in point.iter() {
            if self.variable(name).is_none() {
                return Err(ProblemError::UnknownVariable {
                    name: name.to_string(),
                }
                .into());
            }
        }

        for variable in &self.variables {
            let value = point
                .value(variable.name())
                .ok_or_else(|| ProblemError::MissingVariable {
                    name: variable.name().to_string(),
                })?;
            if !value.is_finite() {
                return Err(ProblemError::NonFiniteValue {
                    name: variable.name().to_string(),
                }
                .into());
            }
            if !variable.contains(value) {
                return Err(ProblemError::OutOfBounds {
                    name: variable.name().to_string(),
                    value,
                    lower: variable.lower(),
                    upper: variable.upper(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Validate and evaluate a trial point.
    ///
    /// Constraint failures and non-finite scores come back as vetoed
    /// evaluations; malformed points and evaluations that do not match the
    /// declared objectives are errors.
    pub fn evaluate(&self, point: &TrialPoint) -> KsResult<Evaluation> {
        self.validate(point)?;

        if let Some(violated) = self.constraints.iter().find(|c| !c.is_satisfied(point)) {
            return Ok(Evaluation::vetoed(format!(
                "constraint {} violated",
                violated.name()
            )));
        }

        let evaluation = self.evaluator.evaluate(point);
        if evaluation.is_vetoed() {
            return Ok(evaluation);
        }

        for name in evaluation.scores.keys() {
            if !self.objectives.iter().any(|o| &o.name == name) {
                return Err(ProblemError::UnknownObjective {
                    objective: name.clone(),
                }
                .into());
            }
        }
        for objective in &self.objectives {
            match evaluation.scores.get(&objective.name) {
                None => {
                    return Err(ProblemError::MissingScore {
                        objective: objective.name.clone(),
                    }
                    .into())
                }
                Some(score) if !score.is_finite() => {
                    return Ok(Evaluation::vetoed(format!(
                        "non-finite score for objective {}",
                        objective.name
                    )));
                }
                Some(_) => {}
            }
        }
        if !evaluation.penalty.is_finite() || evaluation.penalty < 0.0 {
            return Ok(Evaluation::vetoed(format!(
                "invalid penalty {}",
                evaluation.penalty
            )));
        }

        Ok(evaluation)
    }

    /// Values of `point` in variable order; missing entries fall back to the
    /// variable's initial value.
    pub fn coordinates(&self, point: &TrialPoint) -> Vec<f64> {
        self.variables
            .iter()
            .map(|v| point.value(v.name()).unwrap_or_else(|| v.initial()))
            .collect()
    }

    /// Build a point from coordinates in variable order, projecting each
    /// value into its variable's bounds.
    pub fn point_from_coordinates(&self, coordinates: &[f64]) -> KsResult<TrialPoint> {
        if coordinates.len() != self.variables.len() {
            return Err(ProblemError::DimensionMismatch {
                expected: self.variables.len(),
                actual: coordinates.len(),
            }
            .into());
        }
        Ok(self
            .variables
            .iter()
            .zip(coordinates)
            .map(|(v, x)| (v.name().to_string(), v.clamp(*x)))
            .collect())
    }

    /// Feasibility-first ranking of two trials; `Less` means `a` is better.
    pub fn rank(&self, a: &Trial, b: &Trial) -> Ordering {
        ranking::rank(&self.objectives, a, b)
    }

    pub fn is_better(&self, a: &Trial, b: &Trial) -> bool {
        self.rank(a, b) == Ordering::Less
    }

    pub fn satisfaction(&self, trial: &Trial) -> Option<f64> {
        ranking::satisfaction(&self.objectives, trial)
    }
}

impl fmt::Debug for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Problem")
            .field("variables", &self.variables)
            .field("objectives", &self.objectives)
            .field("constraints", &self.constraints)
            .finish_non_exhaustive()
    }
}
