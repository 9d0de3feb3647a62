use serde::{Deserialize, Serialize};

use crate::errors::{KsResult, VariableError};

/// A named decision dimension with inclusive bounds.
///
/// Equal bounds describe a fixed dimension: every trial point carries the
/// same value for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    name: String,
    lower: f64,
    upper: f64,
    /// Starting value used by local strategies before any trial exists.
    initial: f64,
}

impl Variable {
    /// Create a variable whose initial value is the midpoint of its bounds.
    pub fn new(name: impl Into<String>, lower: f64, upper: f64) -> KsResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(VariableError::EmptyName.into());
        }
        if !lower.is_finite() || !upper.is_finite() {
            return Err(VariableError::NonFiniteBounds { name, lower, upper }.into());
        }
        if lower > upper {
            return Err(VariableError::InvertedBounds { name, lower, upper }.into());
        }

        Ok(Self {
            initial: lower + 0.5 * (upper - lower),
            name,
            lower,
            upper,
        })
    }

    /// Create a variable pinned to a single value.
    pub fn fixed(name: impl Into<String>, value: f64) -> KsResult<Self> {
        Self::new(name, value, value)
    }

    /// Override the initial value.
    pub fn with_initial(mut self, initial: f64) -> KsResult<Self> {
        if !self.contains(initial) {
            return Err(VariableError::InitialOutOfBounds {
                name: self.name,
                initial,
                lower: self.lower,
                upper: self.upper,
            }
            .into());
        }
        self.initial = initial;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn initial(&self) -> f64 {
        self.initial
    }

    /// Width of the admissible range.
    pub fn span(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn is_fixed(&self) -> bool {
        self.lower == self.upper
    }

    /// Whether `value` is finite and inside the inclusive bounds.
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.lower && value <= self.upper
    }

    /// Project a generated value into the bounds.
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.initial;
        }
        value.clamp(self.lower, self.upper)
    }
}
