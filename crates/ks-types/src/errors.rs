use thiserror::Error;

/// Main error type for the Kestrel system
#[derive(Error, Debug)]
pub enum KsError {
    #[error("Variable error: {0}")]
    Variable(#[from] VariableError),

    #[error("Problem error: {0}")]
    Problem(#[from] ProblemError),

    #[error("Algorithm error: {0}")]
    Algorithm(#[from] AlgorithmError),

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Variable construction errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VariableError {
    #[error("Variable name must not be empty")]
    EmptyName,

    #[error("Variable {name} has non-finite bounds [{lower}, {upper}]")]
    NonFiniteBounds { name: String, lower: f64, upper: f64 },

    #[error("Variable {name} has lower bound {lower} above upper bound {upper}")]
    InvertedBounds { name: String, lower: f64, upper: f64 },

    #[error("Variable {name} initial value {initial} lies outside [{lower}, {upper}]")]
    InitialOutOfBounds {
        name: String,
        initial: f64,
        lower: f64,
        upper: f64,
    },
}

/// Problem definition and trial point validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    #[error("Problem has no variables")]
    NoVariables,

    #[error("Problem has no objectives")]
    NoObjectives,

    #[error("Duplicate variable name: {name}")]
    DuplicateVariable { name: String },

    #[error("Duplicate objective name: {name}")]
    DuplicateObjective { name: String },

    #[error("Trial point references unknown variable: {name}")]
    UnknownVariable { name: String },

    #[error("Trial point has no value for variable: {name}")]
    MissingVariable { name: String },

    #[error("Value {value} for variable {name} is outside [{lower}, {upper}]")]
    OutOfBounds {
        name: String,
        value: f64,
        lower: f64,
        upper: f64,
    },

    #[error("Value for variable {name} is not finite")]
    NonFiniteValue { name: String },

    #[error("Evaluation is missing a score for objective: {objective}")]
    MissingScore { objective: String },

    #[error("Evaluation reports unknown objective: {objective}")]
    UnknownObjective { objective: String },

    #[error("Expected {expected} coordinates, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Search algorithm errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlgorithmError {
    #[error("Algorithm {label} faulted: {message}")]
    Fault { label: String, message: String },

    #[error("Algorithm not found: {id}")]
    NotFound { id: usize },

    #[error("Invalid algorithm configuration: {message}")]
    InvalidConfig { message: String },
}

/// Schedule lifecycle errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("No algorithms registered")]
    NoAlgorithms,

    #[error("Schedule already terminated: {reason}")]
    AlreadyTerminated { reason: String },

    #[error("Invalid schedule configuration: {message}")]
    InvalidConfig { message: String },
}

/// Result type alias for Kestrel operations
pub type KsResult<T> = Result<T, KsError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::KsError::Validation(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::KsError::Internal(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::KsError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ProblemError::OutOfBounds {
            name: "x".to_string(),
            value: 1.5,
            lower: 0.0,
            upper: 1.0,
        };

        assert!(error.to_string().contains("outside"));
        assert!(error.to_string().contains("1.5"));
        assert!(error.to_string().contains("x"));
    }

    #[test]
    fn test_error_conversion() {
        let problem_error = ProblemError::DuplicateVariable {
            name: "x".to_string(),
        };
        let ks_error: KsError = problem_error.into();

        match ks_error {
            KsError::Problem(ProblemError::DuplicateVariable { name }) => assert_eq!(name, "x"),
            _ => panic!("Expected Problem error"),
        }
    }

    #[test]
    fn test_macros() {
        let validation_err = validation_error!("Invalid value: {}", 42);
        assert!(matches!(validation_err, KsError::Validation(_)));
        let internal_err = internal_error!("Something went wrong");
        assert!(matches!(internal_err, KsError::Internal(_)));
        let config_err = config_error!("Missing required field: {}", "stop");
        assert!(config_err.to_string().contains("stop"));
    }
}
