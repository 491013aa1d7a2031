//! Error types for problem setup and function evaluation.
//!
//! Two tiers live here. [`EvalError`] is a per-evaluation failure: the user
//! function is undefined at one sampled point, and whoever called the
//! differentiation cache decides what to do about it. [`NlpError`] covers
//! malformed input detected before any solver is involved.

use thiserror::Error;

/// Failure of a single function evaluation.
///
/// These are never fatal to a cache; the next evaluation at a different
/// point may well succeed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The function produced a NaN or infinite value.
    #[error("Non-finite {quantity} at index {index}")]
    NonFinite {
        /// Which output was non-finite ("objective", "constraint", "gradient", "jacobian")
        quantity: &'static str,
        /// Position of the offending entry within that output
        index: usize,
    },

    /// The function reported that it is undefined at the point.
    #[error("Function undefined at the sampled point: {reason}")]
    Undefined {
        /// Description supplied by the user function
        reason: String,
    },

    /// User-supplied derivatives were requested but the function has none.
    #[error("Function does not supply derivatives")]
    DerivativesNotProvided,
}

impl EvalError {
    /// Create an Undefined error with a custom reason.
    pub fn undefined<S: Into<String>>(reason: S) -> Self {
        Self::Undefined {
            reason: reason.into(),
        }
    }

    /// Create a NonFinite error.
    pub fn non_finite(quantity: &'static str, index: usize) -> Self {
        Self::NonFinite { quantity, index }
    }
}

/// Errors raised while setting up a problem.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NlpError {
    /// A vector or pattern does not have the size the problem requires.
    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Name of the mismatched quantity
        what: String,
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// The sparsity pattern is malformed.
    #[error("Invalid sparsity pattern: {reason}")]
    InvalidPattern {
        /// Description of the defect
        reason: String,
    },

    /// A configuration value is unusable.
    #[error("Invalid configuration for {parameter}: {reason}")]
    InvalidConfiguration {
        /// Name of the parameter
        parameter: String,
        /// Description of the problem
        reason: String,
    },

    /// The requested differentiation method cannot run on this function.
    #[error("Differentiation method {method} unavailable: {reason}")]
    UnsupportedMethod {
        /// Method tag
        method: String,
        /// Why it cannot be used
        reason: String,
    },

    /// An evaluation needed during setup failed.
    #[error("Evaluation failed during setup: {0}")]
    Evaluation(#[from] EvalError),
}

impl NlpError {
    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<S: Into<String>>(what: S, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }

    /// Create an InvalidPattern error.
    pub fn invalid_pattern<S: Into<String>>(reason: S) -> Self {
        Self::InvalidPattern {
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration<S1, S2>(parameter: S1, reason: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self::InvalidConfiguration {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Create an UnsupportedMethod error.
    pub fn unsupported_method<S1, S2>(method: S1, reason: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: Into<String>,
    {
        Self::UnsupportedMethod {
            method: method.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for setup operations.
pub type Result<T> = std::result::Result<T, NlpError>;

/// Result type alias for a single function evaluation.
pub type EvalResult<T> = std::result::Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = NlpError::dimension_mismatch("x_lower", 3, 2);
        assert!(matches!(err, NlpError::DimensionMismatch { .. }));
        assert_eq!(
            err.to_string(),
            "Dimension mismatch for x_lower: expected 3, got 2"
        );

        let err = NlpError::invalid_pattern("row 0 out of range");
        assert_eq!(err.to_string(), "Invalid sparsity pattern: row 0 out of range");
    }

    #[test]
    fn test_eval_error_display() {
        let errors = vec![
            EvalError::non_finite("objective", 0),
            EvalError::undefined("log of negative number"),
            EvalError::DerivativesNotProvided,
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }

    #[test]
    fn test_eval_error_propagation() {
        let eval = EvalError::undefined("sqrt(-1)");
        let setup: NlpError = eval.into();

        assert!(matches!(setup, NlpError::Evaluation(_)));
        assert!(setup.to_string().contains("Evaluation failed during setup"));
        assert!(setup.to_string().contains("sqrt(-1)"));
    }

    #[test]
    fn test_unsupported_method_display() {
        let err = NlpError::unsupported_method("UserDeriv", "no derivatives supplied");
        assert!(err.to_string().contains("UserDeriv"));
        assert!(err.to_string().contains("no derivatives supplied"));
    }
}
