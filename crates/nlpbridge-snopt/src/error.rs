//! Error types for the SNOPT adapter.
//!
//! Only problems found before the blocking solve are errors. A solve that
//! ends without an optimal point is still an `Ok` carrying its termination
//! code in [`Outputs`](crate::Outputs).

use nlpbridge_core::NlpError;
use thiserror::Error;

/// Errors raised by the adapter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnoptError {
    /// Malformed problem input.
    #[error(transparent)]
    Setup(#[from] NlpError),

    /// A print or summary stream could not be opened.
    #[error("Failed to open {stream} stream at {path}: {reason}")]
    Stream {
        /// "print" or "summary"
        stream: &'static str,
        /// Path that failed
        path: String,
        /// Underlying I/O error
        reason: String,
    },

    /// A size or index does not fit the solver's integer type.
    #[error("Value {value} for {what} exceeds the solver integer range")]
    IntegerOverflow {
        /// Name of the quantity
        what: &'static str,
        /// Offending value
        value: usize,
    },
}

impl SnoptError {
    /// Create a Stream error.
    pub fn stream<P, E>(stream: &'static str, path: P, reason: E) -> Self
    where
        P: std::fmt::Display,
        E: std::fmt::Display,
    {
        Self::Stream {
            stream,
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Converts a count or index to the solver's `i32`.
pub(crate) fn to_solver_int(what: &'static str, value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| SnoptError::IntegerOverflow { what, value })
}

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, SnoptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_error_is_transparent() {
        let err: SnoptError = NlpError::dimension_mismatch("x0", 2, 3).into();
        assert_eq!(err.to_string(), "Dimension mismatch for x0: expected 2, got 3");
    }

    #[test]
    fn test_integer_conversion() {
        assert_eq!(to_solver_int("n", 12).unwrap(), 12);
        let err = to_solver_int("neG", usize::MAX).unwrap_err();
        assert!(matches!(err, SnoptError::IntegerOverflow { what: "neG", .. }));
    }

    #[test]
    fn test_stream_error_display() {
        let err = SnoptError::stream("print", "/nonexistent/run.out", "permission denied");
        assert!(err.to_string().contains("print"));
        assert!(err.to_string().contains("/nonexistent/run.out"));
    }
}
