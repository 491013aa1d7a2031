//! Errors surfaced by [`minimize`](crate::minimize) and the [`Dispatcher`](crate::Dispatcher).

use nlpbridge_core::NlpError;
use nlpbridge_snopt::SnoptError;
use thiserror::Error;

/// Setup failures of a dispatched solve.
///
/// A solver that ran and stopped short of optimality is not an error; its
/// outcome is in [`Solution::status`](crate::Solution::status).
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed problem detected before any backend was reached.
    #[error(transparent)]
    Setup(#[from] NlpError),

    /// The SNOPT-style adapter refused the problem or its streams.
    #[error(transparent)]
    Snopt(#[from] SnoptError),

    /// An external backend could not run.
    #[error("External solver '{solver}' failed: {reason}")]
    External {
        /// Name reported by the backend
        solver: String,
        /// Why it failed
        reason: String,
    },
}

impl Error {
    /// Create an External error.
    pub fn external<S: Into<String>, R: Into<String>>(solver: S, reason: R) -> Self {
        Self::External {
            solver: solver.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for dispatched solves.
pub type Result<T> = std::result::Result<T, Error>;
