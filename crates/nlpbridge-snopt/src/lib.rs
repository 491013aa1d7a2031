//! SNOPT-style solver adapter.
//!
//! This crate drives a solver that follows the SNOPT calling convention:
//! caller-owned workspace negotiated through a memory-sizing query, typed
//! option setters, print and summary streams, and one blocking solve that
//! re-enters a user callback for every function evaluation.
//!
//! # Key Concepts
//!
//! - **SnoptInterface**: the foreign boundary; a native binding or the
//!   bundled [`ReferenceSolver`](reference::ReferenceSolver)
//! - **SnoptAdapter**: runs the setup protocol and the solve, and packages
//!   the result
//! - **CallbackBridge**: turns solver callbacks into
//!   [`DerivativeCache`](nlpbridge_core::cache::DerivativeCache) evaluations
//! - **StartState**: cold start from a point, or warm start from a previous
//!   solve's [`Outputs`]
//!
//! # Example
//!
//! ```
//! use nlpbridge_core::prelude::*;
//! use nlpbridge_snopt::prelude::*;
//!
//! struct Toy;
//!
//! impl NlpFunction for Toy {
//!     fn eval<T: NlpScalar>(&self, g: &mut [T], x: &[T]) -> EvalResult<T> {
//!         g[0] = x[0] + x[1];
//!         Ok(x[0] * x[0] + x[1] * x[1])
//!     }
//! }
//!
//! let bounds = Bounds::new(
//!     vec![f64::NEG_INFINITY; 2],
//!     vec![f64::INFINITY; 2],
//!     vec![1.0],
//!     vec![f64::INFINITY],
//! );
//! let mut adapter = SnoptAdapter::new(ReferenceSolver::new());
//! let out = adapter
//!     .solve(
//!         Toy,
//!         &StartState::cold(vec![2.0, 2.0], 2),
//!         &bounds,
//!         SparsityPattern::dense(2, 2),
//!         DifferentiationMethod::ForwardAD,
//!         0.0,
//!     )
//!     .unwrap();
//! assert!(out.is_optimal());
//! ```

pub mod adapter;
pub mod bridge;
pub mod error;
pub mod interface;
pub mod options;
pub mod reference;
pub mod solution;
pub mod start;
pub mod status;
pub mod workspace;

pub use adapter::{SnoptAdapter, SnoptSettings};
pub use error::{Result, SnoptError};
pub use solution::Outputs;
pub use status::{TerminationCategory, TerminationCode};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::adapter::{SnoptAdapter, SnoptSettings};
    pub use crate::bridge::{BridgeStats, CallbackBridge};
    pub use crate::error::{Result as SnoptResult, SnoptError};
    pub use crate::interface::{SnoptInterface, StreamConfig, INFINITE_BOUND};
    pub use crate::options::{OptionRegistry, OptionValue};
    pub use crate::reference::{ReferenceOptions, ReferenceSolver};
    pub use crate::solution::Outputs;
    pub use crate::start::{StartMode, StartState};
    pub use crate::status::{TerminationCategory, TerminationCode};
    pub use crate::workspace::Workspace;
}
