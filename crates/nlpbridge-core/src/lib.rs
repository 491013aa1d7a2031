//! Sparsity patterns and differentiation caches for nonlinear programming.
//!
//! This crate turns a single user evaluation `x -> (f, g)` into the value
//! and derivative arrays a nonlinear-programming backend asks for, whatever
//! the Jacobian structure and derivative strategy.
//!
//! # Key Concepts
//!
//! - **NlpFunction**: one generic evaluation returning `f` and writing `g`
//! - **SparsityPattern**: 1-indexed coordinates of the nonzero Jacobian entries
//! - **DerivativeCache**: a strategy bound to a pattern and a method, with one
//!   `evaluate` entry point
//!
//! # Modules
//!
//! - [`cache`]: The six differentiation strategies and their factory
//! - [`coloring`]: Greedy column coloring for compressed Jacobians
//! - [`error`]: Setup and evaluation error types
//! - [`finite_diff`]: Forward, central and complex-step differences
//! - [`forward_ad`]: Dual-number sweeps
//! - [`function`]: The user function trait
//! - [`sparsity`]: Sparsity patterns and auto-detection
//! - [`types`]: Scalar abstraction, dimensions and bounds

pub mod cache;
pub mod coloring;
pub mod error;
pub mod finite_diff;
pub mod forward_ad;
pub mod function;
pub mod sparsity;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_problems;

pub use error::{EvalError, EvalResult, NlpError, Result};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use nlpbridge_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cache::{build_cache, DerivativeCache, DifferentiationMethod};
    pub use crate::coloring::ColumnColoring;
    pub use crate::error::{EvalError, EvalResult, NlpError, Result};
    pub use crate::finite_diff::FdScheme;
    pub use crate::function::{CountingFunction, EvaluationCounts, NlpFunction};
    pub use crate::sparsity::SparsityPattern;
    pub use crate::types::{Bounds, Dimensions, NlpScalar};
}
