//! Nonlinear programming through one entry point.
//!
//! `nlpbridge` takes an objective with constraints written once as
//! `x -> (f, g)`, picks a Jacobian structure and a derivative strategy, and
//! hands the problem to a SNOPT-style solver or to any other backend
//! implementing [`ExternalSolver`].
//!
//! # Crates
//!
//! - [`nlpbridge_core`]: sparsity patterns and differentiation caches
//! - [`nlpbridge_snopt`]: workspace negotiation, options, callbacks and warm
//!   starts for SNOPT-style solvers, plus a pure-Rust reference solver
//!
//! # Example
//!
//! ```
//! use nlpbridge::prelude::*;
//!
//! // minimize x1² + x2² subject to x1 + x2 >= 1
//! struct Quadratic;
//!
//! impl NlpFunction for Quadratic {
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
//! let options = Options::new().with_method(DifferentiationMethod::ForwardFD);
//!
//! let mut dispatcher = Dispatcher::reference().with_option("Major print level", 0);
//! let solution = dispatcher.minimize(Quadratic, &[2.0, 2.0], 1, &bounds, &options)?;
//! assert_eq!(solution.status, TerminationCategory::Optimal);
//!
//! // Resume from the final basis and multipliers.
//! dispatcher.set_warm_start(solution.warm_start().expect("adapter outputs"));
//! let again = dispatcher.minimize(Quadratic, &[2.0, 2.0], 1, &bounds, &options)?;
//! assert!(again.is_optimal());
//! # Ok::<(), nlpbridge::Error>(())
//! ```

pub mod dispatch;
pub mod error;
pub mod options;

pub use dispatch::{minimize, Backend, Dispatcher, ExternalOutcome, ExternalSolver, Solution};
pub use error::{Error, Result};
pub use options::{Options, SparsitySpec};

// Re-export the component crates
pub use nlpbridge_core;
pub use nlpbridge_snopt;

// Re-export key dependencies
pub use nalgebra;

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use nlpbridge::prelude::*;
/// ```
pub mod prelude {
    pub use crate::dispatch::{
        minimize, Backend, Dispatcher, ExternalOutcome, ExternalSolver, Solution,
    };
    pub use crate::error::{Error, Result};
    pub use crate::options::{Options, SparsitySpec};
    pub use nlpbridge_core::cache::{build_cache, DerivativeCache, DifferentiationMethod};
    pub use nlpbridge_core::error::{EvalError, EvalResult, NlpError};
    pub use nlpbridge_core::finite_diff::FdScheme;
    pub use nlpbridge_core::function::{CountingFunction, NlpFunction};
    pub use nlpbridge_core::sparsity::SparsityPattern;
    pub use nlpbridge_core::types::{Bounds, Dimensions, NlpScalar};
    pub use nlpbridge_snopt::interface::{SnoptInterface, StreamConfig};
    pub use nlpbridge_snopt::options::{OptionRegistry, OptionValue};
    pub use nlpbridge_snopt::reference::{ReferenceOptions, ReferenceSolver};
    pub use nlpbridge_snopt::start::StartState;
    pub use nlpbridge_snopt::{
        Outputs, SnoptAdapter, SnoptError, SnoptSettings, TerminationCategory, TerminationCode,
    };
}
