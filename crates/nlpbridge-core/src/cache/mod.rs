//! Differentiation caches.
//!
//! A cache binds a user function to a sparsity pattern and a
//! differentiation method, owns whatever scratch that combination needs, and
//! exposes one evaluation entry point. The strategy is fixed when the cache
//! is built by [`build_cache`]; evaluation never re-dispatches.
//!
//! # Output layout
//!
//! - `g` has length ng and `df` length nx.
//! - Dense caches write `dg` as the `ng × nx` constraint Jacobian in
//!   column-major order.
//! - Sparse caches write one `dg` value per declared pattern entry, in the
//!   order the pattern was declared.

mod dense;
mod sparse;

pub use dense::{DenseAdCache, DenseFdCache, DenseUserCache};
pub use sparse::{SparseAdCache, SparseFdCache, SparseUserCache};

use crate::{
    error::{EvalResult, NlpError, Result},
    finite_diff::FdScheme,
    function::NlpFunction,
    sparsity::SparsityPattern,
    types::Dimensions,
};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How derivatives are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DifferentiationMethod {
    /// Forward-mode automatic differentiation
    ForwardAD,
    /// Reverse-mode request; served by the forward dual-number engine
    ReverseAD,
    /// Forward finite differences
    ForwardFD,
    /// Central finite differences
    CentralFD,
    /// Complex-step differentiation
    ComplexStep,
    /// Derivatives supplied by the function itself
    UserDeriv,
}

impl DifferentiationMethod {
    /// All methods, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::ForwardAD,
        Self::ReverseAD,
        Self::ForwardFD,
        Self::CentralFD,
        Self::ComplexStep,
        Self::UserDeriv,
    ];

    /// True for the automatic-differentiation methods.
    pub fn is_ad(self) -> bool {
        matches!(self, Self::ForwardAD | Self::ReverseAD)
    }

    /// True for the finite-difference methods, complex step included.
    pub fn is_fd(self) -> bool {
        self.fd_scheme().is_some()
    }

    /// Difference scheme for finite-difference methods.
    pub fn fd_scheme(self) -> Option<FdScheme> {
        match self {
            Self::ForwardFD => Some(FdScheme::Forward),
            Self::CentralFD => Some(FdScheme::Central),
            Self::ComplexStep => Some(FdScheme::ComplexStep),
            _ => None,
        }
    }

    /// Name used in logs and option strings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ForwardAD => "ForwardAD",
            Self::ReverseAD => "ReverseAD",
            Self::ForwardFD => "ForwardFD",
            Self::CentralFD => "CentralFD",
            Self::ComplexStep => "ComplexStep",
            Self::UserDeriv => "UserDeriv",
        }
    }
}

impl fmt::Display for DifferentiationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DifferentiationMethod {
    type Err = NlpError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                NlpError::invalid_configuration(
                    "differentiation method",
                    format!("unknown method '{s}'"),
                )
            })
    }
}

/// Uniform evaluation contract shared by all strategies.
pub trait DerivativeCache {
    /// Method the cache was built for.
    fn method(&self) -> DifferentiationMethod;

    /// Problem dimensions.
    fn dimensions(&self) -> Dimensions;

    /// Pattern the cache was built for.
    fn pattern(&self) -> &SparsityPattern;

    /// Required length of the `dg` buffer.
    fn jacobian_len(&self) -> usize {
        if self.pattern().is_dense() {
            self.dimensions().dense_jacobian_len()
        } else {
            self.pattern().nnz()
        }
    }

    /// Evaluates `f` and `g` at `x`, and `df`, `dg` when `need_derivatives`.
    ///
    /// Returns the objective. An error means this one point could not be
    /// evaluated; the cache stays usable.
    fn evaluate(
        &mut self,
        x: &[f64],
        g: &mut [f64],
        df: &mut [f64],
        dg: &mut [f64],
        need_derivatives: bool,
    ) -> EvalResult<f64>;
}

impl<C: DerivativeCache + ?Sized> DerivativeCache for Box<C> {
    fn method(&self) -> DifferentiationMethod {
        (**self).method()
    }

    fn dimensions(&self) -> Dimensions {
        (**self).dimensions()
    }

    fn pattern(&self) -> &SparsityPattern {
        (**self).pattern()
    }

    fn jacobian_len(&self) -> usize {
        (**self).jacobian_len()
    }

    fn evaluate(
        &mut self,
        x: &[f64],
        g: &mut [f64],
        df: &mut [f64],
        dg: &mut [f64],
        need_derivatives: bool,
    ) -> EvalResult<f64> {
        (**self).evaluate(x, g, df, dg, need_derivatives)
    }
}

/// Problem dimensions implied by a pattern.
pub fn pattern_dimensions(pattern: &SparsityPattern) -> Result<Dimensions> {
    if pattern.is_dense() {
        if pattern.nrows() == 0 {
            return Err(NlpError::invalid_pattern(
                "dense pattern must include the objective row",
            ));
        }
        Ok(Dimensions::new(pattern.ncols(), pattern.nrows() - 1))
    } else {
        Ok(Dimensions::new(pattern.ncols(), pattern.nrows()))
    }
}

/// Builds the cache for a pattern and method.
///
/// Pass `&function` to keep ownership with the caller.
pub fn build_cache<'a, F>(
    function: F,
    pattern: SparsityPattern,
    method: DifferentiationMethod,
) -> Result<Box<dyn DerivativeCache + 'a>>
where
    F: NlpFunction + 'a,
{
    let dims = pattern_dimensions(&pattern)?;
    if method == DifferentiationMethod::UserDeriv && !function.provides_derivatives() {
        return Err(NlpError::unsupported_method(
            method,
            "function does not implement eval_with_derivatives",
        ));
    }

    tracing::debug!(
        component = "cache",
        operation = "build",
        method = %method,
        dense = pattern.is_dense(),
        nx = dims.nx,
        ng = dims.ng,
        nnz = pattern.nnz(),
        "Building differentiation cache"
    );

    let cache: Box<dyn DerivativeCache + 'a> = match (pattern.is_dense(), method.fd_scheme()) {
        (true, Some(scheme)) => Box::new(DenseFdCache::new(function, pattern, dims, scheme)),
        (false, Some(scheme)) => Box::new(SparseFdCache::new(function, pattern, dims, scheme)),
        (true, None) if method.is_ad() => {
            Box::new(DenseAdCache::new(function, pattern, dims, method))
        }
        (false, None) if method.is_ad() => {
            Box::new(SparseAdCache::new(function, pattern, dims, method))
        }
        (true, None) => Box::new(DenseUserCache::new(function, pattern, dims)),
        (false, None) => Box::new(SparseUserCache::new(function, pattern, dims)),
    };
    Ok(cache)
}

/// Copies `[f; g]` into `g` and returns `f`.
fn split_values(fg: &[f64], g: &mut [f64]) -> f64 {
    g.copy_from_slice(&fg[1..]);
    fg[0]
}
