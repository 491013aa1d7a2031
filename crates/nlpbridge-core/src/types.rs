//! Scalar abstraction, problem dimensions and bounds.
//!
//! User functions are written once against [`NlpScalar`] and then evaluated
//! with plain `f64`, forward-mode dual numbers (`num_dual::Dual64`) or
//! complex numbers (`num_complex::Complex64`) depending on the
//! differentiation method.

use crate::error::{NlpError, Result};
use num_complex::Complex64;
use num_dual::{Dual64, DualNum};
use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Neg, Sub};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Trait for scalar types a user function can be evaluated with.
///
/// Only analytic operations are offered so that the complex-step scheme
/// stays valid; branch on [`NlpScalar::re`] when a comparison is needed.
pub trait NlpScalar:
    Copy
    + Debug
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + 'static
{
    /// Lift a constant.
    fn from_f64(value: f64) -> Self;

    /// Real (primal) part.
    fn re(&self) -> f64;

    /// True when every component is finite.
    fn is_finite(&self) -> bool;

    /// Square root.
    fn sqrt(self) -> Self;

    /// Exponential.
    fn exp(self) -> Self;

    /// Natural logarithm.
    fn ln(self) -> Self;

    /// Sine.
    fn sin(self) -> Self;

    /// Cosine.
    fn cos(self) -> Self;

    /// Integer power.
    fn powi(self, n: i32) -> Self;

    /// Real power.
    fn powf(self, n: f64) -> Self;
}

impl NlpScalar for f64 {
    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn re(&self) -> f64 {
        *self
    }

    #[inline]
    fn is_finite(&self) -> bool {
        f64::is_finite(*self)
    }

    #[inline]
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }

    #[inline]
    fn exp(self) -> Self {
        f64::exp(self)
    }

    #[inline]
    fn ln(self) -> Self {
        f64::ln(self)
    }

    #[inline]
    fn sin(self) -> Self {
        f64::sin(self)
    }

    #[inline]
    fn cos(self) -> Self {
        f64::cos(self)
    }

    #[inline]
    fn powi(self, n: i32) -> Self {
        f64::powi(self, n)
    }

    #[inline]
    fn powf(self, n: f64) -> Self {
        f64::powf(self, n)
    }
}

impl NlpScalar for Dual64 {
    #[inline]
    fn from_f64(value: f64) -> Self {
        Dual64::new(value, 0.0)
    }

    #[inline]
    fn re(&self) -> f64 {
        self.re
    }

    #[inline]
    fn is_finite(&self) -> bool {
        self.re.is_finite() && self.eps.is_finite()
    }

    #[inline]
    fn sqrt(self) -> Self {
        <Dual64 as DualNum<f64>>::sqrt(&self)
    }

    #[inline]
    fn exp(self) -> Self {
        <Dual64 as DualNum<f64>>::exp(&self)
    }

    #[inline]
    fn ln(self) -> Self {
        <Dual64 as DualNum<f64>>::ln(&self)
    }

    #[inline]
    fn sin(self) -> Self {
        <Dual64 as DualNum<f64>>::sin(&self)
    }

    #[inline]
    fn cos(self) -> Self {
        <Dual64 as DualNum<f64>>::cos(&self)
    }

    #[inline]
    fn powi(self, n: i32) -> Self {
        <Dual64 as DualNum<f64>>::powi(&self, n)
    }

    #[inline]
    fn powf(self, n: f64) -> Self {
        <Dual64 as DualNum<f64>>::powf(&self, n)
    }
}

impl NlpScalar for Complex64 {
    #[inline]
    fn from_f64(value: f64) -> Self {
        Complex64::new(value, 0.0)
    }

    #[inline]
    fn re(&self) -> f64 {
        self.re
    }

    #[inline]
    fn is_finite(&self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }

    #[inline]
    fn sqrt(self) -> Self {
        Complex64::sqrt(self)
    }

    #[inline]
    fn exp(self) -> Self {
        Complex64::exp(self)
    }

    #[inline]
    fn ln(self) -> Self {
        Complex64::ln(self)
    }

    #[inline]
    fn sin(self) -> Self {
        Complex64::sin(self)
    }

    #[inline]
    fn cos(self) -> Self {
        Complex64::cos(self)
    }

    #[inline]
    fn powi(self, n: i32) -> Self {
        Complex64::powi(&self, n)
    }

    #[inline]
    fn powf(self, n: f64) -> Self {
        Complex64::powf(self, n)
    }
}

/// Problem dimensions.
///
/// `nf = ng + 1` rows: the objective occupies row 1, constraints follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Dimensions {
    /// Number of variables
    pub nx: usize,
    /// Number of constraints
    pub ng: usize,
}

impl Dimensions {
    /// Creates a new dimension record.
    pub fn new(nx: usize, ng: usize) -> Self {
        Self { nx, ng }
    }

    /// Number of function rows (objective plus constraints).
    #[inline]
    pub fn nf(&self) -> usize {
        self.ng + 1
    }

    /// Length of a dense constraint Jacobian buffer.
    #[inline]
    pub fn dense_jacobian_len(&self) -> usize {
        self.ng * self.nx
    }
}

/// Variable and constraint bounds.
///
/// Infinite bounds are expressed with `f64::INFINITY`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bounds {
    /// Variable lower bounds (length nx)
    pub x_lower: Vec<f64>,
    /// Variable upper bounds (length nx)
    pub x_upper: Vec<f64>,
    /// Constraint lower bounds (length ng)
    pub g_lower: Vec<f64>,
    /// Constraint upper bounds (length ng)
    pub g_upper: Vec<f64>,
}

impl Bounds {
    /// Creates bounds from explicit vectors.
    pub fn new(x_lower: Vec<f64>, x_upper: Vec<f64>, g_lower: Vec<f64>, g_upper: Vec<f64>) -> Self {
        Self {
            x_lower,
            x_upper,
            g_lower,
            g_upper,
        }
    }

    /// Free variables and constraints.
    pub fn unbounded(dims: Dimensions) -> Self {
        Self {
            x_lower: vec![f64::NEG_INFINITY; dims.nx],
            x_upper: vec![f64::INFINITY; dims.nx],
            g_lower: vec![f64::NEG_INFINITY; dims.ng],
            g_upper: vec![f64::INFINITY; dims.ng],
        }
    }

    /// Checks lengths and ordering against the problem dimensions.
    pub fn validate(&self, dims: Dimensions) -> Result<()> {
        let checks = [
            ("x_lower", &self.x_lower, dims.nx),
            ("x_upper", &self.x_upper, dims.nx),
            ("g_lower", &self.g_lower, dims.ng),
            ("g_upper", &self.g_upper, dims.ng),
        ];
        for (what, values, expected) in checks {
            if values.len() != expected {
                return Err(NlpError::dimension_mismatch(what, expected, values.len()));
            }
        }

        let crossed = self
            .x_lower
            .iter()
            .zip(&self.x_upper)
            .chain(self.g_lower.iter().zip(&self.g_upper))
            .position(|(lo, up)| lo > up || lo.is_nan() || up.is_nan());
        if let Some(index) = crossed {
            return Err(NlpError::invalid_configuration(
                "bounds",
                format!("lower bound exceeds upper bound at position {index}"),
            ));
        }
        Ok(())
    }
}
