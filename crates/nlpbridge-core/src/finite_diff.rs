//! Finite-difference Jacobians of the combined `[f; g]` output.
//!
//! All routines perturb a set of columns at once. With a single column this
//! is the usual difference quotient; with all columns of one color it is a
//! compressed evaluation that [`ColumnColoring::decompress`] unpacks.
//!
//! [`ColumnColoring::decompress`]: crate::coloring::ColumnColoring::decompress

use crate::{
    coloring::ColumnColoring,
    error::EvalResult,
    function::{eval_combined, NlpFunction},
    types::Dimensions,
};
use nalgebra::DMatrix;
use num_complex::Complex64;
use num_traits::Float;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Step used by the complex-step scheme.
pub const COMPLEX_STEP: f64 = 1e-20;

/// Difference scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FdScheme {
    /// One-sided forward difference, O(h)
    Forward,
    /// Central difference, O(h²)
    Central,
    /// Complex step, exact to roundoff for analytic functions
    ComplexStep,
}

impl FdScheme {
    /// Step for a variable currently at `x`.
    ///
    /// Forward differences use `sqrt(eps)` and central differences
    /// `cbrt(eps)`, both scaled by `max(1, |x|)`.
    pub fn step_size<T: Float>(self, x: T) -> T {
        let scale = T::one().max(x.abs());
        match self {
            Self::Forward => T::epsilon().sqrt() * scale,
            Self::Central => T::epsilon().cbrt() * scale,
            Self::ComplexStep => {
                <T as num_traits::NumCast>::from(COMPLEX_STEP).unwrap_or_else(T::epsilon)
            }
        }
    }

    /// Function evaluations per perturbation direction.
    pub fn evaluations_per_direction(self) -> usize {
        match self {
            Self::Central => 2,
            Self::Forward | Self::ComplexStep => 1,
        }
    }
}

/// Scratch buffers for finite differencing.
#[derive(Debug, Clone)]
pub struct FdWorkspace {
    x_work: Vec<f64>,
    f_plus: Vec<f64>,
    f_minus: Vec<f64>,
    x_complex: Vec<Complex64>,
    f_complex: Vec<Complex64>,
    raw: Vec<f64>,
    denominators: Vec<f64>,
}

impl FdWorkspace {
    /// Allocates buffers for a problem of the given size.
    pub fn new(dims: Dimensions) -> Self {
        let nf = dims.nf();
        Self {
            x_work: vec![0.0; dims.nx],
            f_plus: vec![0.0; nf],
            f_minus: vec![0.0; nf],
            x_complex: vec![Complex64::new(0.0, 0.0); dims.nx],
            f_complex: vec![Complex64::new(0.0, 0.0); nf],
            raw: vec![0.0; nf],
            denominators: vec![1.0; dims.nx],
        }
    }

    /// Per-column denominators left by the last evaluation.
    pub fn denominators(&self) -> &[f64] {
        &self.denominators
    }
}

/// Perturbs `columns` together and stores raw differences in `work.raw`.
///
/// `fg0` holds `[f; g]` at `x`. The divisor for column `j` is written to
/// `work.denominators[j]`.
fn difference_columns<F: NlpFunction>(
    function: &F,
    x: &[f64],
    columns: &[usize],
    scheme: FdScheme,
    fg0: &[f64],
    work: &mut FdWorkspace,
) -> EvalResult<()> {
    match scheme {
        FdScheme::Forward => {
            work.x_work.copy_from_slice(x);
            for &j in columns {
                work.x_work[j] = x[j] + scheme.step_size(x[j]);
                // Use the representable step.
                work.denominators[j] = work.x_work[j] - x[j];
            }
            eval_combined(function, &mut work.f_plus, &work.x_work)?;
            for ((raw, plus), base) in work.raw.iter_mut().zip(&work.f_plus).zip(fg0) {
                *raw = plus - base;
            }
        }
        FdScheme::Central => {
            work.x_work.copy_from_slice(x);
            for &j in columns {
                work.x_work[j] = x[j] + scheme.step_size(x[j]);
            }
            eval_combined(function, &mut work.f_plus, &work.x_work)?;

            work.x_work.copy_from_slice(x);
            for &j in columns {
                work.x_work[j] = x[j] - scheme.step_size(x[j]);
            }
            eval_combined(function, &mut work.f_minus, &work.x_work)?;

            for &j in columns {
                let h = scheme.step_size(x[j]);
                work.denominators[j] = (x[j] + h) - (x[j] - h);
            }
            for ((raw, plus), minus) in work.raw.iter_mut().zip(&work.f_plus).zip(&work.f_minus) {
                *raw = plus - minus;
            }
        }
        FdScheme::ComplexStep => {
            for (xc, &xi) in work.x_complex.iter_mut().zip(x) {
                *xc = Complex64::new(xi, 0.0);
            }
            for &j in columns {
                work.x_complex[j].im = COMPLEX_STEP;
                work.denominators[j] = COMPLEX_STEP;
            }
            eval_combined(function, &mut work.f_complex, &work.x_complex)?;
            for (raw, fc) in work.raw.iter_mut().zip(&work.f_complex) {
                *raw = fc.im;
            }
        }
    }
    Ok(())
}

/// Full Jacobian of `[f; g]` at `x`, one perturbation per column.
///
/// `fg` receives the values at `x`; `jacobian` is `nf × nx` with the
/// objective gradient in row 0.
pub fn dense_jacobian<F: NlpFunction>(
    function: &F,
    x: &[f64],
    scheme: FdScheme,
    work: &mut FdWorkspace,
    fg: &mut [f64],
    jacobian: &mut DMatrix<f64>,
) -> EvalResult<()> {
    eval_combined(function, fg, x)?;
    for j in 0..x.len() {
        difference_columns(function, x, &[j], scheme, fg, work)?;
        let denominator = work.denominators[j];
        for (i, raw) in work.raw.iter().enumerate() {
            jacobian[(i, j)] = raw / denominator;
        }
    }
    Ok(())
}

/// Objective gradient at `x`, one perturbation per column.
///
/// `fg0` must already hold `[f; g]` at `x`.
pub fn objective_gradient<F: NlpFunction>(
    function: &F,
    x: &[f64],
    scheme: FdScheme,
    fg0: &[f64],
    work: &mut FdWorkspace,
    df: &mut [f64],
) -> EvalResult<()> {
    for (j, dfj) in df.iter_mut().enumerate() {
        difference_columns(function, x, &[j], scheme, fg0, work)?;
        *dfj = work.raw[0] / work.denominators[j];
    }
    Ok(())
}

/// Compressed Jacobian of `[f; g]`, one perturbation per color.
///
/// `compressed` is `nf × ncolors` and holds undivided differences; the
/// per-column divisors are left in [`FdWorkspace::denominators`].
pub fn compressed_jacobian<F: NlpFunction>(
    function: &F,
    x: &[f64],
    scheme: FdScheme,
    coloring: &ColumnColoring,
    fg0: &[f64],
    work: &mut FdWorkspace,
    compressed: &mut DMatrix<f64>,
) -> EvalResult<()> {
    for color in 0..coloring.ncolors() {
        difference_columns(function, x, coloring.columns(color), scheme, fg0, work)?;
        compressed.column_mut(color).copy_from_slice(&work.raw);
    }
    Ok(())
}
