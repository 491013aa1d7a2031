//! Forward-mode AD sweeps with `num_dual::Dual64`.
//!
//! A sweep seeds a set of columns with unit tangents and evaluates `[f; g]`
//! once. One column per sweep gives a Jacobian column; every column of one
//! color gives a compressed column.

use crate::{
    coloring::ColumnColoring,
    error::EvalResult,
    function::{eval_combined, NlpFunction},
    types::Dimensions,
};
use nalgebra::DMatrix;
use num_dual::Dual64;

/// Dual-number scratch buffers.
#[derive(Debug, Clone)]
pub struct DualWorkspace {
    x_dual: Vec<Dual64>,
    f_dual: Vec<Dual64>,
}

impl DualWorkspace {
    /// Allocates buffers for a problem of the given size.
    pub fn new(dims: Dimensions) -> Self {
        Self {
            x_dual: vec![Dual64::new(0.0, 0.0); dims.nx],
            f_dual: vec![Dual64::new(0.0, 0.0); dims.nf()],
        }
    }

    /// Primal values of `[f; g]` from the last sweep.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.f_dual.iter().map(|v| v.re)
    }

    /// Tangents of `[f; g]` from the last sweep.
    pub fn tangents(&self) -> impl Iterator<Item = f64> + '_ {
        self.f_dual.iter().map(|v| v.eps)
    }
}

/// Evaluates `[f; g]` with unit tangents on `columns`.
pub fn seeded_sweep<F: NlpFunction>(
    function: &F,
    x: &[f64],
    columns: &[usize],
    work: &mut DualWorkspace,
) -> EvalResult<()> {
    for (xd, &xi) in work.x_dual.iter_mut().zip(x) {
        *xd = Dual64::new(xi, 0.0);
    }
    for &j in columns {
        work.x_dual[j].eps = 1.0;
    }
    eval_combined(function, &mut work.f_dual, &work.x_dual)
}

/// Full Jacobian of `[f; g]`, one sweep per column.
///
/// `fg` receives the primal values; `jacobian` is `nf × nx`.
pub fn dense_jacobian<F: NlpFunction>(
    function: &F,
    x: &[f64],
    work: &mut DualWorkspace,
    fg: &mut [f64],
    jacobian: &mut DMatrix<f64>,
) -> EvalResult<()> {
    if x.is_empty() {
        return eval_combined(function, fg, x);
    }
    for j in 0..x.len() {
        seeded_sweep(function, x, &[j], work)?;
        for (i, tangent) in work.tangents().enumerate() {
            jacobian[(i, j)] = tangent;
        }
    }
    for (out, value) in fg.iter_mut().zip(work.values()) {
        *out = value;
    }
    Ok(())
}

/// Compressed Jacobian of `[f; g]`, one sweep per color.
///
/// `fg` receives the primal values; `compressed` is `nf × ncolors`.
pub fn compressed_jacobian<F: NlpFunction>(
    function: &F,
    x: &[f64],
    coloring: &ColumnColoring,
    work: &mut DualWorkspace,
    fg: &mut [f64],
    compressed: &mut DMatrix<f64>,
) -> EvalResult<()> {
    if coloring.ncolors() == 0 {
        return eval_combined(function, fg, x);
    }
    for color in 0..coloring.ncolors() {
        seeded_sweep(function, x, coloring.columns(color), work)?;
        for (i, tangent) in work.tangents().enumerate() {
            compressed[(i, color)] = tangent;
        }
    }
    for (out, value) in fg.iter_mut().zip(work.values()) {
        *out = value;
    }
    Ok(())
}
