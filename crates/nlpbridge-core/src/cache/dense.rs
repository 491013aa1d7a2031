//! Dense strategies: full `nf × nx` Jacobian per evaluation.

use super::{split_values, DerivativeCache, DifferentiationMethod};
use crate::{
    error::EvalResult,
    finite_diff::{self, FdScheme, FdWorkspace},
    forward_ad::{self, DualWorkspace},
    function::{check_finite, eval_combined, NlpFunction},
    sparsity::SparsityPattern,
    types::Dimensions,
};
use nalgebra::DMatrix;

/// Splits a full `[f; g]` Jacobian into `df` and column-major `dg`.
fn scatter_dense(jacobian: &DMatrix<f64>, ng: usize, df: &mut [f64], dg: &mut [f64]) {
    for (j, dfj) in df.iter_mut().enumerate() {
        *dfj = jacobian[(0, j)];
        for i in 0..ng {
            dg[j * ng + i] = jacobian[(i + 1, j)];
        }
    }
}

/// Forward-mode AD over the full Jacobian, one dual sweep per column.
#[derive(Debug)]
pub struct DenseAdCache<F> {
    function: F,
    pattern: SparsityPattern,
    dims: Dimensions,
    method: DifferentiationMethod,
    work: DualWorkspace,
    fg: Vec<f64>,
    jacobian: DMatrix<f64>,
}

impl<F: NlpFunction> DenseAdCache<F> {
    /// Creates the cache; `method` is recorded as requested.
    pub fn new(
        function: F,
        pattern: SparsityPattern,
        dims: Dimensions,
        method: DifferentiationMethod,
    ) -> Self {
        Self {
            function,
            pattern,
            dims,
            method,
            work: DualWorkspace::new(dims),
            fg: vec![0.0; dims.nf()],
            jacobian: DMatrix::zeros(dims.nf(), dims.nx),
        }
    }
}

impl<F: NlpFunction> DerivativeCache for DenseAdCache<F> {
    fn method(&self) -> DifferentiationMethod {
        self.method
    }

    fn dimensions(&self) -> Dimensions {
        self.dims
    }

    fn pattern(&self) -> &SparsityPattern {
        &self.pattern
    }

    fn evaluate(
        &mut self,
        x: &[f64],
        g: &mut [f64],
        df: &mut [f64],
        dg: &mut [f64],
        need_derivatives: bool,
    ) -> EvalResult<f64> {
        if need_derivatives {
            forward_ad::dense_jacobian(
                &self.function,
                x,
                &mut self.work,
                &mut self.fg,
                &mut self.jacobian,
            )?;
            scatter_dense(&self.jacobian, self.dims.ng, df, dg);
        } else {
            eval_combined(&self.function, &mut self.fg, x)?;
        }
        Ok(split_values(&self.fg, g))
    }
}

/// Finite differences over the full Jacobian.
#[derive(Debug)]
pub struct DenseFdCache<F> {
    function: F,
    pattern: SparsityPattern,
    dims: Dimensions,
    scheme: FdScheme,
    work: FdWorkspace,
    fg: Vec<f64>,
    jacobian: DMatrix<f64>,
}

impl<F: NlpFunction> DenseFdCache<F> {
    /// Creates the cache for a difference scheme.
    pub fn new(function: F, pattern: SparsityPattern, dims: Dimensions, scheme: FdScheme) -> Self {
        Self {
            function,
            pattern,
            dims,
            scheme,
            work: FdWorkspace::new(dims),
            fg: vec![0.0; dims.nf()],
            jacobian: DMatrix::zeros(dims.nf(), dims.nx),
        }
    }

    /// Difference scheme in use.
    pub fn scheme(&self) -> FdScheme {
        self.scheme
    }
}

impl<F: NlpFunction> DerivativeCache for DenseFdCache<F> {
    fn method(&self) -> DifferentiationMethod {
        match self.scheme {
            FdScheme::Forward => DifferentiationMethod::ForwardFD,
            FdScheme::Central => DifferentiationMethod::CentralFD,
            FdScheme::ComplexStep => DifferentiationMethod::ComplexStep,
        }
    }

    fn dimensions(&self) -> Dimensions {
        self.dims
    }

    fn pattern(&self) -> &SparsityPattern {
        &self.pattern
    }

    fn evaluate(
        &mut self,
        x: &[f64],
        g: &mut [f64],
        df: &mut [f64],
        dg: &mut [f64],
        need_derivatives: bool,
    ) -> EvalResult<f64> {
        if need_derivatives {
            finite_diff::dense_jacobian(
                &self.function,
                x,
                self.scheme,
                &mut self.work,
                &mut self.fg,
                &mut self.jacobian,
            )?;
            scatter_dense(&self.jacobian, self.dims.ng, df, dg);
        } else {
            eval_combined(&self.function, &mut self.fg, x)?;
        }
        Ok(split_values(&self.fg, g))
    }
}

/// Pass-through to user derivatives, dense `dg`.
#[derive(Debug)]
pub struct DenseUserCache<F> {
    function: F,
    pattern: SparsityPattern,
    dims: Dimensions,
}

impl<F: NlpFunction> DenseUserCache<F> {
    /// Creates the cache.
    pub fn new(function: F, pattern: SparsityPattern, dims: Dimensions) -> Self {
        Self {
            function,
            pattern,
            dims,
        }
    }
}

impl<F: NlpFunction> DerivativeCache for DenseUserCache<F> {
    fn method(&self) -> DifferentiationMethod {
        DifferentiationMethod::UserDeriv
    }

    fn dimensions(&self) -> Dimensions {
        self.dims
    }

    fn pattern(&self) -> &SparsityPattern {
        &self.pattern
    }

    fn evaluate(
        &mut self,
        x: &[f64],
        g: &mut [f64],
        df: &mut [f64],
        dg: &mut [f64],
        need_derivatives: bool,
    ) -> EvalResult<f64> {
        user_evaluate(&self.function, x, g, df, dg, need_derivatives)
    }
}

/// Shared by the dense and sparse user strategies.
pub(super) fn user_evaluate<F: NlpFunction>(
    function: &F,
    x: &[f64],
    g: &mut [f64],
    df: &mut [f64],
    dg: &mut [f64],
    need_derivatives: bool,
) -> EvalResult<f64> {
    let f = if need_derivatives {
        let f = function.eval_with_derivatives(g, df, dg, x)?;
        check_finite(df, "gradient")?;
        check_finite(dg, "jacobian")?;
        f
    } else {
        function.eval(g, x)?
    };
    check_finite(&[f], "objective")?;
    check_finite(g, "constraint")?;
    Ok(f)
}
