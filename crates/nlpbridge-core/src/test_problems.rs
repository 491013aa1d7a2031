//! Small problems shared by unit and integration tests.

use crate::{
    error::{EvalError, EvalResult},
    function::NlpFunction,
    types::NlpScalar,
};

/// `f = x1² + x2²`, `g = x1 + x2`.
///
/// Supplies derivatives; with one constraint the dense and declared
/// `[(1,1), (1,2)]` layouts of `dg` coincide.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstrainedQuadratic;

impl NlpFunction for ConstrainedQuadratic {
    fn eval<T: NlpScalar>(&self, g: &mut [T], x: &[T]) -> EvalResult<T> {
        g[0] = x[0] + x[1];
        Ok(x[0] * x[0] + x[1] * x[1])
    }

    fn eval_with_derivatives(
        &self,
        g: &mut [f64],
        df: &mut [f64],
        dg: &mut [f64],
        x: &[f64],
    ) -> EvalResult<f64> {
        g[0] = x[0] + x[1];
        df[0] = 2.0 * x[0];
        df[1] = 2.0 * x[1];
        dg[0] = 1.0;
        dg[1] = 1.0;
        Ok(x[0] * x[0] + x[1] * x[1])
    }

    fn provides_derivatives(&self) -> bool {
        true
    }
}

/// Same values as [`ConstrainedQuadratic`] without derivatives.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDerivatives;

impl NlpFunction for NoDerivatives {
    fn eval<T: NlpScalar>(&self, g: &mut [T], x: &[T]) -> EvalResult<T> {
        ConstrainedQuadratic.eval(g, x)
    }
}

/// `f = sqrt(x1)`, no constraints, undefined for `x1 <= 0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Undefined;

impl NlpFunction for Undefined {
    fn eval<T: NlpScalar>(&self, _g: &mut [T], x: &[T]) -> EvalResult<T> {
        if x[0].re() <= 0.0 {
            return Err(EvalError::undefined("sqrt of non-positive argument"));
        }
        Ok(x[0].sqrt())
    }
}

/// `f = Σ exp(x_i)`, `g_i = x_i² - x_{i+1}` for `i < n`.
///
/// The constraint Jacobian is upper bidiagonal and colors with two colors.
#[derive(Debug, Clone, Copy, Default)]
pub struct BandedChain;

impl NlpFunction for BandedChain {
    fn eval<T: NlpScalar>(&self, g: &mut [T], x: &[T]) -> EvalResult<T> {
        for (i, gi) in g.iter_mut().enumerate() {
            *gi = x[i] * x[i] - x[i + 1];
        }
        Ok(x.iter().fold(T::from_f64(0.0), |acc, &xi| acc + xi.exp()))
    }
}

/// Rosenbrock objective with the unit-disk constraint `x1² + x2²`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskRosenbrock;

impl NlpFunction for DiskRosenbrock {
    fn eval<T: NlpScalar>(&self, g: &mut [T], x: &[T]) -> EvalResult<T> {
        let one = T::from_f64(1.0);
        let hundred = T::from_f64(100.0);
        g[0] = x[0] * x[0] + x[1] * x[1];
        let a = one - x[0];
        let b = x[1] - x[0] * x[0];
        Ok(a * a + hundred * b * b)
    }
}
