//! User function interface.
//!
//! A problem is described by one combined evaluation that returns the
//! objective and writes the constraint values in place. The evaluation is
//! generic over [`NlpScalar`] so that the same code serves finite
//! differencing, forward-mode AD and the complex-step scheme.

use crate::{
    error::{EvalError, EvalResult},
    types::NlpScalar,
};
use std::cell::Cell;

/// Objective and constraint evaluation.
///
/// # Example
///
/// ```
/// use nlpbridge_core::prelude::*;
///
/// struct Circle;
///
/// impl NlpFunction for Circle {
///     fn eval<T: NlpScalar>(&self, g: &mut [T], x: &[T]) -> EvalResult<T> {
///         g[0] = x[0] * x[0] + x[1] * x[1];
///         Ok(x[0] + x[1])
///     }
/// }
/// ```
pub trait NlpFunction {
    /// Evaluates the objective, writing constraint values into `g`.
    ///
    /// `g` has length ng and `x` has length nx. Return an
    /// [`EvalError::Undefined`] when the function has no value at `x`.
    fn eval<T: NlpScalar>(&self, g: &mut [T], x: &[T]) -> EvalResult<T>;

    /// Evaluates values and analytic derivatives in one call.
    ///
    /// `df` receives the objective gradient (length nx). `dg` receives the
    /// constraint Jacobian either dense column-major (`ng * nx` entries) or
    /// one value per declared sparsity entry in declaration order, matching
    /// the pattern the cache was built with.
    ///
    /// # Default Implementation
    ///
    /// Returns [`EvalError::DerivativesNotProvided`].
    fn eval_with_derivatives(
        &self,
        _g: &mut [f64],
        _df: &mut [f64],
        _dg: &mut [f64],
        _x: &[f64],
    ) -> EvalResult<f64> {
        Err(EvalError::DerivativesNotProvided)
    }

    /// Whether [`NlpFunction::eval_with_derivatives`] is implemented.
    fn provides_derivatives(&self) -> bool {
        false
    }
}

impl<F: NlpFunction + ?Sized> NlpFunction for &F {
    fn eval<T: NlpScalar>(&self, g: &mut [T], x: &[T]) -> EvalResult<T> {
        (**self).eval(g, x)
    }

    fn eval_with_derivatives(
        &self,
        g: &mut [f64],
        df: &mut [f64],
        dg: &mut [f64],
        x: &[f64],
    ) -> EvalResult<f64> {
        (**self).eval_with_derivatives(g, df, dg, x)
    }

    fn provides_derivatives(&self) -> bool {
        (**self).provides_derivatives()
    }
}

/// Evaluates `[f; g]` into `fg` and rejects non-finite output.
pub(crate) fn eval_combined<F, T>(function: &F, fg: &mut [T], x: &[T]) -> EvalResult<()>
where
    F: NlpFunction,
    T: NlpScalar,
{
    let (head, g) = fg.split_at_mut(1);
    head[0] = function.eval(g, x)?;
    check_finite(fg, "function")
}

/// Returns an error naming the first non-finite entry.
pub(crate) fn check_finite<T: NlpScalar>(values: &[T], quantity: &'static str) -> EvalResult<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(EvalError::non_finite(quantity, index)),
        None => Ok(()),
    }
}

/// Wrapper to count function evaluations for testing and debugging.
///
/// Evaluations are counted per scalar type so tests can tell which engine
/// a differentiation strategy actually used.
#[derive(Debug)]
pub struct CountingFunction<F> {
    /// The underlying function
    pub inner: F,
    real_count: Cell<usize>,
    dual_count: Cell<usize>,
    complex_count: Cell<usize>,
    derivative_count: Cell<usize>,
}

/// Snapshot of [`CountingFunction`] counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationCounts {
    /// Plain `f64` evaluations
    pub real: usize,
    /// Dual-number evaluations
    pub dual: usize,
    /// Complex-step evaluations
    pub complex: usize,
    /// User derivative evaluations
    pub derivatives: usize,
}

impl EvaluationCounts {
    /// Total number of calls into the wrapped function.
    pub fn total(&self) -> usize {
        self.real + self.dual + self.complex + self.derivatives
    }
}

impl<F> CountingFunction<F> {
    /// Creates a new counting wrapper around a function.
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            real_count: Cell::new(0),
            dual_count: Cell::new(0),
            complex_count: Cell::new(0),
            derivative_count: Cell::new(0),
        }
    }

    /// Resets all counters to zero.
    pub fn reset_counts(&self) {
        self.real_count.set(0);
        self.dual_count.set(0);
        self.complex_count.set(0);
        self.derivative_count.set(0);
    }

    /// Returns the current evaluation counts.
    pub fn counts(&self) -> EvaluationCounts {
        EvaluationCounts {
            real: self.real_count.get(),
            dual: self.dual_count.get(),
            complex: self.complex_count.get(),
            derivatives: self.derivative_count.get(),
        }
    }
}

impl<F: NlpFunction> NlpFunction for CountingFunction<F> {
    fn eval<T: NlpScalar>(&self, g: &mut [T], x: &[T]) -> EvalResult<T> {
        let id = std::any::TypeId::of::<T>();
        let counter = if id == std::any::TypeId::of::<f64>() {
            &self.real_count
        } else if id == std::any::TypeId::of::<num_dual::Dual64>() {
            &self.dual_count
        } else {
            &self.complex_count
        };
        counter.set(counter.get() + 1);
        self.inner.eval(g, x)
    }

    fn eval_with_derivatives(
        &self,
        g: &mut [f64],
        df: &mut [f64],
        dg: &mut [f64],
        x: &[f64],
    ) -> EvalResult<f64> {
        self.derivative_count.set(self.derivative_count.get() + 1);
        self.inner.eval_with_derivatives(g, df, dg, x)
    }

    fn provides_derivatives(&self) -> bool {
        self.inner.provides_derivatives()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use num_dual::Dual64;

    struct Paraboloid;

    impl NlpFunction for Paraboloid {
        fn eval<T: NlpScalar>(&self, g: &mut [T], x: &[T]) -> EvalResult<T> {
            g[0] = x[0] + x[1];
            Ok(x[0] * x[0] + x[1] * x[1])
        }
    }

    struct LogBarrier;

    impl NlpFunction for LogBarrier {
        fn eval<T: NlpScalar>(&self, _g: &mut [T], x: &[T]) -> EvalResult<T> {
            if x[0].re() <= 0.0 {
                return Err(EvalError::undefined("log of non-positive argument"));
            }
            Ok(-x[0].ln())
        }
    }

    #[test]
    fn test_eval_combined_layout() {
        let mut fg = [0.0; 2];
        eval_combined(&Paraboloid, &mut fg, &[1.0, 2.0]).unwrap();
        assert_relative_eq!(fg[0], 5.0);
        assert_relative_eq!(fg[1], 3.0);
    }

    #[test]
    fn test_eval_combined_rejects_nan() {
        struct NanFunction;
        impl NlpFunction for NanFunction {
            fn eval<T: NlpScalar>(&self, g: &mut [T], _x: &[T]) -> EvalResult<T> {
                g[0] = T::from_f64(f64::NAN);
                Ok(T::from_f64(1.0))
            }
        }

        let mut fg = [0.0; 2];
        let err = eval_combined(&NanFunction, &mut fg, &[0.0]).unwrap_err();
        assert_eq!(err, EvalError::non_finite("function", 1));
    }

    #[test]
    fn test_undefined_propagates() {
        let mut fg = [0.0; 1];
        let err = eval_combined(&LogBarrier, &mut fg, &[-1.0]).unwrap_err();
        assert!(matches!(err, EvalError::Undefined { .. }));
    }

    #[test]
    fn test_default_derivatives_missing() {
        let mut g = [0.0];
        let mut df = [0.0; 2];
        let mut dg = [0.0; 2];
        let err = Paraboloid
            .eval_with_derivatives(&mut g, &mut df, &mut dg, &[1.0, 1.0])
            .unwrap_err();
        assert_eq!(err, EvalError::DerivativesNotProvided);
        assert!(!Paraboloid.provides_derivatives());
    }

    #[test]
    fn test_counting_function() {
        let counting = CountingFunction::new(Paraboloid);
        assert_eq!(counting.counts(), EvaluationCounts::default());

        let mut g = [0.0];
        counting.eval(&mut g, &[1.0, 1.0]).unwrap();

        let mut gd = [Dual64::from_f64(0.0)];
        let xd = [Dual64::new(1.0, 1.0), Dual64::new(1.0, 0.0)];
        counting.eval(&mut gd, &xd).unwrap();

        let counts = counting.counts();
        assert_eq!(counts.real, 1);
        assert_eq!(counts.dual, 1);
        assert_eq!(counts.complex, 0);
        assert_eq!(counts.total(), 2);

        counting.reset_counts();
        assert_eq!(counting.counts().total(), 0);
    }

    #[test]
    fn test_reference_forwarding() {
        let counting = CountingFunction::new(Paraboloid);
        let by_ref = &counting;
        let mut g = [0.0];
        by_ref.eval(&mut g, &[2.0, 0.0]).unwrap();
        assert_eq!(counting.counts().real, 1);
    }
}
