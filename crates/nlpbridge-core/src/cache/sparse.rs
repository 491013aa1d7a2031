//! Sparse strategies: colored compression of the constraint Jacobian.
//!
//! The objective gradient is always dense and is computed column by column
//! with finite differences. Constraint derivatives come from one sweep or
//! perturbation per color and are scattered back in declared order.

use super::{dense::user_evaluate, split_values, DerivativeCache, DifferentiationMethod};
use crate::{
    coloring::ColumnColoring,
    error::EvalResult,
    finite_diff::{self, FdScheme, FdWorkspace},
    forward_ad::{self, DualWorkspace},
    function::{eval_combined, NlpFunction},
    sparsity::SparsityPattern,
    types::Dimensions,
};
use nalgebra::DMatrix;

/// Forward-mode AD with colored seeding.
///
/// Constraint Jacobian: one dual sweep per color. Objective gradient:
/// forward differences.
#[derive(Debug)]
pub struct SparseAdCache<F> {
    function: F,
    pattern: SparsityPattern,
    dims: Dimensions,
    method: DifferentiationMethod,
    coloring: ColumnColoring,
    dual_work: DualWorkspace,
    fd_work: FdWorkspace,
    fg: Vec<f64>,
    compressed: DMatrix<f64>,
    unit: Vec<f64>,
}

impl<F: NlpFunction> SparseAdCache<F> {
    /// Creates the cache and colors the pattern.
    pub fn new(
        function: F,
        pattern: SparsityPattern,
        dims: Dimensions,
        method: DifferentiationMethod,
    ) -> Self {
        let coloring = pattern.column_coloring();
        tracing::debug!(
            component = "cache",
            operation = "color",
            ncolors = coloring.ncolors(),
            nx = dims.nx,
            "Colored constraint Jacobian"
        );
        Self {
            function,
            dims,
            method,
            dual_work: DualWorkspace::new(dims),
            fd_work: FdWorkspace::new(dims),
            fg: vec![0.0; dims.nf()],
            compressed: DMatrix::zeros(dims.nf(), coloring.ncolors()),
            unit: vec![1.0; dims.nx],
            coloring,
            pattern,
        }
    }

    /// Column coloring in use.
    pub fn coloring(&self) -> &ColumnColoring {
        &self.coloring
    }
}

impl<F: NlpFunction> DerivativeCache for SparseAdCache<F> {
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
        if !need_derivatives {
            eval_combined(&self.function, &mut self.fg, x)?;
            return Ok(split_values(&self.fg, g));
        }

        forward_ad::compressed_jacobian(
            &self.function,
            x,
            &self.coloring,
            &mut self.dual_work,
            &mut self.fg,
            &mut self.compressed,
        )?;
        finite_diff::objective_gradient(
            &self.function,
            x,
            FdScheme::Forward,
            &self.fg,
            &mut self.fd_work,
            df,
        )?;
        self.coloring
            .decompress(&self.pattern, &self.compressed, 1, &self.unit, dg);
        Ok(split_values(&self.fg, g))
    }
}

/// Finite differences with colored perturbation.
///
/// The objective gradient uses the same scheme, one column at a time.
#[derive(Debug)]
pub struct SparseFdCache<F> {
    function: F,
    pattern: SparsityPattern,
    dims: Dimensions,
    scheme: FdScheme,
    coloring: ColumnColoring,
    work: FdWorkspace,
    fg: Vec<f64>,
    compressed: DMatrix<f64>,
}

impl<F: NlpFunction> SparseFdCache<F> {
    /// Creates the cache and colors the pattern.
    pub fn new(function: F, pattern: SparsityPattern, dims: Dimensions, scheme: FdScheme) -> Self {
        let coloring = pattern.column_coloring();
        tracing::debug!(
            component = "cache",
            operation = "color",
            ncolors = coloring.ncolors(),
            nx = dims.nx,
            "Colored constraint Jacobian"
        );
        Self {
            function,
            dims,
            scheme,
            work: FdWorkspace::new(dims),
            fg: vec![0.0; dims.nf()],
            compressed: DMatrix::zeros(dims.nf(), coloring.ncolors()),
            coloring,
            pattern,
        }
    }

    /// Column coloring in use.
    pub fn coloring(&self) -> &ColumnColoring {
        &self.coloring
    }
}

impl<F: NlpFunction> DerivativeCache for SparseFdCache<F> {
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
        eval_combined(&self.function, &mut self.fg, x)?;
        if need_derivatives {
            finite_diff::objective_gradient(
                &self.function,
                x,
                self.scheme,
                &self.fg,
                &mut self.work,
                df,
            )?;
            finite_diff::compressed_jacobian(
                &self.function,
                x,
                self.scheme,
                &self.coloring,
                &self.fg,
                &mut self.work,
                &mut self.compressed,
            )?;
            self.coloring.decompress(
                &self.pattern,
                &self.compressed,
                1,
                self.work.denominators(),
                dg,
            );
        }
        Ok(split_values(&self.fg, g))
    }
}

/// Pass-through to user derivatives, `dg` in declared order.
#[derive(Debug)]
pub struct SparseUserCache<F> {
    function: F,
    pattern: SparsityPattern,
    dims: Dimensions,
}

impl<F: NlpFunction> SparseUserCache<F> {
    /// Creates the cache.
    pub fn new(function: F, pattern: SparsityPattern, dims: Dimensions) -> Self {
        Self {
            function,
            pattern,
            dims,
        }
    }
}

impl<F: NlpFunction> DerivativeCache for SparseUserCache<F> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;
    use crate::function::CountingFunction;
    use crate::test_problems::{BandedChain, ConstrainedQuadratic};
    use approx::assert_relative_eq;

    fn banded_pattern(n: usize) -> SparsityPattern {
        // Declared row by row, which is not column-major.
        let mut rows = Vec::new();
        let mut cols = Vec::new();
        for i in 1..n {
            rows.extend([i, i]);
            cols.extend([i, i + 1]);
        }
        SparsityPattern::from_coordinates(rows, cols, n - 1, n).unwrap()
    }

    fn expected_values(pattern: &SparsityPattern, x: &[f64]) -> Vec<f64> {
        pattern
            .iter()
            .map(|(r, c)| if r == c { 2.0 * x[c - 1] } else { -1.0 })
            .collect()
    }

    #[test]
    fn test_sparse_ad_declared_order() {
        let n = 8;
        let pattern = banded_pattern(n);
        let dims = Dimensions::new(n, n - 1);
        let x: Vec<f64> = (0..n).map(|i| 0.25 * i as f64 + 0.1).collect();

        let counting = CountingFunction::new(BandedChain);
        let mut cache = SparseAdCache::new(
            &counting,
            pattern.clone(),
            dims,
            DifferentiationMethod::ForwardAD,
        );
        assert_eq!(cache.coloring().ncolors(), 2);

        let mut g = vec![0.0; n - 1];
        let mut df = vec![0.0; n];
        let mut dg = vec![0.0; cache.jacobian_len()];
        cache.evaluate(&x, &mut g, &mut df, &mut dg, true).unwrap();

        assert_eq!(counting.counts().dual, 2);
        for (value, expected) in dg.iter().zip(expected_values(&pattern, &x)) {
            assert_relative_eq!(*value, expected, epsilon = 1e-14);
        }
        for (dfj, xj) in df.iter().zip(&x) {
            assert_relative_eq!(*dfj, xj.exp(), epsilon = 1e-6, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_sparse_fd_matches_dense_with_fewer_evaluations() {
        let n = 10;
        let pattern = banded_pattern(n);
        let dims = Dimensions::new(n, n - 1);
        let x: Vec<f64> = (0..n).map(|i| 0.1 * i as f64 - 0.45).collect();

        for scheme in [FdScheme::Forward, FdScheme::Central, FdScheme::ComplexStep] {
            let counting = CountingFunction::new(BandedChain);
            let mut cache = SparseFdCache::new(&counting, pattern.clone(), dims, scheme);

            let mut g = vec![0.0; n - 1];
            let mut df = vec![0.0; n];
            let mut dg = vec![0.0; pattern.nnz()];
            cache.evaluate(&x, &mut g, &mut df, &mut dg, true).unwrap();

            let per_direction = scheme.evaluations_per_direction();
            let counts = counting.counts();
            let colored_calls = (n + cache.coloring().ncolors()) * per_direction;
            assert_eq!(counts.real + counts.complex, 1 + colored_calls);
            assert!(cache.coloring().ncolors() < n);

            for (value, expected) in dg.iter().zip(expected_values(&pattern, &x)) {
                assert_relative_eq!(*value, expected, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_shuffled_declaration_order() {
        let pattern =
            SparsityPattern::from_coordinates(vec![2, 1, 2, 1], vec![3, 2, 2, 1], 2, 3).unwrap();
        let dims = Dimensions::new(3, 2);
        let x = [0.5, 1.5, 2.5];

        let mut cache =
            SparseFdCache::new(BandedChain, pattern.clone(), dims, FdScheme::ComplexStep);
        let mut g = [0.0; 2];
        let mut df = [0.0; 3];
        let mut dg = [0.0; 4];
        cache.evaluate(&x, &mut g, &mut df, &mut dg, true).unwrap();

        assert_relative_eq!(dg[0], -1.0, epsilon = 1e-12);
        assert_relative_eq!(dg[1], -1.0, epsilon = 1e-12);
        assert_relative_eq!(dg[2], 3.0, epsilon = 1e-12);
        assert_relative_eq!(dg[3], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sparse_user_passthrough() {
        let pattern = SparsityPattern::from_coordinates(vec![1, 1], vec![1, 2], 1, 2).unwrap();
        let counting = CountingFunction::new(ConstrainedQuadratic);
        let mut cache = SparseUserCache::new(&counting, pattern, Dimensions::new(2, 1));

        let mut g = [0.0];
        let mut df = [0.0; 2];
        let mut dg = [0.0; 2];
        let f = cache.evaluate(&[1.0, -2.0], &mut g, &mut df, &mut dg, true).unwrap();

        assert_relative_eq!(f, 5.0);
        assert_eq!(df, [2.0, -4.0]);
        assert_eq!(dg, [1.0, 1.0]);
        assert_eq!(counting.counts().derivatives, 1);
        assert_eq!(counting.counts().real, 0);
    }

    #[test]
    fn test_non_finite_jacobian_is_reported() {
        struct Kink;
        impl NlpFunction for Kink {
            fn eval<T: crate::types::NlpScalar>(&self, g: &mut [T], x: &[T]) -> EvalResult<T> {
                g[0] = x[0].sqrt();
                Ok(x[0])
            }
        }

        let pattern = SparsityPattern::from_coordinates(vec![1], vec![1], 1, 1).unwrap();
        let mut cache = SparseAdCache::new(
            Kink,
            pattern,
            Dimensions::new(1, 1),
            DifferentiationMethod::ForwardAD,
        );
        let mut g = [0.0];
        let mut df = [0.0];
        let mut dg = [0.0];
        let err = cache.evaluate(&[0.0], &mut g, &mut df, &mut dg, true).unwrap_err();
        assert!(matches!(err, EvalError::NonFinite { .. }));

        assert!(cache.evaluate(&[4.0], &mut g, &mut df, &mut dg, true).is_ok());
        assert_relative_eq!(dg[0], 0.25);
    }
}
