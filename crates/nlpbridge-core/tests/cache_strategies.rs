//! Cross-strategy agreement for the differentiation caches.

use approx::assert_relative_eq;
use nalgebra::DMatrix;
use nlpbridge_core::prelude::*;

/// Three variables, two constraints with a sparse Jacobian.
///
/// f  = x1 x2 + exp(x3)
/// g1 = sin(x1) + x2²
/// g2 = x3³
struct Mixed;

impl NlpFunction for Mixed {
    fn eval<T: NlpScalar>(&self, g: &mut [T], x: &[T]) -> EvalResult<T> {
        g[0] = x[0].sin() + x[1] * x[1];
        g[1] = x[2].powi(3);
        Ok(x[0] * x[1] + x[2].exp())
    }
}

fn exact_jacobian(x: &[f64]) -> (Vec<f64>, DMatrix<f64>) {
    let df = vec![x[1], x[0], x[2].exp()];
    let mut dg = DMatrix::zeros(2, 3);
    dg[(0, 0)] = x[0].cos();
    dg[(0, 1)] = 2.0 * x[1];
    dg[(1, 2)] = 3.0 * x[2] * x[2];
    (df, dg)
}

fn tolerance(method: DifferentiationMethod) -> f64 {
    match method {
        DifferentiationMethod::ForwardFD => 1e-6,
        DifferentiationMethod::CentralFD => 1e-8,
        _ => 1e-6,
    }
}

#[test]
fn test_dense_caches_match_exact_jacobian() {
    let x = [0.4, -1.2, 0.7];
    let (df_exact, dg_exact) = exact_jacobian(&x);

    for method in DifferentiationMethod::ALL {
        if method == DifferentiationMethod::UserDeriv {
            continue;
        }
        let mut cache = build_cache(Mixed, SparsityPattern::dense(3, 3), method).unwrap();
        let mut g = [0.0; 2];
        let mut df = [0.0; 3];
        let mut dg = vec![0.0; cache.jacobian_len()];
        let f = cache.evaluate(&x, &mut g, &mut df, &mut dg, true).unwrap();

        assert_relative_eq!(f, x[0] * x[1] + x[2].exp(), epsilon = 1e-14);
        for j in 0..3 {
            assert_relative_eq!(df[j], df_exact[j], epsilon = tolerance(method));
            for i in 0..2 {
                assert_relative_eq!(dg[j * 2 + i], dg_exact[(i, j)], epsilon = tolerance(method));
            }
        }
    }
}

#[test]
fn test_sparse_caches_follow_declared_order() {
    let x = [0.4, -1.2, 0.7];
    let (df_exact, dg_exact) = exact_jacobian(&x);
    let pattern = SparsityPattern::from_coordinates(vec![2, 1, 1], vec![3, 2, 1], 2, 3).unwrap();

    for method in DifferentiationMethod::ALL {
        if method == DifferentiationMethod::UserDeriv {
            continue;
        }
        let mut cache = build_cache(Mixed, pattern.clone(), method).unwrap();
        assert_eq!(cache.jacobian_len(), 3);

        let mut g = [0.0; 2];
        let mut df = [0.0; 3];
        let mut dg = [0.0; 3];
        cache.evaluate(&x, &mut g, &mut df, &mut dg, true).unwrap();

        for j in 0..3 {
            assert_relative_eq!(df[j], df_exact[j], epsilon = tolerance(method));
        }
        for (value, (r, c)) in dg.iter().zip(pattern.iter()) {
            assert_relative_eq!(*value, dg_exact[(r - 1, c - 1)], epsilon = tolerance(method));
        }
    }
}

#[test]
fn test_detected_pattern_feeds_sparse_cache() {
    let probes: [&[f64]; 3] = [&[0.1, 0.2, 0.3], &[1.0, -1.0, 2.0], &[-0.7, 0.4, 1.1]];
    let pattern = SparsityPattern::detect(&Mixed, 2, probes, FdScheme::Central).unwrap();
    assert_eq!(pattern.nnz(), 3);

    let counting = CountingFunction::new(Mixed);
    let mut cache = build_cache(&counting, pattern, DifferentiationMethod::ForwardAD).unwrap();
    let mut g = [0.0; 2];
    let mut df = [0.0; 3];
    let mut dg = [0.0; 3];
    cache.evaluate(&[0.4, -1.2, 0.7], &mut g, &mut df, &mut dg, true).unwrap();

    // Columns 1 and 3 share no row, column 2 shares row 1 with column 1.
    assert_eq!(counting.counts().dual, 2);
}

#[test]
fn test_cache_reused_across_points() {
    let mut cache = build_cache(
        Mixed,
        SparsityPattern::dense(3, 3),
        DifferentiationMethod::ComplexStep,
    )
    .unwrap();
    let mut g = [0.0; 2];
    let mut df = [0.0; 3];
    let mut dg = [0.0; 6];

    for x in [[0.0, 0.0, 0.0], [1.0, 2.0, 3.0], [-0.5, 0.5, -0.5]] {
        cache.evaluate(&x, &mut g, &mut df, &mut dg, true).unwrap();
        let (df_exact, _) = exact_jacobian(&x);
        assert_relative_eq!(df[2], df_exact[2], epsilon = 1e-12);
        assert_relative_eq!(g[1], x[2].powi(3), epsilon = 1e-12);
    }
}
