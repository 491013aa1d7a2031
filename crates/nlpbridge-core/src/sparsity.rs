//! Jacobian sparsity patterns.
//!
//! A pattern stores 1-indexed `(row, col)` coordinates in parallel vectors,
//! which is the layout SNOPT-style solvers expect for `iGfun`/`jGvar`.
//!
//! Two shapes are used:
//! - a dense pattern covers all `nf = ng + 1` rows, objective row included,
//!   in column-major order;
//! - a sparse pattern covers only the constraint Jacobian (`nrows = ng`), in
//!   whatever order the caller declared. The dense objective row is
//!   prepended by [`SparsityPattern::solver_structure`].

use crate::{
    coloring::ColumnColoring,
    error::{NlpError, Result},
    finite_diff::{self, FdScheme, FdWorkspace},
    function::NlpFunction,
    types::Dimensions,
};
use nalgebra::DMatrix;
use std::collections::HashSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Coordinates of the structurally nonzero Jacobian entries.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SparsityPattern {
    rows: Vec<usize>,
    cols: Vec<usize>,
    nrows: usize,
    ncols: usize,
    dense: bool,
}

impl SparsityPattern {
    /// Dense pattern over `nf` rows and `nx` columns.
    ///
    /// Pairs are emitted column-major: for each column `j`, every row `i`.
    /// This is the packing of a flattened column-major dense Jacobian.
    pub fn dense(nx: usize, nf: usize) -> Self {
        let mut rows = Vec::with_capacity(nx * nf);
        let mut cols = Vec::with_capacity(nx * nf);
        for j in 1..=nx {
            for i in 1..=nf {
                rows.push(i);
                cols.push(j);
            }
        }
        Self {
            rows,
            cols,
            nrows: nf,
            ncols: nx,
            dense: true,
        }
    }

    /// Constraint pattern from the nonzeros of a structure matrix.
    ///
    /// The matrix is `ng × nx`; entries are taken in its column-major
    /// storage order.
    pub fn from_matrix(structure: &DMatrix<f64>) -> Self {
        let (nrows, ncols) = structure.shape();
        let mut rows = Vec::new();
        let mut cols = Vec::new();
        for j in 0..ncols {
            for i in 0..nrows {
                if structure[(i, j)] != 0.0 {
                    rows.push(i + 1);
                    cols.push(j + 1);
                }
            }
        }
        Self {
            rows,
            cols,
            nrows,
            ncols,
            dense: false,
        }
    }

    /// Constraint pattern from explicitly declared coordinates.
    ///
    /// Coordinates are 1-indexed and kept in the order given. Out-of-range
    /// or repeated pairs are rejected.
    pub fn from_coordinates(
        rows: Vec<usize>,
        cols: Vec<usize>,
        nrows: usize,
        ncols: usize,
    ) -> Result<Self> {
        if rows.len() != cols.len() {
            return Err(NlpError::dimension_mismatch(
                "pattern columns",
                rows.len(),
                cols.len(),
            ));
        }

        let mut seen = HashSet::with_capacity(rows.len());
        for (k, (&r, &c)) in rows.iter().zip(&cols).enumerate() {
            if r == 0 || r > nrows || c == 0 || c > ncols {
                return Err(NlpError::invalid_pattern(format!(
                    "entry {k} at ({r}, {c}) lies outside 1..={nrows} x 1..={ncols}"
                )));
            }
            if !seen.insert((r, c)) {
                return Err(NlpError::invalid_pattern(format!(
                    "entry {k} repeats ({r}, {c})"
                )));
            }
        }

        Ok(Self {
            rows,
            cols,
            nrows,
            ncols,
            dense: false,
        })
    }

    /// Detects the constraint pattern from three probe points.
    ///
    /// The constraint Jacobian is approximated with `scheme` at each probe
    /// and absolute values are summed; entries whose sum is exactly zero are
    /// left out. This is a heuristic: an entry that happens to vanish at all
    /// three probes is missed, and roundoff can add spurious entries.
    pub fn detect<F: NlpFunction>(
        function: &F,
        ng: usize,
        probes: [&[f64]; 3],
        scheme: FdScheme,
    ) -> Result<Self> {
        let nx = probes[0].len();
        for (k, probe) in probes.iter().enumerate() {
            if probe.len() != nx {
                return Err(NlpError::dimension_mismatch(
                    format!("probe point {k}"),
                    nx,
                    probe.len(),
                ));
            }
        }
        for a in 0..3 {
            for b in (a + 1)..3 {
                if probes[a] == probes[b] {
                    return Err(NlpError::invalid_configuration(
                        "probe points",
                        format!("probe {a} and probe {b} are identical"),
                    ));
                }
            }
        }

        let dims = Dimensions::new(nx, ng);
        let mut work = FdWorkspace::new(dims);
        let mut fg = vec![0.0; dims.nf()];
        let mut jacobian = DMatrix::zeros(dims.nf(), nx);
        let mut magnitude = DMatrix::<f64>::zeros(ng, nx);

        for probe in probes {
            finite_diff::dense_jacobian(
                function,
                probe,
                scheme,
                &mut work,
                &mut fg,
                &mut jacobian,
            )?;
            // Row 0 is the objective.
            magnitude += jacobian.rows(1, ng).abs();
        }

        let pattern = Self::from_matrix(&magnitude);
        tracing::debug!(
            component = "sparsity",
            operation = "detect",
            nx,
            ng,
            nnz = pattern.nnz(),
            "Detected constraint Jacobian pattern"
        );
        Ok(pattern)
    }

    /// Row indices, 1-based.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Column indices, 1-based.
    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    /// Number of rows the pattern spans.
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns the pattern spans.
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of declared entries.
    pub fn nnz(&self) -> usize {
        self.rows.len()
    }

    /// Whether this is a dense pattern including the objective row.
    pub fn is_dense(&self) -> bool {
        self.dense
    }

    /// Iterates over `(row, col)` pairs in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().copied().zip(self.cols.iter().copied())
    }

    /// Checks the pattern shape against the problem dimensions.
    pub fn check_dimensions(&self, dims: Dimensions) -> Result<()> {
        let expected_rows = if self.dense { dims.nf() } else { dims.ng };
        if self.nrows != expected_rows {
            return Err(NlpError::dimension_mismatch(
                "pattern rows",
                expected_rows,
                self.nrows,
            ));
        }
        if self.ncols != dims.nx {
            return Err(NlpError::dimension_mismatch("pattern columns", dims.nx, self.ncols));
        }
        Ok(())
    }

    /// Length of the `G` array handed to the solver.
    pub fn solver_nnz(&self) -> usize {
        if self.dense {
            self.nnz()
        } else {
            self.ncols + self.nnz()
        }
    }

    /// `(iGfun, jGvar)` structure handed to the solver.
    ///
    /// Dense patterns are returned as-is. Sparse patterns get a dense
    /// objective row first and their rows shifted down by one.
    pub fn solver_structure(&self) -> (Vec<usize>, Vec<usize>) {
        if self.dense {
            return (self.rows.clone(), self.cols.clone());
        }

        let len = self.solver_nnz();
        let mut rows = Vec::with_capacity(len);
        let mut cols = Vec::with_capacity(len);
        for j in 1..=self.ncols {
            rows.push(1);
            cols.push(j);
        }
        for (r, c) in self.iter() {
            rows.push(r + 1);
            cols.push(c);
        }
        (rows, cols)
    }

    /// Greedy column coloring of this pattern.
    pub fn column_coloring(&self) -> ColumnColoring {
        ColumnColoring::greedy(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalResult;
    use crate::types::NlpScalar;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    /// g1 = x1 * x2, g2 = x3^2; the (2, 1) entry is structurally zero.
    struct Separable;

    impl NlpFunction for Separable {
        fn eval<T: NlpScalar>(&self, g: &mut [T], x: &[T]) -> EvalResult<T> {
            g[0] = x[0] * x[1];
            g[1] = x[2] * x[2];
            Ok(x[0] + x[1] + x[2])
        }
    }

    #[test]
    fn test_dense_is_column_major() {
        let pattern = SparsityPattern::dense(2, 3);
        assert_eq!(pattern.rows(), &[1, 2, 3, 1, 2, 3]);
        assert_eq!(pattern.cols(), &[1, 1, 1, 2, 2, 2]);
        assert!(pattern.is_dense());
        assert_eq!(pattern.solver_structure(), (pattern.rows().to_vec(), pattern.cols().to_vec()));
    }

    #[test]
    fn test_from_matrix() {
        let structure = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 2.0, 0.0, 3.0, 0.0]);
        let pattern = SparsityPattern::from_matrix(&structure);
        assert_eq!(pattern.nnz(), 3);
        assert_eq!(pattern.rows(), &[1, 2, 1]);
        assert_eq!(pattern.cols(), &[1, 2, 3]);
        assert!(!pattern.is_dense());
    }

    #[test]
    fn test_from_coordinates_validation() {
        assert!(SparsityPattern::from_coordinates(vec![1, 2], vec![1, 2], 2, 2).is_ok());

        let err = SparsityPattern::from_coordinates(vec![1], vec![1, 2], 2, 2).unwrap_err();
        assert!(matches!(err, NlpError::DimensionMismatch { .. }));

        let err = SparsityPattern::from_coordinates(vec![0], vec![1], 2, 2).unwrap_err();
        assert!(matches!(err, NlpError::InvalidPattern { .. }));

        let err = SparsityPattern::from_coordinates(vec![1, 3], vec![1, 1], 2, 2).unwrap_err();
        assert!(matches!(err, NlpError::InvalidPattern { .. }));

        let err = SparsityPattern::from_coordinates(vec![1, 1], vec![2, 2], 2, 2).unwrap_err();
        assert!(err.to_string().contains("repeats"));
    }

    #[test]
    fn test_solver_structure_prepends_objective_row() {
        let pattern = SparsityPattern::from_coordinates(vec![2, 1], vec![1, 3], 2, 3).unwrap();
        let (rows, cols) = pattern.solver_structure();
        assert_eq!(rows, vec![1, 1, 1, 3, 2]);
        assert_eq!(cols, vec![1, 2, 3, 1, 3]);
        assert_eq!(pattern.solver_nnz(), 5);
    }

    #[test]
    fn test_check_dimensions() {
        let dims = Dimensions::new(3, 2);
        assert!(SparsityPattern::dense(3, 3).check_dimensions(dims).is_ok());
        assert!(SparsityPattern::dense(3, 2).check_dimensions(dims).is_err());

        let sparse = SparsityPattern::from_coordinates(vec![1], vec![1], 2, 3).unwrap();
        assert!(sparse.check_dimensions(dims).is_ok());
        assert!(sparse.check_dimensions(Dimensions::new(4, 2)).is_err());
    }

    #[test]
    fn test_detect_excludes_structural_zeros() {
        let probes: [&[f64]; 3] = [&[1.0, 2.0, 3.0], &[-0.5, 0.7, 1.1], &[2.0, -1.0, 0.3]];
        let pattern = SparsityPattern::detect(&Separable, 2, probes, FdScheme::Central).unwrap();

        let entries: Vec<_> = pattern.iter().collect();
        assert_eq!(entries, vec![(1, 1), (1, 2), (2, 3)]);
        assert_eq!(pattern.nrows(), 2);
        assert_eq!(pattern.ncols(), 3);
    }

    #[test]
    fn test_detect_keeps_entry_nonzero_at_one_point() {
        // d(g1)/d(x2) = x1 vanishes at two of the three probes.
        let probes: [&[f64]; 3] = [&[0.0, 1.0, 1.0], &[0.0, 2.0, 1.0], &[1.5, 1.0, 1.0]];
        let pattern = SparsityPattern::detect(&Separable, 2, probes, FdScheme::Forward).unwrap();
        assert!(pattern.iter().any(|entry| entry == (1, 2)));
    }

    #[test]
    fn test_detect_rejects_identical_probes() {
        let x = [1.0, 2.0, 3.0];
        let other = [0.0, 1.0, 2.0];
        let err = SparsityPattern::detect(&Separable, 2, [&x, &other, &x], FdScheme::Forward)
            .unwrap_err();
        assert!(matches!(err, NlpError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_detect_rejects_ragged_probes() {
        let err = SparsityPattern::detect(
            &Separable,
            2,
            [&[1.0, 2.0, 3.0], &[1.0, 2.0], &[0.0, 0.0, 0.0]],
            FdScheme::Forward,
        )
        .unwrap_err();
        assert!(matches!(err, NlpError::DimensionMismatch { .. }));
    }

    proptest! {
        #[test]
        fn prop_dense_pattern_is_bijection(nx in 1usize..12, nf in 1usize..12) {
            let pattern = SparsityPattern::dense(nx, nf);
            prop_assert_eq!(pattern.nnz(), nx * nf);

            let unique: HashSet<_> = pattern.iter().collect();
            prop_assert_eq!(unique.len(), nx * nf);
            for (k, (i, j)) in pattern.iter().enumerate() {
                prop_assert!((1..=nf).contains(&i));
                prop_assert!((1..=nx).contains(&j));
                prop_assert_eq!(k, (j - 1) * nf + (i - 1));
            }
        }

        #[test]
        fn prop_from_matrix_counts_nonzeros(
            values in proptest::collection::vec(prop_oneof![Just(0.0), -5.0..5.0f64], 12)
        ) {
            let structure = DMatrix::from_column_slice(3, 4, &values);
            let pattern = SparsityPattern::from_matrix(&structure);
            let expected = values.iter().filter(|v| **v != 0.0).count();
            prop_assert_eq!(pattern.nnz(), expected);
            for (i, j) in pattern.iter() {
                prop_assert!(structure[(i - 1, j - 1)] != 0.0);
            }
        }
    }
}
