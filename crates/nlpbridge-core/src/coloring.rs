//! Column coloring for compressed Jacobian evaluation.
//!
//! Two columns may share a color when no row has a nonzero in both. All
//! columns of one color can then be perturbed (or seeded) together and the
//! resulting directional derivative decompressed without ambiguity.

use crate::sparsity::SparsityPattern;
use nalgebra::DMatrix;

/// Greedy assignment of Jacobian columns to colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnColoring {
    colors: Vec<usize>,
    groups: Vec<Vec<usize>>,
}

impl ColumnColoring {
    /// Colors the columns of `pattern`.
    ///
    /// Columns are visited by decreasing number of nonzeros and each gets
    /// the smallest color not used by a column it shares a row with.
    pub fn greedy(pattern: &SparsityPattern) -> Self {
        let ncols = pattern.ncols();
        let nrows = pattern.nrows();
        if ncols == 0 {
            return Self {
                colors: Vec::new(),
                groups: Vec::new(),
            };
        }

        let mut column_rows: Vec<Vec<usize>> = vec![Vec::new(); ncols];
        let mut row_columns: Vec<Vec<usize>> = vec![Vec::new(); nrows];
        for (r, c) in pattern.iter() {
            column_rows[c - 1].push(r - 1);
            row_columns[r - 1].push(c - 1);
        }

        let mut order: Vec<usize> = (0..ncols).collect();
        order.sort_by(|&a, &b| column_rows[b].len().cmp(&column_rows[a].len()));

        let mut colors = vec![usize::MAX; ncols];
        let mut num_colors = 0;
        let mut forbidden = Vec::new();

        for &column in &order {
            forbidden.clear();
            forbidden.resize(num_colors + 1, false);
            for &row in &column_rows[column] {
                for &neighbor in &row_columns[row] {
                    let color = colors[neighbor];
                    if color != usize::MAX {
                        forbidden[color] = true;
                    }
                }
            }

            let color = forbidden.iter().position(|used| !used).unwrap_or(num_colors);
            colors[column] = color;
            num_colors = num_colors.max(color + 1);
        }

        let mut groups = vec![Vec::new(); num_colors];
        for (column, &color) in colors.iter().enumerate() {
            groups[color].push(column);
        }

        Self { colors, groups }
    }

    /// Color of each column, 0-based.
    pub fn colors(&self) -> &[usize] {
        &self.colors
    }

    /// Number of colors used.
    pub fn ncolors(&self) -> usize {
        self.groups.len()
    }

    /// Columns (0-based) that share `color`.
    pub fn columns(&self, color: usize) -> &[usize] {
        &self.groups[color]
    }

    /// True when no two columns of one color share a row of `pattern`.
    pub fn is_valid_for(&self, pattern: &SparsityPattern) -> bool {
        if self.colors.len() != pattern.ncols() {
            return false;
        }
        let mut owner = vec![vec![None; self.ncolors()]; pattern.nrows()];
        for (r, c) in pattern.iter() {
            let color = self.colors[c - 1];
            match owner[r - 1][color] {
                Some(other) if other != c => return false,
                _ => owner[r - 1][color] = Some(c),
            }
        }
        true
    }

    /// Scatters a compressed Jacobian back onto declared pattern entries.
    ///
    /// `compressed` holds one column per color, with `row_offset` rows
    /// preceding pattern row 1 (the objective row when `compressed` spans
    /// `[f; g]`). Each entry is divided by the denominator of its column.
    /// Output is in the pattern's declared order.
    pub fn decompress(
        &self,
        pattern: &SparsityPattern,
        compressed: &DMatrix<f64>,
        row_offset: usize,
        denominators: &[f64],
        values: &mut [f64],
    ) {
        for (value, (r, c)) in values.iter_mut().zip(pattern.iter()) {
            let column = c - 1;
            *value = compressed[(row_offset + r - 1, self.colors[column])] / denominators[column];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn tridiagonal(n: usize) -> SparsityPattern {
        let mut rows = Vec::new();
        let mut cols = Vec::new();
        for i in 1..=n {
            for j in i.saturating_sub(1).max(1)..=(i + 1).min(n) {
                rows.push(i);
                cols.push(j);
            }
        }
        SparsityPattern::from_coordinates(rows, cols, n, n).unwrap()
    }

    #[test]
    fn test_diagonal_needs_one_color() {
        let pattern =
            SparsityPattern::from_coordinates(vec![1, 2, 3], vec![1, 2, 3], 3, 3).unwrap();
        let coloring = ColumnColoring::greedy(&pattern);
        assert_eq!(coloring.ncolors(), 1);
        assert_eq!(coloring.columns(0), &[0, 1, 2]);
    }

    #[test]
    fn test_tridiagonal_needs_three_colors() {
        let pattern = tridiagonal(10);
        let coloring = pattern.column_coloring();
        assert_eq!(coloring.ncolors(), 3);
        assert!(coloring.is_valid_for(&pattern));
    }

    #[test]
    fn test_dense_row_needs_one_color_per_column() {
        let pattern =
            SparsityPattern::from_coordinates(vec![1, 1, 1], vec![1, 2, 3], 1, 3).unwrap();
        let coloring = ColumnColoring::greedy(&pattern);
        assert_eq!(coloring.ncolors(), 3);
    }

    #[test]
    fn test_empty_columns() {
        let pattern = SparsityPattern::from_coordinates(vec![], vec![], 0, 4).unwrap();
        let coloring = ColumnColoring::greedy(&pattern);
        assert_eq!(coloring.ncolors(), 1);
        assert_eq!(coloring.colors(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_decompress_declared_order() {
        // Diagonal declared back to front.
        let pattern =
            SparsityPattern::from_coordinates(vec![3, 2, 1], vec![3, 2, 1], 3, 3).unwrap();
        let coloring = ColumnColoring::greedy(&pattern);
        let compressed = DMatrix::from_column_slice(4, 1, &[99.0, 2.0, 4.0, 6.0]);
        let mut values = [0.0; 3];
        coloring.decompress(&pattern, &compressed, 1, &[1.0, 2.0, 3.0], &mut values);
        assert_relative_eq!(values[0], 2.0);
        assert_relative_eq!(values[1], 2.0);
        assert_relative_eq!(values[2], 2.0);
    }

    proptest! {
        #[test]
        fn prop_greedy_coloring_is_valid(
            entries in proptest::collection::hash_set((1usize..=8, 1usize..=8), 0..40)
        ) {
            let (rows, cols): (Vec<_>, Vec<_>) = entries.into_iter().unzip();
            let pattern = SparsityPattern::from_coordinates(rows, cols, 8, 8).unwrap();
            let coloring = ColumnColoring::greedy(&pattern);
            prop_assert!(coloring.is_valid_for(&pattern));
            prop_assert!(coloring.ncolors() <= 8);
            prop_assert!(coloring.colors().iter().all(|&c| c < coloring.ncolors()));
        }
    }
}
