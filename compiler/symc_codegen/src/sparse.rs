//! Static sparsity extraction.
//!
//! The sparsity *structure* of a symbolic matrix is fixed at generation time:
//! an entry is structurally zero iff it canonicalizes to the number `0`.

use symc_ir::{Expr, Matrix};

/// Compressed-sparse-column layout of a symbolic matrix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CscFormat {
    pub rows: usize,
    pub cols: usize,
    /// `cols + 1` offsets into `row_indices`.
    pub col_ptrs: Vec<usize>,
    pub row_indices: Vec<usize>,
    /// Symbolic values of the nonzero entries, column by column.
    pub nonzero_elements: Vec<Expr>,
}

impl CscFormat {
    pub fn from_matrix(matrix: &Matrix) -> Self {
        let (rows, cols) = matrix.shape();
        let mut col_ptrs = Vec::with_capacity(cols + 1);
        let mut row_indices = Vec::new();
        let mut nonzero_elements = Vec::new();
        for j in 0..cols {
            col_ptrs.push(row_indices.len());
            for i in 0..rows {
                let entry = matrix.get(i, j);
                if !entry.is_zero() {
                    row_indices.push(i);
                    nonzero_elements.push(entry.clone());
                }
            }
        }
        col_ptrs.push(row_indices.len());
        CscFormat {
            rows,
            cols,
            col_ptrs,
            row_indices,
            nonzero_elements,
        }
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.nonzero_elements.len()
    }

    /// Scatter the nonzeros back into a zero-initialized dense matrix.
    pub fn to_dense(&self) -> Matrix {
        let mut dense = Matrix::zeros(self.rows, self.cols);
        for j in 0..self.cols {
            for k in self.col_ptrs[j]..self.col_ptrs[j + 1] {
                dense.set(self.row_indices[k], j, self.nonzero_elements[k].clone());
            }
        }
        dense
    }
}

/// Whether a dense output should be zero-filled and then only have its
/// nonzero entries assigned: `nnz / (rows * cols) < threshold`.
#[expect(
    clippy::cast_precision_loss,
    reason = "matrix sizes are far below the f64 mantissa range"
)]
pub fn should_set_zero(matrix: &Matrix, threshold: f64) -> bool {
    if matrix.is_empty() {
        return false;
    }
    let nnz = matrix.count_nonzero();
    (nnz as f64) / (matrix.len() as f64) < threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Matrix {
        let x = Expr::symbol("x");
        let y = Expr::symbol("y");
        Matrix::from_rows(vec![
            vec![x.clone(), Expr::zero(), Expr::zero()],
            vec![Expr::zero(), Expr::zero(), &x * &y],
            vec![y, Expr::zero(), Expr::int(3)],
        ])
        .unwrap_or_else(|_| Matrix::zeros(0, 0))
    }

    #[test]
    fn layout() {
        let csc = CscFormat::from_matrix(&sample());
        assert_eq!(csc.col_ptrs, vec![0, 2, 2, 4]);
        assert_eq!(csc.row_indices, vec![0, 2, 1, 2]);
        assert_eq!(csc.nnz(), 4);
        assert_eq!(csc.nonzero_elements[2].to_string(), "x*y");
    }

    #[test]
    fn round_trip() {
        let m = sample();
        assert_eq!(CscFormat::from_matrix(&m).to_dense(), m);
    }

    #[test]
    fn empty_column_matrix() {
        let csc = CscFormat::from_matrix(&Matrix::zeros(2, 3));
        assert_eq!(csc.col_ptrs, vec![0, 0, 0, 0]);
        assert!(csc.row_indices.is_empty());
    }

    #[test]
    fn zero_initialization_threshold() {
        let m = sample();
        assert!(should_set_zero(&m, 0.5));
        assert!(!should_set_zero(&m, 0.4));
        assert!(!should_set_zero(&Matrix::identity(1), 0.5));
    }
}
