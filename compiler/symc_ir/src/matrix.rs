//! Fixed-shape matrices of symbolic expressions.

use std::collections::BTreeSet;
use std::fmt;

use rustc_hash::FxHashMap;

use crate::expr::Expr;
use crate::symbol::Symbol;

/// Shape mismatch in a matrix operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeError {
    pub operation: &'static str,
    pub left: (usize, usize),
    pub right: (usize, usize),
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "incompatible shapes for {}: {}x{} and {}x{}",
            self.operation, self.left.0, self.left.1, self.right.0, self.right.1
        )
    }
}

impl std::error::Error for ShapeError {}

/// A dense `rows x cols` matrix of expressions, stored row-major.
///
/// The storage order exposed through [`Matrix::to_storage`] is column-major,
/// matching the layout generated code uses for matrix arguments.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<Expr>,
}

impl Matrix {
    /// Build from row-major entries.
    pub fn from_row_major(rows: usize, cols: usize, data: Vec<Expr>) -> Result<Self, ShapeError> {
        if data.len() != rows * cols {
            return Err(ShapeError {
                operation: "from_row_major",
                left: (rows, cols),
                right: (data.len(), 1),
            });
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Build from a list of rows; all rows must have the same length.
    pub fn from_rows(rows: Vec<Vec<Expr>>) -> Result<Self, ShapeError> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for row in rows {
            if row.len() != n_cols {
                return Err(ShapeError {
                    operation: "from_rows",
                    left: (n_rows, n_cols),
                    right: (1, row.len()),
                });
            }
            data.extend(row);
        }
        Ok(Matrix {
            rows: n_rows,
            cols: n_cols,
            data,
        })
    }

    /// A column vector.
    pub fn column(entries: Vec<Expr>) -> Self {
        Matrix {
            rows: entries.len(),
            cols: 1,
            data: entries,
        }
    }

    /// Build entry by entry.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> Expr) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Matrix { rows, cols, data }
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix {
            rows,
            cols,
            data: vec![Expr::zero(); rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        Matrix::from_fn(n, n, |i, j| if i == j { Expr::one() } else { Expr::zero() })
    }

    /// A matrix of fresh symbols: `name0, name1, ..` for vectors and
    /// `name0_0, name0_1, ..` otherwise.
    pub fn symbolic(name: &str, rows: usize, cols: usize) -> Self {
        if cols == 1 {
            Matrix::from_fn(rows, 1, |i, _| Expr::symbol(format!("{name}{i}")))
        } else {
            Matrix::from_fn(rows, cols, |i, j| Expr::symbol(format!("{name}{i}_{j}")))
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_column_vector(&self) -> bool {
        self.cols == 1
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> &Expr {
        &self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: Expr) {
        self.data[row * self.cols + col] = value;
    }

    /// Entries in row-major order.
    pub fn row_major(&self) -> &[Expr] {
        &self.data
    }

    /// Entries in column-major (storage) order.
    pub fn to_storage(&self) -> Vec<Expr> {
        let mut out = Vec::with_capacity(self.data.len());
        for j in 0..self.cols {
            for i in 0..self.rows {
                out.push(self.get(i, j).clone());
            }
        }
        out
    }

    pub fn transpose(&self) -> Matrix {
        Matrix::from_fn(self.cols, self.rows, |i, j| self.get(j, i).clone())
    }

    pub fn map(&self, f: impl FnMut(&Expr) -> Expr) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(f).collect(),
        }
    }

    pub fn scale(&self, factor: &Expr) -> Matrix {
        self.map(|e| e * factor)
    }

    pub fn add(&self, other: &Matrix) -> Result<Matrix, ShapeError> {
        if self.shape() != other.shape() {
            return Err(ShapeError {
                operation: "add",
                left: self.shape(),
                right: other.shape(),
            });
        }
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().zip(&other.data).map(|(a, b)| a + b).collect(),
        })
    }

    pub fn sub(&self, other: &Matrix) -> Result<Matrix, ShapeError> {
        self.add(&other.scale(&Expr::int(-1)))
    }

    /// Matrix product `self * other`.
    pub fn matmul(&self, other: &Matrix) -> Result<Matrix, ShapeError> {
        if self.cols != other.rows {
            return Err(ShapeError {
                operation: "matmul",
                left: self.shape(),
                right: other.shape(),
            });
        }
        Ok(Matrix::from_fn(self.rows, other.cols, |i, j| {
            Expr::add_all((0..self.cols).map(|k| self.get(i, k) * other.get(k, j)))
        }))
    }

    /// `selfᵀ · self`. With `lower_only`, entries above the diagonal are left
    /// as exact zeros and never computed.
    pub fn compute_ata(&self, lower_only: bool) -> Matrix {
        let n = self.cols;
        Matrix::from_fn(n, n, |i, j| {
            if lower_only && j > i {
                return Expr::zero();
            }
            Expr::add_all((0..self.rows).map(|k| self.get(k, i) * self.get(k, j)))
        })
    }

    /// Jacobian of the column-major storage of `self` with respect to
    /// `symbols`: one row per storage entry, one column per symbol.
    pub fn jacobian(&self, symbols: &[Symbol]) -> Matrix {
        jacobian_of(&self.to_storage(), symbols)
    }

    /// Horizontal concatenation.
    pub fn hstack(blocks: &[Matrix]) -> Result<Matrix, ShapeError> {
        let rows = blocks.first().map_or(0, Matrix::rows);
        for block in blocks {
            if block.rows != rows {
                return Err(ShapeError {
                    operation: "hstack",
                    left: (rows, 0),
                    right: block.shape(),
                });
            }
        }
        let cols = blocks.iter().map(Matrix::cols).sum();
        let mut out = Matrix::zeros(rows, cols);
        let mut offset = 0;
        for block in blocks {
            for i in 0..rows {
                for j in 0..block.cols {
                    out.set(i, offset + j, block.get(i, j).clone());
                }
            }
            offset += block.cols;
        }
        Ok(out)
    }

    /// Block-diagonal assembly.
    pub fn block_diag(blocks: &[Matrix]) -> Matrix {
        let rows = blocks.iter().map(Matrix::rows).sum();
        let cols = blocks.iter().map(Matrix::cols).sum();
        let mut out = Matrix::zeros(rows, cols);
        let (mut r0, mut c0) = (0, 0);
        for block in blocks {
            for i in 0..block.rows {
                for j in 0..block.cols {
                    out.set(r0 + i, c0 + j, block.get(i, j).clone());
                }
            }
            r0 += block.rows;
            c0 += block.cols;
        }
        out
    }

    /// Number of entries that are not the exact number zero.
    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|e| !e.is_zero()).count()
    }

    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut out = BTreeSet::new();
        for e in &self.data {
            e.collect_free_symbols(&mut out);
        }
        out
    }

    pub fn subs(&self, map: &FxHashMap<Symbol, Expr>) -> Matrix {
        self.map(|e| e.subs(map))
    }
}

/// Jacobian of a flat list of expressions with respect to `symbols`.
pub fn jacobian_of(exprs: &[Expr], symbols: &[Symbol]) -> Matrix {
    Matrix::from_fn(exprs.len(), symbols.len(), |i, j| exprs[i].diff(&symbols[j]))
}
