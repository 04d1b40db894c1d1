//! Sparse row matrices and the reduced row-echelon engine.
//!
//! A [`Matrix`] is an ordered list of sparse rows of equal length together
//! with a column count. The domain stores one conjunction of affine
//! equalities per row: columns `0..cols-1` carry variable coefficients and
//! the last column carries the constant term, so a row `(c, k)` encodes
//! `Σ cᵢ·xᵢ + k = 0`. The empty matrix constrains nothing.
//!
//! Matrices held by a domain state are **canonical**: they are kept in
//! reduced row-echelon form (RREF). Every row has a unit leading
//! coefficient, pivot columns strictly increase down the rows, a pivot
//! column is zero in every other row, and no zero row exists. Canonicity is
//! what makes structural equality coincide with semantic equality, exactly
//! like the shared canonical form of a decision diagram.
//!
//! The interesting operations are [`normalize`](Matrix::normalize) (full
//! Gaussian elimination), [`rref_vec`](Matrix::rref_vec) (add one equality
//! to an already-reduced system), [`rref_matrix`](Matrix::rref_matrix)
//! (conjoin two reduced systems), [`linear_disjunct`](Matrix::linear_disjunct)
//! (smallest affine subspace containing both operands, the lattice join)
//! and [`reduce_col`](Matrix::reduce_col) (existentially quantify a column
//! away). Inconsistency (a derived row `0 = k` with `k ≠ 0`) surfaces as
//! `None` and is mapped to ⊥ by the caller.

use log::debug;

use num_traits::{One, Zero};

use crate::rational::Rational;
use crate::vector::SparseVector;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Matrix {
    cols: usize,
    rows: Vec<SparseVector>,
}

impl Matrix {
    /// The empty matrix with the given column count (at least the constant
    /// column). Represents ⊤: no equality constrains the store.
    pub fn new(cols: usize) -> Self {
        assert!(cols >= 1, "a matrix needs at least the constant column");
        Self { cols, rows: Vec::new() }
    }

    /// Build a matrix from raw rows. The rows are taken as-is; call
    /// [`normalize`](Self::normalize) to obtain the canonical form.
    pub fn from_rows(cols: usize, rows: Vec<SparseVector>) -> Self {
        assert!(cols >= 1, "a matrix needs at least the constant column");
        for row in &rows {
            assert_eq!(row.len(), cols, "row length does not match column count");
        }
        Self { cols, rows }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cols(&self) -> usize {
        self.cols
    }

    /// True iff the matrix has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get_row(&self, i: usize) -> &SparseVector {
        &self.rows[i]
    }

    pub fn rows(&self) -> impl Iterator<Item = &SparseVector> {
        self.rows.iter()
    }

    /// Append a raw row (no reduction performed).
    pub fn append_row(&mut self, row: SparseVector) {
        assert_eq!(row.len(), self.cols, "row length does not match column count");
        self.rows.push(row);
    }

    /// Drop all-zero rows.
    pub fn remove_zero_rows(&self) -> Self {
        Self {
            cols: self.cols,
            rows: self.rows.iter().filter(|r| !r.is_zero()).cloned().collect(),
        }
    }

    /// Check the reduced row-echelon invariant: unit pivots, strictly
    /// increasing pivot columns, pivot columns zero in every other row, no
    /// zero rows.
    pub fn is_rref(&self) -> bool {
        let mut last_pivot = None;
        for (i, row) in self.rows.iter().enumerate() {
            let Some((pivot, lead)) = row.first_nonzero() else {
                return false;
            };
            if !lead.is_one() {
                return false;
            }
            if let Some(last) = last_pivot {
                if pivot <= last {
                    return false;
                }
            }
            last_pivot = Some(pivot);
            for (j, other) in self.rows.iter().enumerate() {
                if j != i && !other.get(pivot).is_zero() {
                    return false;
                }
            }
        }
        true
    }

    /// Reduce `v` modulo the pivot rows of `self` (which must be in RREF).
    /// The result has a zero in every pivot column of `self`.
    pub fn reduce_row(&self, v: &SparseVector) -> SparseVector {
        let mut v = v.clone();
        for row in &self.rows {
            let (pivot, _) = row.first_nonzero().expect("no zero rows in a reduced matrix");
            let c = v.get(pivot);
            if !c.is_zero() {
                v = v.sub_scaled(row, &c);
            }
        }
        v
    }

    /// Gaussian elimination to reduced row-echelon form.
    ///
    /// Returns `None` iff the system is inconsistent, i.e. some linear
    /// combination of the rows has all variable coefficients zero but a
    /// non-zero constant.
    pub fn normalize(&self) -> Option<Matrix> {
        let basis = echelon(self.rows.clone());
        let m = Matrix { cols: self.cols, rows: basis };
        if m.rows.iter().any(|r| leads_at_constant(r, self.cols)) {
            debug!("normalize: inconsistent system");
            return None;
        }
        debug_assert!(m.is_rref());
        Some(m)
    }

    /// Add the single equality `v` to an already-reduced system.
    ///
    /// `self` must be in RREF. Returns the matrix unchanged when `v` is
    /// already implied, `None` when it contradicts the system, and the
    /// re-reduced matrix otherwise.
    pub fn rref_vec(&self, v: &SparseVector) -> Option<Matrix> {
        debug_assert!(self.is_rref());
        assert_eq!(v.len(), self.cols, "row length does not match column count");
        let v = self.reduce_row(v);
        let Some((lead, coeff)) = v.first_nonzero() else {
            return Some(self.clone());
        };
        if lead == self.cols - 1 {
            debug!("rref_vec: new equality contradicts the system");
            return None;
        }
        let coeff = coeff.clone();
        let v = v.scale_div(&coeff);
        let mut rows: Vec<SparseVector> = Vec::with_capacity(self.rows.len() + 1);
        let mut inserted = false;
        for row in &self.rows {
            let (pivot, _) = row.first_nonzero().expect("no zero rows in a reduced matrix");
            if !inserted && pivot > lead {
                rows.push(v.clone());
                inserted = true;
            }
            let c = row.get(lead);
            if c.is_zero() {
                rows.push(row.clone());
            } else {
                rows.push(row.sub_scaled(&v, &c));
            }
        }
        if !inserted {
            rows.push(v);
        }
        let m = Matrix { cols: self.cols, rows };
        debug_assert!(m.is_rref());
        Some(m)
    }

    /// Conjoin two reduced systems and re-reduce. `None` on inconsistency.
    ///
    /// Folds the rows of the smaller operand into the larger one.
    pub fn rref_matrix(&self, other: &Matrix) -> Option<Matrix> {
        assert_eq!(self.cols, other.cols, "column count mismatch");
        let (mut acc, small) = if self.num_rows() >= other.num_rows() {
            (self.clone(), other)
        } else {
            (other.clone(), self)
        };
        for row in &small.rows {
            acc = acc.rref_vec(row)?;
        }
        Some(acc)
    }

    /// True iff every row of `self` lies in the row span of `cover`, i.e.
    /// every equality of `self` is implied by `cover`. `cover` must be in
    /// RREF.
    pub fn is_covered_by(&self, cover: &Matrix) -> bool {
        assert_eq!(self.cols, cover.cols, "column count mismatch");
        self.rows.iter().all(|r| cover.reduce_row(r).is_zero())
    }

    /// The smallest affine subspace containing both operands: the lattice
    /// join. Both operands must be consistent systems in RREF.
    ///
    /// A linear form vanishes on the union of the two solution sets iff it
    /// lies in both row spans, so the result is the row-span intersection.
    /// It is computed with the Zassenhaus block construction: echelonize
    /// the rows `(r | r)` for `r` in `self` together with `(s | 0)` for `s`
    /// in `other`; the reduced rows whose left half vanished carry the
    /// intersection in their right half, already in echelon form.
    pub fn linear_disjunct(&self, other: &Matrix) -> Matrix {
        assert_eq!(self.cols, other.cols, "column count mismatch");
        debug_assert!(self.is_rref() && other.is_rref());
        let c = self.cols;
        let mut block: Vec<SparseVector> = Vec::with_capacity(self.num_rows() + other.num_rows());
        for r in &self.rows {
            let mut entries: Vec<(usize, Rational)> = Vec::with_capacity(2 * r.nnz());
            for (i, q) in r.iter() {
                entries.push((i, q.clone()));
            }
            for (i, q) in r.iter() {
                entries.push((i + c, q.clone()));
            }
            block.push(SparseVector::from_entries(2 * c, entries));
        }
        for s in &other.rows {
            let entries = s.iter().map(|(i, q)| (i, q.clone())).collect();
            block.push(SparseVector::from_entries(2 * c, entries));
        }
        let reduced = echelon(block);
        let mut rows = Vec::new();
        for row in reduced {
            match row.first_nonzero() {
                Some((lead, _)) if lead >= c => {
                    let entries = row.iter().map(|(i, q)| (i - c, q.clone())).collect();
                    rows.push(SparseVector::from_entries(c, entries));
                }
                _ => {}
            }
        }
        let m = Matrix { cols: c, rows };
        debug_assert!(m.is_rref());
        debug!("linear_disjunct: {} ⊔ {} rows -> {} rows", self.num_rows(), other.num_rows(), m.num_rows());
        m
    }

    /// Eliminate column `j` from the system and drop one row, preserving
    /// every equality that can be expressed without column `j`. Used to
    /// forget a variable.
    ///
    /// Pivots on the *last* row carrying a non-zero in column `j`: rows
    /// below it have a zero there already, so eliminating upward and
    /// dropping the pivot row keeps the matrix in RREF.
    pub fn reduce_col(&self, j: usize) -> Matrix {
        assert!(j < self.cols, "column {} out of range", j);
        let Some(r0) = self.rows.iter().rposition(|r| !r.get(j).is_zero()) else {
            return self.clone();
        };
        let axis = &self.rows[r0];
        let a = axis.get(j);
        let mut rows = Vec::with_capacity(self.rows.len() - 1);
        for (i, row) in self.rows.iter().enumerate() {
            if i == r0 {
                continue;
            }
            let c = row.get(j);
            if c.is_zero() {
                rows.push(row.clone());
            } else {
                rows.push(row.sub_scaled(axis, &(&c / &a)));
            }
        }
        Matrix { cols: self.cols, rows }
    }

    /// Insert all-zero columns at the listed positions of the *new* layout
    /// (sorted ascending). Used when variables enter the environment.
    pub fn add_empty_columns(&self, positions: &[usize]) -> Matrix {
        if positions.is_empty() {
            return self.clone();
        }
        Matrix {
            cols: self.cols + positions.len(),
            rows: self.rows.iter().map(|r| r.insert_zero_positions(positions)).collect(),
        }
    }

    /// Delete the listed columns (old layout, sorted ascending). Rows whose
    /// remaining entries all vanish are kept and must be dropped by the
    /// caller via [`remove_zero_rows`](Self::remove_zero_rows).
    pub fn del_cols(&self, positions: &[usize]) -> Matrix {
        if positions.is_empty() {
            return self.clone();
        }
        Matrix {
            cols: self.cols - positions.len(),
            rows: self.rows.iter().map(|r| r.remove_positions(positions)).collect(),
        }
    }

    /// Column `j` as a vector of length `num_rows`. Under the RREF
    /// invariant entries only appear in rows whose pivot is at most `j`,
    /// i.e. the column is upper-triangular with respect to the pivots.
    pub fn get_col_upper_triangular(&self, j: usize) -> SparseVector {
        assert!(j < self.cols, "column {} out of range", j);
        let mut col = SparseVector::zero(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            col.set(i, row.get(j));
        }
        col
    }

    /// Overwrite column `j` with the given values (length `num_rows`).
    pub fn set_col(&self, j: usize, col: &SparseVector) -> Matrix {
        assert!(j < self.cols, "column {} out of range", j);
        assert_eq!(col.len(), self.rows.len(), "column length does not match row count");
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let mut row = row.clone();
                row.set(j, col.get(i));
                row
            })
            .collect();
        Matrix { cols: self.cols, rows }
    }
}

fn leads_at_constant(row: &SparseVector, cols: usize) -> bool {
    matches!(row.first_nonzero(), Some((lead, _)) if lead == cols - 1)
}

/// Incremental Gaussian elimination. The accumulated basis is kept in
/// reduced row-echelon form at all times; zero rows are discarded.
fn echelon(rows: Vec<SparseVector>) -> Vec<SparseVector> {
    let mut basis: Vec<SparseVector> = Vec::new();
    for row in rows {
        // reduce by the pivots collected so far
        let mut row = row;
        for b in &basis {
            let (pivot, _) = b.first_nonzero().expect("no zero rows in the basis");
            let c = row.get(pivot);
            if !c.is_zero() {
                row = row.sub_scaled(b, &c);
            }
        }
        let Some((lead, coeff)) = row.first_nonzero() else {
            continue;
        };
        let coeff = coeff.clone();
        let row = row.scale_div(&coeff);
        for b in basis.iter_mut() {
            let c = b.get(lead);
            if !c.is_zero() {
                *b = b.sub_scaled(&row, &c);
            }
        }
        let pos = basis.partition_point(|b| match b.first_nonzero() {
            Some((pivot, _)) => pivot < lead,
            None => false,
        });
        basis.insert(pos, row);
    }
    basis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rational::int;

    use test_log::test;

    fn row(values: &[i64]) -> SparseVector {
        SparseVector::from_dense(values.iter().map(|&n| int(n)).collect())
    }

    fn matrix(cols: usize, rows: &[&[i64]]) -> Matrix {
        Matrix::from_rows(cols, rows.iter().map(|r| row(r)).collect())
    }

    #[test]
    fn test_normalize_simple() {
        // 2x - 2y = 0 and x + y - 2 = 0  ==>  x = 1, y = 1
        let m = matrix(3, &[&[2, -2, 0], &[1, 1, -2]]);
        let n = m.normalize().unwrap();
        assert!(n.is_rref());
        assert_eq!(n, matrix(3, &[&[1, 0, -1], &[0, 1, -1]]));
    }

    #[test]
    fn test_normalize_drops_redundant_rows() {
        let m = matrix(3, &[&[1, -1, 0], &[2, -2, 0], &[3, -3, 0]]);
        let n = m.normalize().unwrap();
        assert_eq!(n.num_rows(), 1);
        assert_eq!(n, matrix(3, &[&[1, -1, 0]]));
    }

    #[test]
    fn test_normalize_inconsistent() {
        // x = 0 and x = 1
        let m = matrix(2, &[&[1, 0], &[1, -1]]);
        assert_eq!(m.normalize(), None);
    }

    #[test]
    fn test_rref_vec_insert() {
        let m = matrix(4, &[&[1, 0, -1, 0]]).normalize().unwrap();
        // add y - 2 = 0 (pivot between the existing pivot and the constant)
        let n = m.rref_vec(&row(&[0, 1, 0, -2])).unwrap();
        assert!(n.is_rref());
        assert_eq!(n, matrix(4, &[&[1, 0, -1, 0], &[0, 1, 0, -2]]));
    }

    #[test]
    fn test_rref_vec_implied_is_identity() {
        let m = matrix(3, &[&[1, -1, 0]]);
        let n = m.rref_vec(&row(&[2, -2, 0])).unwrap();
        assert_eq!(n, m);
    }

    #[test]
    fn test_rref_vec_contradiction() {
        let m = matrix(2, &[&[1, 0]]); // x = 0
        assert_eq!(m.rref_vec(&row(&[1, -1])), None); // x = 1
    }

    #[test]
    fn test_rref_matrix_meet() {
        // {x - y = 0} ⊓ {y - 1 = 0} = {x = 1, y = 1}
        let a = matrix(3, &[&[1, -1, 0]]);
        let b = matrix(3, &[&[0, 1, -1]]);
        let m = a.rref_matrix(&b).unwrap();
        assert_eq!(m, matrix(3, &[&[1, 0, -1], &[0, 1, -1]]));
    }

    #[test]
    fn test_is_covered_by() {
        let sub = matrix(3, &[&[1, 0, -1], &[0, 1, -1]]); // x = 1, y = 1
        let sup = matrix(3, &[&[1, -1, 0]]); // x = y
        assert!(sup.is_covered_by(&sub));
        assert!(!sub.is_covered_by(&sup));
        // the empty system covers nothing but is covered by everything
        let top = Matrix::new(3);
        assert!(top.is_covered_by(&sub));
        assert!(!sub.is_covered_by(&top));
    }

    #[test]
    fn test_linear_disjunct_drops_differing_constants() {
        // {x = 1} ⊔ {x = 2} over one variable: no equality survives
        let a = matrix(2, &[&[1, -1]]);
        let b = matrix(2, &[&[1, -2]]);
        let j = a.linear_disjunct(&b);
        assert!(j.is_empty());
    }

    #[test]
    fn test_linear_disjunct_keeps_common_relation() {
        // {x = 1, y = 1} ⊔ {x = 2, y = 2} = {x - y = 0}
        let a = matrix(3, &[&[1, 0, -1], &[0, 1, -1]]);
        let b = matrix(3, &[&[1, 0, -2], &[0, 1, -2]]);
        let j = a.linear_disjunct(&b);
        assert_eq!(j, matrix(3, &[&[1, -1, 0]]));
    }

    #[test]
    fn test_linear_disjunct_identical_inputs() {
        let a = matrix(3, &[&[1, -1, 0]]);
        let j = a.linear_disjunct(&a);
        assert_eq!(j, a);
    }

    #[test]
    fn test_linear_disjunct_with_top() {
        let a = matrix(3, &[&[1, -1, 0]]);
        let top = Matrix::new(3);
        assert!(a.linear_disjunct(&top).is_empty());
        assert!(top.linear_disjunct(&a).is_empty());
    }

    #[test]
    fn test_reduce_col_preserves_other_relations() {
        // {x - z = 0, y - z = 0}, forget z: x - y = 0 survives
        let m = matrix(4, &[&[1, 0, -1, 0], &[0, 1, -1, 0]]);
        let r = m.reduce_col(2);
        assert!(r.is_rref());
        assert_eq!(r, matrix(4, &[&[1, -1, 0, 0]]));
    }

    #[test]
    fn test_reduce_col_pivot_column() {
        // forgetting a pivot variable drops exactly its row
        let m = matrix(3, &[&[1, 0, -1], &[0, 1, -1]]);
        let r = m.reduce_col(1);
        assert_eq!(r, matrix(3, &[&[1, 0, -1]]));
    }

    #[test]
    fn test_reduce_col_absent_column() {
        let m = matrix(3, &[&[1, 0, -1]]);
        assert_eq!(m.reduce_col(1), m);
    }

    #[test]
    fn test_add_and_del_cols() {
        let m = matrix(3, &[&[1, -1, 0]]);
        let wider = m.add_empty_columns(&[1, 2]);
        assert_eq!(wider.num_cols(), 5);
        assert_eq!(wider, matrix(5, &[&[1, 0, 0, -1, 0]]));
        let back = wider.del_cols(&[1, 2]);
        assert_eq!(back, m);
    }

    #[test]
    fn test_del_cols_can_zero_rows() {
        let m = matrix(3, &[&[1, 0, 0], &[0, 1, -1]]);
        let d = m.del_cols(&[0]).remove_zero_rows();
        assert_eq!(d, matrix(2, &[&[1, -1]]));
    }

    #[test]
    fn test_get_set_col() {
        let m = matrix(3, &[&[1, 0, -1], &[0, 1, -2]]);
        let col = m.get_col_upper_triangular(2);
        assert_eq!(col, row(&[-1, -2]));
        let swapped = m.set_col(2, &row(&[0, 0]));
        assert_eq!(swapped, matrix(3, &[&[1, 0, 0], &[0, 1, 0]]));
    }

    #[test]
    fn test_rational_pivots() {
        use crate::rational::frac;
        // 2x + 3y - 1 = 0 normalizes to x + 3/2 y - 1/2 = 0
        let m = matrix(3, &[&[2, 3, -1]]);
        let n = m.normalize().unwrap();
        let r = n.get_row(0);
        assert_eq!(r.get(0), int(1));
        assert_eq!(r.get(1), frac(3, 2));
        assert_eq!(r.get(2), frac(-1, 2));
    }
}
