//! Sparse vectors over exact rationals.
//!
//! A [`SparseVector`] is semantically a dense element of ℚⁿ, stored as its
//! length together with the list of non-zero entries sorted by index. The
//! length is part of the value: two vectors of different length are never
//! equal.
//!
//! # Invariants
//!
//! - Every stored index `i` satisfies `0 <= i < len`, with no duplicates.
//! - Every stored value is non-zero. Operations that can produce zeros
//!   (subtraction that cancels, scaling by zero) drop the entry instead of
//!   materializing it; the matrix layer's echelon-form invariant depends on
//!   this.

use std::fmt;

use num_traits::Zero;

use crate::rational::Rational;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SparseVector {
    len: usize,
    entries: Vec<(usize, Rational)>,
}

impl SparseVector {
    /// The all-zero vector of the given length.
    pub fn zero(len: usize) -> Self {
        Self { len, entries: Vec::new() }
    }

    /// The unit vector with a single `1` at index `i`.
    pub fn unit(len: usize, i: usize) -> Self {
        assert!(i < len, "index {} out of range for length {}", i, len);
        Self {
            len,
            entries: vec![(i, Rational::from_integer(1.into()))],
        }
    }

    /// Build a vector from pre-sorted non-zero entries.
    ///
    /// # Panics
    ///
    /// Panics if the entries are not strictly sorted by index, contain a
    /// zero value, or an index out of range.
    pub fn from_entries(len: usize, entries: Vec<(usize, Rational)>) -> Self {
        for window in entries.windows(2) {
            assert!(window[0].0 < window[1].0, "entries must be strictly sorted by index");
        }
        for (i, q) in &entries {
            assert!(*i < len, "index {} out of range for length {}", i, len);
            assert!(!q.is_zero(), "explicit zero entry at index {}", i);
        }
        Self { len, entries }
    }

    /// Build a vector from a dense list of values, dropping zeros.
    pub fn from_dense(values: Vec<Rational>) -> Self {
        let len = values.len();
        let entries = values
            .into_iter()
            .enumerate()
            .filter(|(_, q)| !q.is_zero())
            .collect();
        Self { len, entries }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of non-zero entries.
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    /// The value at index `i` (zero if no entry is stored).
    pub fn get(&self, i: usize) -> Rational {
        assert!(i < self.len, "index {} out of range for length {}", i, self.len);
        match self.entries.binary_search_by_key(&i, |(j, _)| *j) {
            Ok(pos) => self.entries[pos].1.clone(),
            Err(_) => Rational::zero(),
        }
    }

    /// Set index `i` to `value`, inserting, updating, or removing the entry
    /// so that no explicit zero is ever stored.
    pub fn set(&mut self, i: usize, value: Rational) {
        assert!(i < self.len, "index {} out of range for length {}", i, self.len);
        match self.entries.binary_search_by_key(&i, |(j, _)| *j) {
            Ok(pos) => {
                if value.is_zero() {
                    self.entries.remove(pos);
                } else {
                    self.entries[pos].1 = value;
                }
            }
            Err(pos) => {
                if !value.is_zero() {
                    self.entries.insert(pos, (i, value));
                }
            }
        }
    }

    /// The first non-zero entry, i.e. the leading coefficient.
    pub fn first_nonzero(&self) -> Option<(usize, &Rational)> {
        self.entries.first().map(|(i, q)| (*i, q))
    }

    /// True iff at most the last coordinate (the constant column) is
    /// non-zero. The zero vector is constant.
    pub fn is_constant(&self) -> bool {
        match self.entries.as_slice() {
            [] => true,
            [(i, _)] => *i == self.len - 1,
            _ => false,
        }
    }

    /// Iterate over the non-zero entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Rational)> {
        self.entries.iter().map(|(i, q)| (*i, q))
    }

    /// Apply `f` to the non-zero entries only; requires `f(0) = 0`.
    pub fn map_preserving_zero<F>(&self, f: F) -> Self
    where
        F: Fn(&Rational) -> Rational,
    {
        let entries = self
            .entries
            .iter()
            .filter_map(|(i, q)| {
                let r = f(q);
                if r.is_zero() {
                    None
                } else {
                    Some((*i, r))
                }
            })
            .collect();
        Self { len: self.len, entries }
    }

    /// Index-sensitive variant of [`map_preserving_zero`](Self::map_preserving_zero).
    pub fn mapi_preserving_zero<F>(&self, f: F) -> Self
    where
        F: Fn(usize, &Rational) -> Rational,
    {
        let entries = self
            .entries
            .iter()
            .filter_map(|(i, q)| {
                let r = f(*i, q);
                if r.is_zero() {
                    None
                } else {
                    Some((*i, r))
                }
            })
            .collect();
        Self { len: self.len, entries }
    }

    /// Merge two vectors entrywise; requires `f(0, 0) = 0`.
    ///
    /// The two sorted entry streams are merged in one pass; `f` is applied
    /// wherever at least one side is non-zero, and zero results are dropped.
    pub fn map2_preserving_zero<F>(&self, other: &Self, f: F) -> Self
    where
        F: Fn(&Rational, &Rational) -> Rational,
    {
        assert_eq!(self.len, other.len, "vector length mismatch");
        let zero = Rational::zero();
        let mut entries = Vec::with_capacity(self.entries.len() + other.entries.len());
        let mut xs = self.entries.iter().peekable();
        let mut ys = other.entries.iter().peekable();
        loop {
            let (i, r) = match (xs.peek(), ys.peek()) {
                (Some((ix, qx)), Some((iy, qy))) => {
                    if ix < iy {
                        let r = (*ix, f(qx, &zero));
                        xs.next();
                        r
                    } else if iy < ix {
                        let r = (*iy, f(&zero, qy));
                        ys.next();
                        r
                    } else {
                        let r = (*ix, f(qx, qy));
                        xs.next();
                        ys.next();
                        r
                    }
                }
                (Some((ix, qx)), None) => {
                    let r = (*ix, f(qx, &zero));
                    xs.next();
                    r
                }
                (None, Some((iy, qy))) => {
                    let r = (*iy, f(&zero, qy));
                    ys.next();
                    r
                }
                (None, None) => break,
            };
            if !r.is_zero() {
                entries.push((i, r));
            }
        }
        Self { len: self.len, entries }
    }

    /// Scale every entry by `c`.
    pub fn scale(&self, c: &Rational) -> Self {
        self.map_preserving_zero(|q| q * c)
    }

    /// Divide every entry by `c`.
    ///
    /// # Panics
    ///
    /// Panics (inside the scalar layer) if `c` is zero.
    pub fn scale_div(&self, c: &Rational) -> Self {
        self.map_preserving_zero(|q| q / c)
    }

    /// Coefficient-wise negation.
    pub fn neg(&self) -> Self {
        self.map_preserving_zero(|q| -q)
    }

    pub fn add(&self, other: &Self) -> Self {
        self.map2_preserving_zero(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.map2_preserving_zero(other, |a, b| a - b)
    }

    /// `self - c * other`, the elementary row operation.
    pub fn sub_scaled(&self, other: &Self, c: &Rational) -> Self {
        self.map2_preserving_zero(other, |a, b| a - &(b * c))
    }

    /// Insert all-zero coordinates so that the listed positions (given in
    /// the *new* layout, sorted ascending) become fresh zero columns.
    pub fn insert_zero_positions(&self, positions: &[usize]) -> Self {
        debug_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        let len = self.len + positions.len();
        let mut shift = 0usize;
        let mut pos = positions.iter().peekable();
        let entries = self
            .entries
            .iter()
            .map(|(i, q)| {
                while let Some(&&p) = pos.peek() {
                    if p <= i + shift {
                        shift += 1;
                        pos.next();
                    } else {
                        break;
                    }
                }
                (i + shift, q.clone())
            })
            .collect();
        Self { len, entries }
    }

    /// Remove the listed coordinates (given in the *old* layout, sorted
    /// ascending). Entries at removed positions are dropped.
    pub fn remove_positions(&self, positions: &[usize]) -> Self {
        debug_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        let len = self.len - positions.len();
        let mut removed = 0usize;
        let mut pos = positions.iter().peekable();
        let mut entries = Vec::with_capacity(self.entries.len());
        for (i, q) in &self.entries {
            while let Some(&&p) = pos.peek() {
                if p < *i {
                    removed += 1;
                    pos.next();
                } else {
                    break;
                }
            }
            if pos.peek() == Some(&i) {
                continue;
            }
            entries.push((i - removed, q.clone()));
        }
        Self { len, entries }
    }
}

impl fmt::Display for SparseVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        let mut next = self.entries.iter().peekable();
        for i in 0..self.len {
            if i > 0 {
                write!(f, ", ")?;
            }
            match next.peek() {
                Some((j, q)) if *j == i => {
                    write!(f, "{}", q)?;
                    next.next();
                }
                _ => write!(f, "0")?,
            }
        }
        write!(f, ")")
    }
}
