//! Linearization of expression trees into coefficient vectors.
//!
//! An expression over an environment of `n` variables linearizes to a
//! vector of length `n + 1`: one coefficient per variable plus the
//! constant term in the last coordinate. Variable leaves consult the
//! current equality system first: when the system pins the variable to a
//! constant (a row with a single pivot and a constant entry), the constant
//! is substituted, which lets products like `x * y` linearize whenever one
//! factor is known.

use std::error::Error;
use std::fmt;

use num_traits::{One, Zero};

use crate::env::Environment;
use crate::expr::Texpr;
use crate::matrix::Matrix;
use crate::rational::Rational;
use crate::vector::SparseVector;

/// The expression has no affine meaning over the current state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotAffine;

impl fmt::Display for NotAffine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expression is not affine")
    }
}

impl Error for NotAffine {}

/// Convert `expr` into a coefficient vector of length `env.size() + 1`.
///
/// `m`, when present, is the state's equality system in RREF; it is only
/// consulted to substitute variables the system proves constant.
pub fn linearize(m: Option<&Matrix>, env: &Environment, expr: &Texpr) -> Result<SparseVector, NotAffine> {
    let cols = env.size() + 1;
    match expr {
        Texpr::Const(q) => {
            let mut v = SparseVector::zero(cols);
            v.set(cols - 1, q.clone());
            Ok(v)
        }
        Texpr::Var(x) => {
            let j = env.dim_of_var(x).ok_or(NotAffine)?;
            if let Some(q) = m.and_then(|m| constant_of(m, j)) {
                let mut v = SparseVector::zero(cols);
                v.set(cols - 1, q);
                return Ok(v);
            }
            Ok(SparseVector::unit(cols, j))
        }
        Texpr::Neg(e) => Ok(linearize(m, env, e)?.neg()),
        Texpr::Cast(e) => linearize(m, env, e),
        Texpr::Add(a, b) => Ok(linearize(m, env, a)?.add(&linearize(m, env, b)?)),
        Texpr::Sub(a, b) => Ok(linearize(m, env, a)?.sub(&linearize(m, env, b)?)),
        Texpr::Mul(a, b) => {
            let va = linearize(m, env, a)?;
            let vb = linearize(m, env, b)?;
            if va.is_constant() {
                Ok(vb.scale(&va.get(cols - 1)))
            } else if vb.is_constant() {
                Ok(va.scale(&vb.get(cols - 1)))
            } else {
                Err(NotAffine)
            }
        }
    }
}

/// The constant the system forces column `j` to, if any: a row pivoted at
/// `j` whose only other entry sits in the constant column means `xⱼ = -k`.
fn constant_of(m: &Matrix, j: usize) -> Option<Rational> {
    let cols = m.num_cols();
    for row in m.rows() {
        let (pivot, lead) = row.first_nonzero()?;
        if pivot > j {
            return None;
        }
        if pivot == j {
            debug_assert!(lead.is_one());
            return match row.nnz() {
                1 => Some(Rational::from_integer(0.into())),
                2 if !row.get(cols - 1).is_zero() => Some(-row.get(cols - 1)),
                _ => None,
            };
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Var;
    use crate::rational::{frac, int};

    fn env_xyz() -> Environment {
        Environment::of_ints(["x", "y", "z"])
    }

    fn vec_of(values: &[i64]) -> SparseVector {
        SparseVector::from_dense(values.iter().map(|&n| int(n)).collect())
    }

    #[test]
    fn test_const_and_var() {
        let env = env_xyz();
        let v = linearize(None, &env, &Texpr::int(5)).unwrap();
        assert_eq!(v, vec_of(&[0, 0, 0, 5]));
        let v = linearize(None, &env, &Texpr::var(Var::new("y"))).unwrap();
        assert_eq!(v, vec_of(&[0, 1, 0, 0]));
    }

    #[test]
    fn test_unknown_variable() {
        let env = env_xyz();
        assert_eq!(linearize(None, &env, &Texpr::var(Var::new("w"))), Err(NotAffine));
    }

    #[test]
    fn test_affine_combination() {
        let env = env_xyz();
        // 2*x - (y - 3) = 2x - y + 3
        let e = Texpr::int(2)
            .mul(Texpr::var(Var::new("x")))
            .sub(Texpr::var(Var::new("y")).sub(Texpr::int(3)));
        let v = linearize(None, &env, &e).unwrap();
        assert_eq!(v, vec_of(&[2, -1, 0, 3]));
    }

    #[test]
    fn test_neg_and_cast() {
        let env = env_xyz();
        let e = Texpr::var(Var::new("z")).cast().neg();
        let v = linearize(None, &env, &e).unwrap();
        assert_eq!(v, vec_of(&[0, 0, -1, 0]));
    }

    #[test]
    fn test_mul_needs_constant_side() {
        let env = env_xyz();
        let e = Texpr::var(Var::new("x")).mul(Texpr::var(Var::new("y")));
        assert_eq!(linearize(None, &env, &e), Err(NotAffine));
    }

    #[test]
    fn test_mul_with_known_constant_row() {
        let env = env_xyz();
        // system: y = 3 (row y - 3 = 0)
        let m = Matrix::from_rows(4, vec![vec_of(&[0, 1, 0, -3])]);
        let e = Texpr::var(Var::new("x")).mul(Texpr::var(Var::new("y")));
        let v = linearize(Some(&m), &env, &e).unwrap();
        assert_eq!(v, vec_of(&[3, 0, 0, 0]));
    }

    #[test]
    fn test_constant_row_zero() {
        let env = env_xyz();
        // system: x = 0 (single-entry row)
        let m = Matrix::from_rows(4, vec![vec_of(&[1, 0, 0, 0])]);
        let v = linearize(Some(&m), &env, &Texpr::var(Var::new("x"))).unwrap();
        assert!(v.is_zero());
    }

    #[test]
    fn test_non_constant_row_is_not_substituted() {
        let env = env_xyz();
        // system: x - y = 0 pins nothing
        let m = Matrix::from_rows(4, vec![vec_of(&[1, -1, 0, 0])]);
        let v = linearize(Some(&m), &env, &Texpr::var(Var::new("x"))).unwrap();
        assert_eq!(v, vec_of(&[1, 0, 0, 0]));
    }

    #[test]
    fn test_rational_coefficients() {
        let env = env_xyz();
        let e = Texpr::constant(frac(1, 2)).mul(Texpr::var(Var::new("x")));
        let v = linearize(None, &env, &e).unwrap();
        assert_eq!(v.get(0), frac(1, 2));
        assert_eq!(v.nnz(), 1);
    }
}
