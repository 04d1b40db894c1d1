//! Exact rational scalars.
//!
//! The whole domain computes over ℚ: comparisons and the four field
//! operations are exact, and there is no rounding anywhere. We reuse
//! [`num_rational::BigRational`] (arbitrary-precision numerator and
//! denominator, always kept reduced) instead of hand-rolling a fraction
//! type; this module only adds the construction helpers the rest of the
//! crate needs.
//!
//! Division by zero panics inside `num-rational`. That is intentional: a
//! zero divisor in this crate is always a programming error (a pivot that
//! was supposed to be non-zero), never a recoverable condition.

use num_bigint::BigInt;
use num_rational::BigRational;

/// Exact rational scalar used throughout the crate.
pub type Rational = BigRational;

/// The rational `n/1`.
pub fn int(n: i64) -> Rational {
    Rational::from_integer(BigInt::from(n))
}

/// The rational `numer/denom`, reduced.
///
/// # Panics
///
/// Panics if `denom == 0`.
pub fn frac(numer: i64, denom: i64) -> Rational {
    assert_ne!(denom, 0, "zero denominator");
    Rational::new(BigInt::from(numer), BigInt::from(denom))
}

/// The exact rational value of a machine float.
///
/// Every finite `f64` is a dyadic rational and converts without loss;
/// `None` for NaN and infinities.
pub fn from_f64(value: f64) -> Option<Rational> {
    Rational::from_float(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::{One, Zero};

    #[test]
    fn test_int_and_frac() {
        assert_eq!(int(0), Rational::zero());
        assert_eq!(int(1), Rational::one());
        assert_eq!(frac(2, 4), frac(1, 2));
        assert_eq!(frac(3, -6), frac(-1, 2));
        assert_eq!(int(7).numer(), &num_bigint::BigInt::from(7));
        assert_eq!(int(7).denom(), &num_bigint::BigInt::from(1));
    }

    #[test]
    fn test_exact_arithmetic() {
        let a = frac(1, 3);
        let b = frac(1, 6);
        assert_eq!(&a + &b, frac(1, 2));
        assert_eq!(&a - &b, frac(1, 6));
        assert_eq!(&a * &b, frac(1, 18));
        assert_eq!(&a / &b, int(2));
    }

    #[test]
    fn test_from_f64_is_exact() {
        // 0.5 is a dyadic rational
        assert_eq!(from_f64(0.5), Some(frac(1, 2)));
        // 0.1 is not representable; the conversion captures the float bits exactly
        let q = from_f64(0.1).unwrap();
        assert_ne!(q, frac(1, 10));
        assert_eq!(q, Rational::new(BigInt::from(3602879701896397i64), BigInt::from(36028797018963968i64)));
        assert_eq!(from_f64(f64::NAN), None);
        assert_eq!(from_f64(f64::INFINITY), None);
    }

    #[test]
    fn test_integer_detection() {
        assert!(int(4).is_integer());
        assert!(frac(8, 2).is_integer());
        assert!(!frac(1, 2).is_integer());
    }

    #[test]
    #[should_panic(expected = "zero denominator")]
    fn test_zero_denominator_panics() {
        let _ = frac(1, 0);
    }
}
