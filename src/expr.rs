//! Expression and constraint trees accepted by the domain.
//!
//! The domain consumes a small affine dialect: constants, variables,
//! negation, value-preserving casts, addition, subtraction, and
//! multiplication. Anything else never reaches the core (the driver
//! rejects it first), and a `Mul` without a constant factor on at least
//! one side is reported as not affine by the linearizer.
//!
//! Builder methods mirror the tree constructors so call sites read like
//! the formulas they encode:
//!
//! ```
//! use karr_rs::expr::Texpr;
//! use karr_rs::env::Var;
//!
//! // x + 2*y - 1 == 0
//! let x = Var::new("x");
//! let y = Var::new("y");
//! let cons = Texpr::var(x)
//!     .add(Texpr::int(2).mul(Texpr::var(y)))
//!     .sub(Texpr::int(1))
//!     .eq0();
//! assert_eq!(cons.to_string(), "x + 2 * y - 1 = 0");
//! ```

use std::fmt;

use crate::env::Var;
use crate::rational::{self, Rational};

/// An affine expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Texpr {
    Const(Rational),
    Var(Var),
    Neg(Box<Texpr>),
    /// A cast the caller guarantees cannot alter the rational value; the
    /// domain treats it as transparent.
    Cast(Box<Texpr>),
    Add(Box<Texpr>, Box<Texpr>),
    Sub(Box<Texpr>, Box<Texpr>),
    Mul(Box<Texpr>, Box<Texpr>),
}

impl Texpr {
    pub fn var(v: Var) -> Self {
        Texpr::Var(v)
    }

    pub fn constant(q: Rational) -> Self {
        Texpr::Const(q)
    }

    pub fn int(n: i64) -> Self {
        Texpr::Const(rational::int(n))
    }

    pub fn neg(self) -> Self {
        Texpr::Neg(Box::new(self))
    }

    pub fn cast(self) -> Self {
        Texpr::Cast(Box::new(self))
    }

    pub fn add(self, other: Self) -> Self {
        Texpr::Add(Box::new(self), Box::new(other))
    }

    pub fn sub(self, other: Self) -> Self {
        Texpr::Sub(Box::new(self), Box::new(other))
    }

    pub fn mul(self, other: Self) -> Self {
        Texpr::Mul(Box::new(self), Box::new(other))
    }

    /// Constraint `self = 0`.
    pub fn eq0(self) -> Tcons {
        Tcons::new(self, ConsOp::Eq)
    }

    /// Constraint `self ≠ 0`.
    pub fn diseq0(self) -> Tcons {
        Tcons::new(self, ConsOp::Diseq)
    }

    /// Constraint `self > 0`.
    pub fn gt0(self) -> Tcons {
        Tcons::new(self, ConsOp::Sup)
    }

    /// Constraint `self ≥ 0`.
    pub fn ge0(self) -> Tcons {
        Tcons::new(self, ConsOp::Supeq)
    }
}

impl fmt::Display for Texpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Texpr::Const(q) => write!(f, "{}", q),
            Texpr::Var(v) => write!(f, "{}", v),
            Texpr::Neg(e) => write!(f, "-({})", e),
            Texpr::Cast(e) => write!(f, "{}", e),
            Texpr::Add(a, b) => write!(f, "{} + {}", a, b),
            Texpr::Sub(a, b) => match b.as_ref() {
                Texpr::Const(_) | Texpr::Var(_) => write!(f, "{} - {}", a, b),
                _ => write!(f, "{} - ({})", a, b),
            },
            Texpr::Mul(a, b) => {
                match a.as_ref() {
                    Texpr::Const(_) | Texpr::Var(_) => write!(f, "{}", a)?,
                    _ => write!(f, "({})", a)?,
                }
                write!(f, " * ")?;
                match b.as_ref() {
                    Texpr::Const(_) | Texpr::Var(_) => write!(f, "{}", b),
                    _ => write!(f, "({})", b),
                }
            }
        }
    }
}

/// Comparison of an affine expression against zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsOp {
    /// `e = 0`
    Eq,
    /// `e ≠ 0`
    Diseq,
    /// `e > 0` (strict)
    Sup,
    /// `e ≥ 0`
    Supeq,
}

/// A linear constraint `expr OP 0`.
#[derive(Clone, Debug, PartialEq)]
pub struct Tcons {
    pub expr: Texpr,
    pub op: ConsOp,
}

impl Tcons {
    pub fn new(expr: Texpr, op: ConsOp) -> Self {
        Self { expr, op }
    }

    /// The logical negation of the constraint:
    /// `e = 0` ↔ `e ≠ 0`, `e > 0` ↔ `-e ≥ 0`, `e ≥ 0` ↔ `-e > 0`.
    pub fn negate(&self) -> Tcons {
        match self.op {
            ConsOp::Eq => Tcons::new(self.expr.clone(), ConsOp::Diseq),
            ConsOp::Diseq => Tcons::new(self.expr.clone(), ConsOp::Eq),
            ConsOp::Sup => Tcons::new(self.expr.clone().neg(), ConsOp::Supeq),
            ConsOp::Supeq => Tcons::new(self.expr.clone().neg(), ConsOp::Sup),
        }
    }
}

impl fmt::Display for Tcons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            ConsOp::Eq => "=",
            ConsOp::Diseq => "≠",
            ConsOp::Sup => ">",
            ConsOp::Supeq => "≥",
        };
        write!(f, "{} {} 0", self.expr, op)
    }
}
