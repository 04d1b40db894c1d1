//! # karr-rs: Affine Equalities for Static Analysis
//!
//! **`karr-rs`** implements the classical **affine-equality relational domain** (Karr, 1976)
//! used by abstract interpreters for C-like programs. At each program point, a state
//! captures the *affine hull* of the reachable stores: the set of stores satisfying a
//! conjunction of linear equalities `a₁x₁ + … + aₙxₙ + k = 0` over the program variables.
//!
//! ## What makes it work?
//!
//! Every state keeps its equality system in **reduced row-echelon form** over exact
//! rationals. The form is **canonical** --- for a fixed environment, every affine subspace
//! has exactly one representation --- so equality checks are structural, inclusion is a
//! cheap span test, and no precision is ever lost to rounding.
//!
//! ## Key Features
//!
//! - **Exact arithmetic**: all coefficients are arbitrary-precision rationals
//!   ([`num_rational::BigRational`]); there is no floating point in the core.
//! - **Sparse representation**: rows are sorted index/value lists; elimination never
//!   materializes zeros, so cost tracks the number of non-zero coefficients.
//! - **Full lattice**: order, meet, join (affine hull of the union), widening and
//!   narrowing, with the usual ⊥/⊤ conventions.
//! - **Transfer functions**: invertible and non-invertible assignment, parallel
//!   assignment, backward substitution, guards, variable projection, and exact
//!   constant bounds.
//! - **Pure values**: every operation is functional; states can be shared freely
//!   across threads.
//!
//! ## Basic Usage
//!
//! ```rust
//! use karr_rs::{AffEq, Environment, Texpr, Var};
//!
//! // 1. Fix the environment (the column layout)
//! let env = Environment::of_ints(["x", "y"]);
//! let x = Var::new("x");
//! let y = Var::new("y");
//!
//! // 2. Restrict ⊤ with a guard: x - y == 0
//! let t = AffEq::top_env(&env)
//!     .meet_tcons(&Texpr::var(x.clone()).sub(Texpr::var(y.clone())).eq0());
//! assert_eq!(t.to_string(), "[|x-y=0|]");
//!
//! // 3. The assignment x := x + 1 rewrites the relation
//! let t = t.assign_exp(&x, &Texpr::var(x.clone()).add(Texpr::int(1)));
//! assert_eq!(t.to_string(), "[|x-y-1=0|]");
//!
//! // 4. Learning y pins x exactly
//! let t = t.meet_tcons(&Texpr::var(y).sub(Texpr::int(4)).eq0());
//! assert_eq!(t.to_string(), "[|x-5=0; y-4=0|]");
//! ```
//!
//! ## Core Components
//!
//! - **[`domain`]**: the heart of the library. Contains the [`AffEq`][crate::domain::AffEq]
//!   state and all lattice/transfer operations.
//! - **[`matrix`]**: the sparse row-echelon engine the domain drives.
//! - **[`linearize`]**: translation from expression trees to coefficient vectors.
//! - **[`env`]**: ordered, typed variable environments and column-edit scripts.
//!
//! For the algorithmic details (row-span joins, column reduction, the echelon
//! invariant), see the [`matrix`] module documentation.

pub mod domain;
pub mod env;
pub mod expr;
pub mod linearize;
pub mod matrix;
pub mod rational;
pub mod vector;

pub use domain::AffEq;
pub use env::{EnvMismatch, Environment, Var, VarSort};
pub use expr::{ConsOp, Tcons, Texpr};
pub use linearize::{linearize, NotAffine};
pub use matrix::Matrix;
pub use rational::Rational;
pub use vector::SparseVector;
