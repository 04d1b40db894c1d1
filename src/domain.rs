//! The affine-equality abstract domain.
//!
//! A state is a pair of an optional equality system and the environment
//! that fixes its column layout. `d = None` is ⊥ (a contradiction was
//! derived); an empty system is ⊤ over its environment; otherwise the
//! system is kept in reduced row-echelon form and describes the affine
//! subspace `{x : m·[x;1] = 0}` --- the affine hull of the reachable stores,
//! following Karr's construction.
//!
//! All operations are functional: inputs are read-only, outputs are fresh
//! values. The only in-place variant is
//! [`assign_var_parallel_with`](AffEq::assign_var_parallel_with), a
//! convenience that overwrites a caller-owned state.
//!
//! # Lattice
//!
//! - order: `a ⊑ b` iff every equality of `b` is implied by `a`;
//! - meet: conjoin the two systems (`None` on contradiction);
//! - join: smallest affine subspace containing both operands;
//! - widening: join when the environments coincide --- each environment
//!   admits only finitely many affine subspaces, so join already
//!   terminates and no extrapolation happens; with different environments
//!   the newer state wins.

use std::fmt;

use log::debug;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};

use crate::env::{Environment, Var, VarSort};
use crate::expr::{ConsOp, Tcons, Texpr};
use crate::linearize::linearize;
use crate::matrix::Matrix;
use crate::rational::Rational;
use crate::vector::SparseVector;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AffEq {
    d: Option<Matrix>,
    env: Environment,
}

impl AffEq {
    /// ⊤ over the empty environment.
    pub fn top() -> Self {
        Self::top_env(&Environment::empty())
    }

    /// ⊤ over the given environment: an empty equality system.
    pub fn top_env(env: &Environment) -> Self {
        Self {
            d: Some(Matrix::new(env.size() + 1)),
            env: env.clone(),
        }
    }

    /// ⊥ over the empty environment.
    pub fn bot() -> Self {
        Self::bot_env(&Environment::empty())
    }

    /// ⊥ over the given environment.
    pub fn bot_env(env: &Environment) -> Self {
        Self { d: None, env: env.clone() }
    }

    pub fn is_bot(&self) -> bool {
        self.d.is_none() && self.env.is_empty()
    }

    /// True iff the state carries a contradiction, whatever its
    /// environment.
    pub fn is_bot_env(&self) -> bool {
        self.d.is_none()
    }

    pub fn is_top(&self) -> bool {
        self.is_top_env() && self.env.is_empty()
    }

    /// True iff no equality constrains the store.
    pub fn is_top_env(&self) -> bool {
        matches!(&self.d, Some(m) if m.is_empty())
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// The equality system, `None` for ⊥.
    pub fn matrix(&self) -> Option<&Matrix> {
        self.d.as_ref()
    }

    fn cols(&self) -> usize {
        self.env.size() + 1
    }

    fn dim_of(&self, var: &Var) -> usize {
        self.env
            .dim_of_var(var)
            .unwrap_or_else(|| panic!("variable {} is not in the environment {}", var, self.env))
    }

    fn with_matrix(&self, m: Option<Matrix>) -> Self {
        match m {
            Some(m) => Self { d: Some(m), env: self.env.clone() },
            None => Self::bot_env(&self.env),
        }
    }

    // ------------------------------------------------------------------
    // Environment changes
    // ------------------------------------------------------------------

    /// Grow the state to a super-environment by inserting fresh
    /// unconstrained columns.
    pub fn extend_to(&self, sup: &Environment) -> Self {
        if self.env == *sup {
            return self.clone();
        }
        let dims = self.env.added_dims(sup);
        Self {
            d: self.d.as_ref().map(|m| m.add_empty_columns(&dims)),
            env: sup.clone(),
        }
    }

    /// Add fresh integer variables; the new columns are unconstrained.
    pub fn add_vars(&self, vars: &[Var]) -> Self {
        self.add_vars_with_sort(&vars.iter().map(|v| (v.clone(), VarSort::Int)).collect::<Vec<_>>())
    }

    /// Add fresh typed variables; the new columns are unconstrained.
    pub fn add_vars_with_sort(&self, vars: &[(Var, VarSort)]) -> Self {
        let added = match Environment::from_vars(vars.to_vec()) {
            Ok(env) => env,
            Err(e) => panic!("add_vars: {}", e),
        };
        let sup = match self.env.lce(&added) {
            Ok(env) => env,
            Err(e) => panic!("add_vars: {}", e),
        };
        self.extend_to(&sup)
    }

    /// Remove variables, preserving every equality that does not mention
    /// them.
    pub fn remove_vars(&self, vars: &[Var]) -> Self {
        let (env, dims) = self.env.without(vars);
        if dims.is_empty() {
            return self.clone();
        }
        match &self.d {
            None => Self::bot_env(&env),
            Some(m) => {
                let mut m = m.clone();
                for &j in &dims {
                    m = m.reduce_col(j);
                }
                let m = m.del_cols(&dims).remove_zero_rows();
                Self { d: Some(m), env }
            }
        }
    }

    // ------------------------------------------------------------------
    // Lattice
    // ------------------------------------------------------------------

    /// Partial order: `self ⊑ other`.
    ///
    /// ⊥ is below everything. Environments must be compatible and
    /// `self`'s must be a sub-environment of `other`'s; otherwise the
    /// states are unordered.
    pub fn leq(&self, other: &Self) -> bool {
        if self.is_bot_env() {
            return true;
        }
        if other.is_bot_env() {
            return false;
        }
        if !self.env.is_sub_env(&other.env) {
            return false;
        }
        let grown = self.extend_to(&other.env);
        match (&grown.d, &other.d) {
            (Some(m1), Some(m2)) => m2.is_covered_by(m1),
            _ => unreachable!("both operands are non-bottom here"),
        }
    }

    /// Greatest lower bound over the least common extension of the two
    /// environments.
    pub fn meet(&self, other: &Self) -> Self {
        let env = match self.env.lce(&other.env) {
            Ok(env) => env,
            // incompatible sorts: nothing useful can be said
            Err(_) => return Self::bot(),
        };
        if self.is_bot_env() || other.is_bot_env() {
            return Self::bot_env(&env);
        }
        let a = self.extend_to(&env);
        let b = other.extend_to(&env);
        if a.is_top_env() {
            return b;
        }
        if b.is_top_env() {
            return a;
        }
        match (&a.d, &b.d) {
            (Some(m1), Some(m2)) => {
                debug!("meet: {} ⊓ {}", a, b);
                a.with_matrix(m1.rref_matrix(m2))
            }
            _ => unreachable!("both operands are non-bottom here"),
        }
    }

    /// Least upper bound over the least common extension of the two
    /// environments: the affine hull of the union.
    pub fn join(&self, other: &Self) -> Self {
        let env = match self.env.lce(&other.env) {
            Ok(env) => env,
            Err(_) => return other.clone(),
        };
        if self.is_bot_env() {
            return other.extend_to(&env);
        }
        if other.is_bot_env() {
            return self.extend_to(&env);
        }
        let a = self.extend_to(&env);
        let b = other.extend_to(&env);
        match (&a.d, &b.d) {
            (Some(m1), Some(m2)) => {
                if m1.is_empty() || m2.is_empty() {
                    return Self::top_env(&env);
                }
                if m1 == m2 {
                    return a.clone();
                }
                debug!("join: {} ⊔ {}", a, b);
                a.with_matrix(Some(m1.linear_disjunct(m2)))
            }
            _ => unreachable!("both operands are non-bottom here"),
        }
    }

    /// Widening. Every fixed environment admits only finitely many affine
    /// subspaces, so join terminates and serves as widening; with
    /// different environments the newer state is returned. Note that this
    /// is not a strict extrapolation.
    pub fn widen(&self, other: &Self) -> Self {
        if self.env == other.env {
            self.join(other)
        } else {
            other.clone()
        }
    }

    /// Narrowing: keep the pre-narrowing state.
    pub fn narrow(&self, _other: &Self) -> Self {
        self.clone()
    }

    /// Unification of two states: meet over the least common extension.
    pub fn unify(&self, other: &Self) -> Self {
        self.meet(other)
    }

    // ------------------------------------------------------------------
    // Transfer functions
    // ------------------------------------------------------------------

    /// Existentially quantify the listed variables: all equalities
    /// mentioning only the remaining variables survive.
    pub fn forget_vars(&self, vars: &[Var]) -> Self {
        if self.is_bot_env() || self.is_top_env() {
            return self.clone();
        }
        let Some(m) = &self.d else {
            return self.clone();
        };
        let mut m = m.clone();
        for var in vars {
            if let Some(j) = self.env.dim_of_var(var) {
                m = m.reduce_col(j);
            }
        }
        self.with_matrix(Some(m.remove_zero_rows()))
    }

    /// Assignment `x := e`.
    ///
    /// Expressions that fail to linearize havoc `x`. When the coefficient
    /// of `x` in the linearization is non-zero the assignment is
    /// invertible and the system is rewritten in place of `x`'s old value;
    /// otherwise `x` is forgotten first and the fresh equality
    /// `x - e = 0` is added.
    pub fn assign_exp(&self, x: &Var, e: &Texpr) -> Self {
        let Some(m) = &self.d else {
            return self.clone();
        };
        let j = self.dim_of(x);
        let v = match linearize(Some(m), &self.env, e) {
            Ok(v) => v,
            Err(_) => {
                debug!("assign_exp: {} := {} is not affine, havocking", x, e);
                return self.forget_vars(std::slice::from_ref(x));
            }
        };
        let b0 = v.get(j);
        if b0.is_zero() {
            // non-invertible: forget x, then add x - e = 0
            let reduced = m.reduce_col(j);
            let mut row = v.neg();
            row.set(j, Rational::one());
            debug!("assign_exp: non-invertible {} := {}", x, e);
            self.with_matrix(reduced.rref_vec(&row))
        } else {
            // invertible: substitute x's old value through every row
            let mut axis = v.clone();
            axis.set(j, &b0 - Rational::one());
            let col = m.get_col_upper_triangular(j);
            let mut rows: Vec<SparseVector> = m.rows().cloned().collect();
            for (i, c) in col.iter() {
                let updated = rows[i].sub_scaled(&axis, &(c / &b0));
                rows[i] = updated;
            }
            debug!("assign_exp: invertible {} := {}", x, e);
            self.with_matrix(Matrix::from_rows(self.cols(), rows).normalize())
        }
    }

    /// Assignment `x := y` between variables.
    pub fn assign_var(&self, x: &Var, y: &Var) -> Self {
        self.assign_exp(x, &Texpr::var(y.clone()))
    }

    /// Simultaneous assignment `x₁, …, xₖ := y₁, …, yₖ`.
    ///
    /// Each right-hand side is evaluated in the pre-state: primed shadow
    /// columns receive the values first, the targets are forgotten, and
    /// every target column is switched to its shadow before the shadows
    /// are dropped again.
    pub fn assign_var_parallel(&self, pairs: &[(Var, Var)]) -> Self {
        if pairs.is_empty() || self.is_bot_env() {
            return self.clone();
        }
        let primed: Vec<Var> = pairs.iter().map(|(x, _)| x.prime()).collect();
        let mut t = self.add_vars(&primed);
        for ((_, y), xp) in pairs.iter().zip(&primed) {
            t = t.assign_var(xp, y);
        }
        match &t.d {
            Some(m) if !t.is_top_env() => {
                let mut m = m.clone();
                for (x, _) in pairs {
                    m = m.reduce_col(t.dim_of(x));
                }
                for ((x, _), xp) in pairs.iter().zip(&primed) {
                    let col = m.get_col_upper_triangular(t.dim_of(xp));
                    m = m.set_col(t.dim_of(x), &col);
                    m = m.set_col(t.dim_of(xp), &SparseVector::zero(m.num_rows()));
                }
                let mut prim_dims: Vec<usize> = primed.iter().map(|v| t.dim_of(v)).collect();
                prim_dims.sort_unstable();
                let m = m.del_cols(&prim_dims).remove_zero_rows();
                self.with_matrix(m.normalize())
            }
            // ⊥ or ⊤-env intermediate: dropping the shadows is exact
            _ => t.remove_vars(&primed),
        }
    }

    /// In-place variant of [`assign_var_parallel`](Self::assign_var_parallel)
    /// for a caller-owned state. Not a concurrency primitive.
    pub fn assign_var_parallel_with(&mut self, pairs: &[(Var, Var)]) {
        *self = self.assign_var_parallel(pairs);
    }

    /// Backward assignment: assignment followed by forgetting the target.
    /// Used by weakest-precondition style passes.
    pub fn substitute_exp(&self, x: &Var, e: &Texpr) -> Self {
        self.assign_exp(x, e).forget_vars(std::slice::from_ref(x))
    }

    /// Restrict the state with a linear constraint.
    ///
    /// Equalities are added to the system. Disequalities and strict
    /// inequalities cannot be represented: when the equality version is
    /// already implied the guard is unsatisfiable and the result is ⊥,
    /// otherwise the state passes through unchanged. Non-strict
    /// inequalities always pass through. Expressions that fail to
    /// linearize leave the state unchanged.
    pub fn meet_tcons(&self, cons: &Tcons) -> Self {
        let Some(m) = &self.d else {
            return self.clone();
        };
        let v = match linearize(Some(m), &self.env, &cons.expr) {
            Ok(v) => v,
            Err(_) => {
                debug!("meet_tcons: {} is not affine, ignoring guard", cons);
                return self.clone();
            }
        };
        if v.is_constant() {
            let c0 = v.get(self.cols() - 1);
            let unsat = match cons.op {
                ConsOp::Eq => !c0.is_zero(),
                ConsOp::Diseq => c0.is_zero(),
                ConsOp::Sup => !c0.is_positive(),
                ConsOp::Supeq => c0.is_negative(),
            };
            return if unsat { Self::bot_env(&self.env) } else { self.clone() };
        }
        match cons.op {
            ConsOp::Eq => self.with_matrix(m.rref_vec(&v)),
            ConsOp::Diseq | ConsOp::Sup => {
                // `e = 0` implied makes `e ≠ 0` (and `e > 0`) unsatisfiable
                if m.reduce_row(&v).is_zero() {
                    Self::bot_env(&self.env)
                } else {
                    self.clone()
                }
            }
            ConsOp::Supeq => self.clone(),
        }
    }

    /// Restrict the state with a constraint or its negation.
    pub fn assert_constraint(&self, cons: &Tcons, negate: bool) -> Self {
        if negate {
            self.meet_tcons(&cons.negate())
        } else {
            self.meet_tcons(cons)
        }
    }

    /// Exact integer bounds of an expression, when the system pins it to
    /// an integer constant. The domain derives no interval information
    /// from proper equalities.
    pub fn bound_texpr(&self, e: &Texpr) -> (Option<BigInt>, Option<BigInt>) {
        let Some(m) = &self.d else {
            return (None, None);
        };
        match linearize(Some(m), &self.env, e) {
            Ok(v) if v.is_constant() => {
                let c = v.get(self.cols() - 1);
                if c.is_integer() {
                    let z = c.to_integer();
                    (Some(z.clone()), Some(z))
                } else {
                    (None, None)
                }
            }
            _ => (None, None),
        }
    }

    /// The equalities of the state as linear constraints, one per row.
    pub fn invariant(&self) -> Vec<Tcons> {
        let Some(m) = &self.d else {
            return Vec::new();
        };
        let cols = self.cols();
        m.rows()
            .map(|row| {
                let mut expr: Option<Texpr> = None;
                for (i, q) in row.iter() {
                    let term = if i == cols - 1 {
                        Texpr::constant(q.clone())
                    } else {
                        let var = Texpr::var(self.env.var_of_dim(i).clone());
                        if q.is_one() {
                            var
                        } else {
                            Texpr::constant(q.clone()).mul(var)
                        }
                    };
                    expr = Some(match expr {
                        None => term,
                        Some(e) => e.add(term),
                    });
                }
                Tcons::new(expr.unwrap_or_else(|| Texpr::int(0)), ConsOp::Eq)
            })
            .collect()
    }

    /// Owned snapshot of the state. States are plain values, so the
    /// snapshot *is* the serialized form and
    /// [`unmarshal`](Self::unmarshal) restores it exactly.
    pub fn marshal(&self) -> AffEq {
        self.clone()
    }

    pub fn unmarshal(state: AffEq) -> AffEq {
        state
    }

    fn fmt_row(&self, f: &mut fmt::Formatter<'_>, row: &SparseVector) -> fmt::Result {
        // scale to an integer vector with gcd 1 and positive leading
        // coefficient
        let mut lcm = BigInt::one();
        for (_, q) in row.iter() {
            lcm = lcm.lcm(q.denom());
        }
        let scaled: Vec<(usize, BigInt)> = row
            .iter()
            .map(|(i, q)| (i, q.numer() * (&lcm / q.denom())))
            .collect();
        let mut gcd = BigInt::zero();
        for (_, z) in &scaled {
            gcd = gcd.gcd(z);
        }
        let negate = scaled.first().map(|(_, z)| z.is_negative()).unwrap_or(false);
        let cols = self.cols();
        let mut first = true;
        for (i, z) in &scaled {
            let mut z = z / &gcd;
            if negate {
                z = -z;
            }
            if *i == cols - 1 {
                if z.is_positive() && !first {
                    write!(f, "+")?;
                }
                write!(f, "{}", z)?;
            } else {
                let name = self.env.var_of_dim(*i);
                if z.is_one() {
                    if !first {
                        write!(f, "+")?;
                    }
                    write!(f, "{}", name)?;
                } else if z == -BigInt::one() {
                    write!(f, "-{}", name)?;
                } else {
                    if z.is_positive() && !first {
                        write!(f, "+")?;
                    }
                    write!(f, "{}{}", z, name)?;
                }
            }
            first = false;
        }
        write!(f, "=0")
    }
}

impl fmt::Display for AffEq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.d {
            None => write!(f, "Bottom Env"),
            Some(m) if m.is_empty() => write!(f, "⊤"),
            Some(m) => {
                write!(f, "[|")?;
                for (idx, row) in m.rows().enumerate() {
                    if idx > 0 {
                        write!(f, "; ")?;
                    }
                    self.fmt_row(f, row)?;
                }
                write!(f, "|]")
            }
        }
    }
}
