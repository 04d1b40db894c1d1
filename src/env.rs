//! Variable environments.
//!
//! An [`Environment`] is an ordered, typed set of program variables that
//! fixes the column layout of the matrices: variable `i` in environment
//! order owns column `i`, and the constant term lives one past the last
//! variable. Environments are immutable values; growing or shrinking one
//! produces the column-edit script the matrix layer needs to adapt.
//!
//! Primed variables ([`Var::prime`]) form a sub-namespace reserved for the
//! domain's parallel assignment. Program variables are never primed, so the
//! two can never collide.

use std::error::Error;
use std::fmt;

/// Declared sort of a variable. Two environments that declare the same
/// variable with different sorts cannot be combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VarSort {
    Int,
    Real,
}

/// A program variable (or a primed shadow of one).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var {
    name: String,
    primed: bool,
}

impl Var {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), primed: false }
    }

    /// The primed shadow of this variable. Primed shadows order directly
    /// after their original and are reserved to the domain internals.
    pub fn prime(&self) -> Self {
        Self { name: self.name.clone(), primed: true }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_primed(&self) -> bool {
        self.primed
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.primed {
            write!(f, "{}'", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Two environments declare the same variable with different sorts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvMismatch {
    pub var: Var,
}

impl fmt::Display for EnvMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "variable {} is declared with two different sorts", self.var)
    }
}

impl Error for EnvMismatch {}

/// An ordered, typed variable set.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Environment {
    // sorted by variable, unique
    vars: Vec<(Var, VarSort)>,
}

impl Environment {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Environment of integer variables with the given names.
    pub fn of_ints<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_vars(names.into_iter().map(|n| (Var::new(n), VarSort::Int)).collect())
            .expect("duplicate variable names")
    }

    /// Build an environment from typed variables.
    ///
    /// Fails if the same variable appears with two different sorts;
    /// duplicates with the same sort collapse.
    pub fn from_vars(mut vars: Vec<(Var, VarSort)>) -> Result<Self, EnvMismatch> {
        vars.sort();
        let mut out: Vec<(Var, VarSort)> = Vec::with_capacity(vars.len());
        for (v, s) in vars {
            match out.last() {
                Some((last, ls)) if *last == v => {
                    if *ls != s {
                        return Err(EnvMismatch { var: v });
                    }
                }
                _ => out.push((v, s)),
            }
        }
        Ok(Self { vars: out })
    }

    /// Number of variables (the matrix column count is `size() + 1`).
    pub fn size(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn contains(&self, var: &Var) -> bool {
        self.dim_of_var(var).is_some()
    }

    /// Column index of a variable.
    pub fn dim_of_var(&self, var: &Var) -> Option<usize> {
        self.vars.binary_search_by(|(v, _)| v.cmp(var)).ok()
    }

    /// Variable owning column `dim`.
    pub fn var_of_dim(&self, dim: usize) -> &Var {
        &self.vars[dim].0
    }

    pub fn sort_of_dim(&self, dim: usize) -> VarSort {
        self.vars[dim].1
    }

    /// Iterate over the variables in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&Var, VarSort)> {
        self.vars.iter().map(|(v, s)| (v, *s))
    }

    /// True iff every variable of `self` appears in `sup` with the same
    /// sort.
    pub fn is_sub_env(&self, sup: &Environment) -> bool {
        self.vars.iter().all(|(v, s)| {
            sup.dim_of_var(v).map(|d| sup.sort_of_dim(d)) == Some(*s)
        })
    }

    /// Least common extension of two environments: the ordered union.
    /// Fails with [`EnvMismatch`] when the operands disagree on a sort.
    pub fn lce(&self, other: &Environment) -> Result<Environment, EnvMismatch> {
        let mut out: Vec<(Var, VarSort)> = Vec::with_capacity(self.vars.len() + other.vars.len());
        let mut xs = self.vars.iter().peekable();
        let mut ys = other.vars.iter().peekable();
        loop {
            match (xs.peek(), ys.peek()) {
                (Some((vx, sx)), Some((vy, sy))) => {
                    if vx < vy {
                        out.push((vx.clone(), *sx));
                        xs.next();
                    } else if vy < vx {
                        out.push((vy.clone(), *sy));
                        ys.next();
                    } else {
                        if sx != sy {
                            return Err(EnvMismatch { var: vx.clone() });
                        }
                        out.push((vx.clone(), *sx));
                        xs.next();
                        ys.next();
                    }
                }
                (Some((vx, sx)), None) => {
                    out.push((vx.clone(), *sx));
                    xs.next();
                }
                (None, Some((vy, sy))) => {
                    out.push((vy.clone(), *sy));
                    ys.next();
                }
                (None, None) => break,
            }
        }
        Ok(Environment { vars: out })
    }

    /// Columns to insert (positions in the layout of `sup`) to adapt a
    /// matrix shaped for `self` into one shaped for `sup`.
    ///
    /// Precondition: `self.is_sub_env(sup)`.
    pub fn added_dims(&self, sup: &Environment) -> Vec<usize> {
        debug_assert!(self.is_sub_env(sup));
        sup.vars
            .iter()
            .enumerate()
            .filter(|(_, (v, _))| !self.contains(v))
            .map(|(i, _)| i)
            .collect()
    }

    /// Remove the listed variables. Returns the shrunk environment together
    /// with the removed column positions (old layout, sorted ascending).
    pub fn without(&self, vars: &[Var]) -> (Environment, Vec<usize>) {
        let mut dims: Vec<usize> = vars.iter().filter_map(|v| self.dim_of_var(v)).collect();
        dims.sort_unstable();
        dims.dedup();
        let kept = self
            .vars
            .iter()
            .enumerate()
            .filter(|(i, _)| dims.binary_search(i).is_err())
            .map(|(_, e)| e.clone())
            .collect();
        (Environment { vars: kept }, dims)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (v, _)) in self.vars.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, "}}")
    }
}
