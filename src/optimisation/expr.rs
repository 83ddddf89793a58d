//! Affine expressions over decision variables.
use super::VariableId;
use indexmap::IndexMap;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// An affine expression: a constant plus a weighted sum of decision variables.
///
/// Terms referring to the same variable are merged, so each variable appears at most once.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinearExpr {
    terms: IndexMap<VariableId, f64>,
    constant: f64,
}

impl LinearExpr {
    /// An expression equal to zero
    pub fn zero() -> Self {
        Self::default()
    }

    /// An expression with no variables
    pub fn from_constant(constant: f64) -> Self {
        Self {
            terms: IndexMap::new(),
            constant,
        }
    }

    /// An expression with a single term
    pub fn term(var: VariableId, coeff: f64) -> Self {
        let mut expr = Self::zero();
        expr.add_term(var, coeff);
        expr
    }

    /// Add `coeff * var` to the expression
    pub fn add_term(&mut self, var: VariableId, coeff: f64) {
        *self.terms.entry(var).or_insert(0.0) += coeff;
    }

    /// Add a constant to the expression
    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// The constant part of the expression
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Iterate over the variable terms, skipping any whose coefficient is zero
    pub fn terms(&self) -> impl Iterator<Item = (VariableId, f64)> + '_ {
        self.terms
            .iter()
            .filter(|(_, coeff)| **coeff != 0.0)
            .map(|(var, coeff)| (*var, *coeff))
    }

    /// The coefficient of `var` (zero if it does not appear)
    pub fn coefficient(&self, var: VariableId) -> f64 {
        self.terms.get(&var).copied().unwrap_or(0.0)
    }

    /// Whether the expression has no (non-zero) variable terms
    pub fn is_constant(&self) -> bool {
        self.terms().next().is_none()
    }

    /// The expression without its constant part
    pub fn without_constant(&self) -> Self {
        Self {
            terms: self.terms.clone(),
            constant: 0.0,
        }
    }

    /// Evaluate the expression given a value for every variable
    pub fn evaluate<F>(&self, mut value_of: F) -> f64
    where
        F: FnMut(VariableId) -> f64,
    {
        self.terms()
            .fold(self.constant, |acc, (var, coeff)| acc + coeff * value_of(var))
    }
}

impl From<f64> for LinearExpr {
    fn from(value: f64) -> Self {
        Self::from_constant(value)
    }
}

impl From<VariableId> for LinearExpr {
    fn from(var: VariableId) -> Self {
        Self::term(var, 1.0)
    }
}

impl AddAssign for LinearExpr {
    fn add_assign(&mut self, rhs: Self) {
        for (var, coeff) in rhs.terms {
            self.add_term(var, coeff);
        }
        self.constant += rhs.constant;
    }
}

impl AddAssign<f64> for LinearExpr {
    fn add_assign(&mut self, rhs: f64) {
        self.constant += rhs;
    }
}

impl SubAssign for LinearExpr {
    fn sub_assign(&mut self, rhs: Self) {
        *self += -rhs;
    }
}

impl<T: Into<LinearExpr>> Add<T> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: T) -> LinearExpr {
        self += rhs.into();
        self
    }
}

impl<T: Into<LinearExpr>> Sub<T> for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: T) -> LinearExpr {
        self -= rhs.into();
        self
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        self * -1.0
    }
}

impl Mul<f64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(mut self, rhs: f64) -> LinearExpr {
        for coeff in self.terms.values_mut() {
            *coeff *= rhs;
        }
        self.constant *= rhs;
        self
    }
}

impl Mul<LinearExpr> for f64 {
    type Output = LinearExpr;

    fn mul(self, rhs: LinearExpr) -> LinearExpr {
        rhs * self
    }
}

impl Mul<f64> for VariableId {
    type Output = LinearExpr;

    fn mul(self, rhs: f64) -> LinearExpr {
        LinearExpr::term(self, rhs)
    }
}

impl Mul<VariableId> for f64 {
    type Output = LinearExpr;

    fn mul(self, rhs: VariableId) -> LinearExpr {
        LinearExpr::term(rhs, self)
    }
}

impl<T: Into<LinearExpr>> Add<T> for VariableId {
    type Output = LinearExpr;

    fn add(self, rhs: T) -> LinearExpr {
        LinearExpr::from(self) + rhs
    }
}

impl<T: Into<LinearExpr>> Sub<T> for VariableId {
    type Output = LinearExpr;

    fn sub(self, rhs: T) -> LinearExpr {
        LinearExpr::from(self) - rhs
    }
}

impl Sum for LinearExpr {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, expr| acc + expr)
    }
}
