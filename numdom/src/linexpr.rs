//! Linear expressions and constraints (Section 3 "Linear expression and
//! constraint"): `constant + Σ cᵢ·xᵢ`, with either integer or rational
//! coefficients picked per-system. Grounded in this corpus' existing
//! `Coeff`-over-`BigInt`/`BigRational` pairing (Section 9's design note).

use std::{
    collections::HashMap,
    hash::Hash,
    ops::{Add, Mul, Neg, Sub},
};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero};

/// A coefficient or constant term, either exactly integral or rational.
/// Mixing the two in one expression promotes to `Rational`.
#[derive(Clone, Debug, PartialEq)]
pub enum Coeff {
    Int(BigInt),
    Rational(BigRational),
}

impl Coeff {
    pub fn zero() -> Self {
        Coeff::Int(BigInt::zero())
    }

    pub fn from_i64(n: i64) -> Self {
        Coeff::Int(BigInt::from(n))
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Coeff::Int(i) => i.is_zero(),
            Coeff::Rational(r) => r.is_zero(),
        }
    }

    pub fn is_positive(&self) -> bool {
        match self {
            Coeff::Int(i) => i.is_positive(),
            Coeff::Rational(r) => r.is_positive(),
        }
    }

    pub fn is_negative(&self) -> bool {
        match self {
            Coeff::Int(i) => i.is_negative(),
            Coeff::Rational(r) => r.is_negative(),
        }
    }

    pub(crate) fn as_rational(&self) -> BigRational {
        match self {
            Coeff::Int(i) => BigRational::from_integer(i.clone()),
            Coeff::Rational(r) => r.clone(),
        }
    }

    /// Collapses to `Int` when the value is exactly integral, matching how
    /// the solver presents residual bounds back to an integer-typed
    /// abstract domain.
    pub fn to_bigint_exact(&self) -> Option<BigInt> {
        match self {
            Coeff::Int(i) => Some(i.clone()),
            Coeff::Rational(r) if r.is_integer() => Some(r.to_integer()),
            Coeff::Rational(_) => None,
        }
    }

    /// Rounds toward negative infinity; used to tighten an integer
    /// variable's lower bound by a rational residual.
    pub fn floor_to_bigint(&self) -> BigInt {
        match self {
            Coeff::Int(i) => i.clone(),
            Coeff::Rational(r) => r.floor().to_integer(),
        }
    }

    /// Rounds toward positive infinity; the upper-bound counterpart of
    /// [`Self::floor_to_bigint`].
    pub fn ceil_to_bigint(&self) -> BigInt {
        match self {
            Coeff::Int(i) => i.clone(),
            Coeff::Rational(r) => r.ceil().to_integer(),
        }
    }
}

impl Add for Coeff {
    type Output = Coeff;
    fn add(self, rhs: Coeff) -> Coeff {
        match (self, rhs) {
            (Coeff::Int(a), Coeff::Int(b)) => Coeff::Int(a + b),
            (a, b) => Coeff::Rational(a.as_rational() + b.as_rational()),
        }
    }
}

impl Sub for Coeff {
    type Output = Coeff;
    fn sub(self, rhs: Coeff) -> Coeff {
        match (self, rhs) {
            (Coeff::Int(a), Coeff::Int(b)) => Coeff::Int(a - b),
            (a, b) => Coeff::Rational(a.as_rational() - b.as_rational()),
        }
    }
}

impl Mul for Coeff {
    type Output = Coeff;
    fn mul(self, rhs: Coeff) -> Coeff {
        match (self, rhs) {
            (Coeff::Int(a), Coeff::Int(b)) => Coeff::Int(a * b),
            (a, b) => Coeff::Rational(a.as_rational() * b.as_rational()),
        }
    }
}

impl Neg for Coeff {
    type Output = Coeff;
    fn neg(self) -> Coeff {
        match self {
            Coeff::Int(i) => Coeff::Int(-i),
            Coeff::Rational(r) => Coeff::Rational(-r),
        }
    }
}

impl Coeff {
    /// Divides `self` by `rhs`, promoting to `Rational` unless the integer
    /// division is exact. `rhs` must be non-zero (callers check this before
    /// computing a pivot's residual).
    pub fn div(self, rhs: &Coeff) -> Coeff {
        match (&self, rhs) {
            (Coeff::Int(a), Coeff::Int(b)) if (a % b).is_zero() => Coeff::Int(a / b),
            _ => Coeff::Rational(self.as_rational() / rhs.as_rational()),
        }
    }
}

/// `constant + Σ cᵢ·xᵢ`. Terms with a zero coefficient are pruned eagerly.
#[derive(Clone, Debug, PartialEq)]
pub struct LinExpr<Var> {
    pub constant: Coeff,
    terms: HashMap<Var, Coeff>,
}

impl<Var: Eq + Hash + Clone> LinExpr<Var> {
    pub fn constant(c: Coeff) -> Self {
        LinExpr {
            constant: c,
            terms: HashMap::new(),
        }
    }

    pub fn var(v: Var) -> Self {
        let mut terms = HashMap::new();
        terms.insert(v, Coeff::from_i64(1));
        LinExpr {
            constant: Coeff::zero(),
            terms,
        }
    }

    pub fn with_term(mut self, v: Var, c: Coeff) -> Self {
        if !c.is_zero() {
            self.terms.insert(v, c);
        } else {
            self.terms.remove(&v);
        }
        self
    }

    pub fn coeff_of(&self, v: &Var) -> Coeff {
        self.terms.get(v).cloned().unwrap_or_else(Coeff::zero)
    }

    pub fn vars(&self) -> impl Iterator<Item = &Var> {
        self.terms.keys()
    }

    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    /// The rational interval `constant + Σ cᵢ·xᵢ` can take, given each
    /// variable's current bounds as a signed `(min, max)` pair from
    /// `lookup`. `skip` excludes one variable (the solver's pivot) from the
    /// sum; pass `None` to bound the whole expression.
    pub fn bounds(&self, skip: Option<&Var>, lookup: impl Fn(&Var) -> (BigInt, BigInt)) -> (BigRational, BigRational) {
        let mut lo = self.constant.as_rational();
        let mut hi = lo.clone();
        for (v, c) in &self.terms {
            if skip == Some(v) {
                continue;
            }
            let (vlo, vhi) = lookup(v);
            let c_r = c.as_rational();
            let (term_lo, term_hi) = if c.is_negative() {
                (&c_r * BigRational::from_integer(vhi), &c_r * BigRational::from_integer(vlo))
            } else {
                (&c_r * BigRational::from_integer(vlo), &c_r * BigRational::from_integer(vhi))
            };
            lo += term_lo;
            hi += term_hi;
        }
        (lo, hi)
    }

    /// The residual `constant - Σ_{i≠p} cᵢ·xᵢ` evaluated against a
    /// concrete assignment (used during preprocessing; the solver's actual
    /// propagation works over abstract values, see [`crate::solver`]).
    pub fn evaluate_excluding(&self, pivot: &Var, values: &HashMap<Var, Coeff>) -> Coeff {
        let mut acc = self.constant.clone();
        for (v, c) in &self.terms {
            if v == pivot {
                continue;
            }
            let val = values.get(v).cloned().unwrap_or_else(Coeff::zero);
            acc = acc - (c.clone() * val);
        }
        acc
    }
}

/// One linear constraint over the expression `e`. `Lt`/`Ne` carry their own
/// variant rather than being folded into `Le`, matching Section 4.7's
/// preprocessing step that splits a strict inequality into `e ≤ 0 ∧ e ≠ 0`.
#[derive(Clone, Debug, PartialEq)]
pub enum Constraint<Var> {
    Eq(LinExpr<Var>),
    Le(LinExpr<Var>),
    Lt(LinExpr<Var>),
    Ne(LinExpr<Var>),
}

impl<Var: Eq + Hash + Clone> Constraint<Var> {
    pub fn expr(&self) -> &LinExpr<Var> {
        match self {
            Constraint::Eq(e) | Constraint::Le(e) | Constraint::Lt(e) | Constraint::Ne(e) => e,
        }
    }

    /// Constant-only constraints can be decided outright at construction:
    /// `5 ≤ 0` is a contradiction, `0 = 0` a tautology.
    pub fn classify(&self) -> Classification {
        let e = self.expr();
        if !e.is_constant() {
            return Classification::Undetermined;
        }
        let c = &e.constant;
        let holds = match self {
            Constraint::Eq(_) => c.is_zero(),
            Constraint::Le(_) => c.is_zero() || c.is_negative(),
            Constraint::Lt(_) => c.is_negative(),
            Constraint::Ne(_) => !c.is_zero(),
        };
        if holds {
            Classification::Tautology
        } else {
            Classification::Contradiction
        }
    }

    /// Splits a strict inequality into its `Le`/`Ne` companions, per
    /// Section 4.7's preprocessing step; other kinds pass through as a
    /// single-element vector.
    pub fn preprocess(self) -> Vec<Constraint<Var>> {
        match self {
            Constraint::Lt(e) => vec![Constraint::Le(e.clone()), Constraint::Ne(e)],
            other => vec![other],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    Tautology,
    Contradiction,
    Undetermined,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_zero_constant_equality_is_a_tautology() {
        let c: Constraint<&str> = Constraint::Eq(LinExpr::constant(Coeff::zero()));
        assert_eq!(c.classify(), Classification::Tautology);
    }

    #[test]
    fn a_positive_constant_equality_is_a_contradiction() {
        let c: Constraint<&str> = Constraint::Eq(LinExpr::constant(Coeff::from_i64(5)));
        assert_eq!(c.classify(), Classification::Contradiction);
    }

    #[test]
    fn strict_inequality_splits_into_le_and_ne() {
        let e: LinExpr<&str> = LinExpr::var("x");
        let split = Constraint::Lt(e).preprocess();
        assert_eq!(split.len(), 2);
        assert!(matches!(split[0], Constraint::Le(_)));
        assert!(matches!(split[1], Constraint::Ne(_)));
    }

    #[test]
    fn residual_evaluation_excludes_the_pivot_variable() {
        // e = 3 + 2x - y; pivot x, y = 4 -> residual = 3 - (-1*4) = 3 + 4 = 7
        let e: LinExpr<&str> = LinExpr::constant(Coeff::from_i64(3))
            .with_term("x", Coeff::from_i64(2))
            .with_term("y", Coeff::from_i64(-1));
        let mut values = HashMap::new();
        values.insert("y", Coeff::from_i64(4));
        let r = e.evaluate_excluding(&"x", &values);
        assert_eq!(r, Coeff::from_i64(7));
    }
}
