//! Unbounded mathematical interval (C2), used to present results of the
//! fixed-width domains to external consumers without losing the fact that a
//! wrapped range can be "all positive integers" or similar once it has been
//! projected out of mod-`2^w` space. Not a decision procedure: comparisons
//! and fits-in-bitwidth checks only.

use std::{cmp::Ordering, fmt};

use num_bigint::BigInt;

/// An interval endpoint: a finite integer or one of the two infinities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bound {
    NegInf,
    Finite(BigInt),
    PosInf,
}

impl Bound {
    fn min(a: &Bound, b: &Bound) -> Bound {
        if Self::le(a, b) {
            a.clone()
        } else {
            b.clone()
        }
    }

    fn max(a: &Bound, b: &Bound) -> Bound {
        if Self::le(a, b) {
            b.clone()
        } else {
            a.clone()
        }
    }

    fn le(a: &Bound, b: &Bound) -> bool {
        matches!(Self::cmp(a, b), Ordering::Less | Ordering::Equal)
    }

    fn cmp(a: &Bound, b: &Bound) -> Ordering {
        match (a, b) {
            (Bound::NegInf, Bound::NegInf) => Ordering::Equal,
            (Bound::NegInf, _) => Ordering::Less,
            (_, Bound::NegInf) => Ordering::Greater,
            (Bound::PosInf, Bound::PosInf) => Ordering::Equal,
            (Bound::PosInf, _) => Ordering::Greater,
            (_, Bound::PosInf) => Ordering::Less,
            (Bound::Finite(x), Bound::Finite(y)) => x.cmp(y),
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::NegInf => write!(f, "-inf"),
            Bound::Finite(n) => write!(f, "{n}"),
            Bound::PosInf => write!(f, "+inf"),
        }
    }
}

/// A (possibly unbounded, possibly empty) closed interval over the
/// integers, used as the external, driver-facing view of an abstract value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interval {
    Bottom,
    Bounded { lo: Bound, hi: Bound },
}

impl Interval {
    pub fn bottom() -> Self {
        Interval::Bottom
    }

    pub fn top() -> Self {
        Interval::Bounded {
            lo: Bound::NegInf,
            hi: Bound::PosInf,
        }
    }

    pub fn singleton(n: impl Into<BigInt>) -> Self {
        let n = n.into();
        Interval::Bounded {
            lo: Bound::Finite(n.clone()),
            hi: Bound::Finite(n),
        }
    }

    /// Closed range `[lo, hi]`. Empty (`lo > hi`) collapses to `Bottom`.
    pub fn range(lo: impl Into<BigInt>, hi: impl Into<BigInt>) -> Self {
        let lo = lo.into();
        let hi = hi.into();
        if lo > hi {
            Interval::Bottom
        } else {
            Interval::Bounded {
                lo: Bound::Finite(lo),
                hi: Bound::Finite(hi),
            }
        }
    }

    pub fn is_bottom(&self) -> bool {
        matches!(self, Interval::Bottom)
    }

    pub fn is_top(&self) -> bool {
        matches!(
            self,
            Interval::Bounded {
                lo: Bound::NegInf,
                hi: Bound::PosInf
            }
        )
    }

    pub fn contains(&self, n: &BigInt) -> bool {
        match self {
            Interval::Bottom => false,
            Interval::Bounded { lo, hi } => {
                Bound::le(lo, &Bound::Finite(n.clone())) && Bound::le(&Bound::Finite(n.clone()), hi)
            }
        }
    }

    /// Convex hull. Used to present the join of two abstract values.
    pub fn union(&self, other: &Self) -> Self {
        match (self, other) {
            (Interval::Bottom, x) | (x, Interval::Bottom) => x.clone(),
            (Interval::Bounded { lo: l1, hi: h1 }, Interval::Bounded { lo: l2, hi: h2 }) => {
                Interval::Bounded {
                    lo: Bound::min(l1, l2),
                    hi: Bound::max(h1, h2),
                }
            }
        }
    }

    /// Set intersection. Returns `Bottom` if disjoint.
    pub fn intersect(&self, other: &Self) -> Self {
        match (self, other) {
            (Interval::Bottom, _) | (_, Interval::Bottom) => Interval::Bottom,
            (Interval::Bounded { lo: l1, hi: h1 }, Interval::Bounded { lo: l2, hi: h2 }) => {
                let lo = Bound::max(l1, l2);
                let hi = Bound::min(h1, h2);
                if Bound::le(&lo, &hi) {
                    Interval::Bounded { lo, hi }
                } else {
                    Interval::Bottom
                }
            }
        }
    }

    pub fn leq(&self, other: &Self) -> bool {
        self.intersect(other) == *self
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interval::Bottom => write!(f, "⊥"),
            Interval::Bounded { lo, hi } => write!(f, "[{lo}, {hi}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_is_the_convex_hull() {
        let a = Interval::range(0, 3);
        let b = Interval::range(10, 12);
        assert_eq!(a.union(&b), Interval::range(0, 12));
    }

    #[test]
    fn disjoint_ranges_intersect_to_bottom() {
        let a = Interval::range(0, 3);
        let b = Interval::range(10, 12);
        assert!(a.intersect(&b).is_bottom());
    }

    #[test]
    fn empty_range_construction_collapses_to_bottom() {
        assert!(Interval::range(5, 2).is_bottom());
    }
}
