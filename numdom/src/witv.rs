//! Wrapped interval (C4): a signedness-agnostic interval on the circular
//! bit-vector space `Z/2^w`, kept in the two-circle split form the whole
//! way through (Section 9's recommendation) — circle 0 holds values whose
//! MSB is 0 (non-negative signed / low unsigned half), circle 1 holds
//! values whose MSB is 1. A single-circle ("legacy") view is available as
//! a derived accessor for callers that just want `[start, end]` with
//! wrap-around encoded by `start > end`.

use std::{cmp::Ordering, fmt};

use tracing::warn;
use wrapint::WrapInt;

use crate::{error::DomainError, interval::Interval};

/// One arc of the circular bit-vector space, confined to a single half
/// (MSB fixed), so `start <= end` always holds as plain unsigned integers
/// when the arc is non-bottom.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Circle {
    start: WrapInt,
    end: WrapInt,
    is_bottom: bool,
}

impl fmt::Debug for Circle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom {
            write!(f, "∅")
        } else {
            write!(f, "[{:?}, {:?}]", self.start, self.end)
        }
    }
}

impl Circle {
    pub(crate) fn start(&self) -> WrapInt {
        self.start
    }

    pub(crate) fn end(&self) -> WrapInt {
        self.end
    }

    pub(crate) fn is_bottom(&self) -> bool {
        self.is_bottom
    }

    pub(crate) fn len_pub(&self) -> u128 {
        self.len()
    }

    pub(crate) fn bottom(bitwidth: u32, msb: bool) -> Self {
        let start = if msb {
            WrapInt::imin(bitwidth).unwrap()
        } else {
            WrapInt::zero(bitwidth).unwrap()
        };
        Circle {
            start,
            end: start,
            is_bottom: true,
        }
    }

    pub(crate) fn full(bitwidth: u32, msb: bool) -> Self {
        if msb {
            Circle {
                start: WrapInt::imin(bitwidth).unwrap(),
                end: WrapInt::umax(bitwidth).unwrap(),
                is_bottom: false,
            }
        } else {
            Circle {
                start: WrapInt::zero(bitwidth).unwrap(),
                end: WrapInt::imax(bitwidth).unwrap(),
                is_bottom: false,
            }
        }
    }

    pub(crate) fn singleton(n: WrapInt) -> Self {
        Circle {
            start: n,
            end: n,
            is_bottom: false,
        }
    }

    /// Builds `[lo, hi]` (unsigned order) within a single half, marking
    /// bottom if the range is empty.
    pub(crate) fn range(lo: WrapInt, hi: WrapInt) -> Self {
        if lo.ugt(&hi).unwrap() {
            Circle {
                start: lo,
                end: lo,
                is_bottom: true,
            }
        } else {
            Circle {
                start: lo,
                end: hi,
                is_bottom: false,
            }
        }
    }

    pub(crate) fn is_full(&self, bitwidth: u32, msb: bool) -> bool {
        !self.is_bottom && *self == Circle::full(bitwidth, msb)
    }

    fn contains(&self, n: WrapInt) -> bool {
        !self.is_bottom && self.start.ule(&n).unwrap() && n.ule(&self.end).unwrap()
    }

    fn len(&self) -> u128 {
        if self.is_bottom {
            0
        } else {
            self.end.to_u128() - self.start.to_u128() + 1
        }
    }

    pub(crate) fn join(&self, other: &Self) -> Self {
        if self.is_bottom {
            return *other;
        }
        if other.is_bottom {
            return *self;
        }
        let lo = if self.start.ult(&other.start).unwrap() {
            self.start
        } else {
            other.start
        };
        let hi = if self.end.ugt(&other.end).unwrap() {
            self.end
        } else {
            other.end
        };
        Circle {
            start: lo,
            end: hi,
            is_bottom: false,
        }
    }

    fn meet(&self, other: &Self) -> Self {
        if self.is_bottom || other.is_bottom {
            return Circle {
                is_bottom: true,
                ..*self
            };
        }
        let lo = if self.start.ugt(&other.start).unwrap() {
            self.start
        } else {
            other.start
        };
        let hi = if self.end.ult(&other.end).unwrap() {
            self.end
        } else {
            other.end
        };
        Circle::range(lo, hi)
    }

    fn leq(&self, other: &Self) -> bool {
        if self.is_bottom {
            return true;
        }
        if other.is_bottom {
            return false;
        }
        other.start.ule(&self.start).unwrap() && self.end.ule(&other.end).unwrap()
    }

    /// Widens `*this` toward `other` (the newer iterate). Per Section 4.3:
    /// keep `*this` if `other` is already contained; if they share an
    /// endpoint, extrapolate by doubling the gap (bounded by the half's
    /// own extent); otherwise fall back to `full`, which guarantees
    /// termination because doubling at least halves the number of
    /// remaining widening steps.
    fn widen(&self, other: &Self, bitwidth: u32, msb: bool) -> Self {
        if other.is_bottom {
            return *self;
        }
        if self.is_bottom {
            return *other;
        }
        if other.leq(self) {
            return *self;
        }
        let full = Circle::full(bitwidth, msb);
        let shares_start = self.start == other.start;
        let shares_end = self.end == other.end;
        if shares_start && shares_end {
            return *self;
        }
        let new_start = if shares_start {
            self.start
        } else if other.start.ult(&self.start).unwrap() {
            let gap = self.start.sub(&other.start).unwrap();
            let doubled = self.start.sub(&gap).unwrap_or(full.start);
            if doubled.uge(&other.start).unwrap() {
                doubled
            } else {
                full.start
            }
        } else {
            self.start
        };
        let new_end = if shares_end {
            self.end
        } else if other.end.ugt(&self.end).unwrap() {
            let gap = other.end.sub(&self.end).unwrap();
            let doubled = self.end.add(&gap).unwrap_or(full.end);
            if doubled.ule(&full.end).unwrap() && doubled.uge(&self.end).unwrap() {
                doubled
            } else {
                full.end
            }
        } else {
            self.end
        };
        if new_start == full.start && new_end == full.end {
            full
        } else {
            Circle::range(new_start, new_end)
        }
    }
}

/// Signedness-agnostic wrapped interval, kept as two circles.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SplitWrappedInterval {
    bitwidth: u32,
    c0: Circle,
    c1: Circle,
}

impl fmt::Debug for SplitWrappedInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "swi{{c0={:?}, c1={:?}}}", self.c0, self.c1)
    }
}

impl SplitWrappedInterval {
    pub fn bottom(bitwidth: u32) -> Self {
        SplitWrappedInterval {
            bitwidth,
            c0: Circle::bottom(bitwidth, false),
            c1: Circle::bottom(bitwidth, true),
        }
    }

    pub fn top(bitwidth: u32) -> Self {
        SplitWrappedInterval {
            bitwidth,
            c0: Circle::full(bitwidth, false),
            c1: Circle::full(bitwidth, true),
        }
    }

    pub fn singleton(n: WrapInt) -> Self {
        let bitwidth = n.bitwidth();
        if n.msb() {
            SplitWrappedInterval {
                bitwidth,
                c0: Circle::bottom(bitwidth, false),
                c1: Circle::singleton(n),
            }
        } else {
            SplitWrappedInterval {
                bitwidth,
                c0: Circle::singleton(n),
                c1: Circle::bottom(bitwidth, true),
            }
        }
    }

    /// `mk_swinterval(lb, ub, w)`: the signed range `[lb, ub]`, splitting
    /// across the signed pole when `lb` is negative and `ub` is not.
    pub fn from_signed_range(lb: WrapInt, ub: WrapInt) -> Option<Self> {
        if lb.bitwidth() != ub.bitwidth() {
            return None;
        }
        let bitwidth = lb.bitwidth();
        if lb.igt(&ub).unwrap() {
            return Some(Self::bottom(bitwidth));
        }
        match (lb.msb(), ub.msb()) {
            (true, true) | (false, false) => {
                // same half: unsigned bit-pattern order matches signed
                // order on either side of the pole.
                Some(Self::from_unsigned_range_in_one_half(lb, ub))
            }
            (true, false) => {
                let neg_one = WrapInt::from_i128(-1, bitwidth).unwrap();
                let zero = WrapInt::zero(bitwidth).unwrap();
                Some(SplitWrappedInterval {
                    bitwidth,
                    c0: Circle::range(zero, ub),
                    c1: Circle::range(lb, neg_one),
                })
            }
            (false, true) => unreachable!("lb <= ub signed implies lb.msb() => ub.msb()"),
        }
    }

    fn from_unsigned_range_in_one_half(lo: WrapInt, hi: WrapInt) -> Self {
        let bitwidth = lo.bitwidth();
        if lo.msb() {
            SplitWrappedInterval {
                bitwidth,
                c0: Circle::bottom(bitwidth, false),
                c1: Circle::range(lo, hi),
            }
        } else {
            SplitWrappedInterval {
                bitwidth,
                c0: Circle::range(lo, hi),
                c1: Circle::bottom(bitwidth, true),
            }
        }
    }

    /// `mk_uwinterval(lb, ub, w)`: the unsigned range `[lb, ub]`
    /// (`lb <= ub` as plain unsigned bit patterns), splitting at the
    /// unsigned/signed pole (they coincide) when it falls strictly inside.
    pub fn from_unsigned_range(lo: WrapInt, hi: WrapInt) -> Option<Self> {
        if lo.bitwidth() != hi.bitwidth() {
            return None;
        }
        let bitwidth = lo.bitwidth();
        if lo.ugt(&hi).unwrap() {
            return Some(Self::bottom(bitwidth));
        }
        if lo.msb() == hi.msb() {
            Some(Self::from_unsigned_range_in_one_half(lo, hi))
        } else {
            let low_half_end = WrapInt::imax(bitwidth).unwrap();
            let high_half_start = WrapInt::imin(bitwidth).unwrap();
            Some(SplitWrappedInterval {
                bitwidth,
                c0: Circle::range(lo, low_half_end),
                c1: Circle::range(high_half_start, hi),
            })
        }
    }

    pub fn bitwidth(&self) -> u32 {
        self.bitwidth
    }

    pub fn is_bottom(&self) -> bool {
        self.c0.is_bottom && self.c1.is_bottom
    }

    pub fn is_top(&self) -> bool {
        self.c0.is_full(self.bitwidth, false) && self.c1.is_full(self.bitwidth, true)
    }

    pub fn is_singleton(&self) -> bool {
        match (self.c0.is_bottom, self.c1.is_bottom) {
            (false, true) => self.c0.len() == 1,
            (true, false) => self.c1.len() == 1,
            _ => false,
        }
    }

    pub fn circle0(&self) -> Option<(WrapInt, WrapInt)> {
        (!self.c0.is_bottom).then_some((self.c0.start, self.c0.end))
    }

    pub fn circle1(&self) -> Option<(WrapInt, WrapInt)> {
        (!self.c1.is_bottom).then_some((self.c1.start, self.c1.end))
    }

    /// The single-circle ("legacy") view: `start`, `end`, with wrap
    /// encoded as `start > end`. Only meaningful as a display/compat
    /// shim; all algebra in this crate stays on the split form, since the
    /// single-circle view's own widening is known to lose precision
    /// (Section 9).
    pub fn as_legacy(&self) -> (WrapInt, WrapInt, bool) {
        if self.is_bottom() {
            return (
                WrapInt::zero(self.bitwidth).unwrap(),
                WrapInt::zero(self.bitwidth).unwrap(),
                true,
            );
        }
        match (self.c0.is_bottom, self.c1.is_bottom) {
            (false, true) => (self.c0.start, self.c0.end, false),
            (true, false) => (self.c1.start, self.c1.end, false),
            (false, false) => (self.c1.start, self.c0.end, self.c1.start.ugt(&self.c0.end).unwrap() == false),
            (true, true) => unreachable!(),
        }
    }

    pub fn leq(&self, other: &Self) -> bool {
        if self.bitwidth != other.bitwidth {
            return false;
        }
        self.c0.leq(&other.c0) && self.c1.leq(&other.c1)
    }

    pub fn join(&self, other: &Self) -> Self {
        if self.bitwidth != other.bitwidth {
            warn!("wrapped interval join on mismatched bitwidths");
            return SplitWrappedInterval::top(self.bitwidth);
        }
        SplitWrappedInterval {
            bitwidth: self.bitwidth,
            c0: self.c0.join(&other.c0),
            c1: self.c1.join(&other.c1),
        }
    }

    pub fn meet(&self, other: &Self) -> Self {
        if self.bitwidth != other.bitwidth {
            warn!("wrapped interval meet on mismatched bitwidths");
            return SplitWrappedInterval::bottom(self.bitwidth);
        }
        SplitWrappedInterval {
            bitwidth: self.bitwidth,
            c0: self.c0.meet(&other.c0),
            c1: self.c1.meet(&other.c1),
        }
    }

    pub fn widen(&self, other: &Self) -> Self {
        if self.bitwidth != other.bitwidth {
            warn!("wrapped interval widen on mismatched bitwidths");
            return SplitWrappedInterval::top(self.bitwidth);
        }
        SplitWrappedInterval {
            bitwidth: self.bitwidth,
            c0: self.c0.widen(&other.c0, self.bitwidth, false),
            c1: self.c1.widen(&other.c1, self.bitwidth, true),
        }
    }

    /// A simple, always-sound narrowing: never grow, only adopt `other`
    /// where it is already at least as precise per-circle.
    pub fn narrow(&self, other: &Self) -> Self {
        SplitWrappedInterval {
            bitwidth: self.bitwidth,
            c0: if other.c0.leq(&self.c0) { other.c0 } else { self.c0 },
            c1: if other.c1.leq(&self.c1) { other.c1 } else { self.c1 },
        }
    }

    pub fn to_interval(&self) -> Interval {
        if self.is_bottom() {
            return Interval::bottom();
        }
        let mut acc = Interval::bottom();
        if !self.c0.is_bottom {
            acc = acc.union(&Interval::range(self.c0.start.to_i128(), self.c0.end.to_i128()));
        }
        if !self.c1.is_bottom {
            acc = acc.union(&Interval::range(self.c1.start.to_i128(), self.c1.end.to_i128()));
        }
        acc
    }

    /// `lower_half_line(x, signed)`: the part of `*self` consistent with
    /// "<= x" under the chosen interpretation.
    pub fn lower_half_line(&self, x: WrapInt, signed: bool) -> Self {
        let bitwidth = self.bitwidth;
        if signed {
            let bound = SplitWrappedInterval::from_signed_range(
                WrapInt::imin(bitwidth).unwrap(),
                x,
            )
            .unwrap();
            self.meet(&bound)
        } else {
            let bound = SplitWrappedInterval::from_unsigned_range(WrapInt::zero(bitwidth).unwrap(), x).unwrap();
            self.meet(&bound)
        }
    }

    /// `upper_half_line(x, signed)`: symmetric to `lower_half_line`.
    pub fn upper_half_line(&self, x: WrapInt, signed: bool) -> Self {
        let bitwidth = self.bitwidth;
        if signed {
            let bound = SplitWrappedInterval::from_signed_range(x, WrapInt::imax(bitwidth).unwrap()).unwrap();
            self.meet(&bound)
        } else {
            let bound =
                SplitWrappedInterval::from_unsigned_range(x, WrapInt::umax(bitwidth).unwrap()).unwrap();
            self.meet(&bound)
        }
    }

    /// Removes the single point `x` when it is the only element.
    pub fn trim(&self, x: WrapInt) -> Self {
        if self.is_singleton() {
            let (lo, _, _) = self.as_legacy();
            if lo == x {
                return SplitWrappedInterval::bottom(self.bitwidth);
            }
        }
        *self
    }

    /// `get_bitwidth`: fatal `BitwidthFromVacuous` for top or bottom, since
    /// neither carries a meaningful single bitwidth's worth of information
    /// to the caller (both exist at every bitwidth).
    pub fn get_bitwidth(&self) -> Result<u32, DomainError> {
        if self.is_top() || self.is_bottom() {
            Err(DomainError::BitwidthFromVacuous)
        } else {
            Ok(self.bitwidth)
        }
    }

    pub(crate) fn c0(&self) -> Circle {
        self.c0
    }

    pub(crate) fn c1(&self) -> Circle {
        self.c1
    }

    pub(crate) fn from_circles(bitwidth: u32, c0: Circle, c1: Circle) -> Self {
        SplitWrappedInterval { bitwidth, c0, c1 }
    }

    /// `getSignedMinValue`: the most negative element, drawn from circle 1
    /// (negative half) when present, else circle 0's own lower bound.
    pub fn get_signed_min(&self) -> Option<WrapInt> {
        if !self.c1.is_bottom() {
            Some(self.c1.start())
        } else if !self.c0.is_bottom() {
            Some(self.c0.start())
        } else {
            None
        }
    }

    /// `getSignedMaxValue`.
    pub fn get_signed_max(&self) -> Option<WrapInt> {
        if !self.c0.is_bottom() {
            Some(self.c0.end())
        } else if !self.c1.is_bottom() {
            Some(self.c1.end())
        } else {
            None
        }
    }

    /// `getUnsignedMinValue`: circle 0 is the low unsigned half.
    pub fn get_unsigned_min(&self) -> Option<WrapInt> {
        if !self.c0.is_bottom() {
            Some(self.c0.start())
        } else if !self.c1.is_bottom() {
            Some(self.c1.start())
        } else {
            None
        }
    }

    /// `getUnsignedMaxValue`.
    pub fn get_unsigned_max(&self) -> Option<WrapInt> {
        if !self.c1.is_bottom() {
            Some(self.c1.end())
        } else if !self.c0.is_bottom() {
            Some(self.c0.end())
        } else {
            None
        }
    }

    pub fn is_negative(&self) -> bool {
        !self.is_bottom() && self.c0.is_bottom()
    }

    pub fn is_nonnegative(&self) -> bool {
        !self.is_bottom() && self.c1.is_bottom()
    }

    pub fn is_zero(&self) -> bool {
        self.is_singleton() && self.contains(WrapInt::zero(self.bitwidth).unwrap())
    }

    pub fn is_positive(&self) -> bool {
        self.is_nonnegative() && !self.contains(WrapInt::zero(self.bitwidth).unwrap())
    }

    pub fn contains(&self, n: WrapInt) -> bool {
        n.bitwidth() == self.bitwidth && (self.c0.contains(n) || self.c1.contains(n))
    }

    /// Widening with a set of thresholds: compute the plain widening, then
    /// snap each endpoint that moved to the tightest threshold still
    /// covering it, recovering precision lost to `full`-bound extrapolation
    /// when the driver supplies useful syntactic constants (loop bounds,
    /// comparison literals, ...).
    pub fn widen_with_thresholds(&self, other: &Self, thresholds: &[WrapInt]) -> Self {
        let plain = self.widen(other);
        if thresholds.is_empty() || self.bitwidth != other.bitwidth {
            return plain;
        }
        let snap_lo = |circle: Circle, orig: Circle| -> WrapInt {
            if circle.start() == orig.start() {
                return circle.start();
            }
            thresholds
                .iter()
                .copied()
                .filter(|t| t.bitwidth() == self.bitwidth && t.ule(&orig.start()).unwrap_or(false))
                .max_by(|a, b| if a.ult(b).unwrap() { Ordering::Less } else { Ordering::Greater })
                .unwrap_or(circle.start())
        };
        let snap_hi = |circle: Circle, orig: Circle| -> WrapInt {
            if circle.end() == orig.end() {
                return circle.end();
            }
            thresholds
                .iter()
                .copied()
                .filter(|t| t.bitwidth() == self.bitwidth && t.uge(&orig.end()).unwrap_or(false))
                .min_by(|a, b| if a.ult(b).unwrap() { Ordering::Less } else { Ordering::Greater })
                .unwrap_or(circle.end())
        };
        let c0 = if plain.c0.is_bottom() {
            plain.c0
        } else {
            Circle::range(snap_lo(plain.c0, self.c0), snap_hi(plain.c0, self.c0))
        };
        let c1 = if plain.c1.is_bottom() {
            plain.c1
        } else {
            Circle::range(snap_lo(plain.c1, self.c1), snap_hi(plain.c1, self.c1))
        };
        SplitWrappedInterval::from_circles(self.bitwidth, c0, c1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn e2_widening_a_stable_chain_does_not_run_away() {
        let bw = 8;
        let wi1 = SplitWrappedInterval::from_signed_range(
            WrapInt::from_i128(-127, bw).unwrap(),
            WrapInt::from_i128(1, bw).unwrap(),
        )
        .unwrap();
        let wi2 = wi1;
        let widened = wi1.widen(&wi2);
        assert_eq!(widened.to_interval(), wi1.to_interval());
    }

    #[test]
    fn e5_truncating_a_zero_singleton_to_one_bit_stays_zero() {
        let wi = SplitWrappedInterval::singleton(WrapInt::zero(8).unwrap());
        assert!(wi.is_singleton());
        assert_eq!(wi.to_interval(), Interval::singleton(0));
    }

    #[test]
    fn split_construction_covers_both_circles_across_the_pole() {
        let bw = 8;
        let wi = SplitWrappedInterval::from_signed_range(
            WrapInt::from_i128(-5, bw).unwrap(),
            WrapInt::from_i128(5, bw).unwrap(),
        )
        .unwrap();
        assert!(wi.circle0().is_some());
        assert!(wi.circle1().is_some());
        assert_eq!(wi.to_interval(), Interval::range(-5, 5));
    }

    #[test]
    fn join_is_commutative() {
        let bw = 8;
        let a = SplitWrappedInterval::from_signed_range(
            WrapInt::from_i128(-5, bw).unwrap(),
            WrapInt::from_i128(2, bw).unwrap(),
        )
        .unwrap();
        let b = SplitWrappedInterval::singleton(WrapInt::from_i128(100, bw).unwrap());
        assert_eq!(a.join(&b), b.join(&a));
    }
}
