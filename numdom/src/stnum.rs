//! `stnum` (C5): the signedness split of [`crate::tnum::Tnum`] — a pair of
//! tnums, `t0` summarising every element with MSB=0 and `t1` every element
//! with MSB=1, mirroring the split [`crate::witv::SplitWrappedInterval`]
//! keeps for ranges. From the paper this corpus traces to ("Signedness-
//! Agnostic Program Analysis"): keeping the two circles apart is what lets
//! a bit-precision domain stay exact across the signed pole instead of
//! collapsing to `top` the moment a join straddles it.

use std::fmt;

use tracing::warn;
use wrapint::WrapInt;

use crate::{interval::Interval, tnum::Tnum};

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Stnum {
    t0: Tnum,
    t1: Tnum,
}

impl fmt::Debug for Stnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stnum{{t0={:?}, t1={:?}}}", self.t0, self.t1)
    }
}

impl Stnum {
    pub fn bottom(bitwidth: u32) -> Self {
        Stnum {
            t0: Tnum::bottom(bitwidth),
            t1: Tnum::bottom(bitwidth),
        }
    }

    fn top_half(bitwidth: u32, msb: bool) -> Tnum {
        let zero = WrapInt::zero(bitwidth).unwrap();
        let half_mask = WrapInt::imax(bitwidth).unwrap(); // 0111...1
        if msb {
            Tnum::from_value_mask(WrapInt::imin(bitwidth).unwrap(), half_mask).unwrap()
        } else {
            Tnum::from_value_mask(zero, half_mask).unwrap()
        }
    }

    pub fn top(bitwidth: u32) -> Self {
        Stnum {
            t0: Self::top_half(bitwidth, false),
            t1: Self::top_half(bitwidth, true),
        }
    }

    pub fn singleton(n: WrapInt) -> Self {
        let bw = n.bitwidth();
        if n.msb() {
            Stnum {
                t0: Tnum::bottom(bw),
                t1: Tnum::singleton(n),
            }
        } else {
            Stnum {
                t0: Tnum::singleton(n),
                t1: Tnum::bottom(bw),
            }
        }
    }

    /// `normalize(a, b)`: the concretization of the result is exactly
    /// `γ(a) ∪ γ(b)`, re-split correctly by MSB. Used after every
    /// operation whose raw per-half tnum result might have grown an
    /// unknown MSB bit, which would otherwise make a "t0" describe values
    /// that actually have MSB=1 too.
    pub fn normalize(a: Tnum, b: Tnum) -> Self {
        let bw = a.bitwidth();
        let top0 = Self::top_half(bw, false);
        let top1 = Self::top_half(bw, true);
        let a0 = a.meet(&top0);
        let a1 = a.meet(&top1);
        let b0 = b.meet(&top0);
        let b1 = b.meet(&top1);
        Stnum {
            t0: a0.join(&b0),
            t1: a1.join(&b1),
        }
    }

    pub fn construct_from_tnum(a: Tnum) -> Self {
        Self::normalize(a, Tnum::bottom(a.bitwidth()))
    }

    /// `mk_stnum(n, w)`: top if `n` overflows `w` bits, matching the
    /// recoverable `DoesNotFit` contract instead of panicking.
    pub fn mk_stnum(n: i128, width: u32) -> Self {
        match WrapInt::from_i128(n, width) {
            Ok(w) => Self::singleton(w),
            Err(_) => {
                warn!(n, width, "stnum literal does not fit the requested bitwidth");
                Self::top(width)
            }
        }
    }

    /// `mk_stnum(lb, ub, w)`: the signed range `[lb, ub]`, split across the
    /// pole the same way [`crate::witv::SplitWrappedInterval::from_signed_range`]
    /// does, but building a tnum per half instead of a plain range.
    pub fn mk_stnum_range(lb: WrapInt, ub: WrapInt) -> Self {
        if lb.bitwidth() != ub.bitwidth() || lb.igt(&ub).unwrap() {
            return Self::bottom(lb.bitwidth());
        }
        let bw = lb.bitwidth();
        match (lb.msb(), ub.msb()) {
            (false, false) => Stnum {
                t0: Tnum::from_range(lb, ub).unwrap_or_else(|_| Tnum::top(bw)),
                t1: Tnum::bottom(bw),
            },
            (true, true) => Stnum {
                t0: Tnum::bottom(bw),
                t1: Tnum::from_range(lb, ub).unwrap_or_else(|_| Tnum::top(bw)),
            },
            (true, false) => {
                let zero = WrapInt::zero(bw).unwrap();
                let neg_one = WrapInt::from_i128(-1, bw).unwrap();
                Stnum {
                    t0: Tnum::from_range(zero, ub).unwrap_or_else(|_| Tnum::top(bw)),
                    t1: Tnum::from_range(lb, neg_one).unwrap_or_else(|_| Tnum::top(bw)),
                }
            }
            (false, true) => unreachable!("lb <= ub signed implies lb.msb() => ub.msb()"),
        }
    }

    pub fn bitwidth(&self) -> u32 {
        // `bottom` carries the bitwidth it was built with, so t0 alone
        // always answers this correctly.
        self.t0.bitwidth()
    }

    pub fn get_tnum_0(&self) -> Tnum {
        self.t0
    }

    pub fn get_tnum_1(&self) -> Tnum {
        self.t1
    }

    /// Rebuilds a stnum from two tnums already known to belong to their
    /// respective half (no re-routing). Used by the reduced product, which
    /// tightens each half independently and needs to put the pair back
    /// together without the union semantics of [`Self::normalize`].
    pub(crate) fn from_parts(t0: Tnum, t1: Tnum) -> Self {
        Stnum { t0, t1 }
    }

    pub fn is_bottom(&self) -> bool {
        self.t0.is_bottom() && self.t1.is_bottom()
    }

    pub fn is_bottom_0(&self) -> bool {
        self.t0.is_bottom()
    }

    pub fn is_bottom_1(&self) -> bool {
        self.t1.is_bottom()
    }

    pub fn is_top(&self) -> bool {
        let bw = self.bitwidth();
        self.t0 == Self::top_half(bw, false) && self.t1 == Self::top_half(bw, true)
    }

    pub fn is_singleton(&self) -> bool {
        match (self.t0.is_bottom(), self.t1.is_bottom()) {
            (false, true) => self.t0.is_singleton(),
            (true, false) => self.t1.is_singleton(),
            _ => false,
        }
    }

    pub fn at(&self, x: WrapInt) -> bool {
        if x.msb() {
            self.t1.at(x)
        } else {
            self.t0.at(x)
        }
    }

    pub fn is_negative(&self) -> bool {
        !self.is_bottom() && self.t0.is_bottom()
    }

    pub fn is_nonnegative(&self) -> bool {
        !self.is_bottom() && self.t1.is_bottom()
    }

    pub fn is_zero(&self) -> bool {
        self.is_singleton() && !self.t0.is_bottom() && self.t0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.is_nonnegative() && !self.is_zero()
    }

    pub fn leq(&self, other: &Self) -> bool {
        self.t0.leq(&other.t0) && self.t1.leq(&other.t1)
    }

    fn join_raw(&self, other: &Self) -> Self {
        Stnum {
            t0: self.t0.join(&other.t0),
            t1: self.t1.join(&other.t1),
        }
    }

    pub fn join(&self, other: &Self) -> Self {
        let bw = self.bitwidth();
        let raw0 = Self::normalize(self.t0.join(&other.t0), Tnum::bottom(bw));
        let raw1 = Self::normalize(self.t1.join(&other.t1), Tnum::bottom(bw));
        raw0.join_raw(&raw1)
    }

    pub fn meet(&self, other: &Self) -> Self {
        // Meet only shrinks known bits, so a per-half meet can never grow
        // an unknown MSB bit the way join/widen can; no re-normalize
        // needed.
        Stnum {
            t0: self.t0.meet(&other.t0),
            t1: self.t1.meet(&other.t1),
        }
    }

    pub fn widen(&self, other: &Self) -> Self {
        let bw = self.bitwidth();
        let raw0 = Self::normalize(self.t0.widen(&other.t0), Tnum::bottom(bw));
        let raw1 = Self::normalize(self.t1.widen(&other.t1), Tnum::bottom(bw));
        raw0.join_raw(&raw1)
    }

    pub fn narrow(&self, other: &Self) -> Self {
        Stnum {
            t0: self.t0.narrow(&other.t0),
            t1: self.t1.narrow(&other.t1),
        }
    }

    /// Both halves are monotonic between their bit pattern and their
    /// numeric value (unsigned for `t0`, signed for `t1`, since within a
    /// fixed MSB, increasing the unknown bits' values increases both
    /// interpretations together), so the union of each half's bit-pattern
    /// extremes gives the tightest mathematical interval.
    pub fn to_interval(&self) -> Interval {
        let half0 = if self.t0.is_bottom() {
            Interval::bottom()
        } else {
            let lo = self.t0.value().to_u128();
            let hi = self.t0.value().or(&self.t0.mask()).unwrap().to_u128();
            Interval::range(lo, hi)
        };
        let half1 = if self.t1.is_bottom() {
            Interval::bottom()
        } else {
            let lo = self.t1.value().to_i128();
            let hi = self.t1.value().or(&self.t1.mask()).unwrap().to_i128();
            Interval::range(lo, hi)
        };
        half0.union(&half1)
    }

    /// The greatest signed value consistent with the tnum, used as the
    /// precise "auxiliary" witness by [`Self::lower_half_line_bound`].
    pub fn get_signed_max(&self) -> Option<WrapInt> {
        if !self.t0.is_bottom() {
            Some(self.t0.value().or(&self.t0.mask()).unwrap())
        } else if !self.t1.is_bottom() {
            // within the negative half, the numerically greatest (closest
            // to zero) value maximizes the unknown bits too.
            Some(self.t1.value().or(&self.t1.mask()).unwrap())
        } else {
            None
        }
    }

    pub fn get_signed_min(&self) -> Option<WrapInt> {
        if !self.t1.is_bottom() {
            Some(self.t1.value())
        } else if !self.t0.is_bottom() {
            Some(self.t0.value())
        } else {
            None
        }
    }

    pub fn get_unsigned_max(&self) -> Option<WrapInt> {
        // t1's unsigned range (>= 2^(w-1)) always dominates t0's.
        if !self.t1.is_bottom() {
            Some(self.t1.value().or(&self.t1.mask()).unwrap())
        } else if !self.t0.is_bottom() {
            Some(self.t0.value().or(&self.t0.mask()).unwrap())
        } else {
            None
        }
    }

    pub fn get_unsigned_min(&self) -> Option<WrapInt> {
        if !self.t0.is_bottom() {
            Some(self.t0.value())
        } else if !self.t1.is_bottom() {
            Some(self.t1.value())
        } else {
            None
        }
    }

    /// The part of `*self` consistent with "`<= x`" under the chosen
    /// interpretation.
    pub fn lower_half_line(&self, x: WrapInt, signed: bool) -> Self {
        let bw = self.bitwidth();
        let bound = if signed {
            Self::mk_stnum_range(WrapInt::imin(bw).unwrap(), x)
        } else {
            Self::mk_stnum_range_unsigned(WrapInt::zero(bw).unwrap(), x)
        };
        self.meet(&bound)
    }

    pub fn upper_half_line(&self, x: WrapInt, signed: bool) -> Self {
        let bw = self.bitwidth();
        let bound = if signed {
            Self::mk_stnum_range(x, WrapInt::imax(bw).unwrap())
        } else {
            Self::mk_stnum_range_unsigned(x, WrapInt::umax(bw).unwrap())
        };
        self.meet(&bound)
    }

    /// `lower_half_line` against an auxiliary stnum bound rather than a
    /// single witness: since `exists b in γ(bound), v <= b` is maximized
    /// by `bound`'s own greatest witness, this reduces to the single-point
    /// form evaluated at that witness — the move that keeps precision
    /// when the bound itself straddles the signed pole.
    pub fn lower_half_line_bound(&self, bound: &Self, signed: bool) -> Self {
        let bw = self.bitwidth();
        let witness = if signed {
            bound.get_signed_max()
        } else {
            bound.get_unsigned_max()
        };
        match witness {
            Some(w) => self.lower_half_line(w, signed),
            None => Self::bottom(bw),
        }
    }

    pub fn upper_half_line_bound(&self, bound: &Self, signed: bool) -> Self {
        let bw = self.bitwidth();
        let witness = if signed {
            bound.get_signed_min()
        } else {
            bound.get_unsigned_min()
        };
        match witness {
            Some(w) => self.upper_half_line(w, signed),
            None => Self::bottom(bw),
        }
    }

    fn mk_stnum_range_unsigned(lo: WrapInt, hi: WrapInt) -> Self {
        if lo.bitwidth() != hi.bitwidth() || lo.ugt(&hi).unwrap() {
            return Self::bottom(lo.bitwidth());
        }
        let bw = lo.bitwidth();
        if lo.msb() == hi.msb() {
            if lo.msb() {
                Stnum { t0: Tnum::bottom(bw), t1: Tnum::from_range(lo, hi).unwrap_or_else(|_| Tnum::top(bw)) }
            } else {
                Stnum { t0: Tnum::from_range(lo, hi).unwrap_or_else(|_| Tnum::top(bw)), t1: Tnum::bottom(bw) }
            }
        } else {
            let imax = WrapInt::imax(bw).unwrap();
            let imin = WrapInt::imin(bw).unwrap();
            Stnum {
                t0: Tnum::from_range(lo, imax).unwrap_or_else(|_| Tnum::top(bw)),
                t1: Tnum::from_range(imin, hi).unwrap_or_else(|_| Tnum::top(bw)),
            }
        }
    }

    /// Removes the single point `x` when it is the only element.
    pub fn trim(&self, x: WrapInt) -> Self {
        if self.is_singleton() && self.at(x) {
            return Self::bottom(self.bitwidth());
        }
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn e6_meet_of_disagreeing_known_bits_is_bottom() {
        let a = Tnum::from_value_mask(WrapInt::from_u128(0b0000_1000, 8).unwrap(), WrapInt::from_u128(0b0000_0001, 8).unwrap()).unwrap();
        let b = Tnum::from_value_mask(WrapInt::from_u128(0b0000_1100, 8).unwrap(), WrapInt::from_u128(0b0000_0001, 8).unwrap()).unwrap();
        assert!(a.meet(&b).is_bottom());
        let sa = Stnum::construct_from_tnum(a);
        let sb = Stnum::construct_from_tnum(b);
        assert!(sa.meet(&sb).is_bottom());
    }

    #[test]
    fn normalize_splits_a_tnum_spanning_the_pole() {
        let bw = 8;
        let spanning = Tnum::from_range(WrapInt::from_i128(-2, bw).unwrap(), WrapInt::from_i128(2, bw).unwrap())
            .unwrap_or_else(|_| Tnum::top(bw));
        let s = Stnum::normalize(spanning, Tnum::bottom(bw));
        // whatever normalize produces must still be sound: every point in
        // the original range is consistent with one half or the other.
        assert!(s.at(WrapInt::from_i128(-2, bw).unwrap()) || !spanning.at(WrapInt::from_i128(-2, bw).unwrap()));
    }

    #[test]
    fn singleton_routes_to_the_correct_half() {
        let neg = WrapInt::from_i128(-1, 8).unwrap();
        let s = Stnum::singleton(neg);
        assert!(s.is_bottom_0());
        assert!(!s.is_bottom_1());
    }
}
