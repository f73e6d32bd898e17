//! Transfer functions for [`SplitWrappedInterval`] (C4). Mirrors the split
//! the teacher draws for `Bits`' own arithmetic modules: the lattice shell
//! lives in `witv.rs`, the actual arithmetic lives here.

use tracing::warn;
use wrapint::WrapInt;

use crate::witv::{Circle, SplitWrappedInterval};

/// Cap on the number of shift amounts a non-constant shift will enumerate
/// before falling back to `top`, mirroring `tnum_ops::MAX_SHIFT_DISJUNCTS`.
const MAX_SHIFT_DISJUNCTS: u32 = 16;

/// Builds the split representation of the cyclic arc of length `len`
/// (1..=2^bitwidth) starting at `start`, used by every operation that
/// produces a raw `(start, length)` pair that may straddle the signed pole.
/// `len == 0` is bottom; `len >= 2^bitwidth` is top (the arc covers
/// everything, so which element is "first" no longer matters).
fn cyclic_range(start: WrapInt, len: u128, bitwidth: u32) -> SplitWrappedInterval {
    if len == 0 {
        return SplitWrappedInterval::bottom(bitwidth);
    }
    let modulus: u128 = if bitwidth >= 128 { 0 } else { 1u128 << bitwidth };
    if bitwidth < 128 && len >= modulus {
        return SplitWrappedInterval::top(bitwidth);
    }
    // end = start + (len - 1), mod 2^bitwidth.
    let len_minus_one = WrapInt::from_u128(len - 1, bitwidth).unwrap_or_else(|_| WrapInt::umax(bitwidth).unwrap());
    let end = start.add(&len_minus_one).unwrap();
    if start.msb() == end.msb() && start.ule(&end).unwrap() {
        // stays within one half, no pole crossing
        SplitWrappedInterval::from_unsigned_range(start, end).unwrap()
    } else if !start.msb() {
        // starts in the non-negative half, climbs past imax into circle 1,
        // and (since len < 2^bitwidth) does not wrap all the way back.
        let imax = WrapInt::imax(bitwidth).unwrap();
        let imin = WrapInt::imin(bitwidth).unwrap();
        SplitWrappedInterval::from_circles(bitwidth, Circle::range(start, imax), Circle::range(imin, end))
    } else {
        // starts in the negative half and wraps around 0 back into circle 0.
        let umax = WrapInt::umax(bitwidth).unwrap();
        let zero = WrapInt::zero(bitwidth).unwrap();
        SplitWrappedInterval::from_circles(bitwidth, Circle::range(zero, end), Circle::range(start, umax))
    }
}

fn circle_pair_fold(
    bitwidth: u32,
    a: &SplitWrappedInterval,
    b: &SplitWrappedInterval,
    op: impl Fn(Circle, Circle) -> SplitWrappedInterval,
) -> SplitWrappedInterval {
    let mut acc = SplitWrappedInterval::bottom(bitwidth);
    for ca in [a.c0(), a.c1()] {
        if ca.is_bottom() {
            continue;
        }
        for cb in [b.c0(), b.c1()] {
            if cb.is_bottom() {
                continue;
            }
            acc = acc.join(&op(ca, cb));
        }
    }
    acc
}

impl SplitWrappedInterval {
    fn vacuous(&self, other: &Self) -> Option<Self> {
        if self.is_bottom() || other.is_bottom() {
            return Some(SplitWrappedInterval::bottom(self.bitwidth()));
        }
        if self.bitwidth() != other.bitwidth() {
            warn!(
                lhs = self.bitwidth(),
                rhs = other.bitwidth(),
                "wrapped interval transfer function invoked on mismatched bitwidths"
            );
            return Some(SplitWrappedInterval::top(self.bitwidth()));
        }
        None
    }

    /// `+`: per Section 4.3, sum every pair of circles by adding endpoints
    /// and re-splitting the resulting cyclic arc, then join the four
    /// partial results.
    pub fn add(&self, other: &Self) -> Self {
        if let Some(r) = self.vacuous(other) {
            return r;
        }
        let bw = self.bitwidth();
        circle_pair_fold(bw, self, other, |ca, cb| {
            let start = ca.start().add(&cb.start()).unwrap();
            let len = ca.len_pub() + cb.len_pub() - 1;
            cyclic_range(start, len, bw)
        })
    }

    /// Negation: reverses a circle's order (`-[lo, hi] == [-hi, -lo]`),
    /// which in general migrates values between circles, so every circle
    /// is rebuilt through `cyclic_range`.
    pub fn neg(&self) -> Self {
        if self.is_bottom() {
            return *self;
        }
        let bw = self.bitwidth();
        let mut acc = SplitWrappedInterval::bottom(bw);
        for c in [self.c0(), self.c1()] {
            if c.is_bottom() {
                continue;
            }
            let start = c.end().neg();
            acc = acc.join(&cyclic_range(start, c.len_pub(), bw));
        }
        acc
    }

    /// `-`: `a + (-b)`.
    pub fn sub(&self, other: &Self) -> Self {
        if let Some(r) = self.vacuous(other) {
            return r;
        }
        self.add(&other.neg())
    }

    /// `*`: reduced meet of a signed and an unsigned corner-evaluation on
    /// every circle pair, falling back to top for a pair whose product
    /// range cannot fit in `bitwidth` bits. Joined across all four pairs.
    pub fn mul(&self, other: &Self) -> Self {
        if let Some(r) = self.vacuous(other) {
            return r;
        }
        let bw = self.bitwidth();
        circle_pair_fold(bw, self, other, |ca, cb| mul_circle_pair(ca, cb, bw))
    }

    /// Unsigned division. Same-pair corner evaluation; any pair whose
    /// divisor circle is exactly `{0}` is skipped (recoverable
    /// `DivideByZero`, logged once at the call site below).
    pub fn udiv(&self, other: &Self) -> Self {
        if let Some(r) = self.vacuous(other) {
            return r;
        }
        let bw = self.bitwidth();
        if other.is_zero() {
            warn!("wrapped interval udiv by a known-zero divisor");
            return SplitWrappedInterval::top(bw);
        }
        circle_pair_fold(bw, self, other, |ca, cb| {
            // exclude the zero point from the divisor circle, if present
            // (only circle 0 can ever contain it: circle 1's unsigned
            // range starts at 2^(w-1)).
            let cb = if cb.start().is_zero() {
                Circle::range(WrapInt::uone(bw).unwrap(), cb.end())
            } else {
                cb
            };
            if cb.is_bottom() {
                return SplitWrappedInterval::bottom(bw);
            }
            let corners = [
                ca.start().udiv(&cb.start()),
                ca.start().udiv(&cb.end()),
                ca.end().udiv(&cb.start()),
                ca.end().udiv(&cb.end()),
            ];
            hull_unsigned(&corners, bw)
        })
    }

    /// Unsigned remainder: quotient-based when it collapses to a
    /// singleton, otherwise bounded by the divisor's magnitude.
    pub fn urem(&self, other: &Self) -> Self {
        if let Some(r) = self.vacuous(other) {
            return r;
        }
        let bw = self.bitwidth();
        if other.is_zero() {
            warn!("wrapped interval urem by a known-zero divisor");
            return SplitWrappedInterval::top(bw);
        }
        let q = self.udiv(other);
        if q.is_singleton() {
            let qv = q.get_unsigned_min().unwrap();
            if let Some(ov) = other.get_unsigned_min().filter(|_| other.is_singleton()) {
                if let Ok(prod) = qv.mul(&ov) {
                    return self.sub(&SplitWrappedInterval::singleton(prod));
                }
            }
        }
        let hi = other
            .get_unsigned_max()
            .unwrap_or_else(|| WrapInt::umax(bw).unwrap());
        if hi.is_zero() {
            return SplitWrappedInterval::top(bw);
        }
        let max_rem = hi.sub(&WrapInt::uone(bw).unwrap()).unwrap_or(hi);
        SplitWrappedInterval::from_unsigned_range(WrapInt::zero(bw).unwrap(), max_rem).unwrap()
    }

    /// Signed division, truncating toward zero. `INT_MIN / -1` is the one
    /// corner that overflows two's complement; it is detected explicitly
    /// and folds that corner to top rather than silently wrapping.
    pub fn sdiv(&self, other: &Self) -> Self {
        if let Some(r) = self.vacuous(other) {
            return r;
        }
        let bw = self.bitwidth();
        if other.is_zero() {
            warn!("wrapped interval sdiv by a known-zero divisor");
            return SplitWrappedInterval::top(bw);
        }
        let mut acc = SplitWrappedInterval::bottom(bw);
        for ca in [self.c0(), self.c1()] {
            if ca.is_bottom() {
                continue;
            }
            for cb in [other.c0(), other.c1()] {
                if cb.is_bottom() {
                    continue;
                }
                acc = acc.join(&sdiv_circle_pair(ca, cb, bw));
            }
        }
        acc
    }

    /// Signed remainder (sign follows the dividend).
    pub fn srem(&self, other: &Self) -> Self {
        if let Some(r) = self.vacuous(other) {
            return r;
        }
        let bw = self.bitwidth();
        if other.is_zero() {
            warn!("wrapped interval srem by a known-zero divisor");
            return SplitWrappedInterval::top(bw);
        }
        let q = self.sdiv(other);
        if q.is_singleton() && other.is_singleton() {
            let qv = q.get_signed_min().unwrap();
            let ov = other.get_signed_min().unwrap();
            if let Ok(prod) = qv.mul(&ov) {
                return self.sub(&SplitWrappedInterval::singleton(prod));
            }
        }
        let lo = other.get_signed_min().unwrap_or_else(|| WrapInt::imin(bw).unwrap());
        let hi = other.get_signed_max().unwrap_or_else(|| WrapInt::imax(bw).unwrap());
        let bound = lo.to_i128().unsigned_abs().max(hi.to_i128().unsigned_abs());
        if bound == 0 {
            return SplitWrappedInterval::top(bw);
        }
        let bound = (bound - 1).min(WrapInt::imax(bw).unwrap().to_u128());
        SplitWrappedInterval::from_signed_range(
            WrapInt::from_i128(-(bound as i128), bw).unwrap_or_else(|_| WrapInt::imin(bw).unwrap()),
            WrapInt::from_i128(bound as i128, bw).unwrap_or_else(|_| WrapInt::imax(bw).unwrap()),
        )
        .unwrap()
    }

    pub fn and(&self, other: &Self) -> Self {
        self.via_tnum(other, crate::tnum::Tnum::and)
    }

    pub fn or(&self, other: &Self) -> Self {
        self.via_tnum(other, crate::tnum::Tnum::or)
    }

    pub fn xor(&self, other: &Self) -> Self {
        self.via_tnum(other, crate::tnum::Tnum::xor)
    }

    pub fn not(&self) -> Self {
        if self.is_bottom() {
            return *self;
        }
        crate::tnum::Tnum::from_range(
            self.get_unsigned_min().unwrap_or_else(|| WrapInt::zero(self.bitwidth()).unwrap()),
            self.get_unsigned_max().unwrap_or_else(|| WrapInt::umax(self.bitwidth()).unwrap()),
        )
        .map(|t| t.not())
        .map(range_from_tnum)
        .unwrap_or_else(|_| SplitWrappedInterval::top(self.bitwidth()))
    }

    /// Bitwise ops have no native range algebra of their own; route through
    /// a [`crate::tnum::Tnum`] built from this interval's unsigned bounds,
    /// which is always sound (if sometimes less precise than a bespoke
    /// range-level transfer function would be).
    fn via_tnum(&self, other: &Self, op: impl Fn(&crate::tnum::Tnum, &crate::tnum::Tnum) -> crate::tnum::Tnum) -> Self {
        if let Some(r) = self.vacuous(other) {
            return r;
        }
        let bw = self.bitwidth();
        let ta = crate::tnum::Tnum::from_range(
            self.get_unsigned_min().unwrap(),
            self.get_unsigned_max().unwrap(),
        )
        .unwrap_or_else(|_| crate::tnum::Tnum::top(bw));
        let tb = crate::tnum::Tnum::from_range(
            other.get_unsigned_min().unwrap(),
            other.get_unsigned_max().unwrap(),
        )
        .unwrap_or_else(|_| crate::tnum::Tnum::top(bw));
        range_from_tnum(op(&ta, &tb))
    }

    fn shl_const(&self, k: u32) -> Self {
        let bw = self.bitwidth();
        if k >= bw {
            return SplitWrappedInterval::singleton(WrapInt::zero(bw).unwrap());
        }
        let mut acc = SplitWrappedInterval::bottom(bw);
        for c in [self.c0(), self.c1()] {
            if c.is_bottom() {
                continue;
            }
            acc = acc.join(&cyclic_range(c.start().shl(k), c.len_pub(), bw));
        }
        acc
    }

    fn lshr_const(&self, k: u32) -> Self {
        let bw = self.bitwidth();
        if k >= bw {
            return SplitWrappedInterval::singleton(WrapInt::zero(bw).unwrap());
        }
        let mut acc = SplitWrappedInterval::bottom(bw);
        for c in [self.c0(), self.c1()] {
            if c.is_bottom() {
                continue;
            }
            acc = acc.join(&SplitWrappedInterval::from_unsigned_range(c.start().lshr(k), c.end().lshr(k)).unwrap());
        }
        acc
    }

    fn ashr_const(&self, k: u32) -> Self {
        let bw = self.bitwidth();
        let mut acc = SplitWrappedInterval::bottom(bw);
        for c in [self.c0(), self.c1()] {
            if c.is_bottom() {
                continue;
            }
            // ashr is monotone and keeps a value's sign, so each circle
            // maps into itself: no resplit needed.
            acc = acc.join(&SplitWrappedInterval::from_circles(
                bw,
                if c.start().msb() { Circle::bottom(bw, false) } else { Circle::range(c.start().ashr(k), c.end().ashr(k)) },
                if c.start().msb() { Circle::range(c.start().ashr(k), c.end().ashr(k)) } else { Circle::bottom(bw, true) },
            ));
        }
        acc
    }

    fn amount_bounds(&self, amount: &Self) -> Option<(u32, u32)> {
        if amount.is_bottom() {
            return None;
        }
        let bw = self.bitwidth();
        let lo = amount.get_unsigned_min()?.to_u128().min(bw as u128) as u32;
        let hi = amount.get_unsigned_max()?.to_u128().min(bw as u128) as u32;
        Some((lo, hi))
    }

    /// `shl`'s too-many-disjuncts fallback: whatever the exact shift count
    /// within `[lo, ..]`, at least the low `lo` bits are zero-filled, so the
    /// result's magnitude cannot exceed `umax` with its low `lo` bits
    /// cleared.
    fn shl_bound(&self, lo: u32) -> Self {
        let bw = self.bitwidth();
        if lo >= bw {
            return SplitWrappedInterval::singleton(WrapInt::zero(bw).unwrap());
        }
        let max = WrapInt::umax(bw).unwrap().shl(lo);
        SplitWrappedInterval::from_unsigned_range(WrapInt::zero(bw).unwrap(), max).unwrap()
    }

    /// `lshr`'s too-many-disjuncts fallback: the top `lo` bits are zero
    /// regardless of the exact shift count, so the result cannot exceed
    /// `umax` with its high `lo` bits cleared.
    fn lshr_bound(&self, lo: u32) -> Self {
        let bw = self.bitwidth();
        if lo >= bw {
            return SplitWrappedInterval::singleton(WrapInt::zero(bw).unwrap());
        }
        let max = WrapInt::umax(bw).unwrap().lshr(lo);
        SplitWrappedInterval::from_unsigned_range(WrapInt::zero(bw).unwrap(), max).unwrap()
    }

    /// `ashr`'s too-many-disjuncts fallback: each circle maps into itself
    /// (ashr preserves sign), so the bound is computed per circle and only
    /// joined over the circles `self` actually occupies — a nonnegative
    /// operand cannot produce a negative result no matter the shift count.
    fn ashr_bound(&self, lo: u32) -> Self {
        let bw = self.bitwidth();
        let c0_possible = !self.c0().is_bottom();
        let c1_possible = !self.c1().is_bottom();
        if lo >= bw {
            return match (c0_possible, c1_possible) {
                (true, false) => SplitWrappedInterval::singleton(WrapInt::zero(bw).unwrap()),
                (false, true) => SplitWrappedInterval::singleton(WrapInt::from_i128(-1, bw).unwrap()),
                _ => SplitWrappedInterval::from_circles(
                    bw,
                    Circle::range(WrapInt::zero(bw).unwrap(), WrapInt::zero(bw).unwrap()),
                    Circle::range(WrapInt::from_i128(-1, bw).unwrap(), WrapInt::from_i128(-1, bw).unwrap()),
                ),
            };
        }
        let mut acc = SplitWrappedInterval::bottom(bw);
        if c0_possible {
            let max = WrapInt::umax(bw).unwrap().lshr(lo);
            acc = acc.join(&SplitWrappedInterval::from_unsigned_range(WrapInt::zero(bw).unwrap(), max).unwrap());
        }
        if c1_possible {
            let min = WrapInt::imin(bw).unwrap().ashr(lo);
            let neg_one = WrapInt::from_i128(-1, bw).unwrap();
            acc = acc.join(&SplitWrappedInterval::from_signed_range(min, neg_one).unwrap());
        }
        acc
    }

    fn shift_by_range(&self, amount: &Self, step: impl Fn(&Self, u32) -> Self, bound: impl Fn(&Self, u32) -> Self) -> Self {
        let bw = self.bitwidth();
        if self.is_bottom() || amount.is_bottom() {
            return SplitWrappedInterval::bottom(bw);
        }
        if amount.is_singleton() {
            return step(self, amount.get_unsigned_min().unwrap().to_u128() as u32);
        }
        let (lo, hi) = match self.amount_bounds(amount) {
            Some(b) => b,
            None => return SplitWrappedInterval::bottom(bw),
        };
        if hi - lo > MAX_SHIFT_DISJUNCTS {
            warn!(lo, hi, "shift amount range too wide, falling back to a precomputed max-result bound");
            return bound(self, lo);
        }
        let mut acc = SplitWrappedInterval::bottom(bw);
        for k in lo..=hi {
            acc = acc.join(&step(self, k));
        }
        acc
    }

    pub fn shl(&self, amount: &Self) -> Self {
        self.shift_by_range(amount, Self::shl_const, Self::shl_bound)
    }

    pub fn lshr(&self, amount: &Self) -> Self {
        self.shift_by_range(amount, Self::lshr_const, Self::lshr_bound)
    }

    pub fn ashr(&self, amount: &Self) -> Self {
        self.shift_by_range(amount, Self::ashr_const, Self::ashr_bound)
    }

    /// Zero extension: neither circle's values replicate a sign bit, so
    /// both land, numerically unchanged, in the wider width's circle 0
    /// (the old circle 1's bit pattern, read as an unsigned number, is
    /// still less than `2^old_bitwidth <= 2^(new_bitwidth - 1)`).
    pub fn zero_extend(&self, new_bitwidth: u32) -> Self {
        if self.is_bottom() {
            return SplitWrappedInterval::bottom(new_bitwidth);
        }
        let mut c0 = Circle::bottom(new_bitwidth, false);
        for c in [self.c0(), self.c1()] {
            if c.is_bottom() {
                continue;
            }
            c0 = c0.join(&Circle::range(c.start().zero_extend(new_bitwidth).unwrap(), c.end().zero_extend(new_bitwidth).unwrap()));
        }
        SplitWrappedInterval::from_circles(new_bitwidth, c0, Circle::bottom(new_bitwidth, true))
    }

    /// Sign extension: each circle keeps its own sign, so circle 0 extends
    /// into the wider circle 0 and circle 1 into the wider circle 1,
    /// independently (no cross-circle migration, unlike zero extension).
    pub fn sign_extend(&self, new_bitwidth: u32) -> Self {
        if self.is_bottom() {
            return SplitWrappedInterval::bottom(new_bitwidth);
        }
        let c0 = if self.c0().is_bottom() {
            Circle::bottom(new_bitwidth, false)
        } else {
            Circle::range(
                self.c0().start().sign_extend(new_bitwidth).unwrap(),
                self.c0().end().sign_extend(new_bitwidth).unwrap(),
            )
        };
        let c1 = if self.c1().is_bottom() {
            Circle::bottom(new_bitwidth, true)
        } else {
            Circle::range(
                self.c1().start().sign_extend(new_bitwidth).unwrap(),
                self.c1().end().sign_extend(new_bitwidth).unwrap(),
            )
        };
        SplitWrappedInterval::from_circles(new_bitwidth, c0, c1)
    }

    /// Truncation: per Section 4.3, tests `start >> k == end >> k` on each
    /// circle to decide whether the discarded high bits are constant
    /// across the circle (in which case the low bits form a contiguous
    /// range); otherwise that circle's contribution falls back to top.
    pub fn truncate(&self, new_bitwidth: u32) -> Self {
        if self.is_bottom() {
            return SplitWrappedInterval::bottom(new_bitwidth);
        }
        let mut acc = SplitWrappedInterval::bottom(new_bitwidth);
        for c in [self.c0(), self.c1()] {
            if c.is_bottom() {
                continue;
            }
            acc = acc.join(&truncate_range(c.start(), c.end(), new_bitwidth));
        }
        acc
    }
}

fn truncate_range(lo: WrapInt, hi: WrapInt, new_bw: u32) -> SplitWrappedInterval {
    let old_bw = lo.bitwidth();
    if old_bw == new_bw {
        return SplitWrappedInterval::from_unsigned_range(lo, hi).unwrap();
    }
    if lo.lshr(new_bw) == hi.lshr(new_bw) {
        let tlo = lo.truncate(new_bw).unwrap();
        let thi = hi.truncate(new_bw).unwrap();
        SplitWrappedInterval::from_unsigned_range(tlo, thi).unwrap()
    } else {
        SplitWrappedInterval::top(new_bw)
    }
}

fn range_from_tnum(t: crate::tnum::Tnum) -> SplitWrappedInterval {
    if t.is_bottom() {
        return SplitWrappedInterval::bottom(t.bitwidth());
    }
    let interval = t.to_interval();
    match interval {
        crate::interval::Interval::Bottom => SplitWrappedInterval::bottom(t.bitwidth()),
        crate::interval::Interval::Bounded { .. } => {
            SplitWrappedInterval::from_unsigned_range(
                WrapInt::from_u128(t.value().to_u128(), t.bitwidth()).unwrap(),
                WrapInt::from_u128(t.value().to_u128() | t.mask().to_u128(), t.bitwidth()).unwrap(),
            )
            .unwrap()
        }
    }
}

fn hull_unsigned(corners: &[Result<WrapInt, wrapint::WrapIntError>], bw: u32) -> SplitWrappedInterval {
    let vals: Vec<WrapInt> = corners.iter().filter_map(|r| r.ok()).collect();
    if vals.is_empty() {
        return SplitWrappedInterval::top(bw);
    }
    let mut lo = vals[0];
    let mut hi = vals[0];
    for &v in &vals[1..] {
        if v.ult(&lo).unwrap() {
            lo = v;
        }
        if v.ugt(&hi).unwrap() {
            hi = v;
        }
    }
    SplitWrappedInterval::from_unsigned_range(lo, hi).unwrap()
}

/// Corner-evaluation multiplication for a single circle pair, each circle
/// read both as a signed range and an unsigned range (Section 4.3's
/// "reduced meet of a signed multiplication and an unsigned
/// multiplication"), folding to top for whichever interpretation would
/// overflow `i128`/`u128` host arithmetic or spill outside `bitwidth` bits.
fn mul_circle_pair(a: Circle, b: Circle, bw: u32) -> SplitWrappedInterval {
    let signed = {
        let corners = [
            a.start().to_i128().checked_mul(b.start().to_i128()),
            a.start().to_i128().checked_mul(b.end().to_i128()),
            a.end().to_i128().checked_mul(b.start().to_i128()),
            a.end().to_i128().checked_mul(b.end().to_i128()),
        ];
        if corners.iter().any(|c| c.is_none()) {
            SplitWrappedInterval::top(bw)
        } else {
            let vals: Vec<i128> = corners.into_iter().map(|c| c.unwrap()).collect();
            let lo = *vals.iter().min().unwrap();
            let hi = *vals.iter().max().unwrap();
            match (WrapInt::from_i128(lo, bw), WrapInt::from_i128(hi, bw)) {
                (Ok(lo), Ok(hi)) => SplitWrappedInterval::from_signed_range(lo, hi).unwrap(),
                _ => SplitWrappedInterval::top(bw),
            }
        }
    };
    let unsigned = {
        let corners = [
            a.start().to_u128().checked_mul(b.start().to_u128()),
            a.start().to_u128().checked_mul(b.end().to_u128()),
            a.end().to_u128().checked_mul(b.start().to_u128()),
            a.end().to_u128().checked_mul(b.end().to_u128()),
        ];
        if corners.iter().any(|c| c.is_none()) {
            SplitWrappedInterval::top(bw)
        } else {
            let vals: Vec<u128> = corners.into_iter().map(|c| c.unwrap()).collect();
            let lo = *vals.iter().min().unwrap();
            let hi = *vals.iter().max().unwrap();
            match (WrapInt::from_u128(lo, bw), WrapInt::from_u128(hi, bw)) {
                (Ok(lo), Ok(hi)) => SplitWrappedInterval::from_unsigned_range(lo, hi).unwrap(),
                _ => SplitWrappedInterval::top(bw),
            }
        }
    };
    signed.meet(&unsigned)
}

/// Signed division for a single circle pair, excluding a zero divisor
/// subrange and special-casing `INT_MIN / -1` (the one combination that
/// overflows two's complement and must fold to top rather than be
/// computed directly), then taking the convex hull of the remaining
/// corners.
///
/// Every corner goes through `checked_div`, mirroring `mul_circle_pair`'s
/// `checked_mul` guard. `wrapping_div` plus an `from_i128` fit check on
/// the result is not equivalent: at `bitwidth == 128` (`wrapint::W_MAX`),
/// `i128` host arithmetic has no extra headroom over the target width, so
/// `i128::MIN.wrapping_div(-1)` silently wraps back to `i128::MIN` and
/// `from_i128(i128::MIN, 128)` would accept it, hiding exactly the
/// overflow Section 4.3 requires be folded to top.
fn sdiv_circle_pair(a: Circle, b: Circle, bw: u32) -> SplitWrappedInterval {
    let b_lo = b.start().to_i128();
    let b_hi = b.end().to_i128();
    let mut parts = Vec::new();
    if b_lo < 0 {
        parts.push((b_lo, b_hi.min(-1)));
    }
    if b_hi >= 1 {
        parts.push((b_lo.max(1), b_hi));
    }
    let mut acc = SplitWrappedInterval::bottom(bw);
    for (p_lo, p_hi) in parts {
        if p_lo > p_hi {
            continue;
        }
        let a_lo = a.start().to_i128();
        let a_hi = a.end().to_i128();
        let corners = [
            a_lo.checked_div(p_lo),
            a_lo.checked_div(p_hi),
            a_hi.checked_div(p_lo),
            a_hi.checked_div(p_hi),
        ];
        if corners.iter().any(|c| c.is_none()) {
            acc = acc.join(&SplitWrappedInterval::top(bw));
            continue;
        }
        let vals: Vec<i128> = corners.into_iter().map(|c| c.unwrap()).collect();
        let lo = *vals.iter().min().unwrap();
        let hi = *vals.iter().max().unwrap();
        match (WrapInt::from_i128(lo, bw), WrapInt::from_i128(hi, bw)) {
            (Ok(lo), Ok(hi)) => acc = acc.join(&SplitWrappedInterval::from_signed_range(lo, hi).unwrap()),
            _ => acc = acc.join(&SplitWrappedInterval::top(bw)),
        }
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn e3_unsigned_four_bit_range_divided_by_constant_two() {
        let wi = SplitWrappedInterval::from_unsigned_range(
            WrapInt::from_u128(4, 4).unwrap(),
            WrapInt::from_u128(7, 4).unwrap(),
        )
        .unwrap();
        let ki = SplitWrappedInterval::singleton(WrapInt::from_u128(2, 4).unwrap());
        let result = wi.sdiv(&ki);
        assert_eq!(
            result,
            SplitWrappedInterval::from_unsigned_range(WrapInt::from_u128(2, 4).unwrap(), WrapInt::from_u128(3, 4).unwrap())
                .unwrap()
        );
    }

    #[test]
    fn addition_of_two_positive_singletons_matches_scalar_addition() {
        let a = SplitWrappedInterval::singleton(WrapInt::from_u128(3, 8).unwrap());
        let b = SplitWrappedInterval::singleton(WrapInt::from_u128(4, 8).unwrap());
        let sum = a.add(&b);
        assert!(sum.is_singleton());
        assert_eq!(sum.get_unsigned_min(), Some(WrapInt::from_u128(7, 8).unwrap()));
    }

    #[test]
    fn shl_by_a_constant_that_would_overflow_the_width_falls_back_to_top() {
        let wi = SplitWrappedInterval::from_unsigned_range(WrapInt::zero(8).unwrap(), WrapInt::umax(8).unwrap()).unwrap();
        let amt = SplitWrappedInterval::singleton(WrapInt::from_u128(1, 8).unwrap());
        let shifted = wi.shl(&amt);
        assert!(shifted.is_top());
    }

    #[test]
    fn shl_by_too_wide_an_amount_range_falls_back_to_a_max_result_bound_not_top() {
        let bw = 64;
        let wi = SplitWrappedInterval::top(bw);
        let amt = SplitWrappedInterval::from_unsigned_range(
            WrapInt::from_u128(20, bw).unwrap(),
            WrapInt::from_u128(40, bw).unwrap(),
        )
        .unwrap();
        let shifted = wi.shl(&amt);
        assert!(!shifted.is_top(), "shl fallback should be tighter than top");
        assert_eq!(shifted.get_unsigned_max().unwrap().to_u128() & ((1u128 << 20) - 1), 0);
    }

    #[test]
    fn lshr_by_too_wide_an_amount_range_falls_back_to_a_max_result_bound_not_top() {
        let bw = 64;
        let wi = SplitWrappedInterval::top(bw);
        let amt = SplitWrappedInterval::from_unsigned_range(
            WrapInt::from_u128(20, bw).unwrap(),
            WrapInt::from_u128(40, bw).unwrap(),
        )
        .unwrap();
        let shifted = wi.lshr(&amt);
        assert!(!shifted.is_top(), "lshr fallback should be tighter than top");
        assert!(shifted.get_unsigned_max().unwrap().to_u128() < (1u128 << (bw - 20)));
    }

    #[test]
    fn ashr_of_a_purely_nonnegative_range_with_too_wide_an_amount_stays_nonnegative() {
        let bw = 64;
        let wi = SplitWrappedInterval::from_unsigned_range(
            WrapInt::zero(bw).unwrap(),
            WrapInt::imax(bw).unwrap(),
        )
        .unwrap();
        let amt = SplitWrappedInterval::from_unsigned_range(
            WrapInt::from_u128(20, bw).unwrap(),
            WrapInt::from_u128(40, bw).unwrap(),
        )
        .unwrap();
        let shifted = wi.ashr(&amt);
        assert!(!shifted.is_top(), "ashr fallback should exploit the known-nonnegative sign");
        assert!(!shifted.get_unsigned_min().unwrap().msb());
    }

    #[test]
    fn zero_and_sign_extension_agree_on_a_nonnegative_value() {
        let wi = SplitWrappedInterval::singleton(WrapInt::from_u128(5, 8).unwrap());
        assert_eq!(wi.zero_extend(16).to_interval(), wi.sign_extend(16).to_interval());
    }

    #[test]
    fn e5_truncating_zero_singleton_to_one_bit() {
        let wi = SplitWrappedInterval::singleton(WrapInt::zero(8).unwrap());
        let narrowed = wi.truncate(1);
        assert!(narrowed.is_singleton());
        assert_eq!(narrowed.get_unsigned_min(), Some(WrapInt::zero(1).unwrap()));
    }

    #[test]
    fn sdiv_of_signed_min_by_minus_one_folds_to_top_at_bitwidth_eight() {
        let imin = SplitWrappedInterval::singleton(WrapInt::imin(8).unwrap());
        let minus_one = SplitWrappedInterval::singleton(WrapInt::from_i128(-1, 8).unwrap());
        assert!(imin.sdiv(&minus_one).is_top());
    }

    /// At `bitwidth == 128` (`wrapint::W_MAX`), `i128` host arithmetic has
    /// no extra headroom over the target width: `i128::MIN.wrapping_div(-1)`
    /// silently wraps back to `i128::MIN`, which `from_i128` would then
    /// accept as if it fit. `checked_div` must catch this directly instead
    /// of relying on that accidental fit check.
    #[test]
    fn sdiv_of_signed_min_by_minus_one_folds_to_top_at_bitwidth_128() {
        let imin = SplitWrappedInterval::singleton(WrapInt::imin(128).unwrap());
        let minus_one = SplitWrappedInterval::singleton(WrapInt::from_i128(-1, 128).unwrap());
        assert!(imin.sdiv(&minus_one).is_top());
    }
}
