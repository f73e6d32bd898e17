//! Reduced product (C7, `switv_stnum`): a range-domain environment and a
//! tnum-domain environment sharing the same variable keys, kept in sync by
//! [`ReducedProduct::reduce_variable`] — the only place either side is
//! allowed to mutate the other.

use std::hash::Hash;

use wrapint::WrapInt;

use crate::{
    env::Env,
    stnum::Stnum,
    tnum::Tnum,
    witv::SplitWrappedInterval,
};

/// Tightens one circle's worth of range and tnum against each other.
/// Returns `(None, bottom)` if either side was already empty or the two
/// disagree outright.
fn reduce_half(range: Option<(WrapInt, WrapInt)>, t: Tnum, bitwidth: u32) -> (Option<(WrapInt, WrapInt)>, Tnum) {
    let (lo, hi) = match range {
        Some(r) if !t.is_bottom() => r,
        _ => return (None, Tnum::bottom(bitwidth)),
    };

    // Step 1: tighten the range by the tnum's own min/max.
    let tmin = t.value();
    let tmax = t.value().or(&t.mask()).unwrap();
    let lo = if tmin.ugt(&lo).unwrap() { tmin } else { lo };
    let hi = if tmax.ult(&hi).unwrap() { tmax } else { hi };
    if lo.ugt(&hi).unwrap() {
        return (None, Tnum::bottom(bitwidth));
    }

    // Step 2: recompute the tnum of the tightened range and meet with the
    // existing one.
    let recomputed = Tnum::from_range(lo, hi).unwrap_or_else(|_| Tnum::top(bitwidth));
    let tightened = recomputed.meet(&t);
    if tightened.is_bottom() {
        return (None, Tnum::bottom(bitwidth));
    }

    // Step 3: re-tighten the range by the new tnum's bounds.
    let tmin2 = tightened.value();
    let tmax2 = tightened.value().or(&tightened.mask()).unwrap();
    let final_lo = if tmin2.ugt(&lo).unwrap() { tmin2 } else { lo };
    let final_hi = if tmax2.ult(&hi).unwrap() { tmax2 } else { hi };
    if final_lo.ugt(&final_hi).unwrap() {
        return (None, Tnum::bottom(bitwidth));
    }
    (Some((final_lo, final_hi)), tightened)
}

fn rebuild_range(r0: Option<(WrapInt, WrapInt)>, r1: Option<(WrapInt, WrapInt)>, bitwidth: u32) -> SplitWrappedInterval {
    let half = |r: Option<(WrapInt, WrapInt)>| match r {
        Some((lo, hi)) => SplitWrappedInterval::from_unsigned_range(lo, hi).unwrap(),
        None => SplitWrappedInterval::bottom(bitwidth),
    };
    half(r0).join(&half(r1))
}

/// A range-domain environment and a tnum-domain environment over the same
/// variables, reduced against each other on demand.
#[derive(Clone)]
pub struct ReducedProduct<Var> {
    pub ranges: Env<Var, SplitWrappedInterval>,
    pub tnums: Env<Var, Stnum>,
}

impl<Var: Clone + Eq + Hash> ReducedProduct<Var> {
    pub fn top() -> Self {
        ReducedProduct {
            ranges: Env::top(),
            tnums: Env::top(),
        }
    }

    pub fn bottom() -> Self {
        ReducedProduct {
            ranges: Env::bottom(),
            tnums: Env::bottom(),
        }
    }

    pub fn is_bottom(&self) -> bool {
        self.ranges.is_bottom() || self.tnums.is_bottom()
    }

    fn collapse_if_bottom(&mut self) {
        if self.is_bottom() {
            self.ranges = Env::bottom();
            self.tnums = Env::bottom();
        }
    }

    /// `reduce_variable(v)`: tightens both sides of `v`'s value against
    /// each other, independently on each circle, per Section 4.6. Idempotent
    /// and order-independent across circles: each step is a lattice meet,
    /// and meets of the same operands commute and only ever shrink.
    pub fn reduce_variable(&mut self, v: &Var, bitwidth: u32) {
        if self.is_bottom() {
            return;
        }
        let sw = self.ranges.at(v, bitwidth);
        let st = self.tnums.at(v, bitwidth);
        let (r0, t0) = reduce_half(sw.circle0(), st.get_tnum_0(), bitwidth);
        let (r1, t1) = reduce_half(sw.circle1(), st.get_tnum_1(), bitwidth);
        self.ranges.set(v.clone(), rebuild_range(r0, r1, bitwidth));
        self.tnums.set(v.clone(), Stnum::from_parts(t0, t1));
        self.collapse_if_bottom();
    }

    /// Reduces every variable present in either side, used once after a
    /// batch of constraints has been propagated.
    pub fn reduce_all(&mut self, vars: &[Var], bitwidth: u32) {
        for v in vars {
            self.reduce_variable(v, bitwidth);
            if self.is_bottom() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduction_tightens_a_range_using_known_tnum_bits() {
        let bw = 8;
        let mut p: ReducedProduct<&str> = ReducedProduct::top();
        // x in [0, 15] as a range, but known to have its low 2 bits zero.
        p.ranges.set(
            "x",
            SplitWrappedInterval::from_unsigned_range(WrapInt::zero(bw).unwrap(), WrapInt::from_u128(15, bw).unwrap()).unwrap(),
        );
        p.tnums.set(
            "x",
            Stnum::construct_from_tnum(
                Tnum::from_value_mask(WrapInt::zero(bw).unwrap(), WrapInt::from_u128(0b1111_1100, bw).unwrap()).unwrap(),
            ),
        );
        p.reduce_variable(&"x", bw);
        assert!(!p.is_bottom());
        let tightened = p.ranges.at(&"x", bw);
        assert!(tightened.contains(WrapInt::from_u128(0, bw).unwrap()));
        assert!(!tightened.contains(WrapInt::from_u128(1, bw).unwrap()));
    }

    #[test]
    fn reduction_of_disjoint_range_and_tnum_yields_bottom() {
        let bw = 8;
        let mut p: ReducedProduct<&str> = ReducedProduct::top();
        p.ranges.set("x", SplitWrappedInterval::singleton(WrapInt::from_u128(5, bw).unwrap()));
        p.tnums.set("x", Stnum::singleton(WrapInt::from_u128(9, bw).unwrap()));
        p.reduce_variable(&"x", bw);
        assert!(p.is_bottom());
    }

    #[test]
    fn reduction_is_idempotent() {
        let bw = 8;
        let mut p: ReducedProduct<&str> = ReducedProduct::top();
        p.ranges.set(
            "x",
            SplitWrappedInterval::from_unsigned_range(WrapInt::zero(bw).unwrap(), WrapInt::from_u128(15, bw).unwrap()).unwrap(),
        );
        p.tnums.set(
            "x",
            Stnum::construct_from_tnum(
                Tnum::from_value_mask(WrapInt::zero(bw).unwrap(), WrapInt::from_u128(0b1111_1100, bw).unwrap()).unwrap(),
            ),
        );
        p.reduce_variable(&"x", bw);
        let after_first = (p.ranges.at(&"x", bw), p.tnums.at(&"x", bw));
        p.reduce_variable(&"x", bw);
        let after_second = (p.ranges.at(&"x", bw), p.tnums.at(&"x", bw));
        assert_eq!(after_first, after_second);
    }
}
