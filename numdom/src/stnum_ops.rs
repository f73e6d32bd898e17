//! Transfer functions for [`Stnum`] (C5). Every binary operation folds
//! over the four `(t0, t1)` circle-pair combinations the way
//! [`crate::witv_ops`] folds over `SplitWrappedInterval` circle pairs, then
//! re-routes each raw per-pair tnum result through
//! [`Stnum::normalize`] — the result of, say, `t0 + t0` can carry into the
//! negative half, and normalize is what keeps that sound.
//!
//! Each per-circle tnum already knows its own sign exactly (circle0's mask
//! never has an unknown MSB, circle1's is always known-1), so simply
//! delegating to the matching [`crate::tnum_ops`] function per pair is not
//! an approximation — it is exactly as precise as a bespoke per-circle
//! implementation would be, since `Tnum::sdiv`/`srem`'s own sign-bounds
//! logic already exploits a known sign bit when one is present.

use wrapint::WrapInt;

use crate::{stnum::Stnum, tnum::Tnum};

fn fold(a: &Stnum, b: &Stnum, op: impl Fn(&Tnum, &Tnum) -> Tnum) -> Stnum {
    let bw = a.bitwidth();
    if a.is_bottom() || b.is_bottom() {
        return Stnum::bottom(bw);
    }
    let mut acc = Stnum::bottom(bw);
    for ta in [a.get_tnum_0(), a.get_tnum_1()] {
        if ta.is_bottom() {
            continue;
        }
        for tb in [b.get_tnum_0(), b.get_tnum_1()] {
            if tb.is_bottom() {
                continue;
            }
            let raw = op(&ta, &tb);
            acc = acc.join(&Stnum::normalize(raw, Tnum::bottom(bw)));
        }
    }
    acc
}

fn map_halves(a: &Stnum, op: impl Fn(&Tnum) -> Tnum) -> Stnum {
    let bw = a.bitwidth();
    if a.is_bottom() {
        return Stnum::bottom(bw);
    }
    let raw0 = Stnum::normalize(op(&a.get_tnum_0()), Tnum::bottom(bw));
    let raw1 = Stnum::normalize(op(&a.get_tnum_1()), Tnum::bottom(bw));
    raw0.join(&raw1)
}

impl Stnum {
    pub fn add(&self, other: &Self) -> Self {
        fold(self, other, Tnum::add)
    }

    pub fn sub(&self, other: &Self) -> Self {
        fold(self, other, Tnum::sub)
    }

    pub fn neg(&self) -> Self {
        map_halves(self, Tnum::neg)
    }

    pub fn mul(&self, other: &Self) -> Self {
        fold(self, other, Tnum::mul)
    }

    pub fn udiv(&self, other: &Self) -> Self {
        fold(self, other, Tnum::udiv)
    }

    pub fn urem(&self, other: &Self) -> Self {
        fold(self, other, Tnum::urem)
    }

    pub fn sdiv(&self, other: &Self) -> Self {
        fold(self, other, Tnum::sdiv)
    }

    pub fn srem(&self, other: &Self) -> Self {
        fold(self, other, Tnum::srem)
    }

    pub fn and(&self, other: &Self) -> Self {
        fold(self, other, Tnum::and)
    }

    pub fn or(&self, other: &Self) -> Self {
        fold(self, other, Tnum::or)
    }

    pub fn xor(&self, other: &Self) -> Self {
        fold(self, other, Tnum::xor)
    }

    pub fn not(&self) -> Self {
        map_halves(self, Tnum::not)
    }

    pub fn shl(&self, amount: &Self) -> Self {
        fold(self, amount, Tnum::shl)
    }

    pub fn lshr(&self, amount: &Self) -> Self {
        fold(self, amount, Tnum::lshr)
    }

    pub fn ashr(&self, amount: &Self) -> Self {
        fold(self, amount, Tnum::ashr)
    }

    /// Both halves route to the new `t0`: a zero-extended negative circle
    /// becomes a large nonnegative number at the wider width, with a
    /// known-0 new MSB exactly like an extended `t0` value.
    pub fn zero_extend(&self, new_bitwidth: u32) -> Self {
        map_halves_to_width(self, new_bitwidth, Tnum::zero_extend)
    }

    /// Each half keeps its own sign, since both halves already have a
    /// known MSB and sign-extension replicates it.
    pub fn sign_extend(&self, new_bitwidth: u32) -> Self {
        map_halves_to_width(self, new_bitwidth, Tnum::sign_extend)
    }

    pub fn truncate(&self, new_bitwidth: u32) -> Self {
        map_halves_to_width(self, new_bitwidth, Tnum::truncate)
    }

    /// Removes a known point, used by the solver when a disequation
    /// constraint pins a single value out of an otherwise imprecise
    /// operand.
    pub fn trim_point(&self, x: WrapInt) -> Self {
        self.trim(x)
    }
}

fn map_halves_to_width(a: &Stnum, new_bitwidth: u32, op: impl Fn(&Tnum, u32) -> Tnum) -> Stnum {
    if a.is_bottom() {
        return Stnum::bottom(new_bitwidth);
    }
    let raw0 = Stnum::normalize(op(&a.get_tnum_0(), new_bitwidth), Tnum::bottom(new_bitwidth));
    let raw1 = Stnum::normalize(op(&a.get_tnum_1(), new_bitwidth), Tnum::bottom(new_bitwidth));
    raw0.join(&raw1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn e1_known_bit_addition_matches_the_carry_propagation_example() {
        let bw = 8;
        let a = Tnum::from_value_mask(
            WrapInt::from_u128(0b0000_0100, bw).unwrap(),
            WrapInt::from_u128(0b0000_0011, bw).unwrap(),
        )
        .unwrap();
        let sa = Stnum::construct_from_tnum(a);
        let sum = sa.add(&sa);
        let expect = Tnum::from_value_mask(
            WrapInt::from_u128(0b0000_1000, bw).unwrap(),
            WrapInt::from_u128(0b0000_0110, bw).unwrap(),
        )
        .unwrap();
        let expect_s = Stnum::construct_from_tnum(expect);
        assert!(sum.leq(&expect_s) && expect_s.leq(&sum));
    }

    #[test]
    fn adding_two_negative_singletons_stays_in_the_negative_half() {
        let n = Stnum::singleton(WrapInt::from_i128(-3, 8).unwrap());
        let sum = n.add(&n);
        assert!(sum.is_negative());
        assert!(sum.at(WrapInt::from_i128(-6, 8).unwrap()));
    }

    #[test]
    fn division_of_a_negative_by_a_positive_singleton_stays_sound() {
        let a = Stnum::mk_stnum_range(WrapInt::from_i128(-9, 8).unwrap(), WrapInt::from_i128(-7, 8).unwrap());
        let b = Stnum::singleton(WrapInt::from_i128(2, 8).unwrap());
        let q = a.sdiv(&b);
        // truncating division of -9..-7 by 2 gives -4..-3.
        assert!(q.at(WrapInt::from_i128(-4, 8).unwrap()) || q.at(WrapInt::from_i128(-3, 8).unwrap()));
        assert!(!q.at(WrapInt::from_i128(0, 8).unwrap()));
    }

    #[test]
    fn zero_extending_a_negative_singleton_lands_in_the_new_nonnegative_half() {
        let neg_one = Stnum::singleton(WrapInt::from_i128(-1, 8).unwrap());
        let wide = neg_one.zero_extend(16);
        assert!(wide.is_nonnegative());
        assert!(wide.at(WrapInt::from_u128(0xff, 16).unwrap()));
    }

    #[test]
    fn sign_extending_a_negative_singleton_stays_negative() {
        let neg_one = Stnum::singleton(WrapInt::from_i128(-1, 8).unwrap());
        let wide = neg_one.sign_extend(16);
        assert!(wide.is_negative());
        assert!(wide.at(WrapInt::from_i128(-1, 16).unwrap()));
    }
}
