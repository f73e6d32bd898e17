//! Transfer functions for [`Tnum`]. Split out from `tnum.rs` the way the
//! teacher splits `logic/sum.rs`, `logic/mul.rs`, `logic/div.rs`,
//! `logic/bitwise.rs` and `logic/permute.rs` out of a single `Bits` type.

use tracing::warn;
use wrapint::WrapInt;

use crate::tnum::Tnum;

/// Cap on the number of shift amounts a non-constant shift will enumerate
/// before falling back to a precomputed max-result bound. Keeps the
/// join-over-every-amount scheme from Section 4.2 from blowing up on a
/// wide, barely-constrained shift count.
const MAX_SHIFT_DISJUNCTS: u32 = 16;

/// Bitmask with the low `n` bits cleared (0) and the rest set (1).
fn low_bits_cleared_mask(bw: u32, n: u32) -> WrapInt {
    if n == 0 {
        WrapInt::umax(bw).unwrap()
    } else if n >= bw {
        WrapInt::zero(bw).unwrap()
    } else {
        WrapInt::umax(bw).unwrap().shl(n)
    }
}

/// Bitmask with the high `n` bits cleared (0) and the rest set (1).
fn high_bits_cleared_mask(bw: u32, n: u32) -> WrapInt {
    if n == 0 {
        WrapInt::umax(bw).unwrap()
    } else if n >= bw {
        WrapInt::zero(bw).unwrap()
    } else {
        WrapInt::umax(bw).unwrap().lshr(n)
    }
}

impl Tnum {
    fn vacuous_result(&self, other: &Self) -> Option<Self> {
        if self.is_bottom() || other.is_bottom() {
            return Some(Tnum::bottom(self.bitwidth()));
        }
        if self.bitwidth() != other.bitwidth() {
            warn!(
                lhs = self.bitwidth(),
                rhs = other.bitwidth(),
                "tnum transfer function invoked on mismatched bitwidths"
            );
            return Some(Tnum::top(self.bitwidth()));
        }
        None
    }

    /// `+`: carry-propagation-from-mask addition (Section 4.2).
    pub fn add(&self, other: &Self) -> Self {
        if let Some(r) = self.vacuous_result(other) {
            return r;
        }
        let sum_vv = self.value.add(&other.value).unwrap();
        let sigma = sum_vv
            .add(&self.mask)
            .unwrap()
            .add(&other.mask)
            .unwrap();
        let chi = sigma.xor(&sum_vv).unwrap();
        let new_mask = chi.or(&self.mask).unwrap().or(&other.mask).unwrap();
        let new_value = sum_vv.and(&new_mask.not()).unwrap();
        Tnum::from_value_mask(new_value, new_mask).unwrap_or_else(|_| Tnum::top(self.bitwidth()))
    }

    /// `-`: borrow-propagation-from-mask subtraction, symmetric to `add`.
    pub fn sub(&self, other: &Self) -> Self {
        if let Some(r) = self.vacuous_result(other) {
            return r;
        }
        let dv = self.value.sub(&other.value).unwrap();
        let alpha = dv.add(&self.mask).unwrap();
        let beta = dv.sub(&other.mask).unwrap();
        let chi = alpha.xor(&beta).unwrap();
        let new_mask = chi.or(&self.mask).unwrap().or(&other.mask).unwrap();
        let new_value = dv.and(&new_mask.not()).unwrap();
        Tnum::from_value_mask(new_value, new_mask).unwrap_or_else(|_| Tnum::top(self.bitwidth()))
    }

    /// Unary `-`: `0 - self`.
    pub fn neg(&self) -> Self {
        if self.is_bottom() {
            return *self;
        }
        Tnum::singleton(WrapInt::zero(self.bitwidth()).unwrap()).sub(self)
    }

    fn rshift_by_one(&self) -> Self {
        Tnum::from_value_mask(self.value.lshr(1), self.mask.lshr(1)).unwrap()
    }

    fn lshift_by_one(&self) -> Self {
        Tnum::from_value_mask(self.value.shl(1), self.mask.shl(1)).unwrap()
    }

    /// `*`: bit-by-bit long multiplication over tnums. At each step, a
    /// certain `1` bit of `a` contributes `b`'s full mask as additional
    /// uncertainty; an uncertain bit of `a` contributes all of `b`
    /// (value and mask) as uncertainty, since either a `0` or `1` there
    /// is possible.
    pub fn mul(&self, other: &Self) -> Self {
        if let Some(r) = self.vacuous_result(other) {
            return r;
        }
        let bw = self.bitwidth();
        let acc_known = self.value.mul(&other.value).unwrap();
        let mut acc_unknown = Tnum::singleton(WrapInt::zero(bw).unwrap());
        let mut a = *self;
        let mut b = *other;
        for _ in 0..bw {
            if a.is_zero_tnum_done() {
                break;
            }
            if a.value.lsb() {
                let addend = Tnum::from_value_mask(WrapInt::zero(bw).unwrap(), b.mask).unwrap();
                acc_unknown = acc_unknown.add(&addend);
            } else if a.mask.lsb() {
                let combined = b.value.or(&b.mask).unwrap();
                let addend = Tnum::from_value_mask(WrapInt::zero(bw).unwrap(), combined).unwrap();
                acc_unknown = acc_unknown.add(&addend);
            }
            a = a.rshift_by_one();
            b = b.lshift_by_one();
        }
        Tnum::singleton(acc_known).add(&acc_unknown)
    }

    fn is_zero_tnum_done(&self) -> bool {
        self.value.is_zero() && self.mask.is_zero()
    }

    fn unsigned_bounds(&self) -> (WrapInt, WrapInt) {
        (self.value, self.value.or(&self.mask).unwrap())
    }

    /// Unsigned division: the two-pronged scheme from Section 4.2, mirroring
    /// the original `tnum::UDiv`/`divComputeLowBit` (grounded in
    /// `examples/original_source/clam-master/.../tnum_impl.hpp`, see
    /// DESIGN.md). A high-bit contribution bounds the result's leading
    /// zeros from the largest quotient reachable by dividing the largest
    /// possible numerator by the smallest possible divisor; a low-bit
    /// contribution bounds trailing zeros (and, when the bound is exact,
    /// the first nonzero bit) from the operands' own trailing-zero counts.
    pub fn udiv(&self, other: &Self) -> Self {
        if let Some(r) = self.vacuous_result(other) {
            return r;
        }
        let bw = self.bitwidth();
        if other.is_singleton() && other.value.is_zero() {
            warn!("tnum udiv by a known-zero divisor");
            return Tnum::top(bw);
        }
        if self.is_singleton() && other.is_singleton() {
            return Tnum::singleton(self.value.udiv(&other.value).unwrap());
        }
        // `other.value` is other's minimum possible unsigned witness
        // (clearing every unknown bit minimizes it); if that minimum is
        // already zero, 0 is a member of the divisor's concretization and
        // no transfer function below is sound — the recoverable
        // `DivideByZero` case, generalized to a non-singleton divisor.
        if other.value.is_zero() {
            warn!("tnum udiv: divisor's range may include zero");
            return Tnum::top(bw);
        }

        // High-bit contribution: the largest reachable quotient is the
        // largest numerator (every unknown bit set) divided by the
        // smallest divisor (every unknown bit clear); its leading-zero
        // count bounds how many of the result's high bits are known zero.
        let max_numerator = self.value.or(&self.mask).unwrap();
        let max_res = max_numerator.udiv(&other.value).unwrap_or_else(|_| WrapInt::umax(bw).unwrap());
        let lead_z = max_res.lz();
        if lead_z >= bw {
            return Tnum::singleton(WrapInt::zero(bw).unwrap());
        }
        let mut res_value = WrapInt::zero(bw).unwrap();
        let mut res_mask = high_bits_cleared_mask(bw, lead_z);

        // Low-bit contribution (`divComputeLowBit`): the quotient has at
        // least `min_tz = self.min_trailing_zeros() - other.max_trailing_zeros()`
        // trailing zeros whenever that difference is non-negative; when
        // the matching upper bound on trailing zeros agrees exactly, the
        // bit right above them is known to be set.
        let min_tz = self.min_trailing_zeros() as i64 - other.max_trailing_zeros() as i64;
        let max_tz = self.max_trailing_zeros() as i64 - other.min_trailing_zeros() as i64;
        if min_tz >= 0 {
            let min_tz = (min_tz as u32).min(bw);
            let low_mask = low_bits_cleared_mask(bw, min_tz);
            res_value = res_value.and(&low_mask).unwrap();
            res_mask = res_mask.and(&low_mask).unwrap();
            if max_tz == min_tz as i64 && min_tz < bw {
                let bit = WrapInt::uone(bw).unwrap().shl(min_tz);
                res_value = res_value.or(&bit).unwrap();
                res_mask = res_mask.and(&bit.not()).unwrap();
            }
        }

        Tnum::from_value_mask(res_value, res_mask).unwrap_or_else(|_| Tnum::top(bw))
    }

    /// Unsigned remainder. Uses the quotient directly when it collapses
    /// to a singleton; otherwise bounds the result by the divisor's
    /// magnitude, `[0, max(|divisor|) - 1]`.
    pub fn urem(&self, other: &Self) -> Self {
        if let Some(r) = self.vacuous_result(other) {
            return r;
        }
        let bw = self.bitwidth();
        if other.is_singleton() && other.value.is_zero() {
            warn!("tnum urem by a known-zero divisor");
            return Tnum::top(bw);
        }
        let q = self.udiv(other);
        if q.is_singleton() {
            let prod = Tnum::singleton(q.value.mul(&other.value).unwrap_or(q.value));
            return self.sub(&prod);
        }
        let (_, other_hi) = other.unsigned_bounds();
        if other_hi.is_zero() {
            return Tnum::top(bw);
        }
        let max_rem = other_hi.sub(&WrapInt::uone(bw).unwrap()).unwrap_or(other_hi);
        Tnum::from_range(WrapInt::zero(bw).unwrap(), max_rem).unwrap_or_else(|_| Tnum::top(bw))
    }

    fn signed_bounds(&self) -> (WrapInt, WrapInt) {
        // Without a split representation, a plain tnum's signed bounds are
        // only tight when the sign bit is known; otherwise fall back to
        // the full signed range, which is always sound.
        let bw = self.bitwidth();
        if !self.mask.msb() {
            (self.value, self.value.or(&self.mask).unwrap())
        } else {
            (WrapInt::imin(bw).unwrap(), WrapInt::imax(bw).unwrap())
        }
    }

    /// Signed division, truncating toward zero.
    pub fn sdiv(&self, other: &Self) -> Self {
        if let Some(r) = self.vacuous_result(other) {
            return r;
        }
        let bw = self.bitwidth();
        if other.is_singleton() && other.value.is_zero() {
            warn!("tnum sdiv by a known-zero divisor");
            return Tnum::top(bw);
        }
        if self.is_singleton() && other.is_singleton() {
            return Tnum::singleton(self.value.sdiv(&other.value).unwrap());
        }
        let (self_lo, self_hi) = self.signed_bounds();
        let (other_lo, other_hi) = other.signed_bounds();
        // division is monotonic in magnitude but not in sign, so sample
        // the corners and take the convex hull; sound if imprecise.
        let candidates = [(self_lo, other_lo), (self_lo, other_hi), (self_hi, other_lo), (self_hi, other_hi)];
        // Join the corner quotients directly rather than routing through
        // `Tnum::from_range`: that helper assumes its two endpoints are
        // already in unsigned bit-pattern order, which a signed range
        // straddling zero (e.g. `[-5, 10]`) does not satisfy.
        let mut acc = Tnum::bottom(bw);
        let mut any = false;
        for (n, d) in candidates {
            if d.is_zero() {
                continue;
            }
            let q = n.sdiv(&d).unwrap();
            acc = acc.join(&Tnum::singleton(q));
            any = true;
        }
        if any {
            acc
        } else {
            Tnum::top(bw)
        }
    }

    /// Signed remainder (sign follows the dividend).
    pub fn srem(&self, other: &Self) -> Self {
        if let Some(r) = self.vacuous_result(other) {
            return r;
        }
        let bw = self.bitwidth();
        if other.is_singleton() && other.value.is_zero() {
            warn!("tnum srem by a known-zero divisor");
            return Tnum::top(bw);
        }
        let q = self.sdiv(other);
        if q.is_singleton() && other.is_singleton() {
            let prod = Tnum::singleton(q.value.mul(&other.value).unwrap_or(q.value));
            return self.sub(&prod);
        }
        // bound by the divisor's magnitude
        let (lo, hi) = other.signed_bounds();
        let bound = lo.to_i128().unsigned_abs().max(hi.to_i128().unsigned_abs());
        if bound == 0 {
            return Tnum::top(bw);
        }
        let bound = (bound - 1).min(WrapInt::imax(bw).unwrap().to_u128());
        // [-bound, bound] straddles zero, so it is built as the union of
        // its two unsigned-ordered halves rather than a single
        // `from_range` call (see the comment in `sdiv`).
        let neg_bound = WrapInt::from_i128(-(bound as i128), bw).unwrap_or_else(|_| WrapInt::imin(bw).unwrap());
        let pos_bound = WrapInt::from_i128(bound as i128, bw).unwrap_or_else(|_| WrapInt::imax(bw).unwrap());
        let neg_one = WrapInt::from_i128(-1, bw).unwrap();
        let zero = WrapInt::zero(bw).unwrap();
        let lower_half = Tnum::from_range(neg_bound, neg_one).unwrap_or_else(|_| Tnum::top(bw));
        let upper_half = Tnum::from_range(zero, pos_bound).unwrap_or_else(|_| Tnum::top(bw));
        lower_half.join(&upper_half)
    }

    pub fn and(&self, other: &Self) -> Self {
        if let Some(r) = self.vacuous_result(other) {
            return r;
        }
        let v1 = self.value.to_u128();
        let m1 = self.mask.to_u128();
        let v2 = other.value.to_u128();
        let m2 = other.mask.to_u128();
        // a bit is known-0 if either side is known-0; known-1 if both
        // sides are known-1; unknown otherwise.
        let known1 = v1 & v2 & !m1 & !m2;
        let known0 = (!v1 & !m1) | (!v2 & !m2);
        let new_mask = !(known1 | known0);
        let bw = self.bitwidth();
        Tnum::from_value_mask(
            WrapInt::from_u128(known1, bw).unwrap(),
            WrapInt::from_u128(mask_bits(new_mask, bw), bw).unwrap(),
        )
        .unwrap_or_else(|_| Tnum::top(bw))
    }

    pub fn or(&self, other: &Self) -> Self {
        if let Some(r) = self.vacuous_result(other) {
            return r;
        }
        let v1 = self.value.to_u128();
        let m1 = self.mask.to_u128();
        let v2 = other.value.to_u128();
        let m2 = other.mask.to_u128();
        let known1 = (v1 & !m1) | (v2 & !m2);
        let known0 = !v1 & !m1 & !v2 & !m2;
        let new_mask = !(known1 | known0);
        let bw = self.bitwidth();
        Tnum::from_value_mask(
            WrapInt::from_u128(known1, bw).unwrap(),
            WrapInt::from_u128(mask_bits(new_mask, bw), bw).unwrap(),
        )
        .unwrap_or_else(|_| Tnum::top(bw))
    }

    pub fn xor(&self, other: &Self) -> Self {
        if let Some(r) = self.vacuous_result(other) {
            return r;
        }
        let bw = self.bitwidth();
        let new_mask = self.mask.or(&other.mask).unwrap();
        let new_value = self.value.xor(&other.value).unwrap().and(&new_mask.not()).unwrap();
        Tnum::from_value_mask(new_value, new_mask).unwrap_or_else(|_| Tnum::top(bw))
    }

    pub fn not(&self) -> Self {
        if self.is_bottom() {
            return *self;
        }
        Tnum::from_value_mask(self.value.not().and(&self.mask.not()).unwrap(), self.mask).unwrap()
    }

    fn shl_const(&self, k: u32) -> Self {
        let bw = self.bitwidth();
        if k >= bw {
            return Tnum::singleton(WrapInt::zero(bw).unwrap());
        }
        Tnum::from_value_mask(self.value.shl(k), self.mask.shl(k)).unwrap()
    }

    fn lshr_const(&self, k: u32) -> Self {
        let bw = self.bitwidth();
        if k >= bw {
            return Tnum::singleton(WrapInt::zero(bw).unwrap());
        }
        Tnum::from_value_mask(self.value.lshr(k), self.mask.lshr(k)).unwrap()
    }

    fn ashr_const(&self, k: u32) -> Self {
        let bw = self.bitwidth();
        if self.mask.msb() {
            // sign unknown: low part is a plain logical shift, the
            // vacated high bits become entirely unknown.
            if k >= bw {
                return Tnum::from_value_mask(WrapInt::zero(bw).unwrap(), WrapInt::umax(bw).unwrap()).unwrap();
            }
            let shifted_v = self.value.lshr(k);
            let kept_mask = self.mask.lshr(k);
            let fill_mask = WrapInt::umax(bw).unwrap().lshr(bw - k).not();
            let combined_mask = kept_mask.or(&fill_mask).unwrap();
            let value = shifted_v.and(&combined_mask.not()).unwrap();
            Tnum::from_value_mask(value, combined_mask).unwrap()
        } else {
            // sign known: `WrapInt::ashr` already replicates the correct
            // fixed sign bit in `value`, and replicates `mask`'s (zero)
            // top bit into the vacated positions, so both stay sound.
            Tnum::from_value_mask(self.value.ashr(k), self.mask.ashr(k)).unwrap()
        }
    }

    fn amount_bounds(&self, amount: &Tnum) -> Option<(u32, u32)> {
        let bw = self.bitwidth();
        if amount.is_bottom() {
            return None;
        }
        let lo = amount.value().to_u128().min(bw as u128) as u32;
        let hi = amount
            .value()
            .or(&amount.mask())
            .unwrap()
            .to_u128()
            .min(bw as u128) as u32;
        Some((lo, hi))
    }

    /// `shl`'s too-many-disjuncts fallback: whatever the exact shift count
    /// within `[lo, ..]`, at least the low `lo` bits are known zero (every
    /// shift in that range zero-fills at least that many), everything
    /// above is unknown.
    fn shl_bound(&self, lo: u32) -> Self {
        let bw = self.bitwidth();
        if lo >= bw {
            return Tnum::singleton(WrapInt::zero(bw).unwrap());
        }
        let mask = low_bits_cleared_mask(bw, lo);
        Tnum::from_value_mask(WrapInt::zero(bw).unwrap(), mask).unwrap()
    }

    /// `lshr`'s too-many-disjuncts fallback: the top `lo` bits are known
    /// zero regardless of the exact shift count.
    fn lshr_bound(&self, lo: u32) -> Self {
        let bw = self.bitwidth();
        if lo >= bw {
            return Tnum::singleton(WrapInt::zero(bw).unwrap());
        }
        let mask = high_bits_cleared_mask(bw, lo);
        Tnum::from_value_mask(WrapInt::zero(bw).unwrap(), mask).unwrap()
    }

    /// `ashr`'s too-many-disjuncts fallback: the top `lo` bits are always
    /// sign-fill for every shift count in `[lo, ..]`; known if the sign
    /// bit is known, unknown otherwise. Everything below stays unknown.
    fn ashr_bound(&self, lo: u32) -> Self {
        let bw = self.bitwidth();
        if self.mask.msb() {
            return Tnum::top(bw);
        }
        if lo >= bw {
            let fill = if self.value.msb() { WrapInt::umax(bw).unwrap() } else { WrapInt::zero(bw).unwrap() };
            return Tnum::singleton(fill);
        }
        // Unknown at the low `bw - lo` bits, known at the top `lo` bits.
        let mask = high_bits_cleared_mask(bw, lo);
        let known_region = mask.not(); // 1 at the top `lo` (known) bits, 0 elsewhere
        let value = if self.value.msb() {
            WrapInt::umax(bw).unwrap().and(&known_region).unwrap()
        } else {
            WrapInt::zero(bw).unwrap()
        };
        Tnum::from_value_mask(value, mask).unwrap()
    }

    fn shift_by_tnum(&self, amount: &Tnum, step: impl Fn(&Self, u32) -> Self, bound: impl Fn(&Self, u32) -> Self) -> Self {
        let bw = self.bitwidth();
        if self.is_bottom() || amount.is_bottom() {
            return Tnum::bottom(bw);
        }
        if amount.is_singleton() {
            return step(self, amount.value().to_u128() as u32);
        }
        let (lo, hi) = match self.amount_bounds(amount) {
            Some(b) => b,
            None => return Tnum::bottom(bw),
        };
        if hi - lo > MAX_SHIFT_DISJUNCTS {
            warn!(lo, hi, "shift amount range too wide, falling back to a precomputed max-result bound");
            return bound(self, lo);
        }
        let mut acc = Tnum::bottom(bw);
        for k in lo..=hi {
            acc = acc.join(&step(self, k));
        }
        acc
    }

    pub fn shl(&self, amount: &Tnum) -> Self {
        self.shift_by_tnum(amount, Tnum::shl_const, Tnum::shl_bound)
    }

    pub fn lshr(&self, amount: &Tnum) -> Self {
        self.shift_by_tnum(amount, Tnum::lshr_const, Tnum::lshr_bound)
    }

    pub fn ashr(&self, amount: &Tnum) -> Self {
        self.shift_by_tnum(amount, Tnum::ashr_const, Tnum::ashr_bound)
    }

    pub fn zero_extend(&self, new_bitwidth: u32) -> Self {
        if self.is_bottom() {
            return Tnum::bottom(new_bitwidth);
        }
        Tnum::from_value_mask(
            self.value.zero_extend(new_bitwidth).unwrap(),
            self.mask.zero_extend(new_bitwidth).unwrap(),
        )
        .unwrap()
    }

    pub fn sign_extend(&self, new_bitwidth: u32) -> Self {
        if self.is_bottom() {
            return Tnum::bottom(new_bitwidth);
        }
        if self.mask.msb() {
            let widened_value = self.value.zero_extend(new_bitwidth).unwrap();
            let widened_mask = self.mask.zero_extend(new_bitwidth).unwrap();
            let extra = widened_mask.mask_from(self.bitwidth(), new_bitwidth);
            Tnum::from_value_mask(widened_value, widened_mask.or(&extra).unwrap()).unwrap()
        } else {
            Tnum::from_value_mask(
                self.value.sign_extend(new_bitwidth).unwrap(),
                self.mask.sign_extend(new_bitwidth).unwrap(),
            )
            .unwrap()
        }
    }

    pub fn truncate(&self, new_bitwidth: u32) -> Self {
        if self.is_bottom() {
            return Tnum::bottom(new_bitwidth);
        }
        Tnum::from_value_mask(
            self.value.truncate(new_bitwidth).unwrap(),
            self.mask.truncate(new_bitwidth).unwrap(),
        )
        .unwrap()
    }
}

fn mask_bits(x: u128, bw: u32) -> u128 {
    if bw >= 128 {
        x
    } else {
        x & ((1u128 << bw) - 1)
    }
}

/// Extension trait used only to build the "bits `[old_bw, new_bw)` are all
/// unknown" mask needed by `sign_extend` on a sign-unknown tnum.
trait MaskFrom {
    fn mask_from(&self, old_bw: u32, new_bw: u32) -> WrapInt;
}

impl MaskFrom for WrapInt {
    fn mask_from(&self, old_bw: u32, new_bw: u32) -> WrapInt {
        let full = WrapInt::umax(new_bw).unwrap();
        let low = if old_bw >= new_bw {
            WrapInt::zero(new_bw).unwrap()
        } else {
            full.lshr(new_bw - old_bw)
        };
        full.and(&low.not()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(n: u128, bw: u32) -> WrapInt {
        WrapInt::from_u128(n, bw).unwrap()
    }

    fn exhaustive_members(t: &Tnum, bw: u32) -> Vec<u128> {
        (0..(1u128 << bw)).filter(|&n| t.at(w(n, bw))).collect()
    }

    /// The two-pronged `udiv` must still be sound: every quotient of a
    /// pair of concrete values drawn from the two operands lies in the
    /// abstracted result, checked exhaustively at a small bitwidth.
    #[test]
    fn udiv_two_pronged_scheme_is_sound_over_all_concretizations() {
        let bw = 4;
        // self in {12, 13, 14, 15} (v=0b1100, m=0b0011), other in {2, 3}
        // (v=0b0010, m=0b0001).
        let a = Tnum::from_value_mask(w(0b1100, bw), w(0b0011, bw)).unwrap();
        let b = Tnum::from_value_mask(w(0b0010, bw), w(0b0001, bw)).unwrap();
        let q = a.udiv(&b);
        for x in exhaustive_members(&a, bw) {
            for y in exhaustive_members(&b, bw) {
                let want = x / y;
                assert!(q.at(w(want, bw)), "{x}/{y}={want} must lie in {q:?}");
            }
        }
    }

    /// The high-bit contribution should clear at least the leading zeros
    /// of the largest reachable quotient rather than leaving the whole
    /// result unknown.
    #[test]
    fn udiv_high_bit_contribution_clears_known_zero_leading_bits() {
        let bw = 8;
        // self in [0, 15] (v=0, m=0b0000_1111), divided by the singleton 4:
        // every quotient lies in [0, 3], so the top six bits are known zero.
        let a = Tnum::from_value_mask(w(0, bw), w(0b0000_1111, bw)).unwrap();
        let b = Tnum::singleton(w(4, bw));
        let q = a.udiv(&b);
        assert!(!q.is_top(), "udiv should narrow past top given a bounded numerator");
        assert_eq!(q.mask().to_u128() & 0b1111_1100, 0);
    }

    /// `udiv` folds to `top` when the divisor's own concretization set
    /// includes zero (mirrors the original `tnum::UDiv`'s `x.m_value ==
    /// 0` guard), even though the divisor is not a known-zero singleton.
    #[test]
    fn udiv_folds_to_top_when_divisor_may_be_zero() {
        let bw = 4;
        let a = Tnum::singleton(w(10, bw));
        let b = Tnum::from_value_mask(w(0, bw), w(0b0011, bw)).unwrap(); // {0,1,2,3}
        assert!(a.udiv(&b).is_top());
    }

    /// Too-wide shift amounts fall back to a precomputed bound, not an
    /// outright `top`: shifting a fully-unknown value left by at least
    /// `MAX_SHIFT_DISJUNCTS + 1` must still report the low bits as known
    /// zero.
    #[test]
    fn shl_too_many_disjuncts_falls_back_to_a_max_result_bound_not_top() {
        let bw = 64;
        let x = Tnum::top(bw);
        let amount = Tnum::from_value_mask(w(32, bw), w(0b0001_1111, bw)).unwrap(); // {32..63}
        let shifted = x.shl(&amount);
        assert!(!shifted.is_top(), "shl fallback should be tighter than top");
        assert_eq!(shifted.mask().to_u128() & ((1u128 << 32) - 1), 0, "low 32 bits must be known zero");
    }

    #[test]
    fn lshr_too_many_disjuncts_falls_back_to_a_max_result_bound_not_top() {
        let bw = 64;
        let x = Tnum::top(bw);
        let amount = Tnum::from_value_mask(w(32, bw), w(0b0001_1111, bw)).unwrap(); // {32..63}
        let shifted = x.lshr(&amount);
        assert!(!shifted.is_top(), "lshr fallback should be tighter than top");
        let top_32_mask = (!0u128) << (bw - 32);
        assert_eq!(shifted.mask().to_u128() & top_32_mask, 0, "top 32 bits must be known zero");
    }
}
