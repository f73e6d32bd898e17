//! `tnum` (C3): the bit-precision abstraction, tracking which bits of a
//! fixed-width value are known and what they are known to be.
//!
//! A tnum is a pair `(value, mask)` of equal-bitwidth [`WrapInt`]s with
//! `value & mask == 0`: a set bit in `mask` means "this bit is unknown",
//! and the corresponding bit of `value` is otherwise meaningless. The
//! concretization is `{ x : x & !mask == value & !mask }`.

use std::fmt;

use tracing::warn;
use wrapint::WrapInt;

use crate::{error::DomainError, interval::Interval};

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Tnum {
    value: WrapInt,
    mask: WrapInt,
    is_bottom: bool,
}

impl fmt::Debug for Tnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bottom {
            write!(f, "tnum::bottom({})", self.bitwidth())
        } else {
            write!(f, "tnum(v={:?}, m={:?})", self.value, self.mask)
        }
    }
}

impl Tnum {
    fn well_formed(value: WrapInt, mask: WrapInt) -> Self {
        // `value & mask == 0`: bits claimed certain cannot also be unknown.
        // Callers that violate this (e.g. meet of contradictory bits) get
        // bottom rather than an error, per the data model invariant.
        match value.and(&mask) {
            Ok(anded) if anded.is_zero() => Tnum {
                value,
                mask,
                is_bottom: false,
            },
            _ => Tnum::bottom(value.bitwidth()),
        }
    }

    pub fn bottom(bitwidth: u32) -> Self {
        let z = WrapInt::zero(bitwidth).unwrap_or_else(|_| WrapInt::zero(1).unwrap());
        Tnum {
            value: z,
            mask: z,
            is_bottom: true,
        }
    }

    pub fn top(bitwidth: u32) -> Self {
        let value = WrapInt::zero(bitwidth).expect("valid bitwidth");
        let mask = WrapInt::umax(bitwidth).expect("valid bitwidth");
        Tnum {
            value,
            mask,
            is_bottom: false,
        }
    }

    /// A fully-known singleton tnum.
    pub fn singleton(n: WrapInt) -> Self {
        let zero = WrapInt::zero(n.bitwidth()).expect("valid bitwidth");
        Tnum {
            value: n,
            mask: zero,
            is_bottom: false,
        }
    }

    /// Constructs from an explicit `(value, mask)` pair, resolving to
    /// bottom if `value & mask != 0`. Fatal if the bitwidths disagree.
    pub fn from_value_mask(value: WrapInt, mask: WrapInt) -> Result<Self, DomainError> {
        if value.bitwidth() != mask.bitwidth() {
            return Err(DomainError::Bitwidth(wrapint::WrapIntError::BitwidthMismatch {
                lhs: value.bitwidth(),
                rhs: mask.bitwidth(),
            }));
        }
        Ok(Self::well_formed(value, mask))
    }

    /// `tnum_from_range`: the tightest tnum covering the closed unsigned
    /// range `[min, max]`, selected by masking off bits below (and
    /// including) the highest bit on which `min` and `max` differ.
    pub fn from_range(min: WrapInt, max: WrapInt) -> Result<Self, DomainError> {
        if min.bitwidth() != max.bitwidth() {
            return Err(DomainError::Bitwidth(wrapint::WrapIntError::BitwidthMismatch {
                lhs: min.bitwidth(),
                rhs: max.bitwidth(),
            }));
        }
        let bw = min.bitwidth();
        if min.ugt(&max).unwrap() {
            return Ok(Tnum::bottom(bw));
        }
        let chi = min.xor(&max).unwrap();
        // number of low bits that may vary: position just above the
        // highest differing bit (0 if min == max).
        let bits = match chi.fls() {
            None => 0,
            Some(hi) => hi + 1,
        };
        let mask = if bits == 0 {
            WrapInt::zero(bw).unwrap()
        } else if bits >= bw {
            WrapInt::umax(bw).unwrap()
        } else {
            WrapInt::umax(bw).unwrap().lshr(bw - bits)
        };
        let value = min.and(&mask.not()).unwrap();
        Ok(Self::well_formed(value, mask))
    }

    pub fn is_bottom(&self) -> bool {
        self.is_bottom
    }

    pub fn is_top(&self) -> bool {
        !self.is_bottom && self.mask.is_umax()
    }

    /// Always concrete in this implementation: every constructor is given
    /// an explicit bitwidth, including `bottom`/`top`. See DESIGN.md for
    /// why `BitwidthFromVacuous` is not reachable from here.
    pub fn bitwidth(&self) -> u32 {
        self.value.bitwidth()
    }

    pub fn value(&self) -> WrapInt {
        self.value
    }

    pub fn mask(&self) -> WrapInt {
        self.mask
    }

    pub fn is_singleton(&self) -> bool {
        !self.is_bottom && self.mask.is_zero()
    }

    /// Tests `value == x & !mask`, i.e. whether `x` is consistent with the
    /// known bits (note this alone does not imply `x` is the *only*
    /// concrete value, unless the tnum is a singleton).
    pub fn at(&self, x: WrapInt) -> bool {
        if self.is_bottom || x.bitwidth() != self.bitwidth() {
            return false;
        }
        matches!(x.and(&self.mask.not()), Ok(masked) if masked == self.value)
    }

    fn require_compatible(&self, other: &Self) -> Result<(), DomainError> {
        if self.bitwidth() != other.bitwidth() {
            return Err(DomainError::Bitwidth(wrapint::WrapIntError::BitwidthMismatch {
                lhs: self.bitwidth(),
                rhs: other.bitwidth(),
            }));
        }
        Ok(())
    }

    /// Pointwise bit inclusion: every concrete value of `self` lies in
    /// `γ(other)`.
    pub fn leq(&self, other: &Self) -> bool {
        if self.is_bottom {
            return true;
        }
        if other.is_bottom {
            return false;
        }
        if self.bitwidth() != other.bitwidth() {
            return false;
        }
        // self <= other iff other's unknown bits are a superset of self's,
        // and they agree on the bits other claims to know.
        let self_mask = self.mask.to_u128();
        let other_mask = other.mask.to_u128();
        if self_mask & !other_mask != 0 {
            return false;
        }
        let known = !other_mask;
        (self.value.to_u128() & known) == (other.value.to_u128() & known)
    }

    pub fn join(&self, other: &Self) -> Self {
        if self.is_bottom {
            return *other;
        }
        if other.is_bottom {
            return *self;
        }
        if self.bitwidth() != other.bitwidth() {
            warn!(lhs = self.bitwidth(), rhs = other.bitwidth(), "tnum join on mismatched bitwidths");
            return Tnum::top(self.bitwidth());
        }
        let v1 = self.value.to_u128();
        let v2 = other.value.to_u128();
        let m1 = self.mask.to_u128();
        let m2 = other.mask.to_u128();
        let new_mask = m1 | m2 | (v1 ^ v2);
        let new_value = v1 & !new_mask;
        let bw = self.bitwidth();
        Tnum::well_formed(
            WrapInt::from_u128(new_value, bw).unwrap(),
            WrapInt::from_u128(new_mask & mask_all(bw), bw).unwrap(),
        )
    }

    pub fn meet(&self, other: &Self) -> Self {
        if self.is_bottom || other.is_bottom {
            return Tnum::bottom(self.bitwidth());
        }
        if self.bitwidth() != other.bitwidth() {
            warn!(lhs = self.bitwidth(), rhs = other.bitwidth(), "tnum meet on mismatched bitwidths");
            return Tnum::bottom(self.bitwidth());
        }
        let v1 = self.value.to_u128();
        let v2 = other.value.to_u128();
        let m1 = self.mask.to_u128();
        let m2 = other.mask.to_u128();
        // Bits known by both must agree.
        let known1 = !m1;
        let known2 = !m2;
        if (v1 & known1 & known2) != (v2 & known1 & known2) {
            return Tnum::bottom(self.bitwidth());
        }
        let new_mask = m1 & m2;
        let new_value = (v1 | v2) & !new_mask;
        let bw = self.bitwidth();
        Tnum::well_formed(
            WrapInt::from_u128(new_value, bw).unwrap(),
            WrapInt::from_u128(new_mask, bw).unwrap(),
        )
    }

    /// Widening. The source's non-standard acceleration: when both
    /// operands share the same number of known trailing zeros and the
    /// mask only grew by a single new leading unknown bit, clear the
    /// remaining high bits in one jump instead of converging bit-by-bit
    /// over repeated widenings. Otherwise falls back to `join`, which is
    /// always safe (a join is a valid, if slow, widening step since the
    /// mask lattice has finite height `bitwidth`).
    ///
    /// Preserved per the Open Question decision in DESIGN.md: it still
    /// satisfies the termination property (the mask only ever grows, and
    /// is bounded by `bitwidth` bits), and recovers precision the plain
    /// join-based widening would give up across the specific
    /// trailing-zero-preserving chain it targets.
    pub fn widen(&self, other: &Self) -> Self {
        if self.is_bottom {
            return *other;
        }
        if other.is_bottom {
            return *self;
        }
        if self.bitwidth() != other.bitwidth() {
            warn!("tnum widen on mismatched bitwidths");
            return Tnum::top(self.bitwidth());
        }
        let bw = self.bitwidth();
        let joined = self.join(other);
        let grew_by_one_leading_bit = joined.mask.count_ones() == self.mask.count_ones() + 1
            && self.min_trailing_zeros() == other.min_trailing_zeros();
        if grew_by_one_leading_bit {
            // Clear everything from the new unknown bit upward: we are
            // accelerating toward "everything above the common trailing
            // zeros is unknown" in one step, instead of widening one more
            // bit per call.
            if let Some(new_bit) = joined.mask.fls() {
                let cleared_mask = WrapInt::umax(bw).unwrap().lshr(bw.saturating_sub(new_bit + 1));
                let cleared_value = joined.value.and(&cleared_mask.not()).unwrap_or(joined.value);
                return Tnum::well_formed(cleared_value, cleared_mask);
            }
        }
        joined
    }

    pub fn narrow(&self, other: &Self) -> Self {
        // Narrowing after widening: never grow precision loss, only
        // recover it where `other` is already at least as precise.
        if other.leq(self) {
            *other
        } else {
            *self
        }
    }

    pub fn is_negative(&self) -> bool {
        !self.is_bottom && !self.mask.msb() && self.value.msb()
    }

    pub fn is_nonnegative(&self) -> bool {
        !self.is_bottom && !self.mask.msb() && !self.value.msb()
    }

    pub fn is_zero(&self) -> bool {
        self.is_singleton() && self.value.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.is_nonnegative() && !self.is_zero()
    }

    /// Any bit that is either known-1 or unknown could be set in some
    /// concretization; `known_ones` is the set of bits forced to 1 in
    /// every concretization.
    fn maybe_one_bits(&self) -> WrapInt {
        self.value.or(&self.mask).unwrap()
    }

    fn known_one_bits(&self) -> WrapInt {
        self.value.and(&self.mask.not()).unwrap()
    }

    /// Smallest number of leading zeros any concretization could have:
    /// bounded by the highest bit that could possibly be 1 (known-1 or
    /// unknown).
    pub fn min_leading_zeros(&self) -> u32 {
        self.maybe_one_bits().lz()
    }

    /// Largest number of leading zeros any concretization could have:
    /// bounded only by bits that are known-1 (unknown bits may be chosen
    /// 0 to extend the run of leading zeros).
    pub fn max_leading_zeros(&self) -> u32 {
        self.known_one_bits().lz()
    }

    /// Smallest number of trailing zeros any concretization could have.
    pub fn min_trailing_zeros(&self) -> u32 {
        self.maybe_one_bits().tz()
    }

    /// Largest number of trailing zeros any concretization could have.
    pub fn max_trailing_zeros(&self) -> u32 {
        self.known_one_bits().tz()
    }

    pub fn to_interval(&self) -> Interval {
        if self.is_bottom {
            return Interval::bottom();
        }
        let lo = self.value.to_u128();
        let hi = self.value.to_u128() | self.mask.to_u128();
        Interval::range(lo, hi)
    }
}

fn mask_all(bw: u32) -> u128 {
    if bw >= 128 {
        u128::MAX
    } else {
        (1u128 << bw) - 1
    }
}
