use const_fn::const_fn;

use crate::error::WrapIntError;

/// Largest bitwidth this crate supports. The domains built on top of
/// `WrapInt` only ever reason about machine integer widths (`i1` through
/// `i128`), so unlike the arbitrary-width backing store this crate's layout
/// is modelled on, a single `u128` digit is sufficient storage.
pub const W_MAX: u32 = 128;

/// A bit-width-parameterised unsigned integer, reduced modulo `2^bitwidth`.
///
/// `bits` always satisfies `bits < 2^bitwidth` (trivially true when
/// `bitwidth == 128`). Two's complement gives the signed interpretation.
/// Every combining operation requires both operands to share a bitwidth;
/// see [`WrapIntError::BitwidthMismatch`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_support", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "zeroize_support", derive(zeroize::Zeroize))]
pub struct WrapInt {
    bitwidth: u32,
    bits: u128,
}

#[inline]
const fn mask_for(bitwidth: u32) -> u128 {
    if bitwidth >= 128 {
        u128::MAX
    } else {
        (1u128 << bitwidth) - 1
    }
}

impl WrapInt {
    /// Constructs a `WrapInt` from raw bits, silently masking off anything
    /// above `bitwidth`. Used internally once arithmetic has already
    /// produced a value that must be wrapped.
    #[inline]
    #[const_fn(cfg(feature = "const_support"))]
    pub(crate) const fn from_raw(bits: u128, bitwidth: u32) -> Self {
        WrapInt {
            bitwidth,
            bits: bits & mask_for(bitwidth),
        }
    }

    /// Validates a bitwidth is in `1..=W_MAX`.
    pub const fn check_bitwidth(bitwidth: u32) -> Result<(), WrapIntError> {
        if bitwidth == 0 || bitwidth > W_MAX {
            Err(WrapIntError::InvalidBitwidth(bitwidth))
        } else {
            Ok(())
        }
    }

    /// The all-zeros value of the given bitwidth.
    pub const fn zero(bitwidth: u32) -> Result<Self, WrapIntError> {
        match Self::check_bitwidth(bitwidth) {
            Ok(()) => Ok(WrapInt { bitwidth, bits: 0 }),
            Err(e) => Err(e),
        }
    }

    /// The all-ones value (unsigned max) of the given bitwidth.
    pub const fn umax(bitwidth: u32) -> Result<Self, WrapIntError> {
        match Self::check_bitwidth(bitwidth) {
            Ok(()) => Ok(WrapInt {
                bitwidth,
                bits: mask_for(bitwidth),
            }),
            Err(e) => Err(e),
        }
    }

    /// The largest representable signed value (`0111...1`).
    pub const fn imax(bitwidth: u32) -> Result<Self, WrapIntError> {
        match Self::check_bitwidth(bitwidth) {
            Ok(()) => Ok(WrapInt {
                bitwidth,
                bits: mask_for(bitwidth) >> 1,
            }),
            Err(e) => Err(e),
        }
    }

    /// The smallest representable signed value (`1000...0`).
    pub const fn imin(bitwidth: u32) -> Result<Self, WrapIntError> {
        match Self::check_bitwidth(bitwidth) {
            Ok(()) => Ok(WrapInt {
                bitwidth,
                bits: (mask_for(bitwidth) >> 1) + 1,
            }),
            Err(e) => Err(e),
        }
    }

    /// The value `1` of the given bitwidth.
    pub const fn uone(bitwidth: u32) -> Result<Self, WrapIntError> {
        match Self::check_bitwidth(bitwidth) {
            Ok(()) => Ok(WrapInt { bitwidth, bits: 1 }),
            Err(e) => Err(e),
        }
    }

    /// `get_unsigned_min`: always zero.
    pub const fn get_unsigned_min(bitwidth: u32) -> Result<Self, WrapIntError> {
        Self::zero(bitwidth)
    }

    /// `get_unsigned_max`.
    pub const fn get_unsigned_max(bitwidth: u32) -> Result<Self, WrapIntError> {
        Self::umax(bitwidth)
    }

    /// `get_signed_min`.
    pub const fn get_signed_min(bitwidth: u32) -> Result<Self, WrapIntError> {
        Self::imin(bitwidth)
    }

    /// `get_signed_max`.
    pub const fn get_signed_max(bitwidth: u32) -> Result<Self, WrapIntError> {
        Self::imax(bitwidth)
    }

    /// Tests whether the mathematical integer `n` is representable, without
    /// loss, as an unsigned `WrapInt` of the given bitwidth.
    pub const fn fits_wrapint_unsigned(n: u128, bitwidth: u32) -> bool {
        if bitwidth >= 128 {
            true
        } else {
            n <= mask_for(bitwidth)
        }
    }

    /// Tests whether the mathematical integer `n` is representable, without
    /// loss, as a signed `WrapInt` of the given bitwidth.
    pub const fn fits_wrapint_signed(n: i128, bitwidth: u32) -> bool {
        if bitwidth >= 128 {
            true
        } else {
            let lo = -(1i128 << (bitwidth - 1));
            let hi = (1i128 << (bitwidth - 1)) - 1;
            n >= lo && n <= hi
        }
    }

    /// Constructs a `WrapInt` from an unsigned mathematical integer,
    /// returning [`WrapIntError::DoesNotFit`] if it overflows `bitwidth`.
    pub const fn from_u128(n: u128, bitwidth: u32) -> Result<Self, WrapIntError> {
        if let Err(e) = Self::check_bitwidth(bitwidth) {
            return Err(e);
        }
        if !Self::fits_wrapint_unsigned(n, bitwidth) {
            return Err(WrapIntError::DoesNotFit { bitwidth });
        }
        Ok(WrapInt { bitwidth, bits: n })
    }

    /// Constructs a `WrapInt` from a signed mathematical integer, returning
    /// [`WrapIntError::DoesNotFit`] if it overflows `bitwidth`.
    pub const fn from_i128(n: i128, bitwidth: u32) -> Result<Self, WrapIntError> {
        if let Err(e) = Self::check_bitwidth(bitwidth) {
            return Err(e);
        }
        if !Self::fits_wrapint_signed(n, bitwidth) {
            return Err(WrapIntError::DoesNotFit { bitwidth });
        }
        let bits = (n as u128) & mask_for(bitwidth);
        Ok(WrapInt { bitwidth, bits })
    }

    /// The bitwidth shared by every operand this value may combine with.
    #[inline]
    pub const fn bitwidth(&self) -> u32 {
        self.bitwidth
    }

    /// The raw unsigned bit pattern.
    #[inline]
    pub const fn to_u128(&self) -> u128 {
        self.bits
    }

    /// The two's-complement signed interpretation.
    pub const fn to_i128(&self) -> i128 {
        if self.bitwidth == 128 {
            self.bits as i128
        } else if self.msb() {
            (self.bits as i128) - (1i128 << self.bitwidth)
        } else {
            self.bits as i128
        }
    }

    /// Whether the most significant bit is set (the sign bit, under a
    /// signed interpretation).
    #[inline]
    pub const fn msb(&self) -> bool {
        (self.bits >> (self.bitwidth - 1)) & 1 != 0
    }

    /// Whether the least significant bit is set.
    #[inline]
    pub const fn lsb(&self) -> bool {
        self.bits & 1 != 0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.bits == 0
    }

    #[inline]
    pub const fn is_umax(&self) -> bool {
        self.bits == mask_for(self.bitwidth)
    }

    #[inline]
    pub const fn is_imax(&self) -> bool {
        self.bits == mask_for(self.bitwidth) >> 1
    }

    #[inline]
    pub const fn is_imin(&self) -> bool {
        self.bits == (mask_for(self.bitwidth) >> 1) + 1
    }

    pub(crate) const fn require_same_bitwidth(&self, rhs: &Self) -> Result<(), WrapIntError> {
        if self.bitwidth != rhs.bitwidth {
            Err(WrapIntError::BitwidthMismatch {
                lhs: self.bitwidth,
                rhs: rhs.bitwidth,
            })
        } else {
            Ok(())
        }
    }

    pub(crate) const fn mask(&self) -> u128 {
        mask_for(self.bitwidth)
    }
}

impl core::fmt::Debug for WrapInt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:x}_u{}", self.bits, self.bitwidth)
    }
}

impl core::fmt::Display for WrapInt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.bits)
    }
}
