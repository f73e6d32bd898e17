use crate::{error::WrapIntError, wrapint::WrapInt};

impl WrapInt {
    /// Zero-extends to `new_bitwidth`. Requires `new_bitwidth >= bitwidth`.
    pub const fn zero_extend(&self, new_bitwidth: u32) -> Result<Self, WrapIntError> {
        if new_bitwidth < self.bitwidth() {
            return Err(WrapIntError::UnsupportedConversion {
                src: self.bitwidth(),
                dst: new_bitwidth,
            });
        }
        if let Err(e) = WrapInt::check_bitwidth(new_bitwidth) {
            return Err(e);
        }
        Ok(WrapInt::from_raw(self.to_u128(), new_bitwidth))
    }

    /// Sign-extends to `new_bitwidth`. Requires `new_bitwidth >= bitwidth`.
    pub const fn sign_extend(&self, new_bitwidth: u32) -> Result<Self, WrapIntError> {
        if new_bitwidth < self.bitwidth() {
            return Err(WrapIntError::UnsupportedConversion {
                src: self.bitwidth(),
                dst: new_bitwidth,
            });
        }
        if let Err(e) = WrapInt::check_bitwidth(new_bitwidth) {
            return Err(e);
        }
        let bits = if self.msb() {
            let extension = if new_bitwidth >= 128 {
                u128::MAX
            } else {
                (u128::MAX << self.bitwidth()) & ((1u128 << new_bitwidth).wrapping_sub(1))
            };
            self.to_u128() | extension
        } else {
            self.to_u128()
        };
        Ok(WrapInt::from_raw(bits, new_bitwidth))
    }

    /// Truncates to `new_bitwidth`, keeping the low bits. Requires
    /// `new_bitwidth <= bitwidth`.
    pub const fn truncate(&self, new_bitwidth: u32) -> Result<Self, WrapIntError> {
        if new_bitwidth > self.bitwidth() {
            return Err(WrapIntError::UnsupportedConversion {
                src: self.bitwidth(),
                dst: new_bitwidth,
            });
        }
        if let Err(e) = WrapInt::check_bitwidth(new_bitwidth) {
            return Err(e);
        }
        Ok(WrapInt::from_raw(self.to_u128(), new_bitwidth))
    }
}

#[cfg(test)]
mod tests {
    use crate::WrapInt;

    #[test]
    fn sign_extend_replicates_the_sign_bit() {
        let neg = WrapInt::from_i128(-1, 8).unwrap();
        let wide = neg.sign_extend(16).unwrap();
        assert_eq!(wide.to_i128(), -1);
    }

    #[test]
    fn zero_extend_pads_with_zero_bits() {
        let v = WrapInt::from_i128(-1, 8).unwrap();
        let wide = v.zero_extend(16).unwrap();
        assert_eq!(wide.to_u128(), 0xff);
    }

    #[test]
    fn truncate_keeps_low_bits() {
        let v = WrapInt::from_u128(0x1_23, 16).unwrap();
        let narrow = v.truncate(8).unwrap();
        assert_eq!(narrow.to_u128(), 0x23);
    }

    #[test]
    fn extension_in_the_wrong_direction_is_rejected() {
        let v = WrapInt::from_u128(1, 16).unwrap();
        assert!(v.zero_extend(8).is_err());
        assert!(v.truncate(32).is_err());
    }
}
