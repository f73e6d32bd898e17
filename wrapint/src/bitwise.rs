use crate::{error::WrapIntError, wrapint::WrapInt};

impl WrapInt {
    pub const fn not(&self) -> Self {
        WrapInt::from_raw(!self.to_u128(), self.bitwidth())
    }

    pub const fn and(&self, rhs: &Self) -> Result<Self, WrapIntError> {
        if let Err(e) = self.require_same_bitwidth(rhs) {
            return Err(e);
        }
        Ok(WrapInt::from_raw(
            self.to_u128() & rhs.to_u128(),
            self.bitwidth(),
        ))
    }

    pub const fn or(&self, rhs: &Self) -> Result<Self, WrapIntError> {
        if let Err(e) = self.require_same_bitwidth(rhs) {
            return Err(e);
        }
        Ok(WrapInt::from_raw(
            self.to_u128() | rhs.to_u128(),
            self.bitwidth(),
        ))
    }

    pub const fn xor(&self, rhs: &Self) -> Result<Self, WrapIntError> {
        if let Err(e) = self.require_same_bitwidth(rhs) {
            return Err(e);
        }
        Ok(WrapInt::from_raw(
            self.to_u128() ^ rhs.to_u128(),
            self.bitwidth(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::WrapInt;

    #[test]
    fn bitwise_ops_mask_to_the_bitwidth() {
        let a = WrapInt::from_u128(0b1010, 4).unwrap();
        let b = WrapInt::from_u128(0b0110, 4).unwrap();
        assert_eq!(a.and(&b).unwrap().to_u128(), 0b0010);
        assert_eq!(a.or(&b).unwrap().to_u128(), 0b1110);
        assert_eq!(a.xor(&b).unwrap().to_u128(), 0b1100);
        assert_eq!(a.not().to_u128(), 0b0101);
    }
}
