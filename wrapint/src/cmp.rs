use crate::{error::WrapIntError, wrapint::WrapInt};

impl WrapInt {
    pub const fn ult(&self, rhs: &Self) -> Result<bool, WrapIntError> {
        if let Err(e) = self.require_same_bitwidth(rhs) {
            return Err(e);
        }
        Ok(self.to_u128() < rhs.to_u128())
    }

    pub const fn ule(&self, rhs: &Self) -> Result<bool, WrapIntError> {
        if let Err(e) = self.require_same_bitwidth(rhs) {
            return Err(e);
        }
        Ok(self.to_u128() <= rhs.to_u128())
    }

    pub const fn ugt(&self, rhs: &Self) -> Result<bool, WrapIntError> {
        match rhs.ult(self) {
            Ok(b) => Ok(b),
            Err(e) => Err(e),
        }
    }

    pub const fn uge(&self, rhs: &Self) -> Result<bool, WrapIntError> {
        match rhs.ule(self) {
            Ok(b) => Ok(b),
            Err(e) => Err(e),
        }
    }

    pub const fn ilt(&self, rhs: &Self) -> Result<bool, WrapIntError> {
        if let Err(e) = self.require_same_bitwidth(rhs) {
            return Err(e);
        }
        Ok(self.to_i128() < rhs.to_i128())
    }

    pub const fn ile(&self, rhs: &Self) -> Result<bool, WrapIntError> {
        if let Err(e) = self.require_same_bitwidth(rhs) {
            return Err(e);
        }
        Ok(self.to_i128() <= rhs.to_i128())
    }

    pub const fn igt(&self, rhs: &Self) -> Result<bool, WrapIntError> {
        match rhs.ilt(self) {
            Ok(b) => Ok(b),
            Err(e) => Err(e),
        }
    }

    pub const fn ige(&self, rhs: &Self) -> Result<bool, WrapIntError> {
        match rhs.ile(self) {
            Ok(b) => Ok(b),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::WrapInt;

    #[test]
    fn unsigned_vs_signed_ordering_differ_across_the_sign_bit() {
        let neg_one = WrapInt::from_i128(-1, 8).unwrap();
        let one = WrapInt::uone(8).unwrap();
        assert!(one.ult(&neg_one).unwrap());
        assert!(neg_one.ilt(&one).unwrap());
    }
}
