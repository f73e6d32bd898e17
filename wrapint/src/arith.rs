use crate::{error::WrapIntError, wrapint::WrapInt};

impl WrapInt {
    /// Wrapping addition, modulo `2^bitwidth`.
    pub const fn add(&self, rhs: &Self) -> Result<Self, WrapIntError> {
        if let Err(e) = self.require_same_bitwidth(rhs) {
            return Err(e);
        }
        Ok(WrapInt::from_raw(
            self.to_u128().wrapping_add(rhs.to_u128()),
            self.bitwidth(),
        ))
    }

    /// Wrapping subtraction, modulo `2^bitwidth`.
    pub const fn sub(&self, rhs: &Self) -> Result<Self, WrapIntError> {
        if let Err(e) = self.require_same_bitwidth(rhs) {
            return Err(e);
        }
        Ok(WrapInt::from_raw(
            self.to_u128().wrapping_sub(rhs.to_u128()),
            self.bitwidth(),
        ))
    }

    /// Two's-complement negation, modulo `2^bitwidth`.
    pub const fn neg(&self) -> Self {
        WrapInt::from_raw(self.to_u128().wrapping_neg(), self.bitwidth())
    }

    /// Wrapping multiplication, modulo `2^bitwidth`.
    pub const fn mul(&self, rhs: &Self) -> Result<Self, WrapIntError> {
        if let Err(e) = self.require_same_bitwidth(rhs) {
            return Err(e);
        }
        Ok(WrapInt::from_raw(
            self.to_u128().wrapping_mul(rhs.to_u128()),
            self.bitwidth(),
        ))
    }

    /// Unsigned division. `DivideByZero` if `rhs` is zero.
    pub const fn udiv(&self, rhs: &Self) -> Result<Self, WrapIntError> {
        if let Err(e) = self.require_same_bitwidth(rhs) {
            return Err(e);
        }
        if rhs.is_zero() {
            return Err(WrapIntError::DivideByZero);
        }
        Ok(WrapInt::from_raw(
            self.to_u128() / rhs.to_u128(),
            self.bitwidth(),
        ))
    }

    /// Unsigned remainder. `DivideByZero` if `rhs` is zero.
    pub const fn urem(&self, rhs: &Self) -> Result<Self, WrapIntError> {
        if let Err(e) = self.require_same_bitwidth(rhs) {
            return Err(e);
        }
        if rhs.is_zero() {
            return Err(WrapIntError::DivideByZero);
        }
        Ok(WrapInt::from_raw(
            self.to_u128() % rhs.to_u128(),
            self.bitwidth(),
        ))
    }

    /// Signed division truncating toward zero. `DivideByZero` if `rhs` is
    /// zero. `INT_MIN / -1` wraps back to `INT_MIN`, matching two's
    /// complement machine semantics.
    pub const fn sdiv(&self, rhs: &Self) -> Result<Self, WrapIntError> {
        if let Err(e) = self.require_same_bitwidth(rhs) {
            return Err(e);
        }
        let rv = rhs.to_i128();
        if rv == 0 {
            return Err(WrapIntError::DivideByZero);
        }
        let lv = self.to_i128();
        let q = if self.is_imin() && rhs.to_u128() == self.mask() {
            // INT_MIN / -1 overflows; two's complement wraps to INT_MIN.
            lv
        } else {
            lv.wrapping_div(rv)
        };
        Ok(WrapInt::from_raw(q as u128, self.bitwidth()))
    }

    /// Signed remainder (sign follows the dividend). `DivideByZero` if
    /// `rhs` is zero.
    pub const fn srem(&self, rhs: &Self) -> Result<Self, WrapIntError> {
        if let Err(e) = self.require_same_bitwidth(rhs) {
            return Err(e);
        }
        let rv = rhs.to_i128();
        if rv == 0 {
            return Err(WrapIntError::DivideByZero);
        }
        if self.is_imin() && rhs.to_u128() == self.mask() {
            return Ok(WrapInt::from_raw(0, self.bitwidth()));
        }
        let lv = self.to_i128();
        Ok(WrapInt::from_raw((lv % rv) as u128, self.bitwidth()))
    }
}

#[cfg(test)]
mod tests {
    use crate::WrapInt;

    #[test]
    fn wraps_on_overflow() {
        let a = WrapInt::umax(8).unwrap();
        let one = WrapInt::uone(8).unwrap();
        assert!(a.add(&one).unwrap().is_zero());
    }

    #[test]
    fn signed_div_min_by_neg_one_wraps() {
        let min = WrapInt::imin(8).unwrap();
        let neg_one = WrapInt::from_i128(-1, 8).unwrap();
        assert_eq!(min.sdiv(&neg_one).unwrap(), min);
    }

    #[test]
    fn divide_by_zero_is_recoverable_error() {
        let a = WrapInt::from_u128(5, 8).unwrap();
        let z = WrapInt::zero(8).unwrap();
        assert!(a.udiv(&z).is_err());
        assert!(a.sdiv(&z).is_err());
    }
}
