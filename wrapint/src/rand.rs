use rand_core::RngCore;

use crate::wrapint::WrapInt;

impl WrapInt {
    /// Randomly assigns a value of the given bitwidth using `rng`, by
    /// filling a `u128` and masking off the unused high bits. Used by the
    /// fuzz-style tests in `testcrate` to generate arbitrary operands at a
    /// chosen bitwidth, mirroring the teacher's `Bits::rand_`.
    pub fn rand<R>(bitwidth: u32, rng: &mut R) -> Result<Self, crate::WrapIntError>
    where
        R: RngCore,
    {
        WrapInt::check_bitwidth(bitwidth)?;
        let lo = rng.next_u64() as u128;
        let hi = rng.next_u64() as u128;
        let raw = lo | (hi << 64);
        Ok(WrapInt::from_raw(raw, bitwidth))
    }
}
