//! Bit-width-parameterised wrapping machine integers.
//!
//! `WrapInt` is the single place modular (mod `2^bitwidth`) arithmetic is
//! allowed to happen in this workspace. Every abstract domain built on top
//! (`tnum`, `wrapped_interval`, `stnum`, ...) reasons about wrap-around only
//! through the operations exposed here.
//!
//! This crate is `no_std` by default; enable the `std` feature for
//! `std::error::Error` impls.

#![cfg_attr(not(feature = "std"), no_std)]

mod arith;
mod bits;
mod bitwise;
mod cast;
mod cmp;
mod error;
mod wrapint;

#[cfg(feature = "rand_support")]
mod rand;

pub use crate::{
    error::WrapIntError,
    wrapint::{WrapInt, W_MAX},
};

#[cfg(test)]
mod proptests {
    use crate::WrapInt;

    // Exhaustive over a small bitwidth rather than randomized: 2^8 * 2^8
    // pairs is cheap and gives full coverage of the modular arithmetic for
    // the width most likely to expose an off-by-one in the mask logic.
    #[test]
    fn add_matches_u8_wrapping_add_at_bitwidth_eight() {
        for a in 0u16..256 {
            for b in 0u16..256 {
                let wa = WrapInt::from_u128(a as u128, 8).unwrap();
                let wb = WrapInt::from_u128(b as u128, 8).unwrap();
                let got = wa.add(&wb).unwrap().to_u128();
                let want = (a as u8).wrapping_add(b as u8) as u128;
                assert_eq!(got, want, "{a} + {b}");
            }
        }
    }

    #[test]
    fn signed_and_unsigned_interpretations_round_trip_at_bitwidth_eight() {
        for n in -128i32..=127 {
            let w = WrapInt::from_i128(n as i128, 8).unwrap();
            assert_eq!(w.to_i128(), n as i128);
        }
    }
}
