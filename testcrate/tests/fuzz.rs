//! Randomized, exhaustive-on-small-bitwidths soundness fuzzing: every
//! transfer function must return an abstract value whose concretization
//! covers the actual operation applied to any two concrete members of the
//! operands' concretizations (testable property 3).
//!
//! Bitwidths are kept small (3-5 bits) so the concrete operand space can be
//! enumerated exhaustively rather than sampled, the same tradeoff the
//! teacher's own `testcrate::fuzz` module makes between coverage and
//! runtime.

use numdom::{stnum::Stnum, tnum::Tnum, witv::SplitWrappedInterval};
use rand_xoshiro::{rand_core::{RngCore, SeedableRng}, Xoshiro256StarStar};
use wrapint::WrapInt;

const BW: u32 = 4;

fn all_values(bw: u32) -> Vec<WrapInt> {
    (0..(1u128 << bw)).map(|n| WrapInt::from_u128(n, bw).unwrap()).collect()
}

fn random_tnum(rng: &mut impl RngCore, bw: u32) -> Tnum {
    let mask = (rng.next_u32() as u128) & ((1u128 << bw) - 1);
    let raw_value = (rng.next_u32() as u128) & ((1u128 << bw) - 1);
    let value = raw_value & !mask;
    Tnum::from_value_mask(
        WrapInt::from_u128(value, bw).unwrap(),
        WrapInt::from_u128(mask, bw).unwrap(),
    )
    .unwrap()
}

fn random_interval(rng: &mut impl RngCore, bw: u32) -> SplitWrappedInterval {
    let max = (1u128 << bw) - 1;
    let a = (rng.next_u32() as u128) & max;
    let b = (rng.next_u32() as u128) & max;
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    SplitWrappedInterval::from_unsigned_range(
        WrapInt::from_u128(lo, bw).unwrap(),
        WrapInt::from_u128(hi, bw).unwrap(),
    )
    .unwrap()
}

fn concretize_tnum(t: &Tnum, bw: u32) -> Vec<WrapInt> {
    all_values(bw).into_iter().filter(|x| t.at(*x)).collect()
}

fn concretize_interval(i: &SplitWrappedInterval, bw: u32) -> Vec<WrapInt> {
    all_values(bw).into_iter().filter(|x| i.contains(*x)).collect()
}

macro_rules! assert_tnum_sound {
    ($a:expr, $b:expr, $abstract_op:ident, $concrete_op:expr) => {{
        let result = $a.$abstract_op(&$b);
        for x in concretize_tnum(&$a, BW) {
            for y in concretize_tnum(&$b, BW) {
                let expected = $concrete_op(x, y);
                assert!(
                    result.at(expected),
                    "{:?} {} {:?} = {:?} not covered by {:?}",
                    $a,
                    stringify!($abstract_op),
                    $b,
                    expected,
                    result
                );
            }
        }
    }};
}

macro_rules! assert_interval_sound {
    ($a:expr, $b:expr, $abstract_op:ident, $concrete_op:expr) => {{
        let result = $a.$abstract_op(&$b);
        for x in concretize_interval(&$a, BW) {
            for y in concretize_interval(&$b, BW) {
                let expected = $concrete_op(x, y);
                assert!(
                    result.contains(expected),
                    "{:?} {} {:?} = {:?} not covered by {:?}",
                    $a,
                    stringify!($abstract_op),
                    $b,
                    expected,
                    result
                );
            }
        }
    }};
}

#[test]
fn tnum_transfer_functions_are_sound() {
    let mut rng = Xoshiro256StarStar::seed_from_u64(0xA17);
    for _ in 0..200 {
        let a = random_tnum(&mut rng, BW);
        let b = random_tnum(&mut rng, BW);
        assert_tnum_sound!(a, b, add, |x: WrapInt, y: WrapInt| x.add(&y).unwrap());
        assert_tnum_sound!(a, b, sub, |x: WrapInt, y: WrapInt| x.sub(&y).unwrap());
        assert_tnum_sound!(a, b, and, |x: WrapInt, y: WrapInt| x.and(&y).unwrap());
        assert_tnum_sound!(a, b, or, |x: WrapInt, y: WrapInt| x.or(&y).unwrap());
        assert_tnum_sound!(a, b, xor, |x: WrapInt, y: WrapInt| x.xor(&y).unwrap());
        assert_tnum_sound!(a, b, mul, |x: WrapInt, y: WrapInt| x.mul(&y).unwrap());
    }
}

#[test]
fn tnum_division_is_sound_when_divisor_nonzero() {
    let mut rng = Xoshiro256StarStar::seed_from_u64(0xD1);
    for _ in 0..200 {
        let a = random_tnum(&mut rng, BW);
        let b = random_tnum(&mut rng, BW);
        let result_u = a.udiv(&b);
        let result_s = a.sdiv(&b);
        for x in concretize_tnum(&a, BW) {
            for y in concretize_tnum(&b, BW) {
                if y.is_zero() {
                    continue;
                }
                assert!(result_u.at(x.udiv(&y).unwrap()));
                assert!(result_s.at(x.sdiv(&y).unwrap()));
            }
        }
    }
}

#[test]
fn wrapped_interval_transfer_functions_are_sound() {
    let mut rng = Xoshiro256StarStar::seed_from_u64(0xB0B);
    for _ in 0..200 {
        let a = random_interval(&mut rng, BW);
        let b = random_interval(&mut rng, BW);
        assert_interval_sound!(a, b, add, |x: WrapInt, y: WrapInt| x.add(&y).unwrap());
        assert_interval_sound!(a, b, sub, |x: WrapInt, y: WrapInt| x.sub(&y).unwrap());
        assert_interval_sound!(a, b, and, |x: WrapInt, y: WrapInt| x.and(&y).unwrap());
        assert_interval_sound!(a, b, or, |x: WrapInt, y: WrapInt| x.or(&y).unwrap());
        assert_interval_sound!(a, b, xor, |x: WrapInt, y: WrapInt| x.xor(&y).unwrap());
    }
}

#[test]
fn stnum_matches_tnum_precision_on_random_singletons() {
    let mut rng = Xoshiro256StarStar::seed_from_u64(0x57);
    for _ in 0..100 {
        let raw = (rng.next_u32() as u128) & ((1u128 << BW) - 1);
        let n = WrapInt::from_u128(raw, BW).unwrap();
        let s = Stnum::mk_stnum(n.to_i128(), BW);
        assert!(s.at(n));
        assert!(s.is_singleton());
    }
}

#[test]
fn widening_chain_stabilises_within_bound() {
    // An ascending chain of singletons joined one at a time; widening
    // against the running accumulator must stabilise within 2*bitwidth+1
    // steps (testable property 5).
    let mut rng = Xoshiro256StarStar::seed_from_u64(0x9E);
    let mut acc = SplitWrappedInterval::bottom(8);
    let mut prev_interval = acc.to_interval();
    let mut stable_count = 0;
    for _ in 0..(2 * 8 + 1) {
        let raw = (rng.next_u32() as u128) & 0xFF;
        let next = SplitWrappedInterval::singleton(WrapInt::from_u128(raw, 8).unwrap());
        let joined = acc.join(&next);
        acc = acc.widen(&joined);
        let cur = acc.to_interval();
        if cur == prev_interval {
            stable_count += 1;
        } else {
            stable_count = 0;
        }
        prev_interval = cur;
        if stable_count >= 2 {
            break;
        }
    }
    assert!(stable_count >= 2 || acc.is_top());
}
