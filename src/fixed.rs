//! `Fixed<N, K>`: a two's-complement `Q(N-K).K` fixed-point scalar, and its
//! `FastFixed<N, K>` twin.
//!
//! Ported from `examples/original_source/include/Fixed.h`. Both types store
//! a raw `i64` and represent the rational `raw / 2^K`; `FastFixed` differs
//! only in widening to `i128` (rather than reusing the `i64` storage width)
//! for the multiply/divide intermediate, a freely chosen speed tradeoff as
//! long as results are bit-identical to `Fixed` for the same `(N, K)`. For
//! `N = 32` neither intermediate ever overflows its respective width, so
//! the two are indeed bit-identical.
//!
//! The crate wires up one concrete instantiation, `Fixed<32, 16>` /
//! `FastFixed<32, 16>`, via the type-tag dispatcher in [`crate::config`];
//! the struct itself is generic over any `(N, K)` whose `K` fits in a
//! shift amount.

use crate::scalar::Scalar;
use rand::RngCore;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// `Q(N-K).K` fixed-point value stored as a raw `i64`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Fixed<const N: u32, const K: u32> {
    raw: i64,
}

/// Bit-identical twin of [`Fixed`] whose multiply/divide widen through
/// `i128` instead of `i64`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct FastFixed<const N: u32, const K: u32> {
    raw: i64,
}

/// Convenience alias for the one `(N, K)` pair this crate wires up.
pub type Fixed32_16 = Fixed<32, 16>;
/// Convenience alias for the one `(N, K)` pair this crate wires up.
pub type FastFixed32_16 = FastFixed<32, 16>;

macro_rules! impl_fixed_type {
    ($name:ident, $widen:ty) => {
        impl<const N: u32, const K: u32> $name<N, K> {
            /// Construct directly from a raw `i64` (the value `raw / 2^K`).
            pub const fn from_raw(raw: i64) -> Self {
                Self { raw }
            }

            /// The underlying raw integer.
            pub const fn raw(self) -> i64 {
                self.raw
            }
        }

        impl<const N: u32, const K: u32> Add for $name<N, K> {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self::from_raw(self.raw + rhs.raw)
            }
        }

        impl<const N: u32, const K: u32> Sub for $name<N, K> {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self::from_raw(self.raw - rhs.raw)
            }
        }

        impl<const N: u32, const K: u32> Mul for $name<N, K> {
            type Output = Self;
            fn mul(self, rhs: Self) -> Self {
                let product = (self.raw as $widen) * (rhs.raw as $widen);
                Self::from_raw((product >> K) as i64)
            }
        }

        impl<const N: u32, const K: u32> Div for $name<N, K> {
            type Output = Self;
            fn div(self, rhs: Self) -> Self {
                let numerator = (self.raw as $widen) << K;
                Self::from_raw((numerator / (rhs.raw as $widen)) as i64)
            }
        }

        impl<const N: u32, const K: u32> Neg for $name<N, K> {
            type Output = Self;
            fn neg(self) -> Self {
                Self::from_raw(-self.raw)
            }
        }

        impl<const N: u32, const K: u32> Scalar for $name<N, K> {
            fn zero() -> Self {
                Self::from_raw(0)
            }
            fn one() -> Self {
                Self::from_raw(1 << K)
            }
            fn from_i32(v: i32) -> Self {
                Self::from_raw((v as i64) << K)
            }
            fn from_f64(v: f64) -> Self {
                // Round-toward-zero, matching `static_cast<int64_t>` in the
                // original C++ (`as i64` on a float truncates toward zero).
                Self::from_raw((v * (1i64 << K) as f64) as i64)
            }
            fn to_f64(self) -> f64 {
                self.raw as f64 / (1i64 << K) as f64
            }
            fn abs(self) -> Self {
                Self::from_raw(self.raw.abs())
            }
            fn random01(rng: &mut impl RngCore) -> Self {
                // Uniform on [0, 1) at granularity 2^-K: the low K bits of the
                // next random word, reinterpreted as a fraction.
                let mask = (1i64 << K) - 1;
                Self::from_raw((rng.next_u32() as i64) & mask)
            }
        }
    };
}

impl_fixed_type!(Fixed, i64);
impl_fixed_type!(FastFixed, i128);

#[cfg(test)]
mod tests {
    use super::*;

    type F = Fixed32_16;
    type FF = FastFixed32_16;

    #[test]
    fn from_f64_roundtrips_exactly() {
        for v in [0.0, 1.0, -1.0, 0.5, -0.5, 3.25, -7.75, 123.0625] {
            let f = F::from_f64(v);
            assert_eq!(f.to_f64(), v, "roundtrip failed for {v}");
        }
    }

    #[test]
    fn add_sub_are_exact_on_raw_ints() {
        let a = F::from_f64(1.5);
        let b = F::from_f64(0.25);
        assert_eq!((a + b).to_f64(), 1.75);
        assert_eq!((a - b).to_f64(), 1.25);
    }

    #[test]
    fn mul_matches_rational_semantics() {
        let a = F::from_f64(2.5);
        let b = F::from_f64(4.0);
        assert_eq!((a * b).to_f64(), 10.0);
    }

    #[test]
    fn div_matches_rational_semantics() {
        let a = F::from_f64(10.0);
        let b = F::from_f64(4.0);
        assert_eq!((a / b).to_f64(), 2.5);
    }

    #[test]
    fn neg_and_abs() {
        let a = F::from_f64(3.0);
        assert_eq!((-a).to_f64(), -3.0);
        assert_eq!((-a).abs().to_f64(), 3.0);
    }

    #[test]
    fn fast_fixed_is_bit_identical_to_fixed() {
        let a_raw = F::from_f64(13.37).raw();
        let b_raw = F::from_f64(-2.5).raw();
        let (fa, fb) = (F::from_raw(a_raw), F::from_raw(b_raw));
        let (ga, gb) = (FF::from_raw(a_raw), FF::from_raw(b_raw));

        assert_eq!((fa + fb).raw(), (ga + gb).raw());
        assert_eq!((fa - fb).raw(), (ga - gb).raw());
        assert_eq!((fa * fb).raw(), (ga * gb).raw());
        assert_eq!((fa / fb).raw(), (ga / gb).raw());
    }

    #[test]
    fn random01_is_in_unit_interval_at_fixed_granularity() {
        use rand::SeedableRng;
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(1337);
        for _ in 0..100 {
            let x = F::random01(&mut rng);
            assert!(x.to_f64() >= 0.0 && x.to_f64() < 1.0);
        }
    }

    proptest::proptest! {
        #[test]
        fn from_f64_roundtrips_within_one_ulp(v in -1_000.0f64..1_000.0) {
            let f = F::from_f64(v);
            let back = f.to_f64();
            proptest::prop_assert!((back - v).abs() <= 2f64.powi(-16));
        }

        #[test]
        fn add_is_associative_on_raw_ints(a in -1_000.0f64..1_000.0, b in -1_000.0f64..1_000.0, c in -1_000.0f64..1_000.0) {
            let (fa, fb, fc) = (F::from_f64(a), F::from_f64(b), F::from_f64(c));
            proptest::prop_assert_eq!(((fa + fb) + fc).raw(), (fa + (fb + fc)).raw());
        }

        #[test]
        fn fast_fixed_matches_fixed_for_arbitrary_values(a in -1_000.0f64..1_000.0, b in 1.0f64..1_000.0) {
            let (fa, fb) = (F::from_f64(a), F::from_f64(b));
            let (ga, gb) = (FF::from_raw(fa.raw()), FF::from_raw(fb.raw()));
            proptest::prop_assert_eq!((fa + fb).raw(), (ga + gb).raw());
            proptest::prop_assert_eq!((fa * fb).raw(), (ga * gb).raw());
            proptest::prop_assert_eq!((fa / fb).raw(), (ga / gb).raw());
        }
    }
}
