use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{ToPrimitive, Zero};
use statrs::statistics::Statistics;
use std::{fmt::Display, time::Duration};

// quotient precision kept before rounding to f64
const QUOTIENT_BITS: u64 = 64;
const MANTISSA_BITS: i64 = f64::MANTISSA_DIGITS as i64;
// exponent of the smallest normal f64
const MIN_NORMAL_EXP: i64 = f64::MIN_EXP as i64 - 1;
// exponent of the smallest subnormal f64
const MIN_SUBNORMAL_EXP: i64 = MIN_NORMAL_EXP - MANTISSA_BITS + 1;

/// exact `2^exp` for `exp` in the normal exponent range
#[inline(always)]
fn pow2(exp: i64) -> f64 {
    debug_assert!((MIN_NORMAL_EXP..=1023).contains(&exp));
    f64::from_bits(((exp + 1023) as u64) << 52)
}

/// Multiplies `x` by `2^exp` without overflowing the intermediate power.
/// The result is exact whenever it is representable.
#[inline]
pub fn scale_pow2(mut x: f64, mut exp: i64) -> f64 {
    while exp > 1000 {
        x *= pow2(1000);
        exp -= 1000;
    }
    while exp < -1000 {
        x *= pow2(-1000);
        exp += 1000;
    }
    x * pow2(exp)
}

/// Rounds `(q + f) * 2^-shift` to nearest even, where `0 <= f < 1` and
/// `sticky` tells whether `f` is non zero. `q` must be positive.
fn round_scaled(q: u128, sticky: bool, shift: i64) -> f64 {
    let q_bits = (u128::BITS - q.leading_zeros()) as i64;
    // exponent of the most significant bit of the value
    let top = q_bits - 1 - shift;

    // significant bits available at this magnitude
    let keep = if top >= MIN_NORMAL_EXP {
        MANTISSA_BITS
    } else {
        top - MIN_SUBNORMAL_EXP + 1
    };

    // below half of the smallest subnormal
    if keep < 0 {
        return 0.0;
    }

    // q holds more than MANTISSA_BITS bits so at least one bit is dropped
    let drop = (q_bits - keep) as u32;
    let mut m = q >> drop;
    let rem = q & ((1u128 << drop) - 1);
    let half = 1u128 << (drop - 1);

    if rem > half || (rem == half && (sticky || m & 1 == 1)) {
        m += 1;
    }

    // m fits in MANTISSA_BITS + 1 bits, the conversion is exact
    scale_pow2(m as f64, drop as i64 - shift)
}

/// Rounds the exact ratio `num / den` to the nearest representable f64
/// (ties to even), subnormal results included.
///
/// The quotient is first computed on integers scaled to keep
/// [QUOTIENT_BITS] significant bits plus a sticky bit for the remainder,
/// so operands far beyond the f64 range (hundreds of thousands of bits)
/// are handled with a single rounding. A zero denominator yields
/// `f64::NAN`.
pub fn ratio_to_f64(num: &BigUint, den: &BigUint) -> f64 {
    if den.is_zero() {
        return f64::NAN;
    }

    if num.is_zero() {
        return 0.0;
    }

    let shift = den.bits() as i64 - num.bits() as i64 + QUOTIENT_BITS as i64;
    let (q, r) = if shift >= 0 {
        (num << shift as u64).div_rem(den)
    } else {
        num.div_rem(&(den << shift.unsigned_abs()))
    };

    // q holds QUOTIENT_BITS or QUOTIENT_BITS + 1 bits
    match q.to_u128() {
        Some(q) => round_scaled(q, !r.is_zero(), shift),
        None => f64::NAN,
    }
}

/// Summary statistics over a set of trials
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let std_dev = match samples.len() {
            1 => 0.0,
            _ => samples.std_dev(),
        };

        Self {
            mean: samples.mean(),
            std_dev,
            min: samples.min(),
            max: samples.max(),
        }
    }
}

impl Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "mean={:.1} std_dev={:.2} min={} max={}",
            self.mean, self.std_dev, self.min, self.max
        )
    }
}

pub fn time_it_once<F: FnOnce() -> R, R>(f: F) -> (R, Duration) {
    let start_time = std::time::Instant::now();
    let r = f();
    (r, start_time.elapsed())
}
