use std::{fmt::Display, str::FromStr};

use num_bigint::BigUint;
use tracing::debug;

use crate::{utils::ratio_to_f64, Error};

/// Evaluation strategy for the false positive probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    /// combinatorial formula on arbitrary precision integers
    #[default]
    Exact,
    /// same formula evaluated with floats in the log domain
    LogDomain,
    /// traditional asymptotic approximation
    Approximate,
}

impl Method {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::LogDomain => "log",
            Self::Approximate => "approx",
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(Self::Exact),
            "log" => Ok(Self::LogDomain),
            "approx" => Ok(Self::Approximate),
            _ => Err(Error::InvalidMethod(s.into())),
        }
    }
}

/// computes the exponents `hashes * items` and `hashes`, making sure
/// `hashes * hashes * items` is representable as well
#[inline]
fn exponents(hashes: u64, items: u64) -> Result<(u32, u32), Error> {
    let overflow = || Error::ExponentOverflow { hashes, items };

    let kn = hashes
        .checked_mul(items)
        .and_then(|e| u32::try_from(e).ok())
        .ok_or_else(overflow)?;
    let k = u32::try_from(hashes).map_err(|_| overflow())?;

    u64::from(kn)
        .checked_mul(hashes)
        .filter(|&e| e <= u64::from(u32::MAX))
        .ok_or_else(overflow)?;

    Ok((kn, k))
}

/// Estimates the false positive probability of a Bloom filter of `bits`
/// slots holding `items` entries, each inserted with `hashes` hash
/// functions, using the combinatorial formula
///
/// ```text
/// (bits^(hashes*items) - (bits-1)^(hashes*items))^hashes / bits^(hashes*hashes*items)
/// ```
///
/// Powers are computed exactly and only the final ratio is rounded to
/// f64. The result is not clamped: it underflows to 0.0 when the ratio
/// is below the f64 range.
///
/// `bits == 1` yields 1.0 (every slot is set), `bits == 0` is an error.
///
/// # Example
///
/// ```
/// use fpprobe::classic_bloom;
///
/// assert_eq!(classic_bloom(2, 1, 1).unwrap(), 0.5);
/// assert!(classic_bloom(500, 400, 7).unwrap() > classic_bloom(4000, 400, 7).unwrap());
/// ```
pub fn classic_bloom(bits: u64, items: u64, hashes: u64) -> Result<f64, Error> {
    if bits == 0 {
        return Err(Error::ZeroBits);
    }

    let (kn, k) = exponents(hashes, items)?;

    let m = BigUint::from(bits);
    let all = m.pow(kn);
    let unset = (&m - 1u32).pow(kn);

    let numerator = (&all - &unset).pow(k);
    // bits^(k*k*n) == (bits^(k*n))^k
    let denominator = all.pow(k);

    debug!(
        bits,
        items,
        hashes,
        numerator_bits = numerator.bits(),
        denominator_bits = denominator.bits(),
        "exact ratio computed"
    );

    Ok(ratio_to_f64(&numerator, &denominator))
}

/// Same quantity as [classic_bloom] rewritten as `(1 - (1 - 1/bits)^(hashes*items))^hashes`
/// and evaluated with floats.
pub fn log_domain(bits: u64, items: u64, hashes: u64) -> Result<f64, Error> {
    if bits == 0 {
        return Err(Error::ZeroBits);
    }

    let kn = hashes as f64 * items as f64;
    // fraction of slots set after all insertions
    let set = if kn == 0.0 {
        0.0
    } else {
        -f64::exp_m1(kn * f64::ln_1p(-1.0 / bits as f64))
    };

    Ok(set.powf(hashes as f64))
}

/// Traditional approximation `(1 - e^(-hashes*items/bits))^hashes`
pub fn approximate(bits: u64, items: u64, hashes: u64) -> Result<f64, Error> {
    if bits == 0 {
        return Err(Error::ZeroBits);
    }

    let set = -f64::exp_m1(-(hashes as f64) * items as f64 / bits as f64);
    Ok(set.powf(hashes as f64))
}

#[inline]
pub fn estimate(method: Method, bits: u64, items: u64, hashes: u64) -> Result<f64, Error> {
    match method {
        Method::Exact => classic_bloom(bits, items, hashes),
        Method::LogDomain => log_domain(bits, items, hashes),
        Method::Approximate => approximate(bits, items, hashes),
    }
}

/// number of hash functions minimizing the false positive probability
/// for `items` entries in `bits` slots
#[inline(always)]
pub fn optimal_hashes(bits: u64, items: u64) -> u64 {
    if items == 0 {
        return 1;
    }
    u64::max(
        f64::ceil(f64::ln(2.0) * bits as f64 / (items as f64)) as u64,
        1,
    )
}

/// One bits-per-item budget of a [sweep]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepRow {
    pub bits_per_item: u64,
    pub bits: u64,
    pub exact: f64,
    pub approx: f64,
    pub optimal_hashes: u64,
}

/// Compares [classic_bloom] and [approximate] for every bits-per-item
/// budget in `from..=to`. All rows are computed before returning so a
/// failing budget never yields a partial table.
pub fn sweep(items: u64, hashes: u64, from: u64, to: u64) -> Result<Vec<SweepRow>, Error> {
    if from == 0 || from > to {
        return Err(Error::InvalidRange { from, to });
    }

    (from..=to)
        .map(|bits_per_item| {
            let bits = bits_per_item.saturating_mul(items);
            Ok(SweepRow {
                bits_per_item,
                bits,
                exact: classic_bloom(bits, items, hashes)?,
                approx: approximate(bits, items, hashes)?,
                optimal_hashes: optimal_hashes(bits, items),
            })
        })
        .collect()
}
