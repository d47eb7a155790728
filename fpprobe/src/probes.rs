//! Probe positions derived from a 256-bit hash
//!
//! A Bloom filter of `byte_length` bytes is probed at `count` positions
//! computed by triple hashing from the first three little-endian 32-bit
//! words of the hash. Clearing the three low bits of those words
//! ([poison]) makes every probe a multiple of 8, so a poisoned filter
//! only ever uses one eighth of its bits.

use sha2::{Digest, Sha256};

use crate::Error;

pub const HASH_SIZE: usize = 32;
pub const BITS_PER_ENTRY: u64 = 10;
pub const NUM_PROBES: usize = 7;

// low bits cleared by poisoning
const POISON_MASK: u8 = !7;

pub type Hash = [u8; HASH_SIZE];

/// SHA-256 of `data`
#[inline]
pub fn digest<S: AsRef<[u8]>>(data: S) -> Hash {
    Sha256::digest(data.as_ref()).into()
}

/// parses an hex encoded 256-bit hash
pub fn parse_hash<S: AsRef<str>>(s: S) -> Result<Hash, Error> {
    let bytes = hex::decode(s.as_ref())?;
    to_hash(&bytes)
}

#[inline]
fn to_hash(bytes: &[u8]) -> Result<Hash, Error> {
    bytes
        .try_into()
        .map_err(|_| Error::InvalidHashLength(bytes.len()))
}

/// clears the low bits of the three words used to derive probes
#[inline]
pub fn poison(mut hash: Hash) -> Hash {
    hash[0] &= POISON_MASK;
    hash[4] &= POISON_MASK;
    hash[8] &= POISON_MASK;
    hash
}

#[inline(always)]
fn read_le_u32(b: &[u8]) -> u64 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as u64
}

/// Iterator over the probe positions of a hash
#[derive(Debug, Clone)]
pub struct Probes {
    modulo: u64,
    x: u64,
    y: u64,
    z: u64,
    i: usize,
    count: usize,
}

impl Probes {
    /// Builds the probes of `hash` into a filter of `byte_length` bytes.
    /// `hash` must be exactly 256 bits long.
    pub fn new(hash: &[u8], byte_length: u64, count: usize) -> Result<Self, Error> {
        let hash = to_hash(hash)?;

        if byte_length == 0 {
            return Err(Error::ZeroByteLength);
        }

        let modulo = 8 * byte_length;

        Ok(Self {
            modulo,
            x: read_le_u32(&hash[0..4]) % modulo,
            y: read_le_u32(&hash[4..8]) % modulo,
            z: read_le_u32(&hash[8..12]) % modulo,
            i: 0,
            count,
        })
    }

    /// number of distinct positions the probes can land on
    #[inline]
    pub fn modulo(&self) -> u64 {
        self.modulo
    }
}

impl Iterator for Probes {
    type Item = u64;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.i >= self.count {
            return None;
        }

        if self.i > 0 {
            self.x = (self.x + self.y) % self.modulo;
            self.y = (self.y + self.z) % self.modulo;
        }
        self.i += 1;

        Some(self.x)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rem = self.count - self.i;
        (rem, Some(rem))
    }
}

impl ExactSizeIterator for Probes {}

#[cfg(test)]
mod test {
    use super::*;

    const ZERO_SHA256: &str = "5feceb66ffc86f38d952786c6d696c79c2dbc239dd4e91b46729d73a27fb57e9";

    #[test]
    fn test_digest() {
        assert_eq!(digest("0"), parse_hash(ZERO_SHA256).unwrap());
        assert_eq!(
            parse_hash(ZERO_SHA256.to_uppercase()).unwrap(),
            parse_hash(ZERO_SHA256).unwrap()
        );
    }

    #[test]
    fn test_parse_hash_errors() {
        assert!(matches!(parse_hash("zz"), Err(Error::Hex(_))));
        assert!(matches!(parse_hash("abc"), Err(Error::Hex(_))));
        assert!(matches!(
            parse_hash("abcd"),
            Err(Error::InvalidHashLength(2))
        ));
        assert!(matches!(parse_hash(""), Err(Error::InvalidHashLength(0))));
    }

    #[test]
    fn test_probes() {
        let h = digest("0");
        let probes = Probes::new(&h, 500, NUM_PROBES).unwrap();
        assert_eq!(probes.modulo(), 4000);
        assert_eq!(probes.len(), NUM_PROBES);
        assert_eq!(
            probes.collect::<Vec<u64>>(),
            vec![1503, 3550, 2454, 2215, 2833, 308, 2640]
        );

        let poisoned = Probes::new(&poison(h), 500, NUM_PROBES).unwrap();
        assert_eq!(
            poisoned.collect::<Vec<u64>>(),
            vec![1496, 3536, 2432, 2184, 2792, 256, 2576]
        );
    }

    #[test]
    fn test_poisoned_probes_are_multiple_of_8() {
        for i in 0..1000 {
            let h = poison(digest(i.to_string()));
            for p in Probes::new(&h, 500, NUM_PROBES).unwrap() {
                assert_eq!(p % 8, 0);
                assert!(p < 4000);
            }
        }
    }

    #[test]
    fn test_probes_errors() {
        assert!(matches!(
            Probes::new(&[0u8; 16], 500, NUM_PROBES),
            Err(Error::InvalidHashLength(16))
        ));
        assert!(matches!(
            Probes::new(&digest("0"), 0, NUM_PROBES),
            Err(Error::ZeroByteLength)
        ));
        assert_eq!(Probes::new(&digest("0"), 500, 0).unwrap().count(), 0);
    }
}
