use std::fmt::Display;

use tracing::debug;

use crate::{
    estimate::{estimate, Method},
    probes::{BITS_PER_ENTRY, NUM_PROBES},
    Error,
};

pub const DEFAULT_ITEMS: u64 = 400;
/// poisoned probes are confined to multiples of 8
pub const DEFAULT_POISON_FACTOR: u64 = 8;

/// Parameters of the normal vs poisoned comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scenario {
    pub bits_per_item: u64,
    pub hashes: u64,
    pub items: u64,
    /// the poisoned filter only has `1/poison_factor` of its bits usable
    pub poison_factor: u64,
    pub method: Method,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            bits_per_item: BITS_PER_ENTRY,
            hashes: NUM_PROBES as u64,
            items: DEFAULT_ITEMS,
            poison_factor: DEFAULT_POISON_FACTOR,
            method: Method::Exact,
        }
    }
}

impl Scenario {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bits_per_item(mut self, bits_per_item: u64) -> Self {
        self.bits_per_item = bits_per_item;
        self
    }

    pub fn hashes(mut self, hashes: u64) -> Self {
        self.hashes = hashes;
        self
    }

    pub fn items(mut self, items: u64) -> Self {
        self.items = items;
        self
    }

    pub fn poison_factor(mut self, poison_factor: u64) -> Self {
        self.poison_factor = poison_factor;
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[inline]
    pub fn normal_bits(&self) -> u64 {
        self.bits_per_item.saturating_mul(self.items)
    }

    /// `floor(bits_per_item * items / poison_factor)`
    #[inline]
    pub fn poisoned_bits(&self) -> Result<u64, Error> {
        if self.poison_factor == 0 {
            return Err(Error::InvalidPoisonFactor(self.poison_factor));
        }
        Ok(self.normal_bits() / self.poison_factor)
    }

    pub fn run(&self) -> Result<Report, Error> {
        let normal_bits = self.normal_bits();
        let poisoned_bits = self.poisoned_bits()?;

        debug!(
            normal_bits,
            poisoned_bits,
            items = self.items,
            hashes = self.hashes,
            method = %self.method,
            "running scenario"
        );

        Ok(Report {
            scenario: *self,
            normal: estimate(self.method, normal_bits, self.items, self.hashes)?,
            poisoned: estimate(self.method, poisoned_bits, self.items, self.hashes)?,
        })
    }
}

/// False positive probabilities of a [Scenario]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    pub scenario: Scenario,
    pub normal: f64,
    pub poisoned: f64,
}

impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "False positive probability, normal: {}", self.normal)?;
        write!(f, "False positive probability, poisoned: {}", self.poisoned)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::classic_bloom;

    #[test]
    fn test_default_scenario() {
        let s = Scenario::new();
        assert_eq!(s.normal_bits(), 4000);
        assert_eq!(s.poisoned_bits().unwrap(), 500);

        let r = s.run().unwrap();
        assert_eq!(r.normal, classic_bloom(4000, 400, 7).unwrap());
        assert_eq!(r.poisoned, classic_bloom(500, 400, 7).unwrap());
        assert!(r.normal > 0.0 && r.normal < 1.0);
        assert!(r.poisoned > 0.0 && r.poisoned < 1.0);
        assert!(r.poisoned > r.normal);
    }

    #[test]
    fn test_report_output() {
        let out = Scenario::new().run().unwrap().to_string();
        let lines = out.lines().collect::<Vec<&str>>();
        assert_eq!(lines.len(), 2);

        let values = ["normal", "poisoned"]
            .iter()
            .zip(lines)
            .map(|(label, line)| {
                let prefix = format!("False positive probability, {label}: ");
                assert!(line.starts_with(&prefix), "unexpected line: {line}");
                line[prefix.len()..].parse::<f64>().unwrap()
            })
            .collect::<Vec<f64>>();

        assert!(values.iter().all(|v| *v > 0.0 && *v < 1.0));
        assert!(values[1] > values[0]);
    }

    #[test]
    fn test_poisoned_bits_floor() {
        let s = Scenario::new().bits_per_item(3).items(7);
        assert_eq!(s.normal_bits(), 21);
        assert_eq!(s.poisoned_bits().unwrap(), 2);

        assert!(matches!(
            Scenario::new().poison_factor(0).run(),
            Err(Error::InvalidPoisonFactor(0))
        ));
    }

    #[test]
    fn test_scenario_method() {
        let r = Scenario::new().method(Method::LogDomain).run().unwrap();
        let exact = Scenario::new().run().unwrap();
        assert!(((r.normal - exact.normal) / exact.normal).abs() < 1e-9);
        assert_eq!(r.scenario.method, Method::LogDomain);
    }
}
