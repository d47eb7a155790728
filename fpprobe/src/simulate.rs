use std::{collections::HashSet, fmt::Display};

use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::debug;

use crate::{
    probes::{digest, poison, Probes, NUM_PROBES},
    utils::Summary,
    Error,
};

pub const DEFAULT_ENTRIES: u64 = 10000;
/// 400 entries at 1.25 bytes per entry
pub const DEFAULT_BYTE_LENGTH: u64 = 500;
pub const DEFAULT_SEED: u64 = 42;

/// Inserts keys into a filter of `byte_length` bytes with normal and
/// poisoned hashes and counts the distinct buckets each one reaches.
///
/// The first trial uses the decimal representation of `0..entries` as
/// keys, following trials use random keys drawn from a generator seeded
/// with `seed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Simulation {
    pub entries: u64,
    pub byte_length: u64,
    pub probes: usize,
    pub trials: usize,
    pub seed: u64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            entries: DEFAULT_ENTRIES,
            byte_length: DEFAULT_BYTE_LENGTH,
            probes: NUM_PROBES,
            trials: 1,
            seed: DEFAULT_SEED,
        }
    }
}

/// Distinct buckets reached in a single trial
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TrialCount {
    pub normal: usize,
    pub poisoned: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketStats {
    /// buckets the probes can possibly land on
    pub reachable: u64,
    /// distinct buckets reached across trials
    pub distinct: Summary,
}

impl BucketStats {
    /// average fraction of reachable buckets that got set
    #[inline]
    pub fn fill_ratio(&self) -> f64 {
        self.distinct.mean / self.reachable as f64
    }

    /// false positive probability implied by the fill ratio when
    /// querying with `probes` probes
    #[inline]
    pub fn implied_fpp(&self, probes: usize) -> f64 {
        self.fill_ratio().powf(probes as f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub simulation: Simulation,
    pub normal: BucketStats,
    pub poisoned: BucketStats,
    pub trials: Vec<TrialCount>,
}

impl Display for SimulationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let probes = self.simulation.probes;
        for (label, s) in [("Normal", &self.normal), ("Poisoned", &self.poisoned)] {
            writeln!(
                f,
                "{label}: {} of {} buckets ({}), fill ratio {:.4}, implied fpp {}",
                s.distinct.mean,
                s.reachable,
                s.distinct,
                s.fill_ratio(),
                s.implied_fpp(probes)
            )?;
        }
        write!(f, "Trials: {}", self.trials.len())
    }
}

impl Simulation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(mut self, entries: u64) -> Self {
        self.entries = entries;
        self
    }

    pub fn byte_length(mut self, byte_length: u64) -> Self {
        self.byte_length = byte_length;
        self
    }

    pub fn probes(mut self, probes: usize) -> Self {
        self.probes = probes;
        self
    }

    /// number of trials, at least one trial is always run
    pub fn trials(mut self, trials: usize) -> Self {
        self.trials = trials.max(1);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn run_trial<I, S>(&self, keys: I) -> Result<TrialCount, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut normal = HashSet::new();
        let mut poisoned = HashSet::new();

        for key in keys {
            let h = digest(key);
            normal.extend(Probes::new(&h, self.byte_length, self.probes)?);
            poisoned.extend(Probes::new(&poison(h), self.byte_length, self.probes)?);
        }

        Ok(TrialCount {
            normal: normal.len(),
            poisoned: poisoned.len(),
        })
    }

    pub fn run(&self) -> Result<SimulationReport, Error> {
        if self.byte_length == 0 {
            return Err(Error::ZeroByteLength);
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut trials = Vec::with_capacity(self.trials);

        for trial in 0..self.trials.max(1) {
            let count = match trial {
                0 => self.run_trial((0..self.entries).map(|i| i.to_string()))?,
                _ => {
                    let keys = (0..self.entries)
                        .map(|_| rng.gen::<u64>().to_string())
                        .collect::<Vec<String>>();
                    self.run_trial(keys)?
                }
            };

            debug!(
                trial,
                normal = count.normal,
                poisoned = count.poisoned,
                "trial done"
            );
            trials.push(count);
        }

        let normal = trials.iter().map(|t| t.normal as f64).collect::<Vec<f64>>();
        let poisoned = trials
            .iter()
            .map(|t| t.poisoned as f64)
            .collect::<Vec<f64>>();

        Ok(SimulationReport {
            simulation: *self,
            normal: BucketStats {
                reachable: 8 * self.byte_length,
                distinct: Summary::from_samples(&normal),
            },
            poisoned: BucketStats {
                reachable: self.byte_length,
                distinct: Summary::from_samples(&poisoned),
            },
            trials,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_simulation() {
        let r = Simulation::new().run().unwrap();
        assert_eq!(
            r.trials,
            vec![TrialCount {
                normal: 4000,
                poisoned: 500
            }]
        );
        assert_eq!(r.normal.reachable, 4000);
        assert_eq!(r.poisoned.reachable, 500);
        assert_eq!(r.normal.fill_ratio(), 1.0);
        assert_eq!(r.poisoned.implied_fpp(NUM_PROBES), 1.0);
    }

    #[test]
    fn test_filter_capacity() {
        let r = Simulation::new().entries(400).run().unwrap();
        assert_eq!(r.trials[0].normal, 1992);
        assert_eq!(r.trials[0].poisoned, 499);
        assert!(r.poisoned.implied_fpp(NUM_PROBES) > r.normal.implied_fpp(NUM_PROBES));
    }

    #[test]
    fn test_random_trials() {
        let sim = Simulation::new().entries(400).trials(4).seed(7);
        let r = sim.run().unwrap();
        assert_eq!(r.trials.len(), 4);

        for t in r.trials.iter() {
            assert!(t.poisoned <= 500);
            assert!(t.normal > t.poisoned);
        }

        assert!(r.normal.distinct.min <= r.normal.distinct.mean);
        assert!(r.normal.distinct.mean <= r.normal.distinct.max);
        // same seed, same trials
        assert_eq!(sim.run().unwrap(), r);
    }

    #[test]
    fn test_implied_fpp_many_probes() {
        let s = BucketStats {
            reachable: 4,
            distinct: Summary::from_samples(&[2.0]),
        };
        assert_eq!(s.implied_fpp(3), 0.125);
        // does not wrap around i32
        assert_eq!(s.implied_fpp((i32::MAX as usize) + 2), 0.0);
    }

    #[test]
    fn test_simulation_errors() {
        assert!(matches!(
            Simulation::new().byte_length(0).run(),
            Err(Error::ZeroByteLength)
        ));
        assert_eq!(Simulation::new().trials(0).trials, 1);
    }

    #[test]
    fn test_display() {
        let out = Simulation::new().entries(10).run().unwrap().to_string();
        assert!(out.starts_with("Normal: "));
        assert!(out.contains("Poisoned: "));
        assert!(out.ends_with("Trials: 1"));
    }
}
