use thiserror::Error;

pub mod estimate;
pub mod probes;
pub mod scenario;
pub mod simulate;
pub mod utils;

pub use estimate::{
    approximate, classic_bloom, estimate, log_domain, optimal_hashes, sweep, Method, SweepRow,
};
pub use scenario::{Report, Scenario};
pub use simulate::{Simulation, SimulationReport};

#[derive(Debug, Error)]
pub enum Error {
    #[error("bit array size must be at least 1")]
    ZeroBits,
    #[error("exponent overflow with hashes={hashes} items={items}")]
    ExponentOverflow { hashes: u64, items: u64 },
    #[error("not a 256-bit hash: {0} bytes")]
    InvalidHashLength(usize),
    #[error("byte length must be greater than 0")]
    ZeroByteLength,
    #[error("invalid poison factor {0}")]
    InvalidPoisonFactor(u64),
    #[error("invalid bits per item range: from={from} to={to}")]
    InvalidRange { from: u64, to: u64 },
    #[error("invalid method={0}")]
    InvalidMethod(String),
    #[error("{0}")]
    Hex(#[from] hex::FromHexError),
}
