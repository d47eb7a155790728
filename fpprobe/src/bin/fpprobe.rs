use anyhow::anyhow;
use clap::Parser;
use fpprobe::{
    estimate::{estimate, sweep, Method},
    probes::{parse_hash, poison, Probes, BITS_PER_ENTRY, NUM_PROBES},
    scenario::{DEFAULT_ITEMS, DEFAULT_POISON_FACTOR},
    simulate::{DEFAULT_BYTE_LENGTH, DEFAULT_ENTRIES, DEFAULT_SEED},
    utils::time_it_once,
    Scenario, Simulation,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
pub struct Args {
    /// Verbose output
    #[clap(short, long)]
    verbose: bool,
    /// Commands, when no command is given the default normal vs
    /// poisoned report is printed
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Parser)]
enum Command {
    /// Compare false positive probability of a normal and a poisoned filter
    Report(Report),
    /// Estimate the false positive probability of a single filter
    Estimate(Estimate),
    /// Compare exact and approximated false positive probability
    /// over a range of bits per item
    Sweep(Sweep),
    /// Show the normal and poisoned probes of a SHA-256 hash
    Probes(ShowProbes),
    /// Count the distinct buckets reached by normal and poisoned hashes
    Simulate(Simulate),
}

#[derive(Debug, Parser)]
struct Report {
    /// Number of bits per item in the normal filter
    #[clap(short, long, default_value_t = BITS_PER_ENTRY)]
    bits_per_item: u64,
    /// Number of hash functions
    #[clap(short = 'k', long, default_value_t = NUM_PROBES as u64)]
    hashes: u64,
    /// Number of items inserted
    #[clap(short = 'n', long, default_value_t = DEFAULT_ITEMS)]
    items: u64,
    /// The poisoned filter has 1/F of the bits of the normal one
    #[clap(short = 'F', long, default_value_t = DEFAULT_POISON_FACTOR)]
    poison_factor: u64,
    /// Evaluation method: exact, log or approx
    #[clap(short, long, default_value = "exact")]
    method: Method,
}

#[derive(Debug, Parser)]
struct Estimate {
    /// Size of the bit array
    #[clap(short = 'm', long)]
    bits: u64,
    /// Number of items inserted
    #[clap(short = 'n', long)]
    items: u64,
    /// Number of hash functions
    #[clap(short = 'k', long)]
    hashes: u64,
    /// Evaluation method: exact, log or approx
    #[clap(long, default_value = "exact")]
    method: Method,
}

#[derive(Debug, Parser)]
struct Sweep {
    /// Number of items inserted
    #[clap(short = 'n', long, default_value_t = DEFAULT_ITEMS)]
    items: u64,
    /// Number of hash functions
    #[clap(short = 'k', long, default_value_t = NUM_PROBES as u64)]
    hashes: u64,
    /// First bits per item value
    #[clap(long, default_value_t = 1)]
    from: u64,
    /// Last bits per item value (included)
    #[clap(long, default_value_t = 16)]
    to: u64,
}

#[derive(Debug, Parser)]
struct ShowProbes {
    /// Length of the filter in bytes
    #[clap(short, long, default_value_t = DEFAULT_BYTE_LENGTH)]
    byte_length: u64,
    /// Number of probes
    #[clap(short, long, default_value_t = NUM_PROBES)]
    count: usize,
    /// Hex encoded SHA-256 hash
    hash: String,
}

#[derive(Debug, Parser)]
struct Simulate {
    /// Number of entries inserted per trial
    #[clap(short, long, default_value_t = DEFAULT_ENTRIES)]
    entries: u64,
    /// Length of the filter in bytes
    #[clap(short, long, default_value_t = DEFAULT_BYTE_LENGTH)]
    byte_length: u64,
    /// Number of probes per entry
    #[clap(short, long, default_value_t = NUM_PROBES)]
    probes: usize,
    /// Number of trials, trials after the first one use random entries
    #[clap(short, long, default_value_t = 1)]
    trials: usize,
    /// Seed of the random entries generator
    #[clap(short, long, default_value_t = DEFAULT_SEED)]
    seed: u64,
}

fn init_logging(verbose: bool) -> Result<(), anyhow::Error> {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))
}

fn join_probes(probes: Probes) -> String {
    probes
        .map(|p| p.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}

fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    match args.command {
        None => {
            let (report, t) = time_it_once(|| Scenario::new().run());
            debug!("report time: {t:?}");
            println!("{}", report?);
        }
        Some(Command::Report(o)) => {
            let s = Scenario::new()
                .bits_per_item(o.bits_per_item)
                .hashes(o.hashes)
                .items(o.items)
                .poison_factor(o.poison_factor)
                .method(o.method);

            info!(
                normal_bits = s.normal_bits(),
                poisoned_bits = s.poisoned_bits()?,
                "report"
            );

            let (report, t) = time_it_once(|| s.run());
            debug!("report time: {t:?}");
            println!("{}", report?);
        }
        Some(Command::Estimate(o)) => {
            let (p, t) = time_it_once(|| estimate(o.method, o.bits, o.items, o.hashes));
            debug!("estimate time: {t:?}");
            println!("False positive probability: {}", p?);
        }
        Some(Command::Sweep(o)) => {
            let rows = sweep(o.items, o.hashes, o.from, o.to)?;

            println!("bits/item\tbits\texact\tapprox\toptimal k");
            for r in rows {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    r.bits_per_item, r.bits, r.exact, r.approx, r.optimal_hashes
                );
            }
        }
        Some(Command::Probes(o)) => {
            let h = parse_hash(&o.hash)?;
            let normal = Probes::new(&h, o.byte_length, o.count)?;
            let poisoned = Probes::new(&poison(h), o.byte_length, o.count)?;
            println!("Modulo: {}", normal.modulo());
            println!("Normal: {}", join_probes(normal));
            println!("Poisoned: {}", join_probes(poisoned));
        }
        Some(Command::Simulate(o)) => {
            let sim = Simulation::new()
                .entries(o.entries)
                .byte_length(o.byte_length)
                .probes(o.probes)
                .trials(o.trials)
                .seed(o.seed);

            let (report, t) = time_it_once(|| sim.run());
            info!("simulation time: {t:?}");
            println!("{}", report?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_no_command() {
        let args = Args::try_parse_from(["fpprobe"]).unwrap();
        assert!(args.command.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn test_method_arg() {
        let args = Args::try_parse_from(["fpprobe", "report", "--method", "log"]).unwrap();
        match args.command {
            Some(Command::Report(o)) => assert_eq!(o.method, Method::LogDomain),
            c => panic!("unexpected command: {c:?}"),
        }

        let args = Args::try_parse_from(["fpprobe", "estimate", "-m", "4000", "-n", "400", "-k", "7"])
            .unwrap();
        match args.command {
            Some(Command::Estimate(o)) => assert_eq!(o.method, Method::Exact),
            c => panic!("unexpected command: {c:?}"),
        }

        // rejected as a usage error
        let err = Args::try_parse_from(["fpprobe", "report", "--method", "fast"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_sweep_from_zero() {
        let args = Args::try_parse_from(["fpprobe", "sweep", "--from", "0"]).unwrap();
        match args.command {
            Some(Command::Sweep(o)) => {
                assert!(matches!(
                    sweep(o.items, o.hashes, o.from, o.to),
                    Err(fpprobe::Error::InvalidRange { from: 0, to: 16 })
                ));
            }
            c => panic!("unexpected command: {c:?}"),
        }
    }
}
