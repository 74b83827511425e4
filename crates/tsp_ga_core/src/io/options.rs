use std::{env, path::Path, time::Duration};

use log::LevelFilter;
use tsp_ga_derive::{CliOptions, CliValue, KvDisplay};

use crate::{Error, Result, RingDirection, population::DEFAULT_MUTATION_RATE};

/// Runtime options for a solver run.
#[derive(Clone, Debug, CliOptions, KvDisplay)]
pub struct GaOptions {
    /// Point source: random(N,MAX,SEED), file(PATH) or stdin.
    #[cli(long = "points", value = "<expr>")]
    pub points: String,
    /// Tours kept by each worker.
    #[cli(long = "population-size")]
    pub population_size: usize,
    /// GA generations each worker runs between two migrations.
    #[cli(long = "ga-iterations")]
    pub ga_iterations: usize,
    /// Number of evolve/migrate rounds.
    #[cli(long = "migration-rounds")]
    pub migration_rounds: usize,
    /// Worker units per node.
    #[cli(long = "workers")]
    pub workers: usize,
    /// Nodes in the ring.
    #[cli(long = "nodes")]
    pub nodes: usize,
    /// Elite tours sent to the neighbouring node each round.
    #[cli(long = "elite-count")]
    pub elite_count: usize,
    /// Percent of offspring hit by swap mutation per generation.
    #[cli(long = "mutation-rate")]
    pub mutation_rate: u32,
    /// Base seed for every worker's random source.
    #[cli(long = "seed")]
    pub seed: u64,
    /// Which neighbour receives a node's elites.
    #[cli(long = "ring-direction", choice)]
    pub ring_direction: RingDirection,
    /// How long a node waits for its neighbour's elites before skipping the round.
    #[cli(long = "migration-timeout-ms")]
    pub migration_timeout_ms: u64,
    /// Structured logging level.
    #[cli(long = "log-level", choice)]
    pub log_level: LogLevel,
    /// Logging output format.
    #[cli(long = "log-format", choice)]
    pub log_format: LogFormat,
    /// Include timestamps in log lines.
    #[cli(long = "log-timestamp", flag)]
    pub log_timestamp: bool,
    /// Log file path. Empty means stderr.
    #[cli(long = "log-output", value = "<path>")]
    #[kv(fmt = "or_dash")]
    pub log_output: String,
    /// Report file path. Empty means stdout.
    #[cli(long = "output", value = "<path>")]
    #[kv(fmt = "or_dash")]
    pub output: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, CliValue)]
#[cli_value(option = "log-level")]
pub enum LogLevel {
    Error,
    #[cli(alias = "warning")]
    Warn,
    Info,
    Debug,
    Trace,
    Off,
}

impl LogLevel {
    pub fn to_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
            Self::Off => LevelFilter::Off,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, CliValue)]
#[cli_value(option = "log-format")]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl Default for GaOptions {
    fn default() -> Self {
        Self {
            points: String::from("random(100,100,12345)"),
            population_size: 100,
            ga_iterations: 100,
            migration_rounds: 10,
            workers: 4,
            nodes: 1,
            elite_count: 10,
            mutation_rate: DEFAULT_MUTATION_RATE,
            seed: 12345,
            ring_direction: RingDirection::AntiClockwise,
            migration_timeout_ms: 30_000,
            log_level: LogLevel::Warn,
            log_format: LogFormat::Compact,
            log_timestamp: true,
            log_output: String::new(),
            output: String::new(),
        }
    }
}

impl GaOptions {
    pub fn from_args() -> Result<Self> {
        let options = Self::parse_from_iter(env::args().skip(1))?;
        options.validate()?;
        Ok(options)
    }

    fn parse_from_iter<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = Self::default();
        let mut args = args
            .into_iter()
            .map(|arg| arg.as_ref().to_owned())
            .peekable();

        while let Some(arg) = args.next() {
            if arg == "--help" || arg == "-h" {
                return Err(Error::invalid_input(Self::usage()));
            }

            let Some(raw_name) = arg.strip_prefix("--") else {
                return Err(Error::invalid_input(format!(
                    "Unexpected argument: {arg}\n\n{}",
                    Self::usage()
                )));
            };

            if raw_name.is_empty() {
                return Err(Error::invalid_input(format!(
                    "Invalid option name: {arg}\n\n{}",
                    Self::usage()
                )));
            }

            let (name, value) = Self::split_arg(raw_name, &mut args);

            if !options.apply_cli_option(&name, value)? {
                return Err(Error::invalid_input(format!(
                    "Unknown option: --{name}\n\n{}",
                    Self::usage()
                )));
            }
        }

        Ok(options)
    }

    /// Rejects settings the GA cannot run with.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("population-size", self.population_size),
            ("ga-iterations", self.ga_iterations),
            ("migration-rounds", self.migration_rounds),
            ("workers", self.workers),
            ("nodes", self.nodes),
            ("elite-count", self.elite_count),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(Error::invalid_config(format!("--{name} must be > 0")));
            }
        }
        if self.population_size < 2 {
            return Err(Error::invalid_config(
                "--population-size must be at least 2 so two parents can mate",
            ));
        }
        if self.mutation_rate > 100 {
            return Err(Error::invalid_config(format!(
                "--mutation-rate must be within 0..=100, got {}",
                self.mutation_rate
            )));
        }
        Ok(())
    }

    pub fn usage() -> String {
        format!(
            concat!(
                "Usage:\n",
                "  tsp-ga [options]\n",
                "  tsp-ga --points stdin [options] < points.txt\n\n",
                "Options:\n",
                "{}",
                "  --help\n",
                "\n",
                "Examples:\n",
                "  tsp-ga --points 'random(200,100,42)' --population-size 200 --migration-rounds 20\n",
                "  tsp-ga --points 'file(points.txt)' --workers 8 --nodes 2 --log-level info\n",
                "  tsp-ga --points stdin --ring-direction clockwise --output route.txt < points.txt\n",
            ),
            Self::cli_usage()
        )
    }

    pub fn migration_timeout(&self) -> Duration {
        Duration::from_millis(self.migration_timeout_ms)
    }

    pub fn log_output_path(&self) -> Option<&Path> {
        non_empty_path(&self.log_output)
    }

    pub fn output_path(&self) -> Option<&Path> {
        non_empty_path(&self.output)
    }
}

fn non_empty_path(raw: &str) -> Option<&Path> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "-" {
        None
    } else {
        Some(Path::new(raw))
    }
}
