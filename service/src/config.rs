// Run configuration, built from the command line.

use crate::processor::HeaderPolicy;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://numbersapi.com/random/math";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Parser)]
#[command(name = "enricher")]
#[command(about = "Parse, normalize and enrich an access-log CSV into NDJSON", long_about = None)]
pub struct Cli {
    /// Source CSV file
    #[arg(short = 'f', long = "file")]
    pub input: PathBuf,

    /// Output NDJSON file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// Annotation service queried once per record
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Maximum number of records enriched at the same time
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Per-request timeout for the annotation service
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Treat the first row as data instead of a header
    #[arg(long)]
    pub no_header: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,
    pub endpoint: String,
    pub concurrency: usize,
    pub timeout: Duration,
    pub header: HeaderPolicy,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Input file not found: {0}")]
    InputMissing(PathBuf),
    #[error("Input path is not a file: {0}")]
    InputNotFile(PathBuf),
    #[error("Concurrency must be > 0")]
    ZeroConcurrency,
    #[error("Timeout must be > 0 seconds")]
    ZeroTimeout,
    #[error("Invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            input: cli.input,
            output: cli.output,
            endpoint: cli.endpoint,
            concurrency: cli.concurrency.unwrap_or_else(default_concurrency),
            timeout: Duration::from_secs(cli.timeout_secs),
            header: if cli.no_header {
                HeaderPolicy::None
            } else {
                HeaderPolicy::SkipFirstRow
            },
        }
    }
}

impl Config {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            concurrency: default_concurrency(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            header: HeaderPolicy::SkipFirstRow,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.input.exists() {
            return Err(ConfigError::InputMissing(self.input.clone()));
        }
        if !self.input.is_file() {
            return Err(ConfigError::InputNotFile(self.input.clone()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        let endpoint = reqwest::Url::parse(&self.endpoint).map_err(|e| {
            ConfigError::InvalidEndpoint {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            }
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEndpoint {
                endpoint: self.endpoint.clone(),
                reason: format!("unsupported scheme {}", endpoint.scheme()),
            });
        }

        Ok(())
    }
}

/// Enrichment is network-bound, so allow several requests per core.
fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() * 4)
        .unwrap_or(16)
}
