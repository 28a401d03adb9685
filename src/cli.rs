use clap::Parser;
use std::time::Duration;

use crate::config::{DEFAULT_CHUNK_SIZE, FetchConfig};
use crate::retry::RetryPolicy;

#[derive(Parser, Debug)]
#[command(name = "runxar")]
#[command(version)]
#[command(about = "A Rust XAR extractor with HTTP URL support", long_about = None)]
#[command(after_help = "Examples:\n  \
  runxar Installer.pkg Distribution       extract Distribution from Installer.pkg\n  \
  runxar -p Installer.pkg Scripts | gunzip   send Scripts via pipe into gunzip\n  \
  runxar -l https://example.com/Installer.pkg   list members of a remote package")]
pub struct Cli {
    /// XAR file path or HTTP URL
    #[arg(value_name = "FILE")]
    pub file: String,

    /// Members to extract, by exact name (default: all)
    #[arg(value_name = "MEMBERS")]
    pub members: Vec<String>,

    /// List members (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List verbosely, with offsets, sizes and encodings
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Extract members to pipe, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract members into exdir
    #[arg(short = 'd', value_name = "DIR")]
    pub extract_dir: Option<String>,

    /// Never overwrite existing files
    #[arg(short = 'n')]
    pub never_overwrite: bool,

    /// Overwrite files WITHOUT prompting
    #[arg(short = 'o')]
    pub overwrite: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,

    /// Log debug information to stderr
    #[arg(long)]
    pub debug: bool,

    /// Chunk size in bytes when streaming a remote table of contents
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Attempts at fetching a remote table of contents (0 = no limit)
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub max_retries: u32,

    /// HTTP request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub timeout: u64,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// Default log filter when `RUST_LOG` is unset
    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "runxar=debug"
        } else if self.is_very_quiet() {
            "error"
        } else {
            "warn"
        }
    }

    pub fn fetch_config(&self) -> FetchConfig {
        let retry = match self.max_retries {
            0 => RetryPolicy::unbounded(),
            n => RetryPolicy::with_max_attempts(n),
        };
        FetchConfig::default()
            .with_chunk_size(self.chunk_size)
            .with_timeout(Duration::from_secs(self.timeout))
            .with_retry(retry)
    }
}
