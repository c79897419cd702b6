//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use harvester_core::download::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use harvester_core::search::{DEFAULT_ARCHIVE_BASE, DEFAULT_COLLECTION, DEFAULT_MAX_PAGES};
use harvester_core::{AggMode, DEFAULT_MAX_RETRIES, DEFAULT_WORKERS};

/// Harvest torrent descriptors for every item of an archive collection.
///
/// Walks the collection's paginated search listing, then downloads each
/// item's descriptor into the save directory. Files already on disk are
/// skipped, so an interrupted run can simply be started again.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(author, version, about)]
pub struct Args {
    /// Directory descriptors are saved to (created if missing)
    #[arg(short = 's', long, default_value = "torrents")]
    pub save: PathBuf,

    /// Checkpoint file for resuming the identifier listing
    #[arg(short = 'c', long)]
    pub cache: Option<PathBuf>,

    /// Maximum concurrent downloads (1-100)
    #[arg(short = 'w', long, default_value_t = DEFAULT_WORKERS as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub workers: u8,

    /// Maximum retries per descriptor for transient failures (0-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_RETRIES as u8, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: u8,

    /// Listing mode: collect everything first, or download page by page
    #[arg(short = 'm', long, value_enum, default_value_t = Mode::Full)]
    pub mode: Mode,

    /// Collection to harvest
    #[arg(long, default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    /// Base URL of the search API
    #[arg(long, default_value = DEFAULT_ARCHIVE_BASE)]
    pub api_base: String,

    /// Base URL descriptors are downloaded from
    #[arg(long, default_value = DEFAULT_ARCHIVE_BASE)]
    pub download_base: String,

    /// Lower bound of the random delay before each request, in milliseconds
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub min_delay_ms: u64,

    /// Upper bound of the random delay before each request, in milliseconds (0 with --min-delay-ms 0 disables)
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub max_delay_ms: u64,

    /// Connection timeout in seconds
    #[arg(long, default_value_t = CONNECT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub connect_timeout: u64,

    /// Whole-request timeout in seconds
    #[arg(long, default_value_t = READ_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub read_timeout: u64,

    /// Give up listing after this many pages
    #[arg(long, default_value_t = DEFAULT_MAX_PAGES, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_pages: u64,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Log level; overrides -v and -q (RUST_LOG still wins)
    #[arg(short = 'l', long = "log", value_enum)]
    pub log_level: Option<LogLevel>,

    /// Log line format
    #[arg(short = 'f', long, value_enum, default_value_t = LogFormat::Full)]
    pub log_format: LogFormat,
}

/// Listing mode selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// List the whole collection, then download
    Full,
    /// Download each page's items as soon as the page arrives
    Iterative,
}

impl From<Mode> for AggMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Full => AggMode::Full,
            Mode::Iterative => AggMode::Iterative,
        }
    }
}

/// Log level selected with `--log`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Errors only
    Error,
    /// Warnings and errors
    Warn,
    /// Progress milestones
    Info,
    /// Per-request detail
    Debug,
    /// Everything
    Trace,
}

impl LogLevel {
    /// The `EnvFilter` directive for this level.
    #[must_use]
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Default multi-field lines
    Full,
    /// Shorter lines
    Compact,
    /// Multi-line, human oriented
    Pretty,
    /// Newline-delimited JSON
    Json,
}
