//! Concurrent descriptor downloads.
//!
//! Given a list of identifiers, fetches each item's descriptor file into a
//! save directory using a bounded pool of workers.
//!
//! # Features
//!
//! - Skip-if-present: an identifier whose file already exists costs no request
//! - Randomized pacing before every request
//! - Bounded retry on transient failures, always with the original identifier
//! - Streaming writes through a `.part` file, renamed on success
//! - Failures collected into a [`DownloadReport`] instead of aborting the run
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::download::{DescriptorSource, HttpClient, SaveDir};
//! use harvester_core::Identifier;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let id = Identifier::from("78_a-song_artist");
//! let url = DescriptorSource::new("https://archive.org")?.url_for(&id)?;
//! let dest = SaveDir::new("torrents").path_for(&id)?;
//! let bytes = HttpClient::new()?.download_to_path(&url, &dest).await?;
//! println!("wrote {bytes} bytes to {}", dest.display());
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod descriptor;
mod engine;
mod error;
mod outcome;
mod pacing;
mod retry;

pub use client::HttpClient;
pub use constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_MAX_DELAY, DEFAULT_MIN_DELAY, DESCRIPTOR_EXTENSION,
    READ_TIMEOUT_SECS,
};
pub use descriptor::{DescriptorSource, SaveDir, partial_path};
pub use engine::{
    DEFAULT_WORKERS, DownloadEngine, DownloadTask, EngineError, MAX_WORKERS, MIN_WORKERS,
    NoProgress, ProgressObserver,
};
pub use error::DownloadError;
pub use outcome::{DownloadOutcome, DownloadReport, FailedDownload};
pub use pacing::Pacing;
pub use retry::{DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy, classify_error};
