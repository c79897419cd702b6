//! Download engine for concurrent descriptor downloads with retry support.
//!
//! The engine runs one [`DownloadTask`] per identifier, with a semaphore
//! capping how many run at once. Each task owns its retry loop, so a failing
//! identifier never occupies more than one worker slot.
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::download::{
//!     DescriptorSource, DownloadEngine, DownloadTask, HttpClient, RetryPolicy, SaveDir,
//! };
//! use harvester_core::Identifier;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let task = DownloadTask::new(
//!     HttpClient::new()?,
//!     DescriptorSource::new("https://archive.org")?,
//!     SaveDir::new("torrents"),
//! );
//! let engine = DownloadEngine::new(8, RetryPolicy::default(), task)?;
//! let report = engine.download_all(&[Identifier::from("78_a-song_artist")]).await;
//! println!("failed: {:?}", report.failed_identifiers());
//! # Ok(())
//! # }
//! ```

mod task;

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, info, instrument, warn};

pub use task::DownloadTask;

use super::outcome::{DownloadOutcome, DownloadReport};
use super::retry::RetryPolicy;
use crate::identifier::Identifier;

/// Minimum allowed worker count.
pub const MIN_WORKERS: usize = 1;

/// Maximum allowed worker count.
pub const MAX_WORKERS: usize = 100;

/// Default worker count if not specified.
pub const DEFAULT_WORKERS: usize = 8;

/// Error type for download engine construction.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Worker count outside the accepted range.
    #[error("invalid worker count {value}: must be between {MIN_WORKERS} and {MAX_WORKERS}")]
    InvalidWorkerCount {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// Receives outcomes as tasks finish.
pub trait ProgressObserver: Send + Sync {
    /// Called once before any task starts.
    fn on_start(&self, _total: usize) {}

    /// Called for every finished task, in completion order.
    fn on_outcome(&self, completed: usize, total: usize, outcome: &DownloadOutcome);

    /// Called once after the last task finished.
    fn on_finish(&self, _report: &DownloadReport) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_outcome(&self, _completed: usize, _total: usize, _outcome: &DownloadOutcome) {}
}

/// Concurrent descriptor downloader.
///
/// # Concurrency Model
///
/// - Each identifier runs in its own Tokio task
/// - A task acquires a semaphore permit before its first request and holds
///   it through all of its retries
/// - Permits are released automatically when the task finishes (RAII)
/// - A panicking task is reported as failed instead of aborting the batch
#[derive(Debug)]
pub struct DownloadEngine {
    semaphore: Arc<Semaphore>,
    workers: usize,
    retry_policy: RetryPolicy,
    task: Arc<DownloadTask>,
}

impl DownloadEngine {
    /// Creates an engine running at most `workers` downloads at once.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidWorkerCount`] if `workers` is outside
    /// 1..=100.
    #[instrument(level = "debug", skip(retry_policy, task))]
    pub fn new(
        workers: usize,
        retry_policy: RetryPolicy,
        task: DownloadTask,
    ) -> Result<Self, EngineError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&workers) {
            return Err(EngineError::InvalidWorkerCount { value: workers });
        }

        debug!(
            workers,
            max_retries = retry_policy.max_retries(),
            pacing_min_ms = task.pacing().min().as_millis(),
            pacing_max_ms = task.pacing().max().as_millis(),
            "creating download engine"
        );

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(workers)),
            workers,
            retry_policy,
            task: Arc::new(task),
        })
    }

    /// Returns the configured worker count.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Returns the configured retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Downloads every identifier and returns the partitioned outcomes.
    pub async fn download_all(&self, identifiers: &[Identifier]) -> DownloadReport {
        self.download_all_with_progress(identifiers, &NoProgress)
            .await
    }

    /// Downloads every identifier, reporting each outcome to `progress`.
    ///
    /// Duplicate identifiers are downloaded once. Individual failures never
    /// fail the batch; they land in [`DownloadReport::failed`].
    #[instrument(skip_all, fields(count = identifiers.len(), workers = self.workers))]
    pub async fn download_all_with_progress(
        &self,
        identifiers: &[Identifier],
        progress: &dyn ProgressObserver,
    ) -> DownloadReport {
        let mut seen = HashSet::with_capacity(identifiers.len());
        let unique: Vec<&Identifier> = identifiers
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .collect();
        if unique.len() < identifiers.len() {
            debug!(
                duplicates = identifiers.len() - unique.len(),
                "dropping duplicate identifiers"
            );
        }

        let total = unique.len();
        progress.on_start(total);
        info!(total, "starting downloads");

        let max_retries = self.retry_policy.max_retries();
        let mut tasks = JoinSet::new();
        let mut pending = HashMap::with_capacity(total);
        for identifier in unique {
            let identifier = identifier.clone();
            let semaphore = Arc::clone(&self.semaphore);
            let task = Arc::clone(&self.task);
            let name = identifier.clone();

            let handle = tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return DownloadOutcome::Failed {
                        identifier,
                        retries: 0,
                        error: "worker pool closed".to_string(),
                    };
                };

                match AssertUnwindSafe(task.run(&identifier, max_retries))
                    .catch_unwind()
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(identifier = %identifier, "download task panicked");
                        DownloadOutcome::Failed {
                            identifier,
                            retries: 0,
                            error: "download task panicked".to_string(),
                        }
                    }
                }
            });
            pending.insert(handle.id(), name);
        }

        let report = collect_outcomes(tasks, pending, progress).await;

        info!(
            succeeded = report.succeeded().len(),
            skipped = report.skipped().len(),
            failed = report.failed().len(),
            retries = report.retries(),
            "downloads complete"
        );
        progress.on_finish(&report);
        report
    }
}

/// Drains `tasks`, feeding every outcome to `progress` in completion order.
///
/// A task that died without producing an outcome is recorded as failed under
/// the identifier it was spawned for, so the report always covers `pending`.
async fn collect_outcomes(
    mut tasks: JoinSet<DownloadOutcome>,
    mut pending: HashMap<Id, Identifier>,
    progress: &dyn ProgressObserver,
) -> DownloadReport {
    let total = pending.len();
    let mut report = DownloadReport::new();
    let mut completed = 0;
    while let Some(joined) = tasks.join_next_with_id().await {
        let outcome = match joined {
            Ok((id, outcome)) => {
                pending.remove(&id);
                outcome
            }
            Err(e) => {
                let Some(identifier) = pending.remove(&e.id()) else {
                    warn!(error = %e, "untracked download task aborted");
                    continue;
                };
                aborted_outcome(identifier, &e)
            }
        };
        completed += 1;
        progress.on_outcome(completed, total, &outcome);
        report.record(outcome);
    }
    report
}

fn aborted_outcome(identifier: Identifier, error: &JoinError) -> DownloadOutcome {
    warn!(identifier = %identifier, error = %error, "download task aborted");
    DownloadOutcome::Failed {
        identifier,
        retries: 0,
        error: format!("download task aborted: {error}"),
    }
}
