//! Per-identifier outcomes and the run report built from them.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::identifier::Identifier;

/// Result of one download task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The descriptor was already on disk; no request was made.
    Skipped {
        /// The identifier.
        identifier: Identifier,
        /// The existing file.
        path: PathBuf,
    },

    /// The descriptor was fetched and fully written.
    Succeeded {
        /// The identifier.
        identifier: Identifier,
        /// The written file.
        path: PathBuf,
        /// Body size in bytes.
        bytes: u64,
        /// Retries spent before the successful attempt.
        retries: u32,
    },

    /// Every permitted attempt failed.
    Failed {
        /// The identifier.
        identifier: Identifier,
        /// Retries spent after the first attempt.
        retries: u32,
        /// The last error, rendered for reporting.
        error: String,
    },
}

impl DownloadOutcome {
    /// The identifier this outcome belongs to.
    #[must_use]
    pub fn identifier(&self) -> &Identifier {
        match self {
            Self::Skipped { identifier, .. }
            | Self::Succeeded { identifier, .. }
            | Self::Failed { identifier, .. } => identifier,
        }
    }

    /// Retries spent producing this outcome.
    #[must_use]
    pub fn retries(&self) -> u32 {
        match self {
            Self::Skipped { .. } => 0,
            Self::Succeeded { retries, .. } | Self::Failed { retries, .. } => *retries,
        }
    }

    /// Returns true for [`DownloadOutcome::Failed`].
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Why a download ended up in the failed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDownload {
    /// Retries spent after the first attempt.
    pub retries: u32,
    /// The last error, rendered for reporting.
    pub error: String,
}

/// Outcomes of a download run, partitioned by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    succeeded: BTreeSet<Identifier>,
    skipped: BTreeSet<Identifier>,
    failed: BTreeMap<Identifier, FailedDownload>,
    retries: u64,
}

impl DownloadReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Files the outcome under its kind.
    pub fn record(&mut self, outcome: DownloadOutcome) {
        self.retries += u64::from(outcome.retries());
        match outcome {
            DownloadOutcome::Skipped { identifier, .. } => {
                self.skipped.insert(identifier);
            }
            DownloadOutcome::Succeeded { identifier, .. } => {
                self.succeeded.insert(identifier);
            }
            DownloadOutcome::Failed {
                identifier,
                retries,
                error,
            } => {
                self.failed
                    .insert(identifier, FailedDownload { retries, error });
            }
        }
    }

    /// Folds another report into this one.
    pub fn merge(&mut self, other: Self) {
        self.succeeded.extend(other.succeeded);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
        self.retries += other.retries;
    }

    /// Identifiers downloaded in this run.
    #[must_use]
    pub fn succeeded(&self) -> &BTreeSet<Identifier> {
        &self.succeeded
    }

    /// Identifiers already present on disk.
    #[must_use]
    pub fn skipped(&self) -> &BTreeSet<Identifier> {
        &self.skipped
    }

    /// Identifiers that could not be downloaded, with the reason.
    #[must_use]
    pub fn failed(&self) -> &BTreeMap<Identifier, FailedDownload> {
        &self.failed
    }

    /// Failed identifiers only.
    #[must_use]
    pub fn failed_identifiers(&self) -> BTreeSet<Identifier> {
        self.failed.keys().cloned().collect()
    }

    /// Retries spent across all tasks.
    #[must_use]
    pub fn retries(&self) -> u64 {
        self.retries
    }

    /// Number of identifiers with an outcome.
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.skipped.len() + self.failed.len()
    }

    /// Returns true when nothing failed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
