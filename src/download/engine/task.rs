//! One identifier's download: skip check, pacing, fetch, bounded retry.

use tracing::{debug, error, instrument, warn};

use super::super::descriptor::{DescriptorSource, SaveDir};
use super::super::outcome::DownloadOutcome;
use super::super::pacing::Pacing;
use super::super::retry::{RetryDecision, RetryPolicy, classify_error};
use super::super::{DownloadError, HttpClient};
use crate::identifier::Identifier;

/// Everything needed to harvest one descriptor.
///
/// Cheap to clone; the engine shares one instance across workers.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    client: HttpClient,
    source: DescriptorSource,
    save_dir: SaveDir,
    pacing: Pacing,
}

impl DownloadTask {
    /// Creates a task with default pacing.
    pub fn new(client: HttpClient, source: DescriptorSource, save_dir: SaveDir) -> Self {
        Self {
            client,
            source,
            save_dir,
            pacing: Pacing::default(),
        }
    }

    /// Overrides the pre-request pacing.
    #[must_use]
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// The directory descriptors are written to.
    #[must_use]
    pub fn save_dir(&self) -> &SaveDir {
        &self.save_dir
    }

    /// The pacing applied before each request.
    #[must_use]
    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    /// Downloads the descriptor for `identifier`.
    ///
    /// Returns [`DownloadOutcome::Skipped`] without touching the network when
    /// the file already exists. Otherwise pauses, fetches, and on failure
    /// retries the same identifier until `max_retries` retries are spent.
    /// Never returns an error: an exhausted budget yields
    /// [`DownloadOutcome::Failed`].
    #[instrument(skip(self, identifier), fields(identifier = %identifier))]
    pub async fn run(&self, identifier: &Identifier, max_retries: u32) -> DownloadOutcome {
        let (url, path) = match self
            .source
            .url_for(identifier)
            .and_then(|url| Ok((url, self.save_dir.path_for(identifier)?)))
        {
            Ok(pair) => pair,
            Err(e) => return give_up(identifier, 0, &e, "unusable identifier"),
        };

        let policy = RetryPolicy::with_max_retries(max_retries);
        let mut retries = 0u32;

        loop {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                debug!(path = %path.display(), "descriptor already present; skipping");
                return DownloadOutcome::Skipped {
                    identifier: identifier.clone(),
                    path,
                };
            }

            self.pacing.pause().await;

            let error = match self.client.download_to_path(&url, &path).await {
                Ok(bytes) => {
                    debug!(path = %path.display(), bytes, retries, "descriptor downloaded");
                    return DownloadOutcome::Succeeded {
                        identifier: identifier.clone(),
                        path,
                        bytes,
                        retries,
                    };
                }
                Err(error) => error,
            };

            match policy.should_retry(classify_error(&error), retries) {
                RetryDecision::Retry { retry } => {
                    warn!(
                        retry,
                        max_retries,
                        error = %error,
                        "retrying download"
                    );
                    retries = retry;
                }
                RetryDecision::DoNotRetry { reason } => {
                    return give_up(identifier, retries, &error, &reason);
                }
            }
        }
    }
}

fn give_up(
    identifier: &Identifier,
    retries: u32,
    error: &DownloadError,
    reason: &str,
) -> DownloadOutcome {
    error!(identifier = %identifier, retries, error = %error, %reason, "download failed");
    DownloadOutcome::Failed {
        identifier: identifier.clone(),
        retries,
        error: error.to_string(),
    }
}
