//! Error types for collection traversal.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or writing traversal checkpoints.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Reading, writing or persisting the checkpoint file failed.
    #[error("checkpoint IO error at {path}: {source}")]
    Io {
        /// The checkpoint path involved.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The checkpoint could not be encoded or decoded.
    #[error("checkpoint at {path} is not valid JSON: {source}")]
    Serialization {
        /// The checkpoint path involved.
        path: PathBuf,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// The checkpoint was written by an incompatible format version.
    #[error("checkpoint at {path} has unsupported version {found} (expected {expected})")]
    UnsupportedVersion {
        /// The checkpoint path involved.
        path: PathBuf,
        /// Version found in the file.
        found: u32,
        /// Version this build understands.
        expected: u32,
    },
}

impl CheckpointError {
    /// Creates an IO error for a checkpoint path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a serialization error for a checkpoint path.
    pub fn serialization(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Serialization {
            path: path.into(),
            source,
        }
    }
}

/// Errors that can occur while traversing the search listing.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Network-level failure talking to the search endpoint.
    #[error("network error querying {url}: {source}")]
    Network {
        /// The query URL.
        url: String,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The search endpoint answered with a non-success status.
    #[error("HTTP {status} querying {url}")]
    HttpStatus {
        /// The query URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body was not a valid page.
    #[error("malformed page from {url}: {reason}")]
    Decode {
        /// The query URL.
        url: String,
        /// What was wrong with the body.
        reason: String,
    },

    /// The configured search base URL could not be parsed.
    #[error("invalid search URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// A page fetch was requested after the traversal had already finished.
    #[error("traversal is exhausted; no further pages can be fetched")]
    Exhausted,

    /// The server kept returning cursors past the configured page limit.
    #[error("page limit ({limit}) exceeded at cursor {cursor}; possible cursor loop")]
    PageLimitExceeded {
        /// The configured limit.
        limit: u64,
        /// The cursor that would have been fetched next.
        cursor: String,
    },

    /// Saving or restoring a checkpoint failed.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

impl SearchError {
    /// Creates a network error, folding timeouts into the same variant.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a decode error.
    pub fn decode(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }
}
