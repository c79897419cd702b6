//! Retry budget and failure classification for descriptor downloads.
//!
//! When a download attempt fails, the error is classified into a
//! [`FailureType`]:
//! - [`FailureType::Transient`] - may succeed on another attempt (network,
//!   timeouts, 408, 429, 5xx, local write errors, truncated bodies)
//! - [`FailureType::Permanent`] - will not succeed regardless (404, 410,
//!   unusable identifiers)
//!
//! [`RetryPolicy`] then decides, from the failure type and the retries already
//! spent, whether the same identifier gets another attempt.
//!
//! # Example
//!
//! ```
//! use harvester_core::download::{
//!     DownloadError, RetryDecision, RetryPolicy, classify_error,
//! };
//!
//! let policy = RetryPolicy::default();
//! let error = DownloadError::http_status("https://archive.org/download/x/x_archive.torrent", 503);
//!
//! match policy.should_retry(classify_error(&error), 0) {
//!     RetryDecision::Retry { retry } => println!("retry #{retry}"),
//!     RetryDecision::DoNotRetry { reason } => println!("giving up: {reason}"),
//! }
//! ```

use tracing::{debug, instrument};

use super::DownloadError;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Classification of download failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    Transient,

    /// Permanent failure that won't succeed regardless of retries.
    Permanent,
}

/// Decision on whether to retry a failed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try the same identifier again.
    Retry {
        /// Which retry this will be (1-indexed).
        retry: u32,
    },

    /// Stop and report the identifier as failed.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Bounded retry budget.
///
/// A download gets one initial attempt plus up to `max_retries` retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy allowing `max_retries` retries after the first attempt.
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Creates a policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self { max_retries: 0 }
    }

    /// Returns the retry budget.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Decides whether to retry after a failure.
    ///
    /// # Arguments
    ///
    /// * `failure_type` - Classification of the failure
    /// * `retries_used` - Retries already spent on this identifier
    #[instrument(level = "trace", skip(self), fields(max_retries = self.max_retries))]
    pub fn should_retry(&self, failure_type: FailureType, retries_used: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if retries_used >= self.max_retries {
            debug!(retries_used, max = self.max_retries, "retry budget exhausted");
            return RetryDecision::DoNotRetry {
                reason: format!("retry budget ({}) exhausted", self.max_retries),
            };
        }

        RetryDecision::Retry {
            retry: retries_used + 1,
        }
    }
}

/// Classifies a download error into a failure type for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | HTTP 408, 429, 5xx | Transient |
/// | Other HTTP 4xx | Permanent |
/// | Timeout | Transient |
/// | Network (TLS/certificate) | Permanent |
/// | Network (other) | Transient |
/// | IO, Integrity | Transient |
/// | InvalidIdentifier, InvalidUrl, Client | Permanent |
#[instrument(level = "trace")]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::HttpStatus { status, .. } => classify_http_status(*status),

        DownloadError::Timeout { .. } => FailureType::Transient,

        DownloadError::Network { source, .. } => {
            if is_tls_error(source) {
                FailureType::Permanent
            } else {
                FailureType::Transient
            }
        }

        // A short write or a full disk consumes the budget like a dropped
        // connection does.
        DownloadError::Io { .. } | DownloadError::Integrity { .. } => FailureType::Transient,

        DownloadError::InvalidIdentifier { .. }
        | DownloadError::InvalidUrl { .. }
        | DownloadError::Client { .. } => FailureType::Permanent,
    }
}

#[allow(clippy::match_same_arms)]
fn classify_http_status(status: u16) -> FailureType {
    match status {
        408 | 429 => FailureType::Transient, // Request Timeout, Too Many Requests
        status if (400..500).contains(&status) => FailureType::Permanent,
        status if (500..600).contains(&status) => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}

/// Checks if a reqwest error is a TLS/certificate error.
///
/// Only the underlying causes are inspected: the top-level message embeds the
/// request URL, which carries the identifier.
fn is_tls_error(error: &reqwest::Error) -> bool {
    let mut cause = std::error::Error::source(error);
    while let Some(inner) = cause {
        if mentions_tls(&inner.to_string()) {
            return true;
        }
        cause = inner.source();
    }
    false
}

fn mentions_tls(message: &str) -> bool {
    let message = message.to_lowercase();
    ["certificate", "tls", "ssl", "handshake"]
        .iter()
        .any(|keyword| message.contains(keyword))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_default_budget() {
        assert_eq!(RetryPolicy::default().max_retries(), 3);
        assert_eq!(RetryPolicy::no_retry().max_retries(), 0);
    }

    #[test]
    fn test_should_retry_transient_until_budget_spent() {
        let policy = RetryPolicy::with_max_retries(3);
        for used in 0..3 {
            assert_eq!(
                policy.should_retry(FailureType::Transient, used),
                RetryDecision::Retry { retry: used + 1 }
            );
        }
        assert!(matches!(
            policy.should_retry(FailureType::Transient, 3),
            RetryDecision::DoNotRetry { .. }
        ));
    }

    #[test]
    fn test_should_not_retry_permanent() {
        let policy = RetryPolicy::default();
        let RetryDecision::DoNotRetry { reason } = policy.should_retry(FailureType::Permanent, 0)
        else {
            panic!("permanent failures must not be retried");
        };
        assert!(reason.contains("permanent"));
    }

    #[test]
    fn test_no_retry_policy_gives_up_immediately() {
        let policy = RetryPolicy::no_retry();
        assert!(matches!(
            policy.should_retry(FailureType::Transient, 0),
            RetryDecision::DoNotRetry { .. }
        ));
    }

    #[test]
    fn test_classify_http_statuses() {
        let classify = |status| classify_error(&DownloadError::http_status("u", status));
        assert_eq!(classify(404), FailureType::Permanent);
        assert_eq!(classify(410), FailureType::Permanent);
        assert_eq!(classify(403), FailureType::Permanent);
        assert_eq!(classify(408), FailureType::Transient);
        assert_eq!(classify(429), FailureType::Transient);
        assert_eq!(classify(500), FailureType::Transient);
        assert_eq!(classify(503), FailureType::Transient);
        assert_eq!(classify(302), FailureType::Permanent);
    }

    #[test]
    fn test_classify_local_write_errors_as_transient() {
        let io = std::io::Error::other("disk full");
        assert_eq!(
            classify_error(&DownloadError::io("/x.torrent", io)),
            FailureType::Transient
        );
        assert_eq!(
            classify_error(&DownloadError::integrity("/x.torrent", 10, 5)),
            FailureType::Transient
        );
        assert_eq!(
            classify_error(&DownloadError::timeout("u")),
            FailureType::Transient
        );
    }

    #[test]
    fn test_classify_invalid_identifier_as_permanent() {
        assert_eq!(
            classify_error(&DownloadError::invalid_identifier("..")),
            FailureType::Permanent
        );
    }

    #[test]
    fn test_mentions_tls_keywords() {
        assert!(mentions_tls("invalid peer certificate: UnknownIssuer"));
        assert!(mentions_tls("TLS handshake eof"));
        assert!(!mentions_tls("Connection refused (os error 111)"));
    }

    #[tokio::test]
    async fn test_refused_connection_with_tls_like_url_is_transient() {
        let url = "http://127.0.0.1:9/download/78_tls-handshake/78_tls-handshake_archive.torrent";
        let source = reqwest::Client::new().get(url).send().await.unwrap_err();
        assert!(source.to_string().contains("tls"), "{source}");

        let error = DownloadError::network(url, source);
        assert_eq!(classify_error(&error), FailureType::Transient);
    }
}
