//! Constants for the download module (timeouts, pacing, file layout).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Shortest pause before a descriptor request.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(100);

/// Longest pause before a descriptor request.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(1000);

/// Extension of harvested descriptor files.
pub const DESCRIPTOR_EXTENSION: &str = "torrent";

/// Suffix of in-flight downloads; renamed away once the body is complete.
pub const PARTIAL_SUFFIX: &str = "part";
