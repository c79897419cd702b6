//! Harvester Core Library
//!
//! This library enumerates every item of a cursor-paginated archive
//! collection and harvests one descriptor file per item into a local
//! directory.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`search`] - Cursor pagination, traversal state and checkpoints
//! - [`download`] - Concurrent descriptor downloads with pacing and retry
//! - [`identifier`] - The item identifier shared by both halves

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod identifier;
pub mod search;
mod user_agent;

// Re-export commonly used types
pub use download::{
    DEFAULT_MAX_RETRIES, DEFAULT_WORKERS, DescriptorSource, DownloadEngine, DownloadError,
    DownloadOutcome, DownloadReport, DownloadTask, EngineError, HttpClient, Pacing,
    ProgressObserver, RetryPolicy, SaveDir,
};
pub use identifier::Identifier;
pub use search::{
    AggMode, Aggregator, CheckpointStore, CursorStatus, HttpPageFetcher, PageSource, SearchError,
    SearchQuery, TraversalState,
};
