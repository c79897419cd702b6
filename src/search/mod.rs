//! Cursor-paginated discovery of every identifier in a collection.
//!
//! The archive's scrape endpoint returns the collection as a sequence of
//! windows linked by opaque cursor tokens. This module fetches those windows
//! ([`HttpPageFetcher`]), tracks where a walk stands ([`TraversalState`]),
//! persists that position ([`CheckpointStore`]) and ties the three together
//! ([`Aggregator`]).
//!
//! # Features
//!
//! - Explicit `NotStarted / InProgress / Exhausted` cursor state
//! - Full and one-page-per-call traversal modes
//! - Atomic JSON checkpoints after every page for resumable runs
//! - First-seen deduplication of identifiers
//! - Page limit guard against servers that never stop returning cursors

mod aggregator;
mod checkpoint;
mod error;
mod fetcher;
mod page;
mod state;

pub use aggregator::{AggMode, Aggregator, DEFAULT_MAX_PAGES};
pub use checkpoint::{CHECKPOINT_VERSION, CheckpointStore};
pub use error::{CheckpointError, SearchError};
pub use fetcher::{
    DEFAULT_ARCHIVE_BASE, DEFAULT_COLLECTION, HttpPageFetcher, PageSource, SearchQuery,
};
pub use page::{Page, Record};
pub use state::{CursorStatus, TraversalState};
