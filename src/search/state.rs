//! Traversal position and accumulated identifiers.
//!
//! The cursor is an explicit tri-state so "no traversal yet" and "no more
//! pages" can never be confused. A state only moves forward:
//! `NotStarted -> InProgress(token)* -> Exhausted`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::page::Page;
use crate::identifier::Identifier;

/// Where a traversal stands relative to the remote cursor sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "token", rename_all = "snake_case")]
pub enum CursorStatus {
    /// No page has been fetched yet.
    #[default]
    NotStarted,
    /// At least one page was fetched; the token selects the next one.
    InProgress(String),
    /// The last page has been consumed.
    Exhausted,
}

impl CursorStatus {
    /// Returns the cursor token to send with the next query, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::InProgress(token) => Some(token),
            Self::NotStarted | Self::Exhausted => None,
        }
    }

    /// Returns true once the last page has been consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }

    /// Returns true before the first page has been fetched.
    #[must_use]
    pub fn is_not_started(&self) -> bool {
        matches!(self, Self::NotStarted)
    }
}

/// On-disk shape of [`TraversalState`].
#[derive(Deserialize)]
struct TraversalSnapshot {
    cursor: CursorStatus,
    page_index: u64,
    buffer: Vec<Identifier>,
}

/// Progress of one traversal: cursor, pages consumed, identifiers collected.
///
/// The buffer keeps first-seen order and never holds an identifier twice.
/// Every instance owns its own buffer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "TraversalSnapshot")]
pub struct TraversalState {
    cursor: CursorStatus,
    page_index: u64,
    buffer: Vec<Identifier>,
    #[serde(skip_serializing)]
    seen: HashSet<Identifier>,
}

impl From<TraversalSnapshot> for TraversalState {
    fn from(snapshot: TraversalSnapshot) -> Self {
        let mut state = Self {
            cursor: snapshot.cursor,
            page_index: snapshot.page_index,
            buffer: Vec::with_capacity(snapshot.buffer.len()),
            seen: HashSet::with_capacity(snapshot.buffer.len()),
        };
        state.extend_unique(snapshot.buffer);
        state
    }
}

impl PartialEq for TraversalState {
    fn eq(&self, other: &Self) -> bool {
        self.cursor == other.cursor
            && self.page_index == other.page_index
            && self.buffer == other.buffer
    }
}

impl Eq for TraversalState {}

impl TraversalState {
    /// Creates a fresh, not-yet-started traversal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cursor status.
    #[must_use]
    pub fn cursor(&self) -> &CursorStatus {
        &self.cursor
    }

    /// Number of pages consumed so far.
    #[must_use]
    pub fn page_index(&self) -> u64 {
        self.page_index
    }

    /// Identifiers collected so far, in first-seen order.
    #[must_use]
    pub fn buffer(&self) -> &[Identifier] {
        &self.buffer
    }

    /// Returns true once the last page has been consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_exhausted()
    }

    /// Consumes the state, yielding the collected identifiers.
    #[must_use]
    pub fn into_buffer(self) -> Vec<Identifier> {
        self.buffer
    }

    /// Applies one fetched page: appends its unseen identifiers, bumps the
    /// page index and moves the cursor.
    ///
    /// Returns the identifiers this page newly contributed, in page order.
    pub(crate) fn absorb(&mut self, page: &Page) -> Vec<Identifier> {
        let added = self.extend_unique(page.identifiers().cloned());
        self.page_index += 1;
        self.cursor = page.next_cursor();
        added
    }

    fn extend_unique(&mut self, ids: impl IntoIterator<Item = Identifier>) -> Vec<Identifier> {
        let mut added = Vec::new();
        for id in ids {
            if self.seen.insert(id.clone()) {
                self.buffer.push(id.clone());
                added.push(id);
            }
        }
        added
    }
}
