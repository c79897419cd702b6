//! Collection traversal driver.
//!
//! The [`Aggregator`] walks the cursor sequence of a [`PageSource`], folding
//! each page into its [`TraversalState`] and persisting progress through the
//! [`CheckpointStore`] so an interrupted run resumes from the last saved
//! cursor instead of page one.
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::search::{AggMode, Aggregator, HttpPageFetcher, SearchQuery};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let query = SearchQuery::new("https://archive.org", "georgeblood")?;
//! let fetcher = HttpPageFetcher::new(query)?;
//! let mut aggregator = Aggregator::new(fetcher, AggMode::Full)
//!     .with_checkpoint("great78.json")
//!     .restore()?;
//! let identifiers = aggregator.aggregate().await?;
//! println!("found {} items", identifiers.len());
//! # Ok(())
//! # }
//! ```

use tracing::{debug, info, instrument};

use super::checkpoint::CheckpointStore;
use super::error::SearchError;
use super::fetcher::PageSource;
use super::state::TraversalState;
use crate::identifier::Identifier;

/// Default upper bound on pages fetched by one traversal.
pub const DEFAULT_MAX_PAGES: u64 = 100_000;

/// How [`Aggregator::aggregate`] walks the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggMode {
    /// Walk every remaining page and return the whole collection.
    #[default]
    Full,
    /// Fetch one page per call and return only what that page added.
    Iterative,
}

/// Drives a traversal over a [`PageSource`].
#[derive(Debug)]
pub struct Aggregator<S> {
    source: S,
    mode: AggMode,
    state: TraversalState,
    store: CheckpointStore,
    checkpoint_key: String,
    max_pages: u64,
}

impl<S: PageSource> Aggregator<S> {
    /// Creates an aggregator with a fresh traversal and no persistence.
    pub fn new(source: S, mode: AggMode) -> Self {
        Self {
            source,
            mode,
            state: TraversalState::new(),
            store: CheckpointStore::new(),
            checkpoint_key: String::new(),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Sets the checkpoint key (file path). An empty key disables persistence.
    #[must_use]
    pub fn with_checkpoint(mut self, key: impl Into<String>) -> Self {
        self.checkpoint_key = key.into();
        self
    }

    /// Caps the number of pages one traversal may fetch.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u64) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Replaces the traversal state, e.g. with one restored elsewhere.
    #[must_use]
    pub fn with_state(mut self, state: TraversalState) -> Self {
        self.state = state;
        self
    }

    /// Restores traversal state from the configured checkpoint, if one exists.
    ///
    /// In iterative mode the newest `<key>_<n>` snapshot wins over the bare
    /// key. With no checkpoint on disk the traversal stays not-started.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Checkpoint`] if a checkpoint exists but cannot
    /// be read or decoded.
    #[instrument(level = "debug", skip(self), fields(key = %self.checkpoint_key, mode = ?self.mode))]
    pub fn restore(mut self) -> Result<Self, SearchError> {
        if self.checkpoint_key.is_empty() {
            debug!("no checkpoint configured; starting fresh");
            return Ok(self);
        }

        let key = match self.mode {
            AggMode::Iterative => self
                .store
                .latest_iterative_key(&self.checkpoint_key)?
                .unwrap_or_else(|| self.checkpoint_key.clone()),
            AggMode::Full => self.checkpoint_key.clone(),
        };

        if let Some(state) = self.store.load(&key)? {
            self.state = state;
        }
        Ok(self)
    }

    /// The traversal mode.
    #[must_use]
    pub fn mode(&self) -> AggMode {
        self.mode
    }

    /// The current traversal state.
    #[must_use]
    pub fn state(&self) -> &TraversalState {
        &self.state
    }

    /// Returns true once the last page has been consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.state.is_exhausted()
    }

    /// Consumes the aggregator, yielding every identifier collected so far.
    #[must_use]
    pub fn into_identifiers(self) -> Vec<Identifier> {
        self.state.into_buffer()
    }

    /// Runs the traversal according to the configured mode.
    ///
    /// - [`AggMode::Full`] fetches until exhausted and returns the complete
    ///   buffer.
    /// - [`AggMode::Iterative`] fetches one page and returns only the
    ///   identifiers that page added; once exhausted it returns an empty list
    ///   without fetching.
    ///
    /// # Errors
    ///
    /// Fetch, decode and checkpoint errors abort the call. Progress saved
    /// before the failure stays on disk for a later resume.
    pub async fn aggregate(&mut self) -> Result<Vec<Identifier>, SearchError> {
        match self.mode {
            AggMode::Full => self.aggregate_full().await,
            AggMode::Iterative => self.aggregate_next().await,
        }
    }

    #[instrument(level = "debug", skip(self))]
    async fn aggregate_full(&mut self) -> Result<Vec<Identifier>, SearchError> {
        while !self.state.is_exhausted() {
            self.advance().await?;
            self.store.save(&self.checkpoint_key, &self.state)?;
        }
        self.store.save(&self.checkpoint_key, &self.state)?;

        info!(
            identifiers = self.state.buffer().len(),
            pages = self.state.page_index(),
            "collection traversal complete"
        );
        Ok(self.state.buffer().to_vec())
    }

    #[instrument(level = "debug", skip(self))]
    async fn aggregate_next(&mut self) -> Result<Vec<Identifier>, SearchError> {
        if self.state.is_exhausted() {
            debug!("traversal already exhausted; nothing to fetch");
            return Ok(Vec::new());
        }

        let call = self.state.page_index();
        let added = self.advance().await?;
        let key = CheckpointStore::iterative_key(&self.checkpoint_key, call);
        self.store.save(&key, &self.state)?;
        Ok(added)
    }

    /// Fetches the next page and folds it into the state.
    async fn advance(&mut self) -> Result<Vec<Identifier>, SearchError> {
        if self.state.page_index() >= self.max_pages {
            return Err(SearchError::PageLimitExceeded {
                limit: self.max_pages,
                cursor: self.state.cursor().token().unwrap_or_default().to_string(),
            });
        }

        let page = self.source.fetch_page(self.state.cursor()).await?;
        let added = self.state.absorb(&page);

        debug!(
            page = self.state.page_index(),
            received = page.items.len(),
            added = added.len(),
            collected = self.state.buffer().len(),
            total = ?page.total,
            exhausted = self.state.is_exhausted(),
            "advanced traversal"
        );
        Ok(added)
    }
}
