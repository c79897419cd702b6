//! Page fetching against the archive's scrape endpoint.
//!
//! [`PageSource`] is the seam the aggregator drives; [`HttpPageFetcher`] is
//! the production implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use super::error::SearchError;
use super::page::Page;
use super::state::CursorStatus;
use crate::download::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use crate::user_agent::default_user_agent;

/// Default archive host for both search and download endpoints.
pub const DEFAULT_ARCHIVE_BASE: &str = "https://archive.org";

/// Default collection harvested when none is configured.
pub const DEFAULT_COLLECTION: &str = "georgeblood";

/// Path of the cursor-paginated scrape endpoint under the archive base URL.
const SCRAPE_PATH: &str = "services/search/v1/scrape";

/// Something that can produce one listing page for a cursor position.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches the page at `cursor`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Exhausted`] without any IO when `cursor` is
    /// [`CursorStatus::Exhausted`], or any fetch/decode error.
    async fn fetch_page(&self, cursor: &CursorStatus) -> Result<Page, SearchError>;
}

#[async_trait]
impl<T: PageSource + ?Sized> PageSource for &T {
    async fn fetch_page(&self, cursor: &CursorStatus) -> Result<Page, SearchError> {
        (**self).fetch_page(cursor).await
    }
}

#[async_trait]
impl<T: PageSource + ?Sized> PageSource for Box<T> {
    async fn fetch_page(&self, cursor: &CursorStatus) -> Result<Page, SearchError> {
        (**self).fetch_page(cursor).await
    }
}

/// Fixed part of the search query: endpoint and collection filter.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    endpoint: Url,
    collection: String,
}

impl SearchQuery {
    /// Builds a query for `collection` against the archive at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidUrl`] if `base_url` is not an absolute URL.
    pub fn new(base_url: &str, collection: impl Into<String>) -> Result<Self, SearchError> {
        let mut base = Url::parse(base_url).map_err(|_| SearchError::invalid_url(base_url))?;
        if base.cannot_be_a_base() {
            return Err(SearchError::invalid_url(base_url));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join(SCRAPE_PATH)
            .map_err(|_| SearchError::invalid_url(base_url))?;
        Ok(Self {
            endpoint,
            collection: collection.into(),
        })
    }

    /// The collection this query filters on.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// URL for the page at `cursor`; the `cursor` parameter is only present
    /// for [`CursorStatus::InProgress`].
    #[must_use]
    pub fn url_for(&self, cursor: &CursorStatus) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", &format!("collection:({})", self.collection));
            if let Some(token) = cursor.token() {
                pairs.append_pair("cursor", token);
            }
        }
        url
    }
}

/// Fetches listing pages over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: Client,
    query: SearchQuery,
}

impl HttpPageFetcher {
    /// Creates a fetcher with the default connect/read timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Network`] if the HTTP client cannot be built.
    pub fn new(query: SearchQuery) -> Result<Self, SearchError> {
        Self::with_timeouts(
            query,
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            Duration::from_secs(READ_TIMEOUT_SECS),
        )
    }

    /// Creates a fetcher with explicit timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Network`] if the HTTP client cannot be built.
    pub fn with_timeouts(
        query: SearchQuery,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, SearchError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .gzip(true)
            .user_agent(default_user_agent())
            .build()
            .map_err(|e| SearchError::network(query.endpoint.as_str(), e))?;
        Ok(Self { client, query })
    }

    /// The query this fetcher issues.
    #[must_use]
    pub fn query(&self) -> &SearchQuery {
        &self.query
    }
}

#[async_trait]
impl PageSource for HttpPageFetcher {
    #[instrument(level = "debug", skip(self), fields(collection = %self.query.collection))]
    async fn fetch_page(&self, cursor: &CursorStatus) -> Result<Page, SearchError> {
        if cursor.is_exhausted() {
            return Err(SearchError::Exhausted);
        }

        let url = self.query.url_for(cursor);
        debug!(url = %url, "fetching listing page");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SearchError::network(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::http_status(url.as_str(), status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SearchError::network(url.as_str(), e))?;
        let page = Page::parse(url.as_str(), &body)?;

        debug!(
            items = page.items.len(),
            total = ?page.total,
            last = page.is_last(),
            "decoded listing page"
        );
        Ok(page)
    }
}
