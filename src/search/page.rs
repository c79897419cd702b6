//! Typed view of one search listing page.
//!
//! Pages are decoded by explicit field extraction: `identifier` is pulled out
//! of each item and every other field is carried verbatim in
//! [`Record::metadata`].

use serde_json::{Map, Value};

use super::error::SearchError;
use super::state::CursorStatus;
use crate::identifier::Identifier;

/// One collection item as listed by the search endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// The item identifier.
    pub identifier: Identifier,
    /// All other item fields, passed through unexamined.
    pub metadata: Map<String, Value>,
}

/// One decoded page of the search listing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    /// Items in listing order.
    pub items: Vec<Record>,
    /// Token for the following page; `None` on the last page.
    pub cursor: Option<String>,
    /// Total number of items the server reports for the query.
    pub total: Option<u64>,
    /// Number of items the server reports on this page.
    pub count: Option<u64>,
}

impl Page {
    /// Decodes a page from a response body.
    ///
    /// `url` is only used for error context.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Decode`] when the body is not a JSON object,
    /// `items` is missing or not an array, or an item lacks a string
    /// `identifier`.
    pub fn parse(url: &str, body: &[u8]) -> Result<Self, SearchError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| SearchError::decode(url, format!("invalid JSON: {e}")))?;
        let Value::Object(mut root) = value else {
            return Err(SearchError::decode(url, "top-level value is not an object"));
        };

        let items = match root.remove("items") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(SearchError::decode(url, "`items` is not an array")),
            None => return Err(SearchError::decode(url, "missing `items`")),
        };

        let items = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| record_from_value(url, index, item))
            .collect::<Result<Vec<_>, _>>()?;

        // An empty or null cursor means the same thing as no cursor at all.
        let cursor = match root.get("cursor") {
            Some(Value::String(token)) if !token.is_empty() => Some(token.clone()),
            Some(Value::String(_) | Value::Null) | None => None,
            Some(_) => return Err(SearchError::decode(url, "`cursor` is not a string")),
        };

        Ok(Self {
            items,
            cursor,
            total: root.get("total").and_then(Value::as_u64),
            count: root.get("count").and_then(Value::as_u64),
        })
    }

    /// Cursor status a traversal moves to after consuming this page.
    #[must_use]
    pub fn next_cursor(&self) -> CursorStatus {
        match &self.cursor {
            Some(token) => CursorStatus::InProgress(token.clone()),
            None => CursorStatus::Exhausted,
        }
    }

    /// Returns true when this page ends the traversal.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.cursor.is_none()
    }

    /// Iterates over item identifiers in listing order.
    pub fn identifiers(&self) -> impl Iterator<Item = &Identifier> {
        self.items.iter().map(|record| &record.identifier)
    }
}

fn record_from_value(url: &str, index: usize, item: Value) -> Result<Record, SearchError> {
    let Value::Object(mut fields) = item else {
        return Err(SearchError::decode(
            url,
            format!("item {index} is not an object"),
        ));
    };
    let identifier = match fields.remove("identifier") {
        Some(Value::String(id)) => Identifier::new(id),
        _ => {
            return Err(SearchError::decode(
                url,
                format!("item {index} has no string `identifier`"),
            ));
        }
    };
    Ok(Record {
        identifier,
        metadata: fields,
    })
}
