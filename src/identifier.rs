//! Collection item identifiers.
//!
//! An [`Identifier`] is the opaque name the remote archive assigns to one
//! item. It is the deduplication key during traversal and the filename stem
//! of the harvested descriptor, so it is kept as an immutable newtype rather
//! than a bare `String`.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, stable name of one collection item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Wraps a raw identifier string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when the identifier can be used as a single path component.
    ///
    /// Rejects empty values, `.`/`..`, path separators and NUL so a hostile
    /// listing cannot make a download escape the save directory.
    #[must_use]
    pub fn is_safe_file_stem(&self) -> bool {
        let value = self.0.as_str();
        !value.is_empty()
            && value != "."
            && value != ".."
            && !value.contains(['/', '\\', '\0'])
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}
