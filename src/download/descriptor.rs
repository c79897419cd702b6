//! Where a descriptor comes from and where it lands.
//!
//! Both locations are derived from the identifier alone:
//! `{base}/download/{id}/{id}_archive.torrent` remotely and
//! `{save_dir}/{id}.torrent` locally.

use std::path::{Path, PathBuf};

use url::Url;

use super::constants::{DESCRIPTOR_EXTENSION, PARTIAL_SUFFIX};
use super::error::DownloadError;
use crate::identifier::Identifier;

/// Builds descriptor URLs from identifiers.
#[derive(Debug, Clone)]
pub struct DescriptorSource {
    base: Url,
}

impl DescriptorSource {
    /// Creates a source rooted at `base_url` (e.g. `https://archive.org`).
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidUrl`] if `base_url` is not an absolute
    /// URL that can carry path segments.
    pub fn new(base_url: &str) -> Result<Self, DownloadError> {
        let base = Url::parse(base_url).map_err(|_| DownloadError::invalid_url(base_url))?;
        if base.cannot_be_a_base() {
            return Err(DownloadError::invalid_url(base_url));
        }
        Ok(Self { base })
    }

    /// URL of the descriptor for `identifier`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidIdentifier`] for identifiers that are
    /// not a single safe path segment.
    pub fn url_for(&self, identifier: &Identifier) -> Result<Url, DownloadError> {
        if !identifier.is_safe_file_stem() {
            return Err(DownloadError::invalid_identifier(identifier.as_str()));
        }
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| DownloadError::invalid_url(self.base.as_str()))?
            .pop_if_empty()
            .push("download")
            .push(identifier.as_str())
            .push(&format!("{identifier}_archive.{DESCRIPTOR_EXTENSION}"));
        Ok(url)
    }
}

/// Local directory descriptors are written into.
#[derive(Debug, Clone)]
pub struct SaveDir {
    root: PathBuf,
}

impl SaveDir {
    /// Wraps an existing or to-be-created directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the directory (and parents) if it does not exist.
    ///
    /// Returns true when the directory had to be created.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Io`] if creation fails.
    pub fn ensure_exists(&self) -> Result<bool, DownloadError> {
        if self.root.is_dir() {
            return Ok(false);
        }
        std::fs::create_dir_all(&self.root).map_err(|e| DownloadError::io(&self.root, e))?;
        Ok(true)
    }

    /// Final path of the descriptor for `identifier`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidIdentifier`] for identifiers that would
    /// escape the directory.
    pub fn path_for(&self, identifier: &Identifier) -> Result<PathBuf, DownloadError> {
        if !identifier.is_safe_file_stem() {
            return Err(DownloadError::invalid_identifier(identifier.as_str()));
        }
        Ok(self
            .root
            .join(format!("{identifier}.{DESCRIPTOR_EXTENSION}")))
    }
}

/// Sibling path used while `path` is still being written.
#[must_use]
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_url_for_repeats_identifier() {
        let source = DescriptorSource::new("https://archive.org").unwrap();
        let url = source.url_for(&Identifier::from("78_blue-skies")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://archive.org/download/78_blue-skies/78_blue-skies_archive.torrent"
        );
    }

    #[test]
    fn test_url_for_respects_base_path() {
        let source = DescriptorSource::new("http://127.0.0.1:8080/mirror/").unwrap();
        let url = source.url_for(&Identifier::from("abc")).unwrap();
        assert_eq!(url.path(), "/mirror/download/abc/abc_archive.torrent");
    }

    #[test]
    fn test_url_for_encodes_unusual_characters() {
        let source = DescriptorSource::new("https://archive.org").unwrap();
        let url = source.url_for(&Identifier::from("a b#c")).unwrap();
        assert!(url.as_str().contains("a%20b%23c"), "{url}");
    }

    #[test]
    fn test_url_for_rejects_path_traversal() {
        let source = DescriptorSource::new("https://archive.org").unwrap();
        let err = source.url_for(&Identifier::from("../x")).unwrap_err();
        assert!(matches!(err, DownloadError::InvalidIdentifier { .. }));
    }

    #[test]
    fn test_source_rejects_non_base_url() {
        assert!(DescriptorSource::new("mailto:someone@example.com").is_err());
        assert!(DescriptorSource::new("not a url").is_err());
    }

    #[test]
    fn test_path_for_uses_identifier_as_stem() {
        let dir = SaveDir::new("/tmp/torrents");
        let path = dir.path_for(&Identifier::from("78_abc")).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/torrents/78_abc.torrent"));
    }

    #[test]
    fn test_path_for_rejects_separator() {
        let dir = SaveDir::new("/tmp/torrents");
        assert!(dir.path_for(&Identifier::from("a/b")).is_err());
    }

    #[test]
    fn test_partial_path_appends_suffix() {
        let partial = partial_path(Path::new("/tmp/torrents/78_abc.torrent"));
        assert_eq!(partial, PathBuf::from("/tmp/torrents/78_abc.torrent.part"));
    }

    #[test]
    fn test_ensure_exists_creates_once() {
        let temp = TempDir::new().unwrap();
        let dir = SaveDir::new(temp.path().join("out/nested"));
        assert!(dir.ensure_exists().unwrap());
        assert!(!dir.ensure_exists().unwrap());
        assert!(dir.root().is_dir());
    }
}
