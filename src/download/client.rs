//! HTTP client wrapper for streaming descriptors to disk.
//!
//! Bodies are streamed into a `.part` sibling of the destination and renamed
//! into place only after the last byte is flushed and synced, so the final
//! path never holds a truncated file.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::descriptor::partial_path;
use super::error::DownloadError;
use crate::user_agent::default_user_agent;

/// HTTP client for descriptor downloads.
///
/// Create once and clone freely; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with the default timeouts (30s connect, 5min read).
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Client`] if the underlying client cannot be
    /// built (e.g. TLS backend initialisation failure).
    pub fn new() -> Result<Self, DownloadError> {
        Self::with_timeouts(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            Duration::from_secs(READ_TIMEOUT_SECS),
        )
    }

    /// Creates a client with explicit timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Client`] if the underlying client cannot be built.
    #[instrument(level = "debug")]
    pub fn with_timeouts(
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .gzip(true)
            .user_agent(default_user_agent())
            .build()
            .map_err(|source| DownloadError::Client { source })?;
        Ok(Self { client })
    }

    /// Downloads `url` to `dest`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] if the request fails, the server answers with
    /// a non-success status, the body is shorter than its advertised length,
    /// or the file cannot be written. On error no file is left at `dest`.
    #[instrument(skip(self), fields(url = %url, dest = %dest.display()))]
    pub async fn download_to_path(&self, url: &Url, dest: &Path) -> Result<u64, DownloadError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| DownloadError::network(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url.as_str(), status.as_u16()));
        }
        let content_length = response.content_length();

        let part = partial_path(dest);
        let mut file = File::create(&part)
            .await
            .map_err(|e| DownloadError::io(&part, e))?;

        let written = match stream_to_file(&mut file, response, url, &part).await {
            Ok(written) => written,
            Err(e) => {
                drop(file);
                debug!(path = %part.display(), "cleaning up partial file after error");
                let _ = tokio::fs::remove_file(&part).await;
                return Err(e);
            }
        };
        drop(file);

        if let Some(expected) = content_length
            && expected != written
        {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(DownloadError::integrity(dest, expected, written));
        }

        if let Err(e) = tokio::fs::rename(&part, dest).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(DownloadError::io(dest, e));
        }

        debug!(bytes = written, "descriptor written");
        Ok(written)
    }
}

/// Streams the response body to `file`, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &Url,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(&mut *file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url.as_str(), e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;
    drop(writer);
    file.sync_all()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn test_download_writes_body_and_removes_part() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/d/a.torrent"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"d8:announce".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("a.torrent");
        let url = Url::parse(&format!("{}/d/a.torrent", server.uri())).unwrap();

        let written = HttpClient::new()
            .unwrap()
            .download_to_path(&url, &dest)
            .await
            .unwrap();

        assert_eq!(written, 11);
        assert_eq!(std::fs::read(&dest).unwrap(), b"d8:announce");
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_download_error_status_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("b.torrent");
        let url = Url::parse(&format!("{}/d/b.torrent", server.uri())).unwrap();

        let err = HttpClient::new()
            .unwrap()
            .download_to_path(&url, &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::HttpStatus { status: 503, .. }));
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_download_into_missing_directory_is_io_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("missing/c.torrent");
        let url = Url::parse(&format!("{}/c", server.uri())).unwrap();

        let err = HttpClient::new()
            .unwrap()
            .download_to_path(&url, &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Io { .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("d.torrent");
        // Port 9 (discard) is closed on test hosts.
        let url = Url::parse("http://127.0.0.1:9/d.torrent").unwrap();

        let client =
            HttpClient::with_timeouts(Duration::from_secs(2), Duration::from_secs(2)).unwrap();
        let err = client.download_to_path(&url, &dest).await.unwrap_err();
        assert!(matches!(
            err,
            DownloadError::Network { .. } | DownloadError::Timeout { .. }
        ));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_failed_rename_removes_part_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"torrent".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        // A non-empty directory at the destination makes the final rename fail.
        let dest = dir.path().join("e.torrent");
        std::fs::create_dir(&dest).unwrap();
        std::fs::write(dest.join("keep"), b"x").unwrap();
        let url = Url::parse(&format!("{}/e", server.uri())).unwrap();

        let err = HttpClient::new()
            .unwrap()
            .download_to_path(&url, &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Io { .. }));
        assert!(!partial_path(&dest).exists());
        assert!(dest.join("keep").exists());
    }
}
