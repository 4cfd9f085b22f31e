//! Blocking HTTP downloader with streaming SHA-512 verification.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use camino::{Utf8Path, Utf8PathBuf};
use reqwest::blocking::Client;
use sha2::{Digest, Sha512};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use tracing::{debug, info, warn};

use super::Downloader;
use crate::cleanup_helpers::try_remove_file;
use crate::error::{DownloadError, DownloadResult};
use crate::observability::DOWNLOAD_TARGET;

const CHUNK_SIZE: usize = 64 * 1024;

/// Downloads over HTTP(S) with a shared blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    /// Builds a downloader with a crate-specific user agent.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Transfer`] when the TLS backend cannot be
    /// initialised.
    pub fn new() -> DownloadResult<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| DownloadError::Transfer {
                url: String::new(),
                message: format!("failed to build HTTP client: {err}"),
            })?;
        Ok(Self { client })
    }

    fn fetch(&self, url: &str, destination: &Utf8Path) -> DownloadResult<String> {
        let mut response = self
            .client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|err| transfer_error(url, &err))?;

        let file = File::create(destination).map_err(|source| io_error(destination, source))?;
        let mut writer = BufWriter::new(file);
        let mut hasher = Sha512::new();
        let mut buffer = vec![0_u8; CHUNK_SIZE];
        loop {
            let read = response
                .read(&mut buffer)
                .map_err(|err| transfer_error(url, &err))?;
            let Some(chunk) = buffer.get(..read).filter(|chunk| !chunk.is_empty()) else {
                break;
            };
            hasher.update(chunk);
            writer
                .write_all(chunk)
                .map_err(|source| io_error(destination, source))?;
        }
        writer
            .flush()
            .map_err(|source| io_error(destination, source))?;
        Ok(STANDARD.encode(hasher.finalize()))
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, destination: &Utf8Path, checksum: &str) -> DownloadResult<()> {
        info!(target: DOWNLOAD_TARGET, url, path = %destination, "downloading");
        let verified = self
            .fetch(url, destination)
            .and_then(|actual| verify_checksum(url, checksum, actual));
        if verified.is_err() {
            discard_partial(destination);
        }
        verified?;
        debug!(target: DOWNLOAD_TARGET, url, path = %destination, "downloaded");
        Ok(())
    }
}

/// Returns the base64-encoded SHA-512 digest of `bytes`, the checksum format
/// accepted by [`Downloader::download`].
#[must_use]
pub fn sha512_base64(bytes: &[u8]) -> String {
    STANDARD.encode(Sha512::digest(bytes))
}

fn verify_checksum(url: &str, expected: &str, actual: String) -> DownloadResult<()> {
    let trimmed = expected.trim();
    if trimmed.is_empty() || trimmed == actual {
        return Ok(());
    }
    Err(DownloadError::ChecksumMismatch {
        url: url.to_owned(),
        expected: trimmed.to_owned(),
        actual,
    })
}

fn discard_partial(destination: &Utf8Path) {
    if let Err(err) = try_remove_file(destination.as_std_path()) {
        warn!(
            target: DOWNLOAD_TARGET,
            path = %destination,
            error = %err,
            "failed to remove rejected download"
        );
    }
}

fn transfer_error(url: &str, err: &dyn std::fmt::Display) -> DownloadError {
    DownloadError::Transfer {
        url: url.to_owned(),
        message: err.to_string(),
    }
}

fn io_error(path: &Utf8Path, source: std::io::Error) -> DownloadError {
    DownloadError::Io {
        path: Utf8PathBuf::from(path),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_checksum_skips_verification() {
        assert!(verify_checksum("https://example.com/a", "", "anything".to_owned()).is_ok());
        assert!(verify_checksum("https://example.com/a", "  ", "anything".to_owned()).is_ok());
    }

    #[test]
    fn matching_checksum_passes() {
        let digest = sha512_base64(b"payload");
        assert!(verify_checksum("https://example.com/a", &digest, digest.clone()).is_ok());
    }

    #[test]
    fn mismatch_reports_both_digests() {
        let err = verify_checksum(
            "https://example.com/a",
            &sha512_base64(b"expected"),
            sha512_base64(b"actual"),
        )
        .expect_err("digests differ");
        match err {
            DownloadError::ChecksumMismatch {
                url,
                expected,
                actual,
            } => {
                assert_eq!(url, "https://example.com/a");
                assert_eq!(expected, sha512_base64(b"expected"));
                assert_eq!(actual, sha512_base64(b"actual"));
            }
            other => panic!("expected checksum mismatch, got {other:?}"),
        }
    }

    #[test]
    fn sha512_base64_matches_known_digest() {
        assert_eq!(
            sha512_base64(b""),
            "z4PhNX7vuL3xVChQ1m2AB9Yg5AULVxXcg/SpIdNs6c5H0NE8XYXysP+DGNKHfuwvY7kxvUdBeoGlODJ6+SfaPg=="
        );
    }

    #[test]
    fn unreachable_host_is_a_transfer_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let destination =
            Utf8PathBuf::from_path_buf(temp.path().join("archive.7z")).expect("utf8 path");
        let downloader = HttpDownloader::new().expect("client");

        let err = downloader
            .download("http://127.0.0.1:9/archive.7z", &destination, "")
            .expect_err("nothing listens on the discard port");
        assert!(matches!(err, DownloadError::Transfer { .. }), "got {err:?}");
        assert!(!destination.exists());
    }
}
