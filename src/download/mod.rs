//! Download collaborator used to fetch archives into the cache.
//!
//! The cache only depends on the [`Downloader`] trait. [`HttpDownloader`] is
//! the production implementation; tests substitute fixtures.

mod http;

use camino::Utf8Path;

pub use http::{HttpDownloader, sha512_base64};

use crate::error::DownloadResult;

/// Fetches a URL into a local file, verifying its checksum.
pub trait Downloader {
    /// Downloads `url` to `destination`.
    ///
    /// An empty `checksum` skips verification. Otherwise the checksum is the
    /// base64-encoded SHA-512 digest of the expected bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ChecksumMismatch`](crate::DownloadError) when
    /// the bytes do not match, and
    /// [`DownloadError::Transfer`](crate::DownloadError) or
    /// [`DownloadError::Io`](crate::DownloadError) when they could not be
    /// fetched or stored. Implementations must not leave a mismatching file at
    /// `destination`.
    fn download(&self, url: &str, destination: &Utf8Path, checksum: &str) -> DownloadResult<()>;
}

impl<D: Downloader + ?Sized> Downloader for &D {
    fn download(&self, url: &str, destination: &Utf8Path, checksum: &str) -> DownloadResult<()> {
        (**self).download(url, destination, checksum)
    }
}
