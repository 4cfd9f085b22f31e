//! Offline [`Downloader`] serving a local fixture file.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Barrier, Mutex, PoisonError};

use crate::download::{Downloader, sha512_base64};
use crate::error::{DownloadError, DownloadResult};

/// Copies a fixture to the destination and verifies it like the HTTP
/// downloader would, recording every request.
#[derive(Debug)]
pub struct FixtureDownloader {
    fixture: Utf8PathBuf,
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
    rendezvous: Option<Barrier>,
}

impl FixtureDownloader {
    /// Serves `fixture` for every URL.
    #[must_use]
    pub fn new(fixture: impl Into<Utf8PathBuf>) -> Self {
        Self {
            fixture: fixture.into(),
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
            rendezvous: None,
        }
    }

    /// Holds each download until `parties` downloads are in flight, which
    /// forces concurrent acquisitions to overlap.
    #[must_use]
    pub fn with_rendezvous(mut self, parties: usize) -> Self {
        self.rendezvous = Some(Barrier::new(parties));
        self
    }

    /// Returns the checksum that makes the fixture verify.
    ///
    /// # Panics
    ///
    /// Panics when the fixture cannot be read.
    #[must_use]
    pub fn checksum(&self) -> String {
        let bytes = fs::read(&self.fixture)
            .unwrap_or_else(|err| panic!("read fixture {}: {err}", self.fixture));
        sha512_base64(&bytes)
    }

    /// Number of downloads attempted so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// URLs requested so far, in order.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Downloader for FixtureDownloader {
    fn download(&self, url: &str, destination: &Utf8Path, checksum: &str) -> DownloadResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_owned());

        let bytes = fs::read(&self.fixture).map_err(|source| DownloadError::Io {
            path: self.fixture.clone(),
            source,
        })?;
        let actual = sha512_base64(&bytes);
        if !checksum.is_empty() && checksum != actual {
            return Err(DownloadError::ChecksumMismatch {
                url: url.to_owned(),
                expected: checksum.to_owned(),
                actual,
            });
        }

        fs::write(destination, &bytes).map_err(|source| DownloadError::Io {
            path: destination.to_path_buf(),
            source,
        })?;
        if let Some(barrier) = &self.rendezvous {
            barrier.wait();
        }
        Ok(())
    }
}
