//! Cache hit/miss detection.
//!
//! Entries are trusted on sight: a hit is never re-verified against its
//! checksum because only fully verified and unpacked results are ever
//! renamed into place.

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::Report;
use std::fs;
use std::io::ErrorKind;
use tracing::debug;

use crate::error::{ArtifactError, Result};
use crate::observability::CACHE_TARGET;

/// Suffix of single-file entries that count as complete.
pub(crate) const TAR_SUFFIX: &str = ".tar";

/// Result of a cache lookup operation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CacheLookupResult {
    /// The entry exists and can be used as-is.
    Hit {
        /// Path to the cached entry.
        path: Utf8PathBuf,
    },
    /// The entry must be acquired.
    Miss,
}

impl CacheLookupResult {
    /// Returns `true` for [`CacheLookupResult::Hit`].
    #[must_use]
    pub const fn is_hit(&self) -> bool {
        matches!(self, Self::Hit { .. })
    }
}

/// Checks whether an unpacked artifact is already published at `final_path`.
///
/// A directory is a hit, as is a file whose name ends in `.tar` (archives
/// wrapping a single tarball publish that tarball directly).
///
/// # Errors
///
/// Returns an [`ArtifactErrorKind::Environment`](crate::ArtifactErrorKind)
/// error when the path exists but cannot be inspected.
///
/// # Examples
///
/// ```
/// use artifact_cache::cache::{CacheLookupResult, lookup};
/// use camino::Utf8Path;
///
/// let result = lookup(Utf8Path::new("/nonexistent/zstd/zstd"))?;
/// assert_eq!(result, CacheLookupResult::Miss);
/// # Ok::<(), artifact_cache::ArtifactError>(())
/// ```
pub fn lookup(final_path: &Utf8Path) -> Result<CacheLookupResult> {
    check(final_path, |metadata| {
        metadata.is_dir() || final_path.as_str().ends_with(TAR_SUFFIX)
    })
}

/// Checks whether a single downloaded file is already cached at `path`.
///
/// # Errors
///
/// See [`lookup`].
pub fn lookup_file(path: &Utf8Path) -> Result<CacheLookupResult> {
    check(path, |_| true)
}

fn check<F>(path: &Utf8Path, usable: F) -> Result<CacheLookupResult>
where
    F: FnOnce(&fs::Metadata) -> bool,
{
    match fs::metadata(path) {
        Ok(metadata) if usable(&metadata) => {
            debug!(target: CACHE_TARGET, path = %path, "found existing");
            Ok(CacheLookupResult::Hit {
                path: path.to_path_buf(),
            })
        }
        Ok(_) => {
            debug!(target: CACHE_TARGET, path = %path, "existing entry is not usable");
            Ok(CacheLookupResult::Miss)
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(target: CACHE_TARGET, path = %path, "cache miss");
            Ok(CacheLookupResult::Miss)
        }
        Err(err) => Err(ArtifactError::environment(
            Report::new(err).wrap_err(format!("error during cache check for path {path}")),
        )),
    }
}
