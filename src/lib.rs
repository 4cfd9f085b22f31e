//! Downloads, verifies, and unpacks third-party tool archives into a shared
//! per-user cache.
//!
//! Each artifact is fetched at most once per machine: the first acquisition
//! downloads the archive next to a temporary directory, unpacks it with an
//! external `7za`-compatible archiver, and renames the result into place.
//! Later acquisitions, in this or any other process, find the published entry
//! and return its path immediately.

pub mod cache;
mod cleanup_helpers;
mod cli;
pub mod download;
mod error;
mod fs;
mod observability;
#[doc(hidden)]
pub mod test_support;
pub mod unpack;

pub use cache::{
    Acquisition, AcquisitionSource, ArtifactCache, ArtifactRequest, CacheSettings, HostOs,
    Platform, ToolDescriptor,
};
pub use cli::{Cli, Command, run, run_with};
pub use download::{Downloader, HttpDownloader};
pub use error::{
    ArtifactError, ArtifactErrorKind, ConfigError, ConfigResult, DownloadError, DownloadResult,
    Result,
};

use camino::Utf8PathBuf;
use color_eyre::eyre::eyre;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;

/// Captures cache settings supplied via environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, OrthoConfig, Default)]
#[ortho_config(prefix = "ARTIFACT_CACHE")]
///
/// # Examples
/// ```
/// use artifact_cache::ArtifactEnvCfg;
///
/// let cfg = ArtifactEnvCfg::default();
/// assert!(cfg.dir.is_none());
/// ```
pub struct ArtifactEnvCfg {
    /// Cache root used verbatim instead of the per-user default.
    pub dir: Option<Utf8PathBuf>,
    /// Archiver program name or path.
    pub archiver: Option<String>,
    /// Directory name of the cache under the per-user cache location.
    pub namespace: Option<String>,
}

impl ArtifactEnvCfg {
    /// Loads configuration from environment variables without parsing CLI arguments.
    ///
    /// # Errors
    /// Returns an error when a variable cannot be parsed into its field.
    pub fn load() -> ConfigResult<Self> {
        let args = [OsString::from("artifact-cache")];
        Self::load_from_iter(args).map_err(|err| ConfigError::from(eyre!(err)))
    }
}
