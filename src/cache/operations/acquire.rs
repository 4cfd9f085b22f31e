//! Staged acquisition: download to a temp area, unpack, then publish.

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::{Report, WrapErr, eyre};
use tempfile::{Builder, TempDir};
use tracing::{debug, info, info_span, warn};

use super::lookup::{CacheLookupResult, lookup, lookup_file};
use super::publish::{PublishOutcome, publish};
use crate::cache::catalog::{ToolDescriptor, tool_request};
use crate::cache::config::CacheSettings;
use crate::cache::identity::{ArtifactRequest, normalize, url_basename};
use crate::cleanup_helpers::try_remove_file;
use crate::download::{Downloader, HttpDownloader};
use crate::error::{ArtifactError, Result};
use crate::fs::ensure_dir_exists;
use crate::observability::CACHE_TARGET;
use crate::unpack::{Archiver, UnpackStrategy};

const TEMP_PREFIX: &str = ".tmp-";
const SNAP_SUFFIX: &str = ".snap";

/// Where the returned path came from.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AcquisitionSource {
    /// The entry was already cached; nothing was downloaded.
    Cached,
    /// This call downloaded, unpacked and published the entry.
    Published,
    /// This call did the work but another process published first.
    ConcurrentAgent,
}

impl From<PublishOutcome> for AcquisitionSource {
    fn from(outcome: PublishOutcome) -> Self {
        match outcome {
            PublishOutcome::Published => Self::Published,
            PublishOutcome::AlreadyPresentFromConcurrentAgent => Self::ConcurrentAgent,
        }
    }
}

/// Final path of an acquired artifact plus how it got there.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Acquisition {
    /// Publish-once location of the artifact.
    pub path: Utf8PathBuf,
    /// Whether the entry was cached, published, or raced.
    pub source: AcquisitionSource,
}

/// Downloads and unpacks artifacts into a shared on-disk cache.
///
/// # Examples
///
/// ```no_run
/// use artifact_cache::{ArtifactCache, ArtifactRequest};
///
/// let cache = ArtifactCache::from_env()?;
/// let path = cache.download_artifact(&ArtifactRequest::new(
///     "winCodeSign-2.6.0",
///     "https://example.com/winCodeSign-2.6.0.7z",
///     "",
/// ))?;
/// println!("{path}");
/// # Ok::<(), artifact_cache::ArtifactError>(())
/// ```
#[derive(Debug)]
pub struct ArtifactCache<D = HttpDownloader> {
    settings: CacheSettings,
    archiver: Archiver,
    downloader: D,
}

impl ArtifactCache<HttpDownloader> {
    /// Builds a cache from the process environment with the HTTP downloader.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the environment cannot be parsed
    /// and a transport error when the HTTP client cannot be built.
    pub fn from_env() -> Result<Self> {
        let settings = CacheSettings::from_env()?;
        Ok(Self::new(settings, HttpDownloader::new()?))
    }
}

impl<D: Downloader> ArtifactCache<D> {
    /// Creates a cache over `settings` fetching through `downloader`.
    #[must_use]
    pub fn new(settings: CacheSettings, downloader: D) -> Self {
        let archiver = Archiver::new(settings.archiver.clone());
        Self {
            settings,
            archiver,
            downloader,
        }
    }

    /// Returns the settings this cache was built with.
    #[must_use]
    pub const fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Ensures the artifact is cached and returns its final path.
    ///
    /// # Errors
    ///
    /// See [`ArtifactCache::acquire`].
    pub fn download_artifact(&self, request: &ArtifactRequest) -> Result<Utf8PathBuf> {
        self.acquire(request).map(|acquisition| acquisition.path)
    }

    /// Ensures a catalogued tool is cached for the configured platform.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any download when the tool has
    /// no build for the platform, otherwise see [`ArtifactCache::acquire`].
    pub fn download_tool(&self, descriptor: &ToolDescriptor) -> Result<Utf8PathBuf> {
        let request = tool_request(descriptor, &self.settings.platform)?;
        self.download_artifact(&request)
    }

    /// Ensures the artifact is cached, reporting whether work was done.
    ///
    /// On a miss the archive is downloaded next to a fresh temp directory in
    /// the family directory, unpacked into it, and the result renamed into
    /// place. The returned path is valid even when another process published
    /// first.
    ///
    /// # Errors
    ///
    /// Returns an error when the request cannot be normalised, the cache
    /// cannot be inspected or created, the download or checksum fails, or
    /// the archiver fails. Nothing is published in those cases.
    pub fn acquire(&self, request: &ArtifactRequest) -> Result<Acquisition> {
        let artifact = normalize(request, &self.settings.platform)?;
        let cache_root = self.settings.cache_root()?;
        let entry = artifact.entry(&cache_root);

        let span = info_span!(target: CACHE_TARGET, "acquire", path = %entry.final_path);
        let _entered = span.enter();

        if let CacheLookupResult::Hit { path } = lookup(&entry.final_path)? {
            return Ok(Acquisition {
                path,
                source: AcquisitionSource::Cached,
            });
        }

        ensure_dir_exists(&entry.family_dir).map_err(ArtifactError::environment)?;
        info!(target: CACHE_TARGET, url = %artifact.url, "downloading");

        let staging = Staging::allocate(&entry.family_dir, artifact.strategy)?;
        self.downloader
            .download(&artifact.url, staging.archive(), &artifact.checksum)
            .map_err(|err| {
                ArtifactError::from(err).wrap(format!(
                    "failed to download {} to {}",
                    artifact.url,
                    staging.archive()
                ))
            })?;
        self.archiver.unpack(
            artifact.strategy,
            staging.archive(),
            staging.dir(),
            &entry.family_dir,
        )?;
        let temp_dir = staging.finish()?;

        let outcome = publish(&temp_dir, &entry.final_path, artifact.publish_layout());
        debug!(target: CACHE_TARGET, ?outcome, "downloaded");
        Ok(Acquisition {
            path: entry.final_path,
            source: outcome.into(),
        })
    }

    /// Ensures a single downloaded file is cached without unpacking it.
    ///
    /// The file is stored under `<cache root>[/<sub_dir>]/<URL basename>`.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL has no file name, the directory cannot
    /// be created, the download fails, or the temp file cannot be renamed.
    pub fn download_compressed_artifact(
        &self,
        sub_dir: &str,
        url: &str,
        checksum: &str,
    ) -> Result<Utf8PathBuf> {
        let file_name = url_basename(url);
        if file_name.is_empty() {
            return Err(ArtifactError::configuration(eyre!(
                "cannot derive a file name from {url:?}"
            )));
        }

        let mut cache_dir = self.settings.cache_root()?;
        if !sub_dir.is_empty() {
            cache_dir.push(sub_dir);
        }
        let file_path = cache_dir.join(file_name);

        if let CacheLookupResult::Hit { path } = lookup_file(&file_path)? {
            return Ok(path);
        }

        ensure_dir_exists(&cache_dir).map_err(ArtifactError::environment)?;
        let temp_file = Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(SNAP_SUFFIX)
            .tempfile_in(&cache_dir)
            .wrap_err_with(|| format!("failed to create temp file in {cache_dir}"))
            .map_err(ArtifactError::environment)?
            .into_temp_path();
        let temp_path = utf8(temp_file.to_path_buf())?;

        info!(target: CACHE_TARGET, file = %file_path, url, "downloading");
        self.downloader
            .download(url, &temp_path, checksum)
            .map_err(|err| {
                ArtifactError::from(err).wrap(format!("failed to download {url} to {temp_path}"))
            })?;

        temp_file
            .persist(&file_path)
            .map_err(|err| Report::new(err.error))
            .wrap_err_with(|| format!("failed to move {temp_path} to {file_path}"))?;
        debug!(target: CACHE_TARGET, file = %file_path, "downloaded");
        Ok(file_path)
    }
}

/// Temp unpack directory plus its sibling archive path.
///
/// Dropping the value before [`Staging::finish`] removes both, so failed
/// acquisitions leave nothing behind in the family directory.
struct Staging {
    dir: Option<TempDir>,
    dir_path: Utf8PathBuf,
    archive: Utf8PathBuf,
}

impl Staging {
    fn allocate(family_dir: &Utf8Path, strategy: UnpackStrategy) -> Result<Self> {
        let dir = Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir_in(family_dir)
            .wrap_err_with(|| format!("failed to create temp directory in {family_dir}"))
            .map_err(ArtifactError::environment)?;
        let dir_path = utf8(dir.path().to_path_buf())?;
        let archive = Utf8PathBuf::from(format!("{dir_path}{}", strategy.archive_suffix()));
        Ok(Self {
            dir: Some(dir),
            dir_path,
            archive,
        })
    }

    fn dir(&self) -> &Utf8Path {
        &self.dir_path
    }

    fn archive(&self) -> &Utf8Path {
        &self.archive
    }

    /// Deletes the consumed archive and hands over the populated directory.
    fn finish(mut self) -> Result<Utf8PathBuf> {
        try_remove_file(self.archive.as_std_path())
            .wrap_err_with(|| format!("failed to remove {}", self.archive))?;
        if let Some(dir) = self.dir.take() {
            let _kept = dir.keep();
        }
        Ok(self.dir_path.clone())
    }
}

impl Drop for Staging {
    fn drop(&mut self) {
        if self.dir.is_none() {
            return;
        }
        if let Err(err) = try_remove_file(self.archive.as_std_path()) {
            warn!(
                target: CACHE_TARGET,
                archive = %self.archive,
                error = %err,
                "failed to remove abandoned archive"
            );
        }
    }
}

fn utf8(path: std::path::PathBuf) -> Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).map_err(|raw| {
        ArtifactError::environment(eyre!("temp path is not valid UTF-8: {}", raw.display()))
    })
}
