//! Domain error types for the artifact cache.

use camino::Utf8PathBuf;
use color_eyre::Report;
use thiserror::Error;

/// Result alias for operations that may return an [`ArtifactError`].
pub type Result<T> = std::result::Result<T, ArtifactError>;

/// Result alias for download collaborator operations.
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Result alias for configuration fallible operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Categorises acquisition failures so callers can branch on structured errors.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum ArtifactErrorKind {
    /// Represents errors without a more specific semantic meaning.
    #[default]
    Other,
    /// The artifact is not available for the requested platform, or the
    /// request itself is malformed.
    Configuration,
    /// The local environment could not provide a usable cache location.
    Environment,
    /// The download collaborator failed to fetch or verify the artifact.
    Transport,
    /// The archiver could not be spawned or exited unsuccessfully.
    Extraction,
}

/// Captures acquisition failures together with their diagnostic context.
#[derive(Debug, Error)]
#[error("{report}")]
pub struct ArtifactError {
    kind: ArtifactErrorKind,
    #[source]
    report: Report,
}

impl ArtifactError {
    /// Constructs a new error with the provided kind and diagnostic report.
    #[must_use]
    pub const fn new(kind: ArtifactErrorKind, report: Report) -> Self {
        Self { kind, report }
    }

    /// Shorthand for a [`ArtifactErrorKind::Configuration`] error.
    #[must_use]
    pub const fn configuration(report: Report) -> Self {
        Self::new(ArtifactErrorKind::Configuration, report)
    }

    /// Shorthand for a [`ArtifactErrorKind::Environment`] error.
    #[must_use]
    pub const fn environment(report: Report) -> Self {
        Self::new(ArtifactErrorKind::Environment, report)
    }

    /// Shorthand for a [`ArtifactErrorKind::Extraction`] error.
    #[must_use]
    pub const fn extraction(report: Report) -> Self {
        Self::new(ArtifactErrorKind::Extraction, report)
    }

    /// Returns the semantic category for this failure.
    #[must_use]
    pub const fn kind(&self) -> ArtifactErrorKind {
        self.kind
    }

    /// Wraps the report with additional context whilst keeping the kind.
    #[must_use]
    pub fn wrap<C>(self, context: C) -> Self
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        Self::new(self.kind, self.report.wrap_err(context))
    }

    /// Extracts the underlying diagnostic report.
    #[must_use]
    pub fn into_report(self) -> Report {
        self.report
    }
}

impl From<Report> for ArtifactError {
    fn from(report: Report) -> Self {
        Self::new(ArtifactErrorKind::Other, report)
    }
}

impl From<ConfigError> for ArtifactError {
    fn from(err: ConfigError) -> Self {
        let ConfigError(report) = err;
        Self::configuration(report)
    }
}

impl From<DownloadError> for ArtifactError {
    fn from(err: DownloadError) -> Self {
        Self::new(ArtifactErrorKind::Transport, Report::new(err))
    }
}

/// Failures reported by a [`crate::Downloader`].
///
/// Checksum mismatches are kept distinct from transfer failures so they can
/// be logged differently, although acquisition treats both as fatal.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The fetched bytes did not hash to the expected checksum.
    #[error("checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Source URL of the artifact.
        url: String,
        /// Checksum supplied by the caller.
        expected: String,
        /// Checksum computed over the fetched bytes.
        actual: String,
    },
    /// The transfer itself failed (connection, HTTP status, body read).
    #[error("failed to download {url}: {message}")]
    Transfer {
        /// Source URL of the artifact.
        url: String,
        /// Human-readable cause.
        message: String,
    },
    /// The destination file could not be written.
    #[error("failed to write {path}")]
    Io {
        /// Destination path being written.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Captures configuration failures.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ConfigError(#[from] Report);
