//! Archive unpacking through an external `7za`-compatible archiver.
//!
//! Two strategies are supported:
//!
//! - [`UnpackStrategy::Extract`] runs the archiver once to extract a whole
//!   archive into the target directory.
//! - [`UnpackStrategy::StreamingBinary`] decompresses a `.tar.xz` archive in
//!   one archiver process and pipes the tar stream into a second process that
//!   extracts a single binary, mirroring `xz -dc archive | tar -x path`.

mod extract;
mod output;
mod stream;

use camino::Utf8Path;
use tracing::{debug, info_span};

pub use stream::StreamCoupling;

use crate::error::Result;
use crate::observability::UNPACK_TARGET;

/// Binary extracted from a streamed tarball.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct StreamingTarget {
    /// Recursive archive path pattern selecting the entry.
    pub entry_pattern: &'static str,
    /// File name the entry is extracted as.
    pub binary_name: &'static str,
}

/// The `node` executable inside an official Node.js distribution tarball.
pub const NODE_BINARY: StreamingTarget = StreamingTarget {
    entry_pattern: "*/bin/node",
    binary_name: "node",
};

/// How a downloaded archive is turned into the contents of the temp directory.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum UnpackStrategy {
    /// Extract the whole archive with a single archiver invocation.
    Extract,
    /// Stream-decompress a `.tar.xz` and keep only one executable.
    StreamingBinary(StreamingTarget),
}

impl UnpackStrategy {
    /// Suffix appended to the temp directory path to name the downloaded archive.
    #[must_use]
    pub const fn archive_suffix(self) -> &'static str {
        match self {
            Self::Extract => ".7z",
            Self::StreamingBinary(_) => ".tar.xz",
        }
    }
}

/// Handle on the external archiver program.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Archiver {
    program: String,
}

impl Archiver {
    /// Wraps the program name or path; bare names are resolved through `PATH`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Returns the configured program.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Unpacks `archive` into `target` with the given strategy.
    ///
    /// `working_dir` is the directory the single-process extraction runs in.
    ///
    /// # Errors
    ///
    /// Returns an [`ArtifactErrorKind::Extraction`](crate::ArtifactErrorKind)
    /// error when any archiver process cannot be spawned or exits
    /// unsuccessfully.
    pub fn unpack(
        &self,
        strategy: UnpackStrategy,
        archive: &Utf8Path,
        target: &Utf8Path,
        working_dir: &Utf8Path,
    ) -> Result<()> {
        let span = info_span!(
            target: UNPACK_TARGET,
            "unpack",
            archive = %archive,
            target = %target,
            streaming = matches!(strategy, UnpackStrategy::StreamingBinary(_))
        );
        let _entered = span.enter();
        match strategy {
            UnpackStrategy::Extract => extract::run(self, archive, target, working_dir),
            UnpackStrategy::StreamingBinary(binary) => {
                let path = stream::run(self, archive, target, binary)?;
                debug!(target: UNPACK_TARGET, binary = %path, "extracted streamed binary");
                Ok(())
            }
        }
    }
}
