//! Shared on-disk cache of downloaded and unpacked artifacts.
//!
//! Artifacts are grouped by family under a per-user cache root and published
//! once with an atomic rename. Any number of processes may acquire the same
//! artifact concurrently; the loser of a race discards its own result and
//! uses the winner's.
//!
//! # Cache Location
//!
//! The cache root is resolved in the following order:
//!
//! 1. `ARTIFACT_CACHE_DIR` environment variable if set
//! 2. `~/Library/Caches/<namespace>` on macOS
//! 3. `%LOCALAPPDATA%\<namespace>\cache` on Windows, or the system temp
//!    directory when running under the `SYSTEM` profile
//! 4. `~/.cache/<namespace>` as fallback
//!
//! # Layout
//!
//! ```text
//! <cache root>/
//!   zstd/
//!     zstd-1.3.4-linux-x64/        published entry
//!     .tmp-a1b2c3/                 in-flight unpack (removed on failure)
//!     .tmp-a1b2c3.7z               in-flight download
//! ```

mod catalog;
mod config;
mod identity;
mod operations;
mod platform;

pub use catalog::{DEFAULT_TOOL_REPOSITORY, ToolDescriptor, ZSTD, fpm_request, tool_request};
pub use config::{CacheSettings, DEFAULT_ARCHIVER, DEFAULT_NAMESPACE, resolve_cache_root};
pub use identity::{
    ArtifactRequest, CacheEntry, NODE_ARTIFACT, NormalizedArtifact, PublishLayout, family_of,
    normalize,
};
pub use operations::{
    Acquisition, AcquisitionSource, ArtifactCache, CacheLookupResult, PublishOutcome, lookup,
    lookup_file, publish,
};
pub use platform::{HostOs, Platform};
