//! Shared tracing targets.
//!
//! Centralises the log targets used by the crate so subscribers can filter
//! cache, unpack and download events without pulling in unrelated logs.

/// Target used by cache resolution, lookup and publish events.
pub(crate) const CACHE_TARGET: &str = "artifact_cache::cache";

/// Target used by archiver invocations.
pub(crate) const UNPACK_TARGET: &str = "artifact_cache::unpack";

/// Target used by the HTTP download collaborator.
pub(crate) const DOWNLOAD_TARGET: &str = "artifact_cache::download";
