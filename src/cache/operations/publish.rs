//! Moving unpacked results into their final cache location.
//!
//! Publishing is a single rename, so a reader never observes a partially
//! populated entry. A failed rename is expected when another process won the
//! race for the same entry and is reported as an outcome, not an error.

use camino::Utf8Path;
use std::fs;
use tracing::{debug, warn};

use super::lookup::TAR_SUFFIX;
use crate::cache::identity::PublishLayout;
use crate::cleanup_helpers::try_remove_dir_all;
use crate::observability::CACHE_TARGET;

/// What happened when the temp result was moved into place.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PublishOutcome {
    /// This process renamed its result into the final path.
    Published,
    /// The rename failed, most likely because a concurrent process published
    /// the same entry first. The temp result was discarded.
    AlreadyPresentFromConcurrentAgent,
}

/// Renames `temp_dir` (or, for [`PublishLayout::Nested`], the entry inside it
/// named after it) to `final_path`.
///
/// Leftover temp directories are removed on a best-effort basis.
pub fn publish(temp_dir: &Utf8Path, final_path: &Utf8Path, layout: PublishLayout) -> PublishOutcome {
    let source = match layout {
        PublishLayout::Direct => temp_dir.to_path_buf(),
        PublishLayout::Nested => temp_dir.join(temp_dir.file_name().unwrap_or_default()),
    };

    let outcome = match fs::rename(&source, final_path) {
        Ok(()) => {
            debug!(target: CACHE_TARGET, path = %final_path, "published");
            PublishOutcome::Published
        }
        Err(err) if occupied_by_unusable_entry(final_path) => {
            warn!(
                target: CACHE_TARGET,
                path = %final_path,
                temp_dir = %temp_dir,
                error = %err,
                "existing file at final location is not a usable cache entry; leaving it in place"
            );
            PublishOutcome::AlreadyPresentFromConcurrentAgent
        }
        Err(err) => {
            warn!(
                target: CACHE_TARGET,
                path = %final_path,
                temp_dir = %temp_dir,
                error = %err,
                "cannot move downloaded into final location (another process downloaded faster?)"
            );
            PublishOutcome::AlreadyPresentFromConcurrentAgent
        }
    };

    if layout == PublishLayout::Nested || outcome != PublishOutcome::Published {
        discard(temp_dir);
    }
    outcome
}

/// Whether `final_path` holds something [`lookup`](super::lookup()) would
/// never count as a hit.
fn occupied_by_unusable_entry(final_path: &Utf8Path) -> bool {
    fs::metadata(final_path)
        .is_ok_and(|metadata| !metadata.is_dir() && !final_path.as_str().ends_with(TAR_SUFFIX))
}

fn discard(temp_dir: &Utf8Path) {
    if let Err(err) = try_remove_dir_all(temp_dir.as_std_path()) {
        warn!(
            target: CACHE_TARGET,
            temp_dir = %temp_dir,
            error = %err,
            "failed to remove temporary unpack directory"
        );
    }
}
