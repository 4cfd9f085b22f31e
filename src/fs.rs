//! Shared filesystem helpers.
//!
//! Unix builds route directory creation and permission changes through
//! `cap-std` handles opened on the canonical form of the nearest existing
//! ancestor, so symlinked cache roots resolve the way `std::fs` would; other
//! platforms fall back to `std::fs`.

use camino::Utf8Path;
#[cfg(unix)]
use camino::Utf8PathBuf;
#[cfg(unix)]
use color_eyre::eyre::eyre;
use color_eyre::eyre::{Context, Result};
use std::io::ErrorKind;

#[cfg(unix)]
use cap_std::{
    ambient_authority,
    fs::{Dir, Permissions, PermissionsExt},
};

/// Mode applied to binaries extracted from a stream.
pub(crate) const EXECUTABLE_MODE: u32 = 0o755;

/// Splits `path` into its nearest existing ancestor and the components below it
/// that still have to be created.
///
/// Relative paths are anchored at the current working directory.
#[cfg(unix)]
fn split_existing_ancestor(path: &Utf8Path) -> (Utf8PathBuf, Utf8PathBuf) {
    let mut ancestor = path;
    let mut missing = Vec::new();
    while !ancestor.as_str().is_empty() && std::fs::symlink_metadata(ancestor).is_err() {
        match (ancestor.parent(), ancestor.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                ancestor = parent;
            }
            _ => break,
        }
    }
    let existing = if ancestor.as_str().is_empty() {
        Utf8PathBuf::from(".")
    } else {
        ancestor.to_path_buf()
    };
    let remainder = missing.into_iter().rev().collect::<Utf8PathBuf>();
    (existing, remainder)
}

/// Opens an ambient directory handle on the canonical form of `path`.
#[cfg(unix)]
fn open_canonical_dir(path: &Utf8Path) -> std::io::Result<Dir> {
    let canonical = std::fs::canonicalize(path)?;
    Dir::open_ambient_dir(canonical, ambient_authority())
}

/// Ensures the provided path exists, creating intermediate directories when required.
///
/// A concurrent creator winning the race is not an error.
pub(crate) fn ensure_dir_exists(path: &Utf8Path) -> Result<()> {
    create_dir_all(path)
        .or_else(|err| {
            if err.kind() == ErrorKind::AlreadyExists {
                Ok(())
            } else {
                Err(err)
            }
        })
        .with_context(|| format!("create {path}"))
}

#[cfg(unix)]
fn create_dir_all(path: &Utf8Path) -> std::io::Result<()> {
    let (existing, remainder) = split_existing_ancestor(path);
    let dir = open_canonical_dir(&existing)?;
    if remainder.as_str().is_empty() {
        return Ok(());
    }
    dir.create_dir_all(remainder.as_std_path())
}

#[cfg(not(unix))]
fn create_dir_all(path: &Utf8Path) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}

/// Applies the provided POSIX mode to the given path.
#[cfg(unix)]
pub(crate) fn set_permissions(path: &Utf8Path, mode: u32) -> Result<()> {
    let canonical = std::fs::canonicalize(path)
        .map_err(color_eyre::Report::new)
        .and_then(|raw| {
            Utf8PathBuf::from_path_buf(raw)
                .map_err(|lossy| eyre!("non-UTF-8 path {}", lossy.display()))
        })
        .with_context(|| format!("resolve {path}"))?;
    let (Some(parent), Some(name)) = (canonical.parent(), canonical.file_name()) else {
        return Ok(());
    };

    let dir = Dir::open_ambient_dir(parent, ambient_authority())
        .with_context(|| format!("open {parent}"))?;
    dir.set_permissions(name, Permissions::from_mode(mode))
        .with_context(|| format!("chmod {path}"))
}

/// Permission bits are not meaningful here; the file only has to exist.
#[cfg(not(unix))]
pub(crate) fn set_permissions(path: &Utf8Path, _mode: u32) -> Result<()> {
    std::fs::metadata(path)
        .map(drop)
        .with_context(|| format!("stat {path}"))
}
