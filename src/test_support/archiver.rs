//! A shell stand-in for `7za` and tarball fixtures for unpack tests.
//!
//! The fake understands exactly the three invocations the cache issues:
//!
//! - `x -bd <archive> -o<dir>` extracts a tarball, or copies any other file
//!   into `<dir>` named after the archive without its `.7z` suffix (which is
//!   how `7za` unpacks a single compressed stream)
//! - `e -bd -txz <archive> -so` writes the archive to stdout unchanged, so
//!   fixtures are plain tarballs standing in for `.tar.xz`
//! - `e -bd -ttar -o<dir> <pattern> -r -si` reads a tarball from stdin and
//!   moves the first file matching `<pattern>` into `<dir>`

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use std::process::Command;
use std::sync::OnceLock;

const FAKE_ARCHIVER: &str = r#"#!/bin/sh
set -eu
mode="$1"
case "$mode" in
  x)
    archive="$3"
    target="${4#-o}"
    mkdir -p "$target"
    if tar -tf "$archive" >/dev/null 2>&1; then
      tar -xf "$archive" -C "$target"
    else
      cp "$archive" "$target/$(basename "$archive" .7z)"
    fi
    ;;
  e)
    case "$3" in
      -txz)
        cat "$4"
        ;;
      -ttar)
        target="${4#-o}"
        pattern="$5"
        scratch="$(mktemp -d)"
        trap 'rm -rf "$scratch"' EXIT
        tar -xf - -C "$scratch"
        found="$(find "$scratch" -type f -path "$pattern" | head -n 1)"
        if [ -z "$found" ]; then
          echo "no files matching $pattern" >&2
          exit 2
        fi
        mkdir -p "$target"
        mv "$found" "$target/$(basename "$found")"
        ;;
      *)
        echo "unsupported type $3" >&2
        exit 7
        ;;
    esac
    ;;
  *)
    echo "unsupported command $mode" >&2
    exit 7
    ;;
esac
"#;

/// Writes the fake archiver into `dir` and returns its path.
///
/// # Errors
///
/// Returns an error when the script cannot be written or made executable.
pub fn write_fake_archiver(dir: &Utf8Path) -> io::Result<Utf8PathBuf> {
    let path = dir.join("fake-7za");
    fs::write(&path, FAKE_ARCHIVER)?;
    make_executable(&path)?;
    Ok(path)
}

/// Returns a fake archiver shared by every test in the process.
///
/// The script is written once so concurrently spawning tests never execute
/// a file another thread still has open for writing.
///
/// # Panics
///
/// Panics when the script cannot be written.
#[must_use]
pub fn shared_fake_archiver() -> &'static Utf8Path {
    static ARCHIVER: OnceLock<Utf8PathBuf> = OnceLock::new();
    ARCHIVER.get_or_init(|| {
        let raw_dir = tempfile::Builder::new()
            .prefix("fake-archiver-")
            .tempdir()
            .unwrap_or_else(|err| panic!("create fake archiver dir: {err}"))
            .keep();
        let dir = Utf8PathBuf::from_path_buf(raw_dir)
            .unwrap_or_else(|raw| panic!("non-UTF-8 temp dir: {}", raw.display()));
        write_fake_archiver(&dir).unwrap_or_else(|err| panic!("write fake archiver: {err}"))
    })
}

/// Packs `entries` (relative path, contents) into an uncompressed tarball at
/// `archive` using the system `tar`.
///
/// # Errors
///
/// Returns an error when the staging files cannot be written or `tar` fails.
pub fn build_tar(archive: &Utf8Path, entries: &[(&str, &[u8])]) -> io::Result<()> {
    let staging = tempfile::tempdir()?;
    for (relative, contents) in entries {
        let path = staging.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
    }

    let status = Command::new("tar")
        .arg("-cf")
        .arg(archive)
        .arg("-C")
        .arg(staging.path())
        .arg(".")
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("tar exited with {status}")))
    }
}

#[cfg(unix)]
fn make_executable(path: &Utf8Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Utf8Path) -> io::Result<()> {
    Ok(())
}
