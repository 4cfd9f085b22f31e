//! Guarded removal helpers for temporary working areas.

use std::io::ErrorKind;
use std::path::{Component, Path};

/// Records the outcome of a guarded removal attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum RemovalOutcome {
    Removed,
    Missing,
}

/// Checks whether a path contains any parent-directory (`..`) components.
pub(crate) fn has_parent_dir(path: &Path) -> bool {
    path.components()
        .any(|component| matches!(component, Component::ParentDir))
}

/// Attempts to remove a directory tree, rejecting unsafe paths before deletion.
pub(crate) fn try_remove_dir_all(path: &Path) -> Result<RemovalOutcome, std::io::Error> {
    guard_removal_path(path)?;
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(RemovalOutcome::Removed),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(RemovalOutcome::Missing),
        Err(err) => Err(err),
    }
}

/// Removes a single file, treating an already-missing file as success.
pub(crate) fn try_remove_file(path: &Path) -> Result<RemovalOutcome, std::io::Error> {
    guard_removal_path(path)?;
    match std::fs::remove_file(path) {
        Ok(()) => Ok(RemovalOutcome::Removed),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(RemovalOutcome::Missing),
        Err(err) => Err(err),
    }
}

fn guard_removal_path(path: &Path) -> Result<(), std::io::Error> {
    if is_empty_or_root(path) || has_parent_dir(path) {
        return Err(std::io::Error::new(
            ErrorKind::InvalidInput,
            format!("refuse to remove unsafe path {}", path.display()),
        ));
    }
    Ok(())
}

fn is_empty_or_root(path: &Path) -> bool {
    let mut components = path.components();
    match components.next() {
        None => true,
        Some(Component::CurDir | Component::RootDir) => components.next().is_none(),
        Some(Component::Prefix(_)) => match components.next() {
            None => true,
            Some(Component::RootDir) => components.next().is_none(),
            _ => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    #[case("")]
    #[case("/")]
    #[case(".")]
    #[case("/tmp/../etc")]
    fn rejects_unsafe_paths(#[case] raw: &str) {
        let err = try_remove_dir_all(Path::new(raw)).expect_err("unsafe path must be rejected");
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let temp = tempdir().expect("tempdir");
        let outcome = try_remove_file(&temp.path().join("gone.7z")).expect("remove");
        assert_eq!(outcome, RemovalOutcome::Missing);
    }

    #[test]
    fn removes_nested_tree() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("outer");
        std::fs::create_dir_all(root.join("inner/deeper")).expect("create tree");
        std::fs::write(root.join("inner/file"), b"x").expect("write file");

        let outcome = try_remove_dir_all(&root).expect("remove");
        assert_eq!(outcome, RemovalOutcome::Removed);
        assert!(!root.exists());
    }
}
