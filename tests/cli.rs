//! Exercises the `artifact_cache` binary against a pre-seeded cache.

use camino::Utf8PathBuf;
use std::fs;
use std::process::Command;

fn binary() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_artifact_cache"));
    command
        .env_remove("ARTIFACT_CACHE_NAMESPACE")
        .env_remove("ARTIFACT_CACHE_ARCHIVER")
        .env("RUST_LOG", "off");
    command
}

fn cache_dir() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 path");
    (temp, root)
}

#[test]
fn prints_cached_path_without_newline() {
    let (_temp, root) = cache_dir();
    let entry = root.join("appimage").join("appimage-9.1.0");
    fs::create_dir_all(&entry).expect("seed cache");

    let output = binary()
        .env("ARTIFACT_CACHE_DIR", root.as_str())
        .args([
            "download-artifact",
            "-n",
            "appimage-9.1.0",
            "-u",
            "https://example.com/appimage-9.1.0.7z",
        ])
        .output()
        .expect("run binary");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8(output.stdout).expect("utf8 stdout"), entry.as_str());
}

#[test]
fn malformed_node_token_fails_without_output() {
    let (_temp, root) = cache_dir();

    let output = binary()
        .env("ARTIFACT_CACHE_DIR", root.as_str())
        .args(["download-artifact", "--name", "node", "--url", "16"])
        .output()
        .expect("run binary");

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("<version>-<os>-<arch>"),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}
