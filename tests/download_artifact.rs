//! Acquires artifacts end to end through the public API.
//!
//! Downloads are served from local fixtures and unpacking goes through the
//! shell stand-in for `7za`, so these tests need neither network access nor
//! a real archiver.
#![cfg(unix)]

use artifact_cache::cache::{CacheLookupResult, lookup};
use artifact_cache::test_support::{FixtureDownloader, build_tar, shared_fake_archiver};
use artifact_cache::{
    AcquisitionSource, ArtifactCache, ArtifactErrorKind, ArtifactRequest, CacheSettings, HostOs,
    Platform,
};
use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use std::fs;
use tempfile::TempDir;

struct Sandbox {
    _temp: TempDir,
    cache_root: Utf8PathBuf,
    fixture: Utf8PathBuf,
}

#[fixture]
fn sandbox() -> Sandbox {
    let temp = tempfile::tempdir().expect("tempdir");
    let base = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 path");
    let fixture = base.join("winCodeSign.tar");
    build_tar(
        &fixture,
        &[
            ("linux/ar", b"#!/bin/sh\n"),
            ("windows-10/x64/signtool.exe", b"MZ"),
        ],
    )
    .expect("build fixture");
    Sandbox {
        _temp: temp,
        cache_root: base.join("cache"),
        fixture,
    }
}

fn settings(sandbox: &Sandbox) -> CacheSettings {
    CacheSettings::with_dir(sandbox.cache_root.clone())
        .with_archiver(shared_fake_archiver().as_str())
        .with_platform(Platform::new(HostOs::Linux, "x86_64"))
}

#[rstest]
fn artifact_is_downloaded_once_and_reused(sandbox: Sandbox) {
    let downloader = FixtureDownloader::new(sandbox.fixture.clone());
    let request = ArtifactRequest::new(
        "winCodeSign-2.6.0",
        "https://github.com/electron-userland/electron-builder-binaries/releases/download/winCodeSign-2.6.0/winCodeSign-2.6.0.7z",
        downloader.checksum(),
    );
    let cache = ArtifactCache::new(settings(&sandbox), &downloader);

    let first = cache.acquire(&request).expect("first acquisition");
    let second = cache.acquire(&request).expect("second acquisition");

    let expected = sandbox.cache_root.join("winCodeSign").join("winCodeSign-2.6.0");
    assert_eq!(first.path, expected);
    assert_eq!(first.source, AcquisitionSource::Published);
    assert_eq!(second.source, AcquisitionSource::Cached);
    assert_eq!(downloader.calls(), 1);
    assert!(expected.join("windows-10").join("x64").join("signtool.exe").is_file());
    assert_eq!(
        lookup(&expected).expect("lookup"),
        CacheLookupResult::Hit { path: expected }
    );
}

#[rstest]
fn name_is_derived_from_url_when_empty(sandbox: Sandbox) {
    let downloader = FixtureDownloader::new(sandbox.fixture.clone());
    let cache = ArtifactCache::new(settings(&sandbox), &downloader);

    let path = cache
        .download_artifact(&ArtifactRequest::new(
            "",
            "https://example.com/releases/winCodeSign-2.6.0.7z",
            "",
        ))
        .expect("unverified acquisition");

    assert_eq!(
        path,
        sandbox.cache_root.join("winCodeSign").join("winCodeSign-2.6.0")
    );
}

#[rstest]
fn checksum_mismatch_leaves_cache_untouched(sandbox: Sandbox) {
    let downloader = FixtureDownloader::new(sandbox.fixture.clone());
    let cache = ArtifactCache::new(settings(&sandbox), &downloader);

    let err = cache
        .download_artifact(&ArtifactRequest::new(
            "winCodeSign-2.6.0",
            "https://example.com/winCodeSign-2.6.0.7z",
            artifact_cache::download::sha512_base64(b"tampered"),
        ))
        .expect_err("checksum mismatch");

    assert_eq!(err.kind(), ArtifactErrorKind::Transport);
    let family_dir = sandbox.cache_root.join("winCodeSign");
    assert_eq!(
        fs::read_dir(&family_dir).expect("family dir").count(),
        0,
        "failed acquisition left files behind"
    );
}

#[rstest]
fn fpm_is_refused_on_windows_before_downloading(sandbox: Sandbox) {
    let downloader = FixtureDownloader::new(sandbox.fixture.clone());
    let cache = ArtifactCache::new(
        settings(&sandbox).with_platform(Platform::new(HostOs::Windows, "x86_64")),
        &downloader,
    );

    let err = cache
        .download_artifact(&ArtifactRequest::new("fpm", "", ""))
        .expect_err("no windows fpm build");

    assert_eq!(err.kind(), ArtifactErrorKind::Configuration);
    assert_eq!(downloader.calls(), 0);
}
