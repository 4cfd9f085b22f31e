//! Internal helpers re-exported for integration tests.
//!
//! Exposes an offline [`FixtureDownloader`], a shell stand-in for the
//! archiver, and log capture so behavioural tests can drive a real cache
//! without network access or a `7za` installation.

mod archiver;
mod downloader;
mod logging;

pub use archiver::{build_tar, shared_fake_archiver, write_fake_archiver};
pub use downloader::FixtureDownloader;
pub use logging::{capture_logs, capture_warn_logs};
