//! Command-line entry point.
//!
//! Parses arguments with `clap`, acquires the requested artifact through an
//! environment-configured [`ArtifactCache`], and prints the final path on
//! stdout without a trailing newline so callers can capture it verbatim.

use camino::Utf8PathBuf;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Report, WrapErr};
use std::ffi::OsString;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

use crate::cache::{ArtifactCache, ArtifactRequest};
use crate::download::Downloader;
use crate::error::{ArtifactError, Result};

/// Downloads and unpacks build tool archives into a shared cache.
#[derive(Debug, Parser)]
#[command(name = "artifact_cache", version, about)]
pub struct Cli {
    /// Operation to perform.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported operations.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ensure an artifact is cached and print its unpacked location.
    DownloadArtifact {
        /// Cache name of the artifact; pass `""` to derive it from the URL.
        #[arg(short, long)]
        name: String,
        /// Archive URL, or a `<version>-<os>-<arch>` token for `node`.
        #[arg(short, long)]
        url: String,
        /// Base64-encoded SHA-512 checksum of the archive.
        #[arg(long, default_value = "")]
        sha512: String,
    },
}

impl Command {
    fn execute<D: Downloader>(&self, cache: &ArtifactCache<D>) -> Result<Utf8PathBuf> {
        match self {
            Self::DownloadArtifact { name, url, sha512 } => {
                cache.download_artifact(&ArtifactRequest::new(name, url, sha512))
            }
        }
    }
}

/// Runs the command line against the process arguments and environment.
///
/// # Examples
/// ```no_run
/// fn main() -> Result<(), artifact_cache::ArtifactError> {
///     artifact_cache::run()?;
///     Ok(())
/// }
/// ```
///
/// # Errors
/// Returns an error when the arguments are invalid, the environment cannot be
/// loaded, or the artifact cannot be acquired.
pub fn run() -> Result<()> {
    if let Err(err) = color_eyre::install() {
        tracing::debug!("color_eyre already installed: {err}");
    }
    init_tracing();

    let cache = ArtifactCache::from_env()?;
    run_with(std::env::args_os(), &cache, &mut io::stdout().lock())
}

/// Parses `args`, runs the command against `cache`, and writes the resulting
/// path to `out`.
///
/// # Errors
/// See [`run`].
pub fn run_with<I, T, D, W>(args: I, cache: &ArtifactCache<D>, out: &mut W) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    D: Downloader,
    W: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            write!(out, "{err}").wrap_err("failed to write help")?;
            return Ok(());
        }
        Err(err) => return Err(ArtifactError::configuration(Report::new(err))),
    };
    let path = cli.command.execute(cache)?;
    out.write_all(path.as_str().as_bytes())
        .and_then(|()| out.flush())
        .wrap_err("failed to write the artifact path to stdout")?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
    if let Err(err) = installed {
        tracing::debug!("tracing subscriber already installed: {err}");
    }
}
