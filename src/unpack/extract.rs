//! Single-process archive extraction.

use camino::Utf8Path;
use color_eyre::eyre::{Report, WrapErr};
use std::process::{Command, Stdio};
use tracing::debug;

use super::Archiver;
use super::output::{render_failure, truncate_output};
use crate::error::{ArtifactError, Result};
use crate::observability::UNPACK_TARGET;

/// Runs `<archiver> x -bd <archive> -o<target>` inside `working_dir`.
pub(super) fn run(
    archiver: &Archiver,
    archive: &Utf8Path,
    target: &Utf8Path,
    working_dir: &Utf8Path,
) -> Result<()> {
    let mut command = Command::new(archiver.program());
    command
        .arg("x")
        .arg("-bd")
        .arg(archive)
        .arg(format!("-o{target}"))
        .current_dir(working_dir)
        .stdin(Stdio::null());

    let output = command
        .output()
        .map_err(Report::new)
        .wrap_err_with(|| format!("failed to spawn {} to extract {archive}", archiver.program()))
        .map_err(ArtifactError::extraction)?;

    debug!(
        target: UNPACK_TARGET,
        archive = %archive,
        stdout = %truncate_output(String::from_utf8_lossy(&output.stdout)),
        stderr = %truncate_output(String::from_utf8_lossy(&output.stderr)),
        "archiver finished"
    );

    if output.status.success() {
        Ok(())
    } else {
        Err(render_failure(
            &format!("{} failed to extract {archive}", archiver.program()),
            &output,
        ))
    }
}
