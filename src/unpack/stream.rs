//! Two-process streaming extraction of a single binary from a `.tar.xz`.
//!
//! Process 1 decompresses the archive to its stdout. Process 2 reads a tar
//! stream from its stdin and extracts one entry. A [`StreamCoupling`] relays
//! the bytes between them and closes process 2's stdin once process 1's
//! output is exhausted; without that close process 2 never terminates.

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::{Report, WrapErr, eyre};
use std::io::{self, ErrorKind, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

use super::output::render_status;
use super::{Archiver, StreamingTarget};
use crate::error::{ArtifactError, Result};
use crate::fs::{EXECUTABLE_MODE, set_permissions};
use crate::observability::UNPACK_TARGET;

/// Background relay copying one stream into another.
///
/// The relay owns both handles. When the source reports end of stream the
/// sink is dropped, which closes it and signals end of input to whatever
/// reads the other side.
///
/// # Examples
///
/// ```
/// use artifact_cache::unpack::StreamCoupling;
/// use std::io::{Cursor, sink};
///
/// let coupling = StreamCoupling::start(Cursor::new(vec![7_u8; 1024]), sink())?;
/// assert_eq!(coupling.finish()?, 1024);
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct StreamCoupling {
    handle: JoinHandle<io::Result<u64>>,
}

impl StreamCoupling {
    /// Starts relaying `source` into `sink` on a dedicated thread.
    ///
    /// # Errors
    ///
    /// Returns an error when the relay thread cannot be spawned. Both handles
    /// are dropped in that case, closing them.
    pub fn start<R, W>(source: R, sink: W) -> io::Result<Self>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name("archive-relay".to_owned())
            .spawn(move || relay(source, sink))?;
        Ok(Self { handle })
    }

    /// Waits for the relay to finish and returns the number of bytes copied.
    ///
    /// # Errors
    ///
    /// Returns the copy error, or an error when the relay thread panicked.
    pub fn finish(self) -> io::Result<u64> {
        self.handle
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("archive relay thread panicked")))
    }
}

fn relay<R: Read, W: Write>(mut source: R, mut sink: W) -> io::Result<u64> {
    let copied = io::copy(&mut source, &mut sink);
    let flushed = sink.flush();
    drop(sink);
    let count = copied?;
    flushed?;
    Ok(count)
}

/// Extracts `binary` from `archive` into `target` and marks it executable.
pub(super) fn run(
    archiver: &Archiver,
    archive: &Utf8Path,
    target: &Utf8Path,
    binary: StreamingTarget,
) -> Result<Utf8PathBuf> {
    let mut decompress = spawn(decompress_command(archiver, archive), "decompress", archive)?;
    let Some(source) = decompress.stdout.take() else {
        abort(&mut decompress);
        return Err(ArtifactError::extraction(eyre!(
            "decompress process for {archive} has no stdout"
        )));
    };

    let mut extract = match spawn(extract_command(archiver, target, binary), "extract", archive) {
        Ok(child) => child,
        Err(err) => {
            abort(&mut decompress);
            return Err(err);
        }
    };
    let Some(sink) = extract.stdin.take() else {
        abort(&mut decompress);
        abort(&mut extract);
        return Err(ArtifactError::extraction(eyre!(
            "extract process for {archive} has no stdin"
        )));
    };

    let coupling = match StreamCoupling::start(source, sink) {
        Ok(coupling) => coupling,
        Err(err) => {
            abort(&mut decompress);
            abort(&mut extract);
            return Err(ArtifactError::extraction(
                Report::new(err).wrap_err("failed to start archive relay"),
            ));
        }
    };

    let decompress_status = decompress.wait();
    let extract_status = extract.wait();
    let relayed = coupling.finish();

    check_exit(decompress_status, &format!("failed to decompress {archive}"))?;
    check_exit(
        extract_status,
        &format!("failed to extract {} from {archive}", binary.entry_pattern),
    )?;
    check_relay(relayed, archive)?;

    let binary_path = target.join(binary.binary_name);
    set_permissions(&binary_path, EXECUTABLE_MODE)
        .wrap_err_with(|| format!("{} was not extracted from {archive}", binary.binary_name))
        .map_err(ArtifactError::extraction)?;
    Ok(binary_path)
}

/// `<archiver> e -bd -txz <archive> -so`
fn decompress_command(archiver: &Archiver, archive: &Utf8Path) -> Command {
    let mut command = Command::new(archiver.program());
    command
        .args(["e", "-bd", "-txz"])
        .arg(archive)
        .arg("-so")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());
    command
}

/// `<archiver> e -bd -ttar -o<target> <pattern> -r -si`
fn extract_command(archiver: &Archiver, target: &Utf8Path, binary: StreamingTarget) -> Command {
    let mut command = Command::new(archiver.program());
    command
        .args(["e", "-bd", "-ttar"])
        .arg(format!("-o{target}"))
        .arg(binary.entry_pattern)
        .args(["-r", "-si"])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::inherit());
    command
}

fn spawn(mut command: Command, stage: &str, archive: &Utf8Path) -> Result<Child> {
    let child = command
        .spawn()
        .map_err(Report::new)
        .wrap_err_with(|| format!("failed to spawn {stage} process for {archive}"))
        .map_err(ArtifactError::extraction)?;
    debug!(target: UNPACK_TARGET, stage, pid = child.id(), "spawned archiver");
    Ok(child)
}

fn abort(child: &mut Child) {
    match child.kill() {
        Ok(()) => {}
        // Already exited.
        Err(err) if err.kind() == ErrorKind::InvalidInput => {}
        Err(err) => {
            warn!(target: UNPACK_TARGET, pid = child.id(), error = %err, "failed to kill archiver");
        }
    }
    if let Err(err) = child.wait() {
        warn!(target: UNPACK_TARGET, pid = child.id(), error = %err, "failed to reap archiver");
    }
}

fn check_exit(status: io::Result<ExitStatus>, context: &str) -> Result<()> {
    let exit = status
        .map_err(Report::new)
        .wrap_err_with(|| format!("{context}: failed to wait for archiver"))
        .map_err(ArtifactError::extraction)?;
    if exit.success() {
        Ok(())
    } else {
        Err(render_status(context, exit))
    }
}

fn check_relay(relayed: io::Result<u64>, archive: &Utf8Path) -> Result<()> {
    match relayed {
        Ok(bytes) => {
            debug!(target: UNPACK_TARGET, bytes, "relayed tar stream");
            Ok(())
        }
        // The extractor may stop reading once it has what it needs.
        Err(err) if err.kind() == ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(ArtifactError::extraction(
            Report::new(err).wrap_err(format!("failed to relay tar stream for {archive}")),
        )),
    }
}
