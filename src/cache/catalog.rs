//! Static catalog of well-known tools and their per-platform checksums.
//!
//! Requests for catalogued tools are synthesised from the host platform
//! rather than from the caller's URL, and a platform without a registered
//! checksum is refused instead of being downloaded unverified.

use color_eyre::eyre::eyre;

use super::identity::ArtifactRequest;
use super::platform::{HostOs, Platform};
use crate::error::{ArtifactError, Result};

/// Repository hosting the prebuilt tool archives unless a descriptor says otherwise.
pub const DEFAULT_TOOL_REPOSITORY: &str = "electron-userland/electron-builder-binaries";

/// Catalog entry describing one prebuilt tool release.
#[derive(Debug, Clone, Copy)]
pub struct ToolDescriptor {
    /// Tool name, also the family directory in the cache.
    pub name: &'static str,
    /// Release version.
    pub version: &'static str,
    /// GitHub `owner/repo` publishing the release; `None` means
    /// [`DEFAULT_TOOL_REPOSITORY`].
    pub repository: Option<&'static str>,
    /// Checksum of the macOS build, which is architecture independent.
    pub mac: Option<&'static str>,
    /// Linux checksums keyed by canonical architecture.
    pub linux: &'static [(&'static str, &'static str)],
    /// Windows checksums keyed by canonical architecture.
    pub windows: &'static [(&'static str, &'static str)],
}

/// `zstd` release used for compressing snap and app images.
pub const ZSTD: ToolDescriptor = ToolDescriptor {
    name: "zstd",
    version: "1.3.4",
    repository: None,
    mac: Some(
        "pLrLk2FAkop3C2drZ7+oxyGPQJjNMzUmVf0m3ZCc1a3WIEjYJNpq9UYvfBU/dl2CsRAchlKvoIOWRxRIdX0ugA==",
    ),
    linux: &[(
        "x64",
        "C1TcuuN/0nNvHMwfkKmE8rgsDxkeSbGoV4DMSf4kIJIO4mNp+PUayYeBf4h3usScsWfvX70Jvg5v3yt1FySTDg==",
    )],
    windows: &[
        (
            "ia32",
            "URJhIibWZUEy9USYlHBjc6bgEp7KP+hMJl/YWsssMTt6umxgk+niyc5meKs2XwOwBsvK6KsP+Qr/BawK7CdWVQ==",
        ),
        (
            "x64",
            "S4RtWJwccUQfr/UQeZuWTJyJvU5uaYaP3rGT6e55epuAJx+fuljbJTBw+n8da0oRLIw0essEjGHkNafWgmKt1w==",
        ),
    ],
};

const FPM_LINUX_X64: (&str, &str) = (
    "fpm-1.9.3-2.3.1-linux-x86_64",
    "fcKdXPJSso3xFs5JyIJHG1TfHIRTGDP0xhSBGZl7pPZlz4/TJ4rD/q3wtO/uaBBYeX0qFFQAFjgu1uJ6HLHghA==",
);
const FPM_LINUX_X86: (&str, &str) = (
    "fpm-1.9.3-2.3.1-linux-x86",
    "OnzvBdsHE5djcXcAT87rwbnZwS789ZAd2ehuIO42JWtBAHNzXKxV4o/24XFX5No4DJWGO2YSGQttW+zn7d/4rQ==",
);
const FPM_MAC: (&str, &str) = (
    "fpm-1.9.3-20150715-2.2.2-mac",
    "oXfq+0H2SbdrbMik07mYloAZ8uHrmf6IJk+Q3P1kwywuZnKTXSaaeZUJNlWoVpRDWNu537YxxpBQWuTcF+6xfw==",
);

impl ToolDescriptor {
    /// Returns the registered checksum for `platform`, if any.
    #[must_use]
    pub fn checksum_for(&self, platform: &Platform) -> Option<&'static str> {
        let table = match platform.os {
            HostOs::Mac => return self.mac,
            HostOs::Windows => self.windows,
            HostOs::Linux => self.linux,
        };
        table
            .iter()
            .find(|(arch, _)| *arch == platform.arch)
            .map(|(_, checksum)| *checksum)
    }
}

/// Builds the acquisition request for a catalogued tool on `platform`.
///
/// The cache name is `<tool>-<version>-<os>[-<arch>]`; macOS builds carry no
/// architecture qualifier.
///
/// # Errors
///
/// Returns an [`ArtifactErrorKind::Configuration`](crate::ArtifactErrorKind)
/// error when the descriptor has no checksum for the platform.
///
/// # Examples
///
/// ```
/// use artifact_cache::cache::{HostOs, Platform, ZSTD, tool_request};
///
/// let request = tool_request(&ZSTD, &Platform::new(HostOs::Linux, "x86_64"))?;
/// assert_eq!(request.name, "zstd-1.3.4-linux-x64");
/// assert!(request.url.ends_with("/zstd-1.3.4/zstd-v1.3.4-linux-x64.7z"));
/// # Ok::<(), artifact_cache::ArtifactError>(())
/// ```
pub fn tool_request(descriptor: &ToolDescriptor, platform: &Platform) -> Result<ArtifactRequest> {
    let checksum = descriptor.checksum_for(platform).ok_or_else(|| {
        ArtifactError::configuration(eyre!(
            "checksum not specified for {} on {platform}",
            descriptor.name
        ))
    })?;

    let os_and_arch = match platform.os {
        HostOs::Mac => platform.os.qualifier().to_owned(),
        HostOs::Windows | HostOs::Linux => format!("{}-{}", platform.os, platform.arch),
    };
    let (repository, tag) = match descriptor.repository {
        Some(repository) => (repository, format!("v{}", descriptor.version)),
        None => (
            DEFAULT_TOOL_REPOSITORY,
            format!("{}-{}", descriptor.name, descriptor.version),
        ),
    };

    Ok(ArtifactRequest::new(
        format!("{}-{}-{os_and_arch}", descriptor.name, descriptor.version),
        format!(
            "https://github.com/{repository}/releases/download/{tag}/{}-v{}-{os_and_arch}.7z",
            descriptor.name, descriptor.version
        ),
        checksum,
    ))
}

/// Builds the acquisition request for the `fpm` packaging helper.
///
/// # Errors
///
/// Returns a configuration error on Windows, where no build is published.
pub fn fpm_request(platform: &Platform) -> Result<ArtifactRequest> {
    let (name, checksum) = match platform.os {
        HostOs::Linux if platform.arch == "x64" => FPM_LINUX_X64,
        HostOs::Linux => FPM_LINUX_X86,
        HostOs::Mac => FPM_MAC,
        HostOs::Windows => {
            return Err(ArtifactError::configuration(eyre!(
                "fpm is not available for {platform}"
            )));
        }
    };
    Ok(ArtifactRequest::new(
        name,
        format!("https://github.com/{DEFAULT_TOOL_REPOSITORY}/releases/download/{name}/{name}.7z"),
        checksum,
    ))
}
