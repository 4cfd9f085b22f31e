//! Artifact identity normalisation.
//!
//! Turns a caller-supplied `(name, url, checksum)` triple into the canonical
//! cache directory name, the real download URL, and the unpack strategy.

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::eyre;

use super::catalog::{ZSTD, fpm_request, tool_request};
use super::platform::Platform;
use crate::error::{ArtifactError, Result};
use crate::unpack::{NODE_BINARY, UnpackStrategy};

/// Logical name selecting the streaming Node.js runtime artifact.
pub const NODE_ARTIFACT: &str = "node";

const NODE_DIST_BASE: &str = "https://nodejs.org/dist";

/// URL suffix of archives that wrap a single tarball one level deep.
const NESTED_ARCHIVE_SUFFIX: &str = ".tar.7z";

/// Identity of an artifact as supplied by a caller.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ArtifactRequest {
    /// Logical artifact key; empty means "derive from the URL".
    pub name: String,
    /// Source location, or a `<version>-<os>-<arch>` token for `node`.
    pub url: String,
    /// Expected checksum; empty means the download is not verified.
    pub checksum: String,
}

impl ArtifactRequest {
    /// Creates a request from its three parts.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        checksum: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            checksum: checksum.into(),
        }
    }
}

/// How the unpacked temp directory maps onto the final path.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PublishLayout {
    /// The temp directory itself becomes the final path.
    Direct,
    /// The temp directory holds a single entry named after itself, and that
    /// entry becomes the final path.
    Nested,
}

/// A request after catalog substitution and name derivation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NormalizedArtifact {
    /// Canonical cache directory name.
    pub dir_name: String,
    /// URL actually downloaded.
    pub url: String,
    /// Expected checksum, possibly empty.
    pub checksum: String,
    /// Unpack strategy applied to the downloaded archive.
    pub strategy: UnpackStrategy,
}

/// Locations derived for one artifact under a cache root.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CacheEntry {
    /// Root of the whole cache.
    pub cache_root: Utf8PathBuf,
    /// Directory grouping every variant of one tool family.
    pub family_dir: Utf8PathBuf,
    /// Publish-once location of the artifact.
    pub final_path: Utf8PathBuf,
}

impl NormalizedArtifact {
    /// Prefix before the first hyphen, or the whole name when there is none.
    #[must_use]
    pub fn family(&self) -> &str {
        family_of(&self.dir_name)
    }

    /// Computes where this artifact lives under `cache_root`.
    #[must_use]
    pub fn entry(&self, cache_root: &Utf8Path) -> CacheEntry {
        let family_dir = cache_root.join(self.family());
        let final_path = family_dir.join(&self.dir_name);
        CacheEntry {
            cache_root: cache_root.to_path_buf(),
            family_dir,
            final_path,
        }
    }

    /// Selects how the unpacked result is moved into place.
    #[must_use]
    pub fn publish_layout(&self) -> PublishLayout {
        if self.url.ends_with(NESTED_ARCHIVE_SUFFIX) {
            PublishLayout::Nested
        } else {
            PublishLayout::Direct
        }
    }
}

/// Returns the family component of a cache directory name.
///
/// # Examples
///
/// ```
/// use artifact_cache::cache::family_of;
///
/// assert_eq!(family_of("fpm-1.9.3-2.3.1-linux-x86_64"), "fpm");
/// assert_eq!(family_of("zstd"), "zstd");
/// ```
#[must_use]
pub fn family_of(dir_name: &str) -> &str {
    match dir_name.split_once('-') {
        Some((family, _)) if !family.is_empty() => family,
        _ => dir_name,
    }
}

/// Normalises a request for `platform`.
///
/// - `fpm` and `zstd` are replaced by their catalog entries.
/// - `node` treats `url` as a `<version>-<os>-<arch>` token, downloads the
///   official `.tar.xz` build and extracts only the binary.
/// - An empty name is derived from the URL's last segment minus its
///   extension.
///
/// # Errors
///
/// Returns a configuration error when a catalogued tool has no build for the
/// platform or a `node` token carries no version separator.
pub fn normalize(request: &ArtifactRequest, platform: &Platform) -> Result<NormalizedArtifact> {
    let resolved = match request.name.as_str() {
        "fpm" => fpm_request(platform)?,
        "zstd" => tool_request(&ZSTD, platform)?,
        NODE_ARTIFACT => return normalize_node(request),
        _ => request.clone(),
    };

    let dir_name = if resolved.name.is_empty() {
        name_from_url(&resolved.url)
    } else {
        resolved.name
    };

    Ok(NormalizedArtifact {
        dir_name,
        url: resolved.url,
        checksum: resolved.checksum,
        strategy: UnpackStrategy::Extract,
    })
}

fn normalize_node(request: &ArtifactRequest) -> Result<NormalizedArtifact> {
    let version_and_arch = request.url.as_str();
    let Some((version, _)) = version_and_arch
        .split_once('-')
        .filter(|(version, _)| !version.is_empty())
    else {
        return Err(ArtifactError::configuration(eyre!(
            "expected a <version>-<os>-<arch> token for {NODE_ARTIFACT}, got {version_and_arch:?}"
        )));
    };

    Ok(NormalizedArtifact {
        dir_name: format!("{NODE_ARTIFACT}-{version_and_arch}"),
        url: format!("{NODE_DIST_BASE}/v{version}/node-v{version_and_arch}.tar.xz"),
        checksum: request.checksum.clone(),
        strategy: UnpackStrategy::StreamingBinary(NODE_BINARY),
    })
}

/// Derives a cache name from the final URL segment, dropping its last
/// extension.
pub(crate) fn name_from_url(url: &str) -> String {
    let file_name = url_basename(url);
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => file_name.get(..dot).unwrap_or(file_name).to_owned(),
        _ => file_name.to_owned(),
    }
}

/// Returns the final path segment of a URL, ignoring any query or fragment.
pub(crate) fn url_basename(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::platform::HostOs;
    use crate::error::ArtifactErrorKind;
    use rstest::{fixture, rstest};

    #[fixture]
    fn linux_x64() -> Platform {
        Platform::new(HostOs::Linux, "x86_64")
    }

    #[rstest]
    fn family_groups_hyphenated_names(linux_x64: Platform) {
        let request = ArtifactRequest::new("fpm", "", "");
        let artifact = normalize(&request, &linux_x64).expect("fpm resolves");
        let entry = artifact.entry(Utf8Path::new("/cache"));
        assert_eq!(
            entry.final_path.as_str(),
            "/cache/fpm/fpm-1.9.3-2.3.1-linux-x86_64"
        );
        assert_eq!(entry.family_dir.as_str(), "/cache/fpm");
    }

    #[rstest]
    fn name_without_hyphen_is_its_own_family(linux_x64: Platform) {
        let request = ArtifactRequest::new("winCodeSign", "https://example.com/a.7z", "");
        let artifact = normalize(&request, &linux_x64).expect("plain request");
        assert_eq!(
            artifact.entry(Utf8Path::new("/cache")).final_path.as_str(),
            "/cache/winCodeSign/winCodeSign"
        );
    }

    #[rstest]
    fn zstd_is_resolved_through_the_catalog(linux_x64: Platform) {
        let request = ArtifactRequest::new("zstd", "ignored", "ignored");
        let artifact = normalize(&request, &linux_x64).expect("zstd resolves");
        assert_eq!(artifact.dir_name, "zstd-1.3.4-linux-x64");
        assert_eq!(artifact.family(), "zstd");
        assert_ne!(artifact.checksum, "ignored");
    }

    #[rstest]
    fn zstd_on_unsupported_arch_is_refused() {
        let request = ArtifactRequest::new("zstd", "", "");
        let err = normalize(&request, &Platform::new(HostOs::Linux, "aarch64"))
            .expect_err("no linux arm build");
        assert_eq!(err.kind(), ArtifactErrorKind::Configuration);
    }

    #[rstest]
    fn node_rewrites_url_and_selects_streaming(linux_x64: Platform) {
        let request = ArtifactRequest::new("node", "16.13.0-linux-x64", "sum");
        let artifact = normalize(&request, &linux_x64).expect("node resolves");
        assert_eq!(artifact.dir_name, "node-16.13.0-linux-x64");
        assert_eq!(
            artifact.url,
            "https://nodejs.org/dist/v16.13.0/node-v16.13.0-linux-x64.tar.xz"
        );
        assert_eq!(artifact.checksum, "sum");
        assert_eq!(
            artifact.strategy,
            UnpackStrategy::StreamingBinary(NODE_BINARY)
        );
        assert_eq!(artifact.family(), "node");
    }

    #[rstest]
    #[case("16")]
    #[case("-linux-x64")]
    fn node_token_without_version_is_rejected(linux_x64: Platform, #[case] token: &str) {
        let request = ArtifactRequest::new("node", token, "");
        let err = normalize(&request, &linux_x64).expect_err("malformed token");
        assert_eq!(err.kind(), ArtifactErrorKind::Configuration);
    }

    #[rstest]
    #[case("https://example.com/dl/appimage-9.1.0.7z", "appimage-9.1.0")]
    #[case("https://example.com/dl/linux-tools.tar.7z", "linux-tools.tar")]
    #[case("https://example.com/dl/archive?token=1", "archive")]
    #[case("https://example.com/dl/.hidden", ".hidden")]
    fn empty_name_derives_from_url(
        linux_x64: Platform,
        #[case] url: &str,
        #[case] expected: &str,
    ) {
        let request = ArtifactRequest::new("", url, "");
        let artifact = normalize(&request, &linux_x64).expect("derived name");
        assert_eq!(artifact.dir_name, expected);
    }

    #[rstest]
    #[case("-leading", "-leading")]
    #[case("a-b-c", "a")]
    #[case("plain", "plain")]
    fn family_of_uses_first_hyphen(#[case] dir_name: &str, #[case] family: &str) {
        assert_eq!(family_of(dir_name), family);
    }

    #[rstest]
    fn tar_7z_urls_publish_nested(linux_x64: Platform) {
        let request = ArtifactRequest::new("", "https://example.com/linux-tools.tar.7z", "");
        let nested = normalize(&request, &linux_x64).expect("derived name");
        assert_eq!(nested.publish_layout(), PublishLayout::Nested);

        let plain = ArtifactRequest::new("", "https://example.com/linux-tools.7z", "");
        let direct = normalize(&plain, &linux_x64).expect("derived name");
        assert_eq!(direct.publish_layout(), PublishLayout::Direct);
    }
}
