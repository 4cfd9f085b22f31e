//! Settings snapshot and cache-root resolution.
//!
//! Every environment lookup the cache depends on is captured once in
//! [`CacheSettings`], so resolution is a pure function of that value.

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::eyre;
use std::env::{self, VarError};
use std::path::PathBuf;

use super::platform::{HostOs, Platform};
use crate::ArtifactEnvCfg;
use crate::error::{ArtifactError, ConfigError, ConfigResult, Result};

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "artifact-cache";

/// Archiver program used when none is configured.
pub const DEFAULT_ARCHIVER: &str = "7za";

const LOCAL_APP_DATA_ENV: &str = "LOCALAPPDATA";
const USERNAME_ENV: &str = "USERNAME";

/// Inputs for cache-root resolution and archiver invocation.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Explicit cache root; when set it is used verbatim.
    pub cache_dir: Option<Utf8PathBuf>,
    /// Directory name identifying this cache under the per-user cache location.
    pub namespace: String,
    /// Program invoked to extract and decompress archives.
    pub archiver: String,
    /// Home directory of the current user, when it could be determined.
    pub home_dir: Option<Utf8PathBuf>,
    /// Value of `LOCALAPPDATA` (Windows only).
    pub local_app_data: Option<String>,
    /// Value of `USERNAME` (Windows only).
    pub username: Option<String>,
    /// System temporary directory.
    pub temp_dir: Utf8PathBuf,
    /// Platform used for cache placement and tool catalog lookups.
    pub platform: Platform,
}

impl CacheSettings {
    /// Loads the settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when the environment configuration cannot be parsed
    /// or contains non-UTF-8 paths.
    pub fn from_env() -> ConfigResult<Self> {
        let cfg = ArtifactEnvCfg::load()?;
        Self::from_env_cfg(&cfg)
    }

    /// Combines parsed environment configuration with host lookups.
    ///
    /// # Errors
    ///
    /// Returns an error when `LOCALAPPDATA`, `USERNAME`, the temporary
    /// directory, or the home directory are not valid UTF-8.
    pub fn from_env_cfg(cfg: &ArtifactEnvCfg) -> ConfigResult<Self> {
        let home_dir = dirs::home_dir()
            .map(|home| utf8_path(home, "home directory"))
            .transpose()?;

        Ok(Self {
            cache_dir: cfg.dir.clone().filter(|dir| !dir.as_str().trim().is_empty()),
            namespace: non_empty(cfg.namespace.as_deref())
                .unwrap_or(DEFAULT_NAMESPACE)
                .to_owned(),
            archiver: non_empty(cfg.archiver.as_deref())
                .unwrap_or(DEFAULT_ARCHIVER)
                .to_owned(),
            home_dir,
            local_app_data: optional_env(LOCAL_APP_DATA_ENV)?,
            username: optional_env(USERNAME_ENV)?,
            temp_dir: utf8_path(env::temp_dir(), "temporary directory")?,
            platform: Platform::current(),
        })
    }

    /// Creates settings rooted at an explicit cache directory.
    ///
    /// No environment is consulted, which keeps tests isolated from the
    /// developer's real cache.
    #[must_use]
    pub fn with_dir(cache_dir: Utf8PathBuf) -> Self {
        Self {
            cache_dir: Some(cache_dir),
            namespace: DEFAULT_NAMESPACE.to_owned(),
            archiver: DEFAULT_ARCHIVER.to_owned(),
            home_dir: None,
            local_app_data: None,
            username: None,
            temp_dir: Utf8PathBuf::from("/tmp"),
            platform: Platform::current(),
        }
    }

    /// Replaces the archiver program.
    #[must_use]
    pub fn with_archiver(mut self, archiver: impl Into<String>) -> Self {
        self.archiver = archiver.into();
        self
    }

    /// Replaces the platform used for tool lookups and cache placement.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Resolves the cache root for the configured namespace.
    ///
    /// # Errors
    ///
    /// See [`resolve_cache_root`].
    pub fn cache_root(&self) -> Result<Utf8PathBuf> {
        resolve_cache_root(&self.namespace, self)
    }
}

/// Resolves the directory under which every artifact is cached.
///
/// The resolution order is:
///
/// 1. `settings.cache_dir` verbatim when set
/// 2. macOS: `<home>/Library/Caches/<namespace>`
/// 3. Windows with `LOCALAPPDATA`: `<LOCALAPPDATA>/<namespace>/cache`, or
///    `<temp>/<namespace>-cache` when running as the `SYSTEM` account or from
///    a profile under `\Windows\System32\`
/// 4. otherwise `<home>/.cache/<namespace>`
///
/// # Errors
///
/// Returns an [`ArtifactErrorKind::Environment`](crate::ArtifactErrorKind)
/// error when the home directory is needed but unknown.
///
/// # Examples
///
/// ```
/// use artifact_cache::cache::{CacheSettings, resolve_cache_root};
/// use camino::Utf8PathBuf;
///
/// let settings = CacheSettings::with_dir(Utf8PathBuf::from("/build/cache"));
/// let root = resolve_cache_root("tools", &settings)?;
/// assert_eq!(root.as_str(), "/build/cache");
/// # Ok::<(), artifact_cache::ArtifactError>(())
/// ```
pub fn resolve_cache_root(namespace: &str, settings: &CacheSettings) -> Result<Utf8PathBuf> {
    if let Some(dir) = &settings.cache_dir {
        return Ok(dir.clone());
    }

    match settings.platform.os {
        HostOs::Mac => Ok(home(settings)?
            .join("Library")
            .join("Caches")
            .join(namespace)),
        HostOs::Windows if settings.local_app_data.is_some() => {
            Ok(resolve_windows_root(namespace, settings))
        }
        HostOs::Windows | HostOs::Linux => Ok(home(settings)?.join(".cache").join(namespace)),
    }
}

fn resolve_windows_root(namespace: &str, settings: &CacheSettings) -> Utf8PathBuf {
    let local_app_data = settings.local_app_data.as_deref().unwrap_or_default();
    if is_system_profile(local_app_data, settings.username.as_deref()) {
        return settings.temp_dir.join(format!("{namespace}-cache"));
    }
    Utf8Path::new(local_app_data).join(namespace).join("cache")
}

fn is_system_profile(local_app_data: &str, username: Option<&str>) -> bool {
    local_app_data
        .to_lowercase()
        .contains("\\windows\\system32\\")
        || username.is_some_and(|name| name.eq_ignore_ascii_case("system"))
}

fn home(settings: &CacheSettings) -> Result<&Utf8Path> {
    settings.home_dir.as_deref().ok_or_else(|| {
        ArtifactError::environment(eyre!(
            "cannot determine the home directory to place the {} cache",
            settings.namespace
        ))
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|trimmed| !trimmed.is_empty())
}

fn optional_env(key: &str) -> ConfigResult<Option<String>> {
    match env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(value)) => Err(ConfigError::from(eyre!(
            "{key} must contain a valid UTF-8 value (received {value:?})"
        ))),
    }
}

fn utf8_path(path: PathBuf, what: &str) -> ConfigResult<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).map_err(|raw| {
        ConfigError::from(eyre!("{what} is not valid UTF-8: {}", raw.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArtifactErrorKind;
    use rstest::{fixture, rstest};
    use serial_test::serial;
    use temp_env::with_vars;

    #[fixture]
    fn settings() -> CacheSettings {
        CacheSettings {
            cache_dir: None,
            namespace: DEFAULT_NAMESPACE.to_owned(),
            archiver: DEFAULT_ARCHIVER.to_owned(),
            home_dir: Some(Utf8PathBuf::from("/home/builder")),
            local_app_data: None,
            username: None,
            temp_dir: Utf8PathBuf::from("/tmp"),
            platform: Platform::new(HostOs::Linux, "x86_64"),
        }
    }

    fn on(os: HostOs, settings: CacheSettings) -> CacheSettings {
        settings.with_platform(Platform::new(os, "x86_64"))
    }

    #[rstest]
    fn override_wins_on_every_platform(settings: CacheSettings) {
        for os in [HostOs::Mac, HostOs::Windows, HostOs::Linux] {
            let mut candidate = on(os, settings.clone());
            candidate.cache_dir = Some(Utf8PathBuf::from("/ci/cache"));
            let root = resolve_cache_root("tools", &candidate).expect("resolve");
            assert_eq!(root.as_str(), "/ci/cache");
        }
    }

    #[rstest]
    fn mac_uses_library_caches(settings: CacheSettings) {
        let root = resolve_cache_root("tools", &on(HostOs::Mac, settings)).expect("resolve");
        assert_eq!(root.as_str(), "/home/builder/Library/Caches/tools");
    }

    #[rstest]
    fn linux_uses_dot_cache_with_namespace(settings: CacheSettings) {
        let root = resolve_cache_root("tools", &settings).expect("resolve");
        assert_eq!(root.as_str(), "/home/builder/.cache/tools");
    }

    #[rstest]
    fn windows_uses_local_app_data(settings: CacheSettings) {
        let mut candidate = on(HostOs::Windows, settings);
        candidate.local_app_data = Some("/Users/builder/AppData/Local".to_owned());
        let root = resolve_cache_root("tools", &candidate).expect("resolve");
        assert_eq!(root.as_str(), "/Users/builder/AppData/Local/tools/cache");
    }

    #[rstest]
    #[case(Some("C:\\Windows\\System32\\config\\systemprofile\\AppData\\Local"), None)]
    #[case(Some("C:\\Users\\svc\\AppData\\Local"), Some("SYSTEM"))]
    fn windows_system_profile_falls_back_to_temp(
        settings: CacheSettings,
        #[case] local_app_data: Option<&str>,
        #[case] username: Option<&str>,
    ) {
        let mut candidate = on(HostOs::Windows, settings);
        candidate.local_app_data = local_app_data.map(str::to_owned);
        candidate.username = username.map(str::to_owned);
        let root = resolve_cache_root("tools", &candidate).expect("resolve");
        assert_eq!(root.as_str(), "/tmp/tools-cache");
    }

    #[rstest]
    fn windows_without_local_app_data_uses_home(settings: CacheSettings) {
        let root = resolve_cache_root("tools", &on(HostOs::Windows, settings)).expect("resolve");
        assert_eq!(root.as_str(), "/home/builder/.cache/tools");
    }

    #[rstest]
    fn missing_home_is_an_environment_error(settings: CacheSettings) {
        let mut candidate = settings;
        candidate.home_dir = None;
        let err = resolve_cache_root("tools", &candidate).expect_err("home is required");
        assert_eq!(err.kind(), ArtifactErrorKind::Environment);
    }

    #[test]
    #[serial]
    fn from_env_reads_prefixed_variables() {
        let settings = with_vars(
            [
                ("ARTIFACT_CACHE_DIR", Some("/custom/cache")),
                ("ARTIFACT_CACHE_ARCHIVER", Some("/opt/7zip/7za")),
                ("ARTIFACT_CACHE_NAMESPACE", None::<&str>),
            ],
            CacheSettings::from_env,
        )
        .expect("settings load");
        assert_eq!(settings.cache_dir.as_deref(), Some(Utf8Path::new("/custom/cache")));
        assert_eq!(settings.archiver, "/opt/7zip/7za");
        assert_eq!(settings.namespace, DEFAULT_NAMESPACE);
    }

    #[test]
    #[serial]
    fn from_env_defaults_archiver_and_ignores_blank_override() {
        let settings = with_vars(
            [
                ("ARTIFACT_CACHE_DIR", Some("   ")),
                ("ARTIFACT_CACHE_ARCHIVER", None::<&str>),
            ],
            CacheSettings::from_env,
        )
        .expect("settings load");
        assert!(settings.cache_dir.is_none());
        assert_eq!(settings.archiver, DEFAULT_ARCHIVER);
    }

    #[test]
    fn with_dir_uses_provided_path() {
        let custom = Utf8PathBuf::from("/custom/path");
        let settings = CacheSettings::with_dir(custom.clone());
        assert_eq!(settings.cache_root().expect("resolve"), custom);
    }
}
