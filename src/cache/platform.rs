//! Host platform description used to pick cache locations and tool builds.

use std::fmt;

/// Operating-system family relevant to cache placement and tool selection.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum HostOs {
    /// macOS (`darwin`).
    Mac,
    /// Windows (`win32`).
    Windows,
    /// Linux and every other Unix-like system.
    Linux,
}

impl HostOs {
    /// Returns the family of the running process.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::Mac
        } else if cfg!(windows) {
            Self::Windows
        } else {
            Self::Linux
        }
    }

    /// Qualifier used in tool artifact names.
    #[must_use]
    pub const fn qualifier(self) -> &'static str {
        match self {
            Self::Mac => "mac",
            Self::Windows => "win",
            Self::Linux => "linux",
        }
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.qualifier())
    }
}

/// Operating system plus canonical CPU architecture.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Platform {
    /// Operating-system family.
    pub os: HostOs,
    /// Canonical architecture name (`x64`, `ia32`, `armv7`, `armv8`, ...).
    pub arch: String,
}

impl Platform {
    /// Builds a platform, normalising the raw architecture identifier.
    #[must_use]
    pub fn new(os: HostOs, raw_arch: &str) -> Self {
        Self {
            os,
            arch: normalize_arch(raw_arch).to_owned(),
        }
    }

    /// Describes the running process.
    #[must_use]
    pub fn current() -> Self {
        Self::new(HostOs::current(), std::env::consts::ARCH)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.os, self.arch)
    }
}

/// Maps raw CPU identifiers onto the short names used by the tool catalog.
///
/// Unknown identifiers pass through unchanged.
#[must_use]
pub fn normalize_arch(raw: &str) -> &str {
    match raw {
        "arm" => "armv7",
        "aarch64" | "arm64" => "armv8",
        "x86_64" | "amd64" => "x64",
        "x86" | "i386" | "i686" => "ia32",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("x86_64", "x64")]
    #[case("amd64", "x64")]
    #[case("aarch64", "armv8")]
    #[case("arm", "armv7")]
    #[case("x86", "ia32")]
    #[case("riscv64", "riscv64")]
    fn normalizes_architecture_aliases(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_arch(raw), expected);
    }

    #[test]
    fn platform_display_joins_os_and_arch() {
        let platform = Platform::new(HostOs::Windows, "x86_64");
        assert_eq!(platform.to_string(), "win:x64");
    }
}
