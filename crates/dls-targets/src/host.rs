//! Host platform identification using host-style naming.

use std::env::consts;
use std::fmt;

use crate::table::{PlatformTarget, lookup};

/// Operating system and architecture of a host, in host-style tokens.
///
/// Tokens follow the `darwin`/`linux`/`win32` and `x64`/`arm`/`arm64`
/// conventions used in artefact names. Hosts outside that vocabulary keep
/// their raw Rust identifiers, which never match a table entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostPlatform {
    os: String,
    arch: String,
}

impl HostPlatform {
    /// Builds a host description from host-style tokens.
    #[must_use]
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Describes the host this process is running on.
    #[must_use]
    pub fn current() -> Self {
        Self::from_rust_identifiers(consts::OS, consts::ARCH)
    }

    /// Translates Rust `target_os`/`target_arch` identifiers to host-style tokens.
    #[must_use]
    pub fn from_rust_identifiers(os: &str, arch: &str) -> Self {
        let os = match os {
            "macos" => "darwin",
            "windows" => "win32",
            other => other,
        };
        let arch = match arch {
            "x86_64" => "x64",
            "aarch64" => "arm64",
            other => other,
        };
        Self::new(os, arch)
    }

    /// Host-style operating system token.
    #[must_use]
    pub fn os(&self) -> &str {
        self.os.as_str()
    }

    /// Host-style architecture token.
    #[must_use]
    pub fn arch(&self) -> &str {
        self.arch.as_str()
    }

    /// The `{os}-{arch}` platform key for this host.
    #[must_use]
    pub fn platform_key(&self) -> String {
        format!("{}-{}", self.os, self.arch)
    }

    /// Table entry for this host, when a bundled binary can exist for it.
    #[must_use]
    pub fn target(&self) -> Option<PlatformTarget> {
        lookup(&self.platform_key())
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}-{}", self.os, self.arch)
    }
}
