//! Static mapping from host-style platform keys to cross-compiler tokens.

use std::fmt;
use std::str::FromStr;

use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Bare command name of the worker, also used as the "unset" override sentinel.
pub const COMMAND_NAME: &str = "dlitescript";

/// Prefix shared by every published worker binary.
pub const BINARY_PREFIX: &str = "dlitescript";

/// Operating systems understood by the cross-compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum TargetOs {
    /// macOS.
    Darwin,
    /// Linux.
    Linux,
    /// Windows.
    Windows,
}

impl TargetOs {
    /// Compiler token (`GOOS` value).
    #[must_use]
    pub fn compiler_token(self) -> &'static str {
        self.into()
    }

    /// Host-style token used in platform keys.
    #[must_use]
    pub const fn host_token(self) -> &'static str {
        match self {
            Self::Darwin => "darwin",
            Self::Linux => "linux",
            Self::Windows => "win32",
        }
    }
}

/// Processor architectures understood by the cross-compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum TargetArch {
    /// 64-bit x86.
    Amd64,
    /// 32-bit ARM.
    Arm,
    /// 64-bit ARM.
    Arm64,
}

impl TargetArch {
    /// Compiler token (`GOARCH` value).
    #[must_use]
    pub fn compiler_token(self) -> &'static str {
        self.into()
    }

    /// Host-style token used in platform keys.
    #[must_use]
    pub const fn host_token(self) -> &'static str {
        match self {
            Self::Amd64 => "x64",
            Self::Arm => "arm",
            Self::Arm64 => "arm64",
        }
    }
}

/// Error returned when a compiler OS token is not recognised.
pub type TargetOsParseError = strum::ParseError;

/// Error returned when a compiler architecture token is not recognised.
pub type TargetArchParseError = strum::ParseError;

/// One supported os/architecture combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformTarget {
    platform_key: &'static str,
    os: TargetOs,
    arch: TargetArch,
}

impl PlatformTarget {
    const fn new(platform_key: &'static str, os: TargetOs, arch: TargetArch) -> Self {
        Self {
            platform_key,
            os,
            arch,
        }
    }

    /// Host-style key, for example `linux-x64`.
    #[must_use]
    pub const fn platform_key(&self) -> &'static str {
        self.platform_key
    }

    /// Target operating system.
    #[must_use]
    pub const fn os(&self) -> TargetOs {
        self.os
    }

    /// Target architecture.
    #[must_use]
    pub const fn arch(&self) -> TargetArch {
        self.arch
    }

    /// Whether artefacts for this target are Windows executables.
    #[must_use]
    pub const fn is_windows(&self) -> bool {
        matches!(self.os, TargetOs::Windows)
    }

    /// File name of the artefact published for this target.
    #[must_use]
    pub fn artifact_name(&self, prefix: &str) -> String {
        artifact_name(prefix, self.platform_key)
    }
}

impl fmt::Display for PlatformTarget {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.platform_key)
    }
}

/// Error returned when a platform key is not part of the table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported platform: {key}")]
pub struct UnknownPlatformError {
    key: String,
}

impl UnknownPlatformError {
    /// The key that failed to resolve.
    #[must_use]
    pub fn key(&self) -> &str {
        self.key.as_str()
    }
}

impl FromStr for PlatformTarget {
    type Err = UnknownPlatformError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        lookup(value).ok_or_else(|| UnknownPlatformError {
            key: value.to_owned(),
        })
    }
}

/// Every supported target, in provisioning order.
pub const PLATFORM_TARGETS: [PlatformTarget; 8] = [
    PlatformTarget::new("darwin-x64", TargetOs::Darwin, TargetArch::Amd64),
    PlatformTarget::new("darwin-arm64", TargetOs::Darwin, TargetArch::Arm64),
    PlatformTarget::new("linux-x64", TargetOs::Linux, TargetArch::Amd64),
    PlatformTarget::new("linux-arm", TargetOs::Linux, TargetArch::Arm),
    PlatformTarget::new("linux-arm64", TargetOs::Linux, TargetArch::Arm64),
    PlatformTarget::new("win32-x64", TargetOs::Windows, TargetArch::Amd64),
    PlatformTarget::new("win32-arm", TargetOs::Windows, TargetArch::Arm),
    PlatformTarget::new("win32-arm64", TargetOs::Windows, TargetArch::Arm64),
];

/// Returns the full table in provisioning order.
#[must_use]
pub fn targets() -> &'static [PlatformTarget] {
    &PLATFORM_TARGETS
}

/// Finds the target registered under a host-style platform key.
#[must_use]
pub fn lookup(platform_key: &str) -> Option<PlatformTarget> {
    PLATFORM_TARGETS
        .iter()
        .find(|target| target.platform_key == platform_key)
        .copied()
}

/// Finds the target matching a pair of compiler tokens.
#[must_use]
pub fn lookup_compiler(os: TargetOs, arch: TargetArch) -> Option<PlatformTarget> {
    PLATFORM_TARGETS
        .iter()
        .find(|target| target.os == os && target.arch == arch)
        .copied()
}

/// Builds the `<prefix>-<platformKey>` artefact file name.
#[must_use]
pub fn artifact_name(prefix: &str, platform_key: &str) -> String {
    format!("{prefix}-{platform_key}")
}
