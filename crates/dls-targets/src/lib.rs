//! Platform target table shared by the provisioning pipeline and the binary
//! resolver.
//!
//! Every supported worker binary is identified by a host-style platform key
//! such as `darwin-arm64` or `win32-x64`. The key names the published artefact
//! and is what the running host computes when it looks for a bundled binary.
//! The Go cross-compiler uses different tokens (`windows`, `amd64`), so each
//! table entry carries both vocabularies and callers translate through it
//! rather than string-munging keys.

mod host;
mod table;

pub use host::HostPlatform;
pub use table::{
    BINARY_PREFIX, COMMAND_NAME, PLATFORM_TARGETS, PlatformTarget, TargetArch, TargetArchParseError,
    TargetOs, TargetOsParseError, UnknownPlatformError, artifact_name, lookup, lookup_compiler,
    targets,
};
