//! Error types raised while provisioning worker binaries.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Failure of an external command run by a [`crate::Toolchain`].
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be launched at all.
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        /// Program that failed to launch.
        program: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The program ran but reported failure.
    #[error("`{program}` exited with {status}: {stderr}")]
    Failed {
        /// Program that failed.
        program: String,
        /// Rendered exit status.
        status: String,
        /// Trimmed standard error output.
        stderr: String,
    },
}

impl CommandError {
    /// Builds a [`CommandError::Failed`] from a plain message, for fakes.
    #[must_use]
    pub fn failed(program: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::Failed {
            program: program.into(),
            status: String::from("exit status: 1"),
            stderr: stderr.into(),
        }
    }
}

/// Errors that abort a provisioning run.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A relative path could not be resolved against the working directory.
    #[error("failed to resolve path {path}: {source}")]
    ResolvePath {
        /// Path as configured.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The worker source tree is not where it is expected.
    #[error("DLiteScript source tree not found at: {path}")]
    MissingSourceTree {
        /// Expected location of the source tree.
        path: Utf8PathBuf,
    },

    /// Updating the source tree's submodules failed.
    #[error("failed to update source dependencies: {source}")]
    SourceSync {
        /// The failing command.
        #[source]
        source: CommandError,
    },

    /// The cross-compiler is not installed or not runnable.
    #[error("Go executable not found: {source}")]
    ToolchainUnavailable {
        /// The failing probe.
        #[source]
        source: CommandError,
    },

    /// Removing a stale artefact failed.
    #[error("failed to remove stale artefact {path}: {source}")]
    Cleanup {
        /// Artefact that could not be removed.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The output directory could not be listed during cleanup.
    #[error("failed to list output directory {path}: {source}")]
    ListOutputDir {
        /// Output directory.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The output directory could not be created.
    #[error("failed to prepare output directory {path}: {source}")]
    CreateOutputDir {
        /// Output directory.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The compiler failed for a target.
    #[error("could not compile dlitescript-{platform_key}: {message}")]
    Compile {
        /// Target whose build failed.
        platform_key: String,
        /// Compiler failure description.
        message: String,
    },

    /// The compiler produced an artefact too small to be a real binary.
    #[error(
        "dlitescript-{platform_key} is empty: {path} is {size} bytes, expected at least {minimum}"
    )]
    UndersizedArtifact {
        /// Target whose artefact was rejected.
        platform_key: String,
        /// Rejected artefact, already deleted.
        path: Utf8PathBuf,
        /// Observed size in bytes.
        size: u64,
        /// Minimum accepted size in bytes.
        minimum: u64,
    },

    /// The produced artefact could not be inspected.
    #[error("failed to inspect artefact for {platform_key} at {path}: {source}")]
    Inspect {
        /// Target whose artefact failed inspection.
        platform_key: String,
        /// Artefact path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The artefact's permissions could not be updated.
    #[error("failed to mark artefact for {platform_key} executable at {path}: {source}")]
    Permissions {
        /// Target whose artefact could not be updated.
        platform_key: String,
        /// Artefact path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl ProvisionError {
    /// Platform key of the failing target, when the failure is target-specific.
    #[must_use]
    pub fn platform_key(&self) -> Option<&str> {
        match self {
            Self::Compile { platform_key, .. }
            | Self::UndersizedArtifact { platform_key, .. }
            | Self::Inspect { platform_key, .. }
            | Self::Permissions { platform_key, .. } => Some(platform_key.as_str()),
            _ => None,
        }
    }
}
