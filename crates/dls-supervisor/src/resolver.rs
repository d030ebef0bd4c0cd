//! Chooses the worker executable for a start attempt.

use std::fmt;

use camino::Utf8Path;
use dls_config::ServerConfiguration;
use dls_targets::{BINARY_PREFIX, COMMAND_NAME, HostPlatform};

/// Which strategy produced a [`ResolvedCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionSource {
    /// An explicit override from configuration.
    Override,
    /// A bundled binary matching the host platform.
    Bundled,
    /// The bare command name, looked up on `PATH` at spawn time.
    SearchPath,
}

/// Executable and arguments for one start attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    /// Program to execute, verbatim.
    pub executable_path: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Strategy that chose `executable_path`.
    pub source: ResolutionSource,
}

impl ResolvedCommand {
    /// Builds a command directly, bypassing resolution.
    #[must_use]
    pub fn new(executable_path: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            executable_path: executable_path.into(),
            args,
            source: ResolutionSource::Override,
        }
    }
}

impl fmt::Display for ResolvedCommand {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.executable_path)?;
        for arg in &self.args {
            write!(formatter, " {arg}")?;
        }
        Ok(())
    }
}

/// Resolves the worker executable: override, then bundled binary, then `PATH`.
///
/// Never fails. A path that cannot actually be executed only surfaces when
/// the transport tries to spawn it.
#[must_use]
pub fn resolve(
    config: &ServerConfiguration,
    host: &HostPlatform,
    resources_dir: &Utf8Path,
) -> ResolvedCommand {
    let args = config.server_args.clone();

    if let Some(path) = config.explicit_override() {
        return ResolvedCommand {
            executable_path: path.to_owned(),
            args,
            source: ResolutionSource::Override,
        };
    }

    if let Some(target) = host.target() {
        let bundled = resources_dir.join(target.artifact_name(BINARY_PREFIX));
        if bundled.exists() {
            return ResolvedCommand {
                executable_path: bundled.into_string(),
                args,
                source: ResolutionSource::Bundled,
            };
        }
    }

    ResolvedCommand {
        executable_path: COMMAND_NAME.to_owned(),
        args,
        source: ResolutionSource::SearchPath,
    }
}
