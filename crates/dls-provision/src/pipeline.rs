//! Sequential, fail-fast provisioning pipeline.

use std::{fs, io};

use camino::{Utf8Path, Utf8PathBuf};
use dls_targets::{BINARY_PREFIX, PlatformTarget, lookup, targets};
use tracing::{error, info, warn};

use crate::cleanup::purge_artifacts;
use crate::error::ProvisionError;
use crate::toolchain::Toolchain;

pub(crate) const PIPELINE_TARGET: &str = "dls_provision::pipeline";

/// Artefacts strictly smaller than this are treated as truncated builds.
pub const MIN_ARTIFACT_BYTES: u64 = 1000;

/// Source tree location relative to the repository root.
pub const DEFAULT_SOURCE_DIR: &str = "dlitescript";

/// Output directory relative to the repository root.
pub const DEFAULT_OUTPUT_DIR: &str = "resources";

#[cfg(unix)]
const EXECUTABLE_MODE: u32 = 0o755;

/// Settings for one provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOptions {
    /// Repository root; submodule updates run here.
    pub repo_root: Utf8PathBuf,
    /// Worker source tree compiled for every target.
    pub source_dir: Utf8PathBuf,
    /// Directory receiving the published artefacts.
    pub output_dir: Utf8PathBuf,
    /// Minimum accepted artefact size in bytes.
    pub minimum_size: u64,
    /// Targets to build, in build order.
    pub targets: Vec<PlatformTarget>,
    /// Whether to update the source tree's submodules first.
    pub sync_sources: bool,
}

impl ProvisionOptions {
    /// Options for the full table rooted at `repo_root`.
    #[must_use]
    pub fn new(repo_root: impl Into<Utf8PathBuf>) -> Self {
        let repo_root = repo_root.into();
        Self {
            source_dir: repo_root.join(DEFAULT_SOURCE_DIR),
            output_dir: repo_root.join(DEFAULT_OUTPUT_DIR),
            repo_root,
            minimum_size: MIN_ARTIFACT_BYTES,
            targets: targets().to_vec(),
            sync_sources: true,
        }
    }

    /// Resolves the repository, source and output paths against the working
    /// directory so they stay valid when the compiler runs elsewhere.
    ///
    /// # Errors
    /// Returns an error when the working directory cannot be determined or
    /// is not valid UTF-8.
    pub fn to_absolute(&self) -> Result<Self, ProvisionError> {
        Ok(Self {
            repo_root: absolute(&self.repo_root)?,
            source_dir: absolute(&self.source_dir)?,
            output_dir: absolute(&self.output_dir)?,
            ..self.clone()
        })
    }
}

fn absolute(path: &Utf8Path) -> Result<Utf8PathBuf, ProvisionError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::path::absolute(path)
        .and_then(|resolved| {
            Utf8PathBuf::from_path_buf(resolved).map_err(|lossy| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("non UTF-8 path: {}", lossy.display()),
                )
            })
        })
        .map_err(|source| ProvisionError::ResolvePath {
            path: path.to_path_buf(),
            source,
        })
}

/// Result of building one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Target the artefact was built for.
    pub platform_key: String,
    /// Artefact location.
    pub output_path: Utf8PathBuf,
    /// Artefact size in bytes, zero when unknown.
    pub size_bytes: u64,
    /// Whether the artefact passed validation.
    pub succeeded: bool,
    /// Failure description for unsuccessful builds.
    pub error_message: Option<String>,
}

impl BuildOutcome {
    fn success(target: PlatformTarget, output_path: Utf8PathBuf, size_bytes: u64) -> Self {
        Self {
            platform_key: target.platform_key().to_owned(),
            output_path,
            size_bytes,
            succeeded: true,
            error_message: None,
        }
    }

    fn failure(target: PlatformTarget, output_path: Utf8PathBuf, error: &ProvisionError) -> Self {
        let size_bytes = match error {
            ProvisionError::UndersizedArtifact { size, .. } => *size,
            _ => 0,
        };
        Self {
            platform_key: target.platform_key().to_owned(),
            output_path,
            size_bytes,
            succeeded: false,
            error_message: Some(error.to_string()),
        }
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Stale artefacts deleted before compiling.
    pub removed: Vec<Utf8PathBuf>,
    /// One successful outcome per target, in build order.
    pub outcomes: Vec<BuildOutcome>,
}

/// Restricts the table to `keys`, keeping table order.
///
/// An empty filter selects every target. Keys missing from the table are
/// returned separately so callers can report them as skipped.
#[must_use]
pub fn select_targets(keys: &[String]) -> (Vec<PlatformTarget>, Vec<String>) {
    if keys.is_empty() {
        return (targets().to_vec(), Vec::new());
    }

    let skipped: Vec<String> = keys
        .iter()
        .filter(|key| lookup(key).is_none())
        .cloned()
        .collect();
    let selected = targets()
        .iter()
        .filter(|target| keys.iter().any(|key| key == target.platform_key()))
        .copied()
        .collect();
    (selected, skipped)
}

/// Runs the pipeline: preconditions, cleanup, then compile-and-validate.
///
/// Relative paths in `requested` are resolved against the working directory
/// before any command runs.
///
/// # Errors
/// Returns the first failure; later targets are not attempted.
pub fn provision<T>(
    requested: &ProvisionOptions,
    toolchain: &T,
) -> Result<ProvisionReport, ProvisionError>
where
    T: Toolchain + ?Sized,
{
    let resolved = requested.to_absolute()?;
    let options = &resolved;
    info!(target: PIPELINE_TARGET, path = %options.source_dir, "checking source tree");
    if !options.source_dir.is_dir() {
        return Err(ProvisionError::MissingSourceTree {
            path: options.source_dir.clone(),
        });
    }

    if options.sync_sources {
        info!(target: PIPELINE_TARGET, "updating source submodules");
        toolchain
            .sync_sources(&options.repo_root)
            .map_err(|source| ProvisionError::SourceSync { source })?;
    }

    info!(target: PIPELINE_TARGET, "checking cross-compiler");
    toolchain
        .ensure_available()
        .map_err(|source| ProvisionError::ToolchainUnavailable { source })?;

    info!(target: PIPELINE_TARGET, path = %options.output_dir, "clearing old binaries");
    let removed = purge_artifacts(&options.output_dir)?;
    fs::create_dir_all(&options.output_dir).map_err(|source| {
        ProvisionError::CreateOutputDir {
            path: options.output_dir.clone(),
            source,
        }
    })?;

    let mut outcomes = Vec::with_capacity(options.targets.len());
    for target in &options.targets {
        let output_path = options
            .output_dir
            .join(target.artifact_name(BINARY_PREFIX));
        match build_target(options, toolchain, *target, &output_path) {
            Ok(size_bytes) => {
                outcomes.push(BuildOutcome::success(*target, output_path, size_bytes));
            }
            Err(failure) => {
                let outcome = BuildOutcome::failure(*target, output_path, &failure);
                error!(
                    target: PIPELINE_TARGET,
                    platform = %outcome.platform_key,
                    path = %outcome.output_path,
                    size = outcome.size_bytes,
                    "build failed; aborting run"
                );
                return Err(failure);
            }
        }
    }

    info!(target: PIPELINE_TARGET, count = outcomes.len(), "all binaries have been compiled");
    Ok(ProvisionReport { removed, outcomes })
}

fn build_target<T>(
    options: &ProvisionOptions,
    toolchain: &T,
    target: PlatformTarget,
    output_path: &Utf8Path,
) -> Result<u64, ProvisionError>
where
    T: Toolchain + ?Sized,
{
    let platform_key = target.platform_key().to_owned();
    info!(target: PIPELINE_TARGET, platform = %platform_key, "compiling");
    toolchain
        .compile(&options.source_dir, target, output_path)
        .map_err(|failure| ProvisionError::Compile {
            platform_key: platform_key.clone(),
            message: failure.to_string(),
        })?;

    let size = fs::metadata(output_path)
        .map_err(|source| ProvisionError::Inspect {
            platform_key: platform_key.clone(),
            path: output_path.to_path_buf(),
            source,
        })?
        .len();
    if size < options.minimum_size {
        if let Err(removal) = fs::remove_file(output_path) {
            warn!(
                target: PIPELINE_TARGET,
                path = %output_path,
                error = %removal,
                "failed to delete undersized artefact"
            );
        }
        return Err(ProvisionError::UndersizedArtifact {
            platform_key,
            path: output_path.to_path_buf(),
            size,
            minimum: options.minimum_size,
        });
    }

    if !target.is_windows() {
        mark_executable(output_path).map_err(|source| ProvisionError::Permissions {
            platform_key,
            path: output_path.to_path_buf(),
            source,
        })?;
    }

    Ok(size)
}

#[cfg(unix)]
fn mark_executable(path: &Utf8Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(EXECUTABLE_MODE))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Utf8Path) -> std::io::Result<()> {
    Ok(())
}
