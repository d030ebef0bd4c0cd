//! Removal of previously published artefacts.

use std::fs;
use std::io::ErrorKind;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::error::ProvisionError;
use crate::pipeline::PIPELINE_TARGET;

/// File-name prefix shared by every published artefact.
pub const ARTIFACT_PREFIX: &str = "dlitescript-";

/// Deletes every file in `output_dir` whose name starts with [`ARTIFACT_PREFIX`].
///
/// Unrelated files and directories are left alone. A missing directory is
/// treated as already clean. Returns the removed paths.
///
/// # Errors
/// Returns an error when the directory cannot be listed or a matching file
/// cannot be removed.
pub fn purge_artifacts(output_dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, ProvisionError> {
    let entries = match fs::read_dir(output_dir) {
        Ok(entries) => entries,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ProvisionError::ListOutputDir {
                path: output_dir.to_path_buf(),
                source,
            });
        }
    };

    let mut removed = Vec::new();
    for listed in entries {
        let entry = listed.map_err(|source| ProvisionError::ListOutputDir {
            path: output_dir.to_path_buf(),
            source,
        })?;
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if !name.starts_with(ARTIFACT_PREFIX) {
            continue;
        }
        let is_file = entry.file_type().is_ok_and(|kind| !kind.is_dir());
        if !is_file {
            continue;
        }

        let path = output_dir.join(&name);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(error) if error.kind() == ErrorKind::NotFound => continue,
            Err(source) => return Err(ProvisionError::Cleanup { path, source }),
        }
        debug!(target: PIPELINE_TARGET, path = %path, "removed stale artefact");
        removed.push(path);
    }

    removed.sort();
    Ok(removed)
}
