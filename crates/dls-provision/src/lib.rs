//! Build-time provisioning of the DLiteScript worker binaries.
//!
//! The pipeline cross-compiles the worker for every entry of the platform
//! table, rejects undersized artefacts and marks the survivors executable.
//! A single failure aborts the whole run; there is no partial publish.
//!
//! The compiler and source-sync commands sit behind [`Toolchain`] so the
//! pipeline can be exercised without Go or git installed.

mod cleanup;
mod error;
mod pipeline;
mod toolchain;

pub use cleanup::{ARTIFACT_PREFIX, purge_artifacts};
pub use error::{CommandError, ProvisionError};
pub use pipeline::{
    BuildOutcome, DEFAULT_OUTPUT_DIR, DEFAULT_SOURCE_DIR, MIN_ARTIFACT_BYTES, ProvisionOptions,
    ProvisionReport, provision, select_targets,
};
pub use toolchain::{GoToolchain, Toolchain};

#[cfg(test)]
mod tests;
