//! Error type shared by the binary runtimes.

use std::io;
use std::sync::Arc;

use dls_provision::ProvisionError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    #[error("none of the requested platform keys are supported: {keys}")]
    NoTargets { keys: String },
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}
