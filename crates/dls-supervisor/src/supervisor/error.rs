//! Errors returned by supervisor operations.

use thiserror::Error;

use crate::config_source::ConfigSourceError;
use crate::transport::TransportError;

/// Failure of a single supervisor operation.
///
/// The supervisor stays usable after any of these; the next `start()` tries
/// again from scratch.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Configuration could not be read.
    #[error(transparent)]
    Configuration(#[from] ConfigSourceError),

    /// The worker could not be spawned or did not complete its handshake.
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        /// Rendered command line.
        command: String,
        /// The transport failure.
        #[source]
        source: TransportError,
    },

    /// The worker could not be stopped cleanly.
    #[error("failed to stop worker: {source}")]
    Stop {
        /// The transport failure.
        #[source]
        source: TransportError,
    },

    /// The operation needs a running worker.
    #[error("worker is not running")]
    NotRunning,

    /// Writing to or reading from the worker failed.
    #[error("failed to exchange data with worker: {source}")]
    Send {
        /// The transport failure.
        #[source]
        source: TransportError,
    },
}

impl SupervisorError {
    /// Reason text recorded in [`crate::SupervisorState::Failed`].
    #[must_use]
    pub fn reason(&self) -> String {
        self.to_string()
    }
}
