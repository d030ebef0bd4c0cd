//! Error types for worker transports.

use std::io;

use thiserror::Error;

/// Errors raised while spawning or talking to the worker process.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The worker binary was not found.
    #[error("worker binary not found: {command}")]
    BinaryNotFound {
        /// The command that was not found.
        command: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The operating system refused to start the worker.
    #[error("failed to spawn worker `{command}`: {source}")]
    SpawnFailed {
        /// The command that failed to start.
        command: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Transport-level I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The start handshake did not complete in time.
    #[error("worker did not answer the start handshake within {timeout_ms}ms")]
    HandshakeTimeout {
        /// The bound that expired, in milliseconds.
        timeout_ms: u128,
    },

    /// The worker rejected or garbled the start handshake.
    #[error("start handshake failed: {message}")]
    HandshakeFailed {
        /// Description of the failure.
        message: String,
    },

    /// The worker process is gone.
    #[error("worker process exited unexpectedly")]
    ProcessExited,

    /// JSON serialisation or deserialisation error.
    #[error("JSON codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Invalid header format.
    #[error("invalid header format")]
    InvalidHeader,

    /// Missing Content-Length header.
    #[error("missing Content-Length header")]
    MissingContentLength,
}

impl TransportError {
    /// Classifies a spawn failure by its I/O error kind.
    #[must_use]
    pub fn spawn(command: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::BinaryNotFound {
                command: command.to_owned(),
                source,
            }
        } else {
            Self::SpawnFailed {
                command: command.to_owned(),
                source,
            }
        }
    }
}
