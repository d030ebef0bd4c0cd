//! Duplex byte channels to the worker process.
//!
//! The supervisor treats the worker as an opaque channel: it can be
//! started, stopped, probed for liveness and written to. [`StdioTransport`]
//! is the production implementation over the child's stdin/stdout.

mod error;
mod framing;
mod jsonrpc;
mod lifecycle;
mod stdio;

use std::time::Duration;

pub use error::TransportError;
pub use stdio::{StdioSettings, StdioTransport, StdioTransportFactory};

use crate::resolver::ResolvedCommand;

/// Log target for transport operations.
pub(crate) const TRANSPORT_TARGET: &str = "dls_supervisor::transport";

/// A channel to one worker process.
pub trait Transport: Send {
    /// Spawns the worker and completes the start handshake.
    ///
    /// # Errors
    /// Returns an error when the process cannot be spawned, exits early or
    /// does not complete the handshake in time. No process is left behind.
    fn start(&mut self) -> Result<(), TransportError>;

    /// Flushes pending writes, closes the channel and waits for the worker to exit.
    ///
    /// Stopping a worker that has already exited succeeds.
    ///
    /// # Errors
    /// Returns an error when the worker cannot be reaped.
    fn stop(&mut self) -> Result<(), TransportError>;

    /// Whether the worker process is still alive.
    fn is_running(&mut self) -> bool;

    /// Writes one message to the worker.
    ///
    /// # Errors
    /// Returns an error when the worker is not running or the write fails.
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    /// Waits up to `timeout` for the next message from the worker.
    ///
    /// # Errors
    /// Returns an error when the worker is gone or the stream is malformed.
    fn receive(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError>;

    /// Operating-system process id of the live worker.
    fn pid(&self) -> Option<u32>;
}

/// Builds a fresh transport for every start attempt.
pub trait TransportFactory: Send + Sync {
    /// Creates an unstarted transport for `command`.
    fn create(&self, command: &ResolvedCommand) -> Box<dyn Transport>;
}
