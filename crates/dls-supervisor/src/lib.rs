//! Resolution, launch and supervision of the DLiteScript language worker.
//!
//! A [`Supervisor`] owns at most one live worker. Every public operation
//! runs under a single transition lock, so concurrent callers always see a
//! completed transition. Configuration is re-read through a
//! [`ConfigSource`] on every start attempt, the executable is chosen by
//! [`resolve`], and the process itself is driven through a [`Transport`].
//!
//! State changes are published to a [`SupervisorReporter`] rather than to
//! any UI directly; [`Supervisor::subscribe`] hands out event receivers.

mod config_source;
mod events;
mod resolver;
mod supervisor;
pub mod transport;

pub use config_source::{ConfigSource, ConfigSourceError, OrthoConfigSource, StaticConfigSource};
pub use events::{
    ChannelReporter, FanoutReporter, Operation, StateChange, StructuredReporter, SupervisorEvent,
    SupervisorReporter, WorkerInfo,
};
pub use resolver::{ResolutionSource, ResolvedCommand, resolve};
pub use supervisor::{Supervisor, SupervisorError, SupervisorOptions, SupervisorState, Watchdog};
pub use transport::{StdioTransport, StdioTransportFactory, Transport, TransportError, TransportFactory};

#[cfg(test)]
mod tests;
