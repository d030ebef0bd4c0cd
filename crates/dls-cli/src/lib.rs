//! Runtimes behind the `dls-provision` and `dls-host` binaries.
//!
//! Both entry points take their argument list and output streams as
//! parameters so tests can drive them without spawning processes.

mod errors;
mod host;
mod provision;
mod telemetry;

pub use host::{Flow, Host, HostCommand, HostCommandParseError, run_host};
pub use provision::run_provision;
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
