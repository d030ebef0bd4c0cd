//! Line commands understood by the host.

use std::str::FromStr;

use thiserror::Error;

/// One command read from the host's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    /// Start the worker.
    Start,
    /// Stop the worker.
    Stop,
    /// Restart the worker.
    Restart,
    /// Flip between running and stopped.
    Toggle,
    /// Report the current state.
    Status,
    /// Stop the worker and exit.
    Quit,
}

/// Input line that is not a known command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown command `{input}`; expected start, stop, restart, toggle, status or quit")]
pub struct HostCommandParseError {
    input: String,
}

impl FromStr for HostCommand {
    type Err = HostCommandParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "restart" => Ok(Self::Restart),
            "toggle" => Ok(Self::Toggle),
            "status" => Ok(Self::Status),
            "quit" | "exit" => Ok(Self::Quit),
            _ => Err(HostCommandParseError {
                input: input.trim().to_owned(),
            }),
        }
    }
}
