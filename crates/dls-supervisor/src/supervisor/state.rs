//! Supervisor state machine states.

use std::fmt;

/// Lifecycle state of the supervised worker.
///
/// A live worker handle exists only in `Running`, and transiently in
/// `Stopping` while a stop is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SupervisorState {
    /// Configuration disables the worker.
    Disabled,
    /// No worker is running.
    Stopped,
    /// A worker is being spawned.
    Starting,
    /// A worker is live.
    Running,
    /// A worker is being shut down.
    Stopping,
    /// The last operation failed; the supervisor remains usable.
    Failed(String),
}

impl SupervisorState {
    /// Whether this is [`SupervisorState::Running`].
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Failure reason for [`SupervisorState::Failed`].
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => formatter.write_str("disabled"),
            Self::Stopped => formatter.write_str("stopped"),
            Self::Starting => formatter.write_str("starting"),
            Self::Running => formatter.write_str("running"),
            Self::Stopping => formatter.write_str("stopping"),
            Self::Failed(reason) => write!(formatter, "failed: {reason}"),
        }
    }
}
