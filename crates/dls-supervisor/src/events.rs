//! State-change notifications emitted by the supervisor.

use std::sync::Arc;
use std::sync::mpsc::Sender;

use strum::Display;

use crate::resolver::ResolvedCommand;
use crate::supervisor::{SupervisorError, SupervisorState};

const EVENTS_TARGET: &str = "dls_supervisor::events";

/// Public supervisor operations, as named in events and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    /// `start()`
    Start,
    /// `stop()`
    Stop,
    /// `restart()`
    Restart,
    /// `toggle_enabled()`
    Toggle,
    /// `send()` or `receive()`
    Send,
}

/// A completed state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    /// State before the transition.
    pub from: SupervisorState,
    /// State after the transition.
    pub to: SupervisorState,
}

/// Identity of a worker process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerInfo {
    /// Operating-system process id, when known.
    pub pid: Option<u32>,
    /// Command the worker was started with.
    pub command: ResolvedCommand,
}

/// Owned event forwarded to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// The state machine moved.
    StateChanged(StateChange),
    /// A worker finished its start handshake.
    WorkerStarted(WorkerInfo),
    /// A worker stopped, either on request or unexpectedly.
    WorkerStopped(WorkerInfo),
    /// An operation failed; `reason` matches the `Failed` state text.
    OperationFailed {
        /// The failing operation.
        operation: Operation,
        /// Human-readable failure reason.
        reason: String,
    },
}

/// Observer notified of supervisor lifecycle events.
///
/// Callbacks run while the transition lock is held and must not call back
/// into the supervisor.
pub trait SupervisorReporter: Send + Sync {
    /// Invoked after every state transition.
    fn state_changed(&self, change: &StateChange);

    /// Invoked once a worker is running.
    fn worker_started(&self, worker: &WorkerInfo);

    /// Invoked once a worker is gone.
    fn worker_stopped(&self, worker: &WorkerInfo);

    /// Invoked when an operation returns an error to its caller.
    fn operation_failed(&self, operation: Operation, error: &SupervisorError);
}

impl<T> SupervisorReporter for Arc<T>
where
    T: SupervisorReporter + ?Sized,
{
    fn state_changed(&self, change: &StateChange) {
        (**self).state_changed(change);
    }

    fn worker_started(&self, worker: &WorkerInfo) {
        (**self).worker_started(worker);
    }

    fn worker_stopped(&self, worker: &WorkerInfo) {
        (**self).worker_stopped(worker);
    }

    fn operation_failed(&self, operation: Operation, error: &SupervisorError) {
        (**self).operation_failed(operation, error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredReporter;

impl StructuredReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SupervisorReporter for StructuredReporter {
    fn state_changed(&self, change: &StateChange) {
        tracing::info!(
            target: EVENTS_TARGET,
            event = "state_changed",
            from = %change.from,
            to = %change.to,
            "worker state changed"
        );
    }

    fn worker_started(&self, worker: &WorkerInfo) {
        tracing::info!(
            target: EVENTS_TARGET,
            event = "worker_started",
            pid = ?worker.pid,
            command = %worker.command,
            "worker started"
        );
    }

    fn worker_stopped(&self, worker: &WorkerInfo) {
        tracing::info!(
            target: EVENTS_TARGET,
            event = "worker_stopped",
            pid = ?worker.pid,
            command = %worker.command,
            "worker stopped"
        );
    }

    fn operation_failed(&self, operation: Operation, error: &SupervisorError) {
        tracing::error!(
            target: EVENTS_TARGET,
            event = "operation_failed",
            %operation,
            error = %error,
            "worker operation failed"
        );
    }
}

/// Forwards events over an `mpsc` channel.
///
/// Sends to a disconnected receiver are dropped silently.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    sender: Sender<SupervisorEvent>,
}

impl ChannelReporter {
    /// Wraps the sending half of a channel.
    #[must_use]
    pub const fn new(sender: Sender<SupervisorEvent>) -> Self {
        Self { sender }
    }

    /// Sends `event`, returning `false` once the receiver is gone.
    pub fn forward(&self, event: SupervisorEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

impl SupervisorReporter for ChannelReporter {
    fn state_changed(&self, change: &StateChange) {
        self.forward(SupervisorEvent::StateChanged(change.clone()));
    }

    fn worker_started(&self, worker: &WorkerInfo) {
        self.forward(SupervisorEvent::WorkerStarted(worker.clone()));
    }

    fn worker_stopped(&self, worker: &WorkerInfo) {
        self.forward(SupervisorEvent::WorkerStopped(worker.clone()));
    }

    fn operation_failed(&self, operation: Operation, error: &SupervisorError) {
        self.forward(SupervisorEvent::OperationFailed {
            operation,
            reason: error.reason(),
        });
    }
}

/// Dispatches every event to several reporters in order.
#[derive(Clone, Default)]
pub struct FanoutReporter {
    reporters: Vec<Arc<dyn SupervisorReporter>>,
}

impl FanoutReporter {
    /// Creates an empty fan-out.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reporter to the end of the dispatch list.
    #[must_use]
    pub fn with(mut self, reporter: Arc<dyn SupervisorReporter>) -> Self {
        self.reporters.push(reporter);
        self
    }
}

impl SupervisorReporter for FanoutReporter {
    fn state_changed(&self, change: &StateChange) {
        for reporter in &self.reporters {
            reporter.state_changed(change);
        }
    }

    fn worker_started(&self, worker: &WorkerInfo) {
        for reporter in &self.reporters {
            reporter.worker_started(worker);
        }
    }

    fn worker_stopped(&self, worker: &WorkerInfo) {
        for reporter in &self.reporters {
            reporter.worker_stopped(worker);
        }
    }

    fn operation_failed(&self, operation: Operation, error: &SupervisorError) {
        for reporter in &self.reporters {
            reporter.operation_failed(operation, error);
        }
    }
}
