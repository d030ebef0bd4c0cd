//! Serialised lifecycle control for the worker.

mod error;
mod state;
mod watchdog;

use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use dls_config::Config;
use dls_targets::HostPlatform;
use tracing::{debug, info, warn};

pub use error::SupervisorError;
pub use state::SupervisorState;
pub use watchdog::Watchdog;

use crate::config_source::ConfigSource;
use crate::events::{
    ChannelReporter, Operation, StateChange, StructuredReporter, SupervisorEvent,
    SupervisorReporter, WorkerInfo,
};
use crate::resolver::resolve;
use crate::transport::{Transport, TransportFactory};

/// Log target for supervisor operations.
pub(crate) const SUPERVISOR_TARGET: &str = "dls_supervisor::supervisor";

/// Construction-time settings that do not change between starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorOptions {
    /// Directory holding bundled worker binaries.
    pub resources_dir: Utf8PathBuf,
    /// Platform used to pick a bundled binary.
    pub host: HostPlatform,
    /// Pause between the stop and start phases of a restart.
    ///
    /// Stop already waits for the worker to exit, so this is only a fallback
    /// for workers that release resources after exiting.
    pub settle_delay: Duration,
}

impl SupervisorOptions {
    /// Options for the current host with no settle delay.
    #[must_use]
    pub fn new(resources_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            resources_dir: resources_dir.into(),
            host: HostPlatform::current(),
            settle_delay: Duration::ZERO,
        }
    }

    /// Reads the supervisor fields from a loaded configuration.
    ///
    /// A relative resources directory is anchored to the directory holding
    /// the running executable, so lookups do not depend on where the host
    /// was launched from.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let options = Self {
            settle_delay: config.settle_delay(),
            ..Self::new(config.resources_dir())
        };
        if options.resources_dir.is_absolute() {
            return options;
        }
        match install_dir() {
            Some(dir) => options.with_install_dir(&dir),
            None => {
                warn!(
                    target: SUPERVISOR_TARGET,
                    path = %options.resources_dir,
                    "executable location unknown; resources directory stays relative"
                );
                options
            }
        }
    }

    /// Anchors a relative resources directory to `install_dir`.
    #[must_use]
    pub fn with_install_dir(mut self, install_dir: &Utf8Path) -> Self {
        if self.resources_dir.is_relative() {
            self.resources_dir = install_dir.join(&self.resources_dir);
        }
        self
    }

    /// Overrides the host platform.
    #[must_use]
    pub fn with_host(mut self, host: HostPlatform) -> Self {
        self.host = host;
        self
    }

    /// Overrides the restart settle delay.
    #[must_use]
    pub const fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }
}

fn install_dir() -> Option<Utf8PathBuf> {
    let exe = std::env::current_exe()
        .ok()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())?;
    exe.parent().map(Utf8Path::to_path_buf)
}

struct Worker {
    transport: Box<dyn Transport>,
    info: WorkerInfo,
}

struct Inner {
    state: SupervisorState,
    worker: Option<Worker>,
}

/// Owns at most one worker and serialises every transition on it.
///
/// Each public operation takes the transition lock for its whole duration,
/// so a `stop()` issued while a `start()` is spawning waits for the start to
/// finish and then stops the new worker. Waiters are woken in the order the
/// standard library mutex chooses, which is not strictly first-come.
pub struct Supervisor {
    inner: Mutex<Inner>,
    config: Arc<dyn ConfigSource>,
    factory: Arc<dyn TransportFactory>,
    reporter: Arc<dyn SupervisorReporter>,
    subscribers: Mutex<Vec<ChannelReporter>>,
    options: SupervisorOptions,
}

impl Supervisor {
    /// Creates a supervisor in `Disabled` or `Stopped`, per current configuration.
    #[must_use]
    pub fn new(
        config: Arc<dyn ConfigSource>,
        factory: Arc<dyn TransportFactory>,
        options: SupervisorOptions,
    ) -> Self {
        let state = match config.load() {
            Ok(server) if !server.enabled => SupervisorState::Disabled,
            Ok(_) => SupervisorState::Stopped,
            Err(error) => {
                warn!(
                    target: SUPERVISOR_TARGET,
                    error = %error,
                    "configuration unavailable at construction; starting stopped"
                );
                SupervisorState::Stopped
            }
        };
        Self {
            inner: Mutex::new(Inner {
                state,
                worker: None,
            }),
            config,
            factory,
            reporter: Arc::new(StructuredReporter::new()),
            subscribers: Mutex::new(Vec::new()),
            options,
        }
    }

    /// Replaces the default `tracing` reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn SupervisorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Returns a receiver for every subsequent event.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<SupervisorEvent> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ChannelReporter::new(sender));
        receiver
    }

    /// Starts the worker unless one is already running.
    ///
    /// Configuration is read fresh. A disabled configuration moves the
    /// supervisor to `Disabled` without spawning anything.
    ///
    /// # Errors
    /// Returns an error when configuration cannot be read or the worker fails
    /// to spawn or handshake; the state becomes `Failed`.
    pub fn start(&self) -> Result<SupervisorState, SupervisorError> {
        let mut inner = self.lock();
        self.start_locked(&mut inner)
            .inspect_err(|error| self.report_failure(Operation::Start, error))
    }

    /// Stops the worker if one is running; otherwise does nothing.
    ///
    /// # Errors
    /// Returns an error when the worker cannot be reaped; the handle is
    /// discarded regardless.
    pub fn stop(&self) -> Result<SupervisorState, SupervisorError> {
        let mut inner = self.lock();
        self.stop_locked(&mut inner)
            .inspect_err(|error| self.report_failure(Operation::Stop, error))
    }

    /// Stops then starts the worker with no other operation in between.
    ///
    /// # Errors
    /// Returns the first failure of either phase.
    pub fn restart(&self) -> Result<SupervisorState, SupervisorError> {
        let mut inner = self.lock();
        self.restart_locked(&mut inner)
            .inspect_err(|error| self.report_failure(Operation::Restart, error))
    }

    /// Stops a running worker or starts a stopped one.
    ///
    /// Does nothing at all when configuration reports the worker disabled.
    ///
    /// # Errors
    /// Returns an error when configuration cannot be read or the chosen
    /// operation fails.
    pub fn toggle_enabled(&self) -> Result<SupervisorState, SupervisorError> {
        let mut inner = self.lock();
        self.toggle_locked(&mut inner)
            .inspect_err(|error| self.report_failure(Operation::Toggle, error))
    }

    /// Whether the state is `Running` and the worker process is alive.
    ///
    /// Does not change state; see [`Supervisor::reconcile`].
    #[must_use]
    pub fn is_running(&self) -> bool {
        let mut inner = self.lock();
        let Inner { state, worker } = &mut *inner;
        state.is_running()
            && worker
                .as_mut()
                .is_some_and(|live| live.transport.is_running())
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SupervisorState {
        self.lock().state.clone()
    }

    /// Identity of the live worker, if any.
    #[must_use]
    pub fn worker(&self) -> Option<WorkerInfo> {
        self.lock().worker.as_ref().map(|live| live.info.clone())
    }

    /// Writes one message to the live worker.
    ///
    /// # Errors
    /// Returns [`SupervisorError::NotRunning`] without a live worker, or
    /// [`SupervisorError::Send`] when the write fails.
    pub fn send(&self, payload: &[u8]) -> Result<(), SupervisorError> {
        let mut inner = self.lock();
        self.reconcile_locked(&mut inner);
        let result = match inner.worker.as_mut() {
            Some(live) => live
                .transport
                .send(payload)
                .map_err(|source| SupervisorError::Send { source }),
            None => Err(SupervisorError::NotRunning),
        };
        result.inspect_err(|error| self.report_failure(Operation::Send, error))
    }

    /// Waits up to `timeout` for the next message from the live worker.
    ///
    /// The transition lock is held while waiting, so keep `timeout` short.
    ///
    /// # Errors
    /// Returns [`SupervisorError::NotRunning`] without a live worker, or
    /// [`SupervisorError::Send`] when the stream fails.
    pub fn receive(&self, timeout: Duration) -> Result<Option<Vec<u8>>, SupervisorError> {
        let mut inner = self.lock();
        self.reconcile_locked(&mut inner);
        let result = match inner.worker.as_mut() {
            Some(live) => live
                .transport
                .receive(timeout)
                .map_err(|source| SupervisorError::Send { source }),
            None => Err(SupervisorError::NotRunning),
        };
        result.inspect_err(|error| self.report_failure(Operation::Send, error))
    }

    /// Demotes `Running` to `Stopped` when the worker has exited on its own.
    ///
    /// Returns `true` when a demotion happened. Every operation already
    /// reconciles first; this is for watchdogs and status displays.
    pub fn reconcile(&self) -> bool {
        let mut inner = self.lock();
        self.reconcile_locked(&mut inner)
    }

    /// Final stop for host teardown.
    ///
    /// # Errors
    /// Returns an error when the worker cannot be reaped.
    pub fn shutdown(&self) -> Result<(), SupervisorError> {
        info!(target: SUPERVISOR_TARGET, "shutting down worker supervisor");
        self.stop().map(drop)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Recover from poisoning so teardown can still stop the worker.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_locked(&self, inner: &mut Inner) -> Result<SupervisorState, SupervisorError> {
        self.reconcile_locked(inner);
        if inner.state.is_running() {
            debug!(target: SUPERVISOR_TARGET, "worker already running");
            return Ok(SupervisorState::Running);
        }

        let config = match self.config.load() {
            Ok(config) => config,
            Err(source) => {
                let error = SupervisorError::from(source);
                self.transition(inner, SupervisorState::Failed(error.reason()));
                return Err(error);
            }
        };
        if !config.enabled {
            debug!(target: SUPERVISOR_TARGET, "worker disabled in configuration");
            self.transition(inner, SupervisorState::Disabled);
            return Ok(SupervisorState::Disabled);
        }

        self.transition(inner, SupervisorState::Starting);
        let command = resolve(&config, &self.options.host, &self.options.resources_dir);
        info!(
            target: SUPERVISOR_TARGET,
            command = %command,
            source = ?command.source,
            "starting worker"
        );

        let mut transport = self.factory.create(&command);
        if let Err(source) = transport.start() {
            drop(transport);
            let error = SupervisorError::Spawn {
                command: command.to_string(),
                source,
            };
            self.transition(inner, SupervisorState::Failed(error.reason()));
            return Err(error);
        }

        let info = WorkerInfo {
            pid: transport.pid(),
            command,
        };
        inner.worker = Some(Worker {
            transport,
            info: info.clone(),
        });
        self.transition(inner, SupervisorState::Running);
        self.publish(&SupervisorEvent::WorkerStarted(info));
        Ok(SupervisorState::Running)
    }

    fn stop_locked(&self, inner: &mut Inner) -> Result<SupervisorState, SupervisorError> {
        self.reconcile_locked(inner);
        let Some(mut worker) = inner.worker.take() else {
            debug!(target: SUPERVISOR_TARGET, state = %inner.state, "no worker to stop");
            return Ok(inner.state.clone());
        };

        self.transition(inner, SupervisorState::Stopping);
        let outcome = worker.transport.stop();
        let Worker { transport, info } = worker;
        drop(transport);
        self.publish(&SupervisorEvent::WorkerStopped(info));

        match outcome {
            Ok(()) => {
                self.transition(inner, SupervisorState::Stopped);
                Ok(SupervisorState::Stopped)
            }
            Err(source) => {
                let error = SupervisorError::Stop { source };
                self.transition(inner, SupervisorState::Failed(error.reason()));
                Err(error)
            }
        }
    }

    fn restart_locked(&self, inner: &mut Inner) -> Result<SupervisorState, SupervisorError> {
        self.stop_locked(inner)?;
        if !self.options.settle_delay.is_zero() {
            debug!(
                target: SUPERVISOR_TARGET,
                delay_ms = self.options.settle_delay.as_millis(),
                "settling before restart"
            );
            thread::sleep(self.options.settle_delay);
        }
        self.start_locked(inner)
    }

    fn toggle_locked(&self, inner: &mut Inner) -> Result<SupervisorState, SupervisorError> {
        let config = self.config.load()?;
        if !config.enabled {
            debug!(target: SUPERVISOR_TARGET, "toggle ignored while disabled");
            return Ok(inner.state.clone());
        }

        self.reconcile_locked(inner);
        if inner.state.is_running() {
            self.stop_locked(inner)
        } else {
            self.start_locked(inner)
        }
    }

    fn reconcile_locked(&self, inner: &mut Inner) -> bool {
        if !inner.state.is_running() {
            return false;
        }
        let alive = inner
            .worker
            .as_mut()
            .is_some_and(|live| live.transport.is_running());
        if alive {
            return false;
        }

        warn!(target: SUPERVISOR_TARGET, "worker exited unexpectedly");
        if let Some(Worker {
            mut transport,
            info,
        }) = inner.worker.take()
        {
            if let Err(error) = transport.stop() {
                debug!(target: SUPERVISOR_TARGET, error = %error, "reaping exited worker failed");
            }
            drop(transport);
            self.publish(&SupervisorEvent::WorkerStopped(info));
        }
        self.transition(inner, SupervisorState::Stopped);
        true
    }

    fn transition(&self, inner: &mut Inner, to: SupervisorState) {
        if inner.state == to {
            return;
        }
        let from = std::mem::replace(&mut inner.state, to.clone());
        debug!(target: SUPERVISOR_TARGET, %from, %to, "transition");
        self.publish(&SupervisorEvent::StateChanged(StateChange { from, to }));
    }

    fn publish(&self, event: &SupervisorEvent) {
        match event {
            SupervisorEvent::StateChanged(change) => self.reporter.state_changed(change),
            SupervisorEvent::WorkerStarted(worker) => self.reporter.worker_started(worker),
            SupervisorEvent::WorkerStopped(worker) => self.reporter.worker_stopped(worker),
            SupervisorEvent::OperationFailed { .. } => {}
        }
        self.forward(event);
    }

    fn report_failure(&self, operation: Operation, error: &SupervisorError) {
        self.reporter.operation_failed(operation, error);
        self.forward(&SupervisorEvent::OperationFailed {
            operation,
            reason: error.reason(),
        });
    }

    fn forward(&self, event: &SupervisorEvent) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|subscriber| subscriber.forward(event.clone()));
    }
}
