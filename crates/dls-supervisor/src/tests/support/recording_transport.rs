//! Recording transport used in tests.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crate::{ResolvedCommand, Transport, TransportError, TransportFactory};

const FIRST_PID: u32 = 100;

/// Lifecycle event observed by the recording factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A transport finished starting with this pid.
    Opened(u32),
    /// A transport was stopped or dropped while alive.
    Closed(u32),
    /// A worker died on its own.
    Exited(u32),
}

#[derive(Default)]
struct FactoryState {
    events: Vec<TransportEvent>,
    commands: Vec<ResolvedCommand>,
    sent: Vec<Vec<u8>>,
    next_pid: u32,
    live: usize,
    max_live: usize,
    start_failures: VecDeque<String>,
    start_delay: Duration,
    current: Option<(u32, Arc<AtomicBool>)>,
}

/// Factory handing out [`RecordingTransport`]s that share one event log.
#[derive(Clone)]
pub struct RecordingFactory {
    shared: Arc<Mutex<FactoryState>>,
}

impl RecordingFactory {
    /// Creates a factory whose transports always start successfully.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(FactoryState {
                next_pid: FIRST_PID,
                ..FactoryState::default()
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, FactoryState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the next start attempt fail with `message`.
    pub fn fail_next_start(&self, message: &str) {
        self.state().start_failures.push_back(message.to_owned());
    }

    /// Delays every start attempt, simulating a slow handshake.
    pub fn set_start_delay(&self, delay: Duration) {
        self.state().start_delay = delay;
    }

    /// Simulates the most recent worker exiting on its own.
    pub fn crash_current(&self) {
        let mut state = self.state();
        if let Some((pid, alive)) = state.current.clone()
            && alive.swap(false, Ordering::SeqCst)
        {
            state.events.push(TransportEvent::Exited(pid));
            state.live -= 1;
        }
    }

    /// Every lifecycle event so far.
    pub fn events(&self) -> Vec<TransportEvent> {
        self.state().events.clone()
    }

    /// Number of successful starts.
    pub fn opened(&self) -> usize {
        self.state()
            .events
            .iter()
            .filter(|event| matches!(event, TransportEvent::Opened(_)))
            .count()
    }

    /// Commands passed to the factory, one per start attempt.
    pub fn commands(&self) -> Vec<ResolvedCommand> {
        self.state().commands.clone()
    }

    /// Payloads written through any transport.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.state().sent.clone()
    }

    /// Workers alive right now.
    pub fn live(&self) -> usize {
        self.state().live
    }

    /// Largest number of simultaneously alive workers observed.
    pub fn max_live(&self) -> usize {
        self.state().max_live
    }
}

impl TransportFactory for RecordingFactory {
    fn create(&self, command: &ResolvedCommand) -> Box<dyn Transport> {
        self.state().commands.push(command.clone());
        Box::new(RecordingTransport {
            shared: Arc::clone(&self.shared),
            command: command.clone(),
            pid: None,
            alive: Arc::new(AtomicBool::new(false)),
        })
    }
}

/// Test double standing in for a worker process.
struct RecordingTransport {
    shared: Arc<Mutex<FactoryState>>,
    command: ResolvedCommand,
    pid: Option<u32>,
    alive: Arc<AtomicBool>,
}

impl RecordingTransport {
    fn state(&self) -> MutexGuard<'_, FactoryState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close(&mut self) {
        if let Some(pid) = self.pid.take()
            && self.alive.swap(false, Ordering::SeqCst)
        {
            let mut state = self.state();
            state.events.push(TransportEvent::Closed(pid));
            state.live -= 1;
        }
    }
}

impl Transport for RecordingTransport {
    fn start(&mut self) -> Result<(), TransportError> {
        let delay = self.state().start_delay;
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let mut state = self.state();
        if let Some(message) = state.start_failures.pop_front() {
            return Err(TransportError::SpawnFailed {
                command: self.command.executable_path.clone(),
                source: io::Error::other(message),
            });
        }

        let pid = state.next_pid;
        state.next_pid += 1;
        state.events.push(TransportEvent::Opened(pid));
        state.live += 1;
        state.max_live = state.max_live.max(state.live);
        self.alive.store(true, Ordering::SeqCst);
        state.current = Some((pid, Arc::clone(&self.alive)));
        drop(state);
        self.pid = Some(pid);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), TransportError> {
        self.close();
        self.pid = None;
        Ok(())
    }

    fn is_running(&mut self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(TransportError::ProcessExited);
        }
        self.state().sent.push(payload.to_vec());
        Ok(())
    }

    fn receive(&mut self, _timeout: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        if self.alive.load(Ordering::SeqCst) {
            Ok(None)
        } else {
            Err(TransportError::ProcessExited)
        }
    }

    fn pid(&self) -> Option<u32> {
        self.pid
    }
}

impl Drop for RecordingTransport {
    fn drop(&mut self) {
        self.close();
    }
}
