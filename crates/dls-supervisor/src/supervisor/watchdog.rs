//! Background liveness polling.

use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use super::{SUPERVISOR_TARGET, Supervisor};

/// Periodically calls [`Supervisor::reconcile`] so an unexpected worker exit
/// is noticed without waiting for the next operation.
///
/// The thread holds only a weak reference and exits once the supervisor is
/// dropped. Dropping the watchdog stops and joins the thread.
pub struct Watchdog {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Watchdog {
    /// Starts polling `supervisor` every `interval`.
    ///
    /// # Errors
    /// Returns an error when the polling thread cannot be spawned.
    pub fn spawn(supervisor: &Arc<Supervisor>, interval: Duration) -> io::Result<Self> {
        let weak = Arc::downgrade(supervisor);
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name(String::from("dls-watchdog"))
            .spawn(move || {
                loop {
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            if !poll(&weak) {
                                break;
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;
        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    /// Stops polling and waits for the thread to finish.
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.halt();
    }
}

fn poll(weak: &Weak<Supervisor>) -> bool {
    let Some(supervisor) = weak.upgrade() else {
        return false;
    };
    if supervisor.reconcile() {
        debug!(target: SUPERVISOR_TARGET, "watchdog observed worker exit");
    }
    true
}
