//! Bounded waiting for worker exit, with a forced kill as the last resort.

use std::io;
use std::process::{Child, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::TRANSPORT_TARGET;

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Polls the child until it exits or `grace` elapses.
pub(super) fn wait_for_exit(child: &mut Child, grace: Duration) -> Option<ExitStatus> {
    let deadline = Instant::now() + grace;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) => {}
            Err(error) => {
                warn!(
                    target: TRANSPORT_TARGET,
                    pid = child.id(),
                    error = %error,
                    "failed to check worker status"
                );
                return None;
            }
        }
        if Instant::now() >= deadline {
            return None;
        }
        thread::sleep(EXIT_POLL_INTERVAL);
    }
}

/// Waits up to `grace` for the child to exit, then kills and reaps it.
///
/// A child that has already exited is a normal outcome.
///
/// # Errors
/// Returns an error only when reaping the killed child fails.
pub(super) fn terminate_child(child: &mut Child, grace: Duration) -> io::Result<()> {
    if let Some(status) = wait_for_exit(child, grace) {
        debug!(target: TRANSPORT_TARGET, pid = child.id(), ?status, "worker exited");
        return Ok(());
    }

    warn!(
        target: TRANSPORT_TARGET,
        pid = child.id(),
        grace_ms = grace.as_millis(),
        "worker did not exit gracefully, killing"
    );
    kill_child(child)
}

/// Kills and reaps the child immediately.
pub(super) fn kill_child(child: &mut Child) -> io::Result<()> {
    if let Err(error) = child.kill() {
        // InvalidInput means the child was already reaped.
        if error.kind() != io::ErrorKind::InvalidInput {
            debug!(target: TRANSPORT_TARGET, pid = child.id(), error = %error, "kill failed");
        }
    }
    child.wait().map(drop)
}
