//! Termination signal forwarding.

use std::io;
use std::sync::mpsc::Sender;
use std::thread;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::info;

use super::{HOST_TARGET, HostInput};

/// Forwards the first termination signal to the host loop.
pub(super) fn forward_signals(sender: Sender<HostInput>) -> io::Result<()> {
    let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])?;
    thread::Builder::new()
        .name(String::from("dls-signals"))
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                info!(target: HOST_TARGET, signal, "shutdown signal received");
                let _ = sender.send(HostInput::Signal(signal));
            }
        })
        .map(drop)
}
