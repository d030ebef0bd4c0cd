//! Shared fixtures and helpers for supervisor tests.

mod recording_transport;

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use dls_config::ServerConfiguration;
use dls_targets::HostPlatform;

use crate::{StaticConfigSource, Supervisor, SupervisorEvent, SupervisorOptions};

pub use recording_transport::{RecordingFactory, TransportEvent};

/// Supervisor wired to a recording factory and a shared static configuration.
pub struct Harness {
    /// Configuration handle shared with the supervisor.
    pub config: StaticConfigSource,
    /// Factory recording every transport it hands out.
    pub factory: RecordingFactory,
    /// Supervisor under test.
    pub supervisor: Arc<Supervisor>,
}

impl Harness {
    /// Builds a harness whose worker is enabled.
    pub fn enabled() -> Self {
        Self::with_config(ServerConfiguration::default())
    }

    /// Builds a harness with explicit starting configuration.
    pub fn with_config(config: ServerConfiguration) -> Self {
        Self::with_options(config, options())
    }

    /// Builds a harness with explicit options.
    pub fn with_options(config: ServerConfiguration, options: SupervisorOptions) -> Self {
        let source = StaticConfigSource::new(config);
        let factory = RecordingFactory::new();
        let supervisor = Supervisor::new(
            Arc::new(source.clone()),
            Arc::new(factory.clone()),
            options,
        );
        Self {
            config: source,
            factory,
            supervisor: Arc::new(supervisor),
        }
    }
}

/// Options pointing at a resources directory that never exists.
pub fn options() -> SupervisorOptions {
    SupervisorOptions::new("/nonexistent/dls-resources").with_host(HostPlatform::new("linux", "x64"))
}

/// Drains every event currently queued on `receiver`.
pub fn drain(receiver: &Receiver<SupervisorEvent>) -> Vec<SupervisorEvent> {
    receiver.try_iter().collect()
}

/// Polls `condition` until it holds or `timeout` elapses.
pub fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}
