//! Stub worker transport for host tests.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use dls_config::ServerConfiguration;
use dls_supervisor::{
    ResolvedCommand, StaticConfigSource, Supervisor, SupervisorOptions, Transport,
    TransportError, TransportFactory,
};

use crate::Host;

pub(crate) const STUB_PID: u32 = 4242;

struct StubTransport {
    command: String,
    failure: Option<String>,
    alive: bool,
}

impl Transport for StubTransport {
    fn start(&mut self) -> Result<(), TransportError> {
        if let Some(message) = self.failure.take() {
            return Err(TransportError::SpawnFailed {
                command: self.command.clone(),
                source: io::Error::other(message),
            });
        }
        self.alive = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), TransportError> {
        self.alive = false;
        Ok(())
    }

    fn is_running(&mut self) -> bool {
        self.alive
    }

    fn send(&mut self, _payload: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }

    fn receive(&mut self, _timeout: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(None)
    }

    fn pid(&self) -> Option<u32> {
        self.alive.then_some(STUB_PID)
    }
}

/// Factory whose transports start instantly, or always fail with `failure`.
pub(crate) struct StubFactory {
    pub(crate) failure: Option<String>,
}

impl TransportFactory for StubFactory {
    fn create(&self, command: &ResolvedCommand) -> Box<dyn Transport> {
        Box::new(StubTransport {
            command: command.executable_path.clone(),
            failure: self.failure.clone(),
            alive: false,
        })
    }
}

/// Host over a stub supervisor, writing into a buffer.
pub(crate) fn host_with(
    config: ServerConfiguration,
    failure: Option<&str>,
) -> (Host<Vec<u8>>, StaticConfigSource) {
    let source = StaticConfigSource::new(config);
    let supervisor = Supervisor::new(
        Arc::new(source.clone()),
        Arc::new(StubFactory {
            failure: failure.map(str::to_owned),
        }),
        SupervisorOptions::new("/nonexistent/dls-resources"),
    );
    (Host::new(Arc::new(supervisor), Vec::new()), source)
}

/// Output lines written so far.
pub(crate) fn lines(host: Host<Vec<u8>>) -> Vec<String> {
    String::from_utf8_lossy(&host.into_output())
        .lines()
        .map(str::to_owned)
        .collect()
}
