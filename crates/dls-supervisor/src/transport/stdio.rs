//! Worker transport over the child's standard input and output.

use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use dls_config::{Config, HandshakeMode};
use lsp_types::{ClientCapabilities, ClientInfo, InitializeParams};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use super::error::TransportError;
use super::framing::{read_frame, write_frame};
use super::jsonrpc::{
    JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestIds,
};
use super::lifecycle::{kill_child, terminate_child};
use super::{TRANSPORT_TARGET, Transport, TransportFactory};
use crate::resolver::ResolvedCommand;

/// Maximum number of frames inspected while waiting for a handshake response.
const MAX_RESPONSE_FRAMES: usize = 100;

/// Read size used when the worker's output is not framed.
const RAW_CHUNK_BYTES: usize = 8192;

const CLIENT_NAME: &str = "dls-host";

type Inbound = Result<Vec<u8>, TransportError>;

/// Timeouts and handshake used by [`StdioTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StdioSettings {
    /// Start handshake spoken after spawning.
    pub handshake: HandshakeMode,
    /// Bound on the start handshake.
    pub start_timeout: Duration,
    /// Grace period for a graceful stop before the worker is killed.
    pub stop_timeout: Duration,
}

impl StdioSettings {
    /// Reads the transport fields from a loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            handshake: config.handshake(),
            start_timeout: config.start_timeout(),
            stop_timeout: config.stop_timeout(),
        }
    }
}

impl Default for StdioSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

enum ProcessState {
    NotStarted,
    Running(RunningWorker),
    Stopped,
}

struct RunningWorker {
    child: Child,
    writer: Option<BufWriter<ChildStdin>>,
    inbound: Receiver<Inbound>,
    ids: RequestIds,
    handshake: HandshakeMode,
}

/// Spawns the worker with piped stdio and speaks the configured handshake.
///
/// In [`HandshakeMode::Lsp`] messages are `Content-Length` framed in both
/// directions; in [`HandshakeMode::None`] bytes pass through untouched.
/// Dropping a running transport kills and reaps the worker.
pub struct StdioTransport {
    command: ResolvedCommand,
    settings: StdioSettings,
    state: ProcessState,
}

impl StdioTransport {
    /// Creates an unstarted transport.
    #[must_use]
    pub const fn new(command: ResolvedCommand, settings: StdioSettings) -> Self {
        Self {
            command,
            settings,
            state: ProcessState::NotStarted,
        }
    }

    /// Command this transport runs.
    #[must_use]
    pub const fn command(&self) -> &ResolvedCommand {
        &self.command
    }

    fn spawn(&self) -> Result<RunningWorker, TransportError> {
        let program = self.command.executable_path.as_str();
        debug!(
            target: TRANSPORT_TARGET,
            command = %program,
            args = ?self.command.args,
            "spawning worker process"
        );

        let mut child = Command::new(program)
            .args(&self.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| TransportError::spawn(program, source))?;

        let pipes = (child.stdin.take(), child.stdout.take(), child.stderr.take());
        let (Some(stdin), Some(stdout), Some(stderr)) = pipes else {
            // Unreachable with piped stdio, but never leak the child.
            let _ = kill_child(&mut child);
            return Err(TransportError::SpawnFailed {
                command: program.to_owned(),
                source: io::Error::other("worker stdio pipes were unavailable"),
            });
        };

        let pid = child.id();
        drain_stderr(pid, stderr);
        let (sender, inbound) = mpsc::channel();
        match self.settings.handshake {
            HandshakeMode::Lsp => forward_frames(stdout, sender),
            HandshakeMode::None => forward_chunks(stdout, sender),
        }

        debug!(target: TRANSPORT_TARGET, pid, "worker process spawned");
        Ok(RunningWorker {
            child,
            writer: Some(BufWriter::new(stdin)),
            inbound,
            ids: RequestIds::new(),
            handshake: self.settings.handshake,
        })
    }
}

impl Transport for StdioTransport {
    fn start(&mut self) -> Result<(), TransportError> {
        if matches!(self.state, ProcessState::Running(_)) {
            return Ok(());
        }

        let mut worker = self.spawn()?;
        let handshake = match self.settings.handshake {
            HandshakeMode::Lsp => worker.initialize(self.settings.start_timeout),
            HandshakeMode::None => worker.confirm_alive(),
        };
        if let Err(error) = handshake {
            warn!(
                target: TRANSPORT_TARGET,
                pid = worker.child.id(),
                error = %error,
                "start handshake failed; killing worker"
            );
            let _ = kill_child(&mut worker.child);
            self.state = ProcessState::Stopped;
            return Err(error);
        }

        self.state = ProcessState::Running(worker);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), TransportError> {
        match std::mem::replace(&mut self.state, ProcessState::Stopped) {
            ProcessState::Running(worker) => worker.shutdown(self.settings.stop_timeout),
            ProcessState::NotStarted | ProcessState::Stopped => Ok(()),
        }
    }

    fn is_running(&mut self) -> bool {
        match &mut self.state {
            ProcessState::Running(worker) => matches!(worker.child.try_wait(), Ok(None)),
            ProcessState::NotStarted | ProcessState::Stopped => false,
        }
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        match &mut self.state {
            ProcessState::Running(worker) => worker.write(payload),
            ProcessState::NotStarted | ProcessState::Stopped => Err(TransportError::ProcessExited),
        }
    }

    fn receive(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        let ProcessState::Running(worker) = &mut self.state else {
            return Err(TransportError::ProcessExited);
        };
        match worker.inbound.recv_timeout(timeout) {
            Ok(message) => message.map(Some),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::ProcessExited),
        }
    }

    fn pid(&self) -> Option<u32> {
        match &self.state {
            ProcessState::Running(worker) => Some(worker.child.id()),
            ProcessState::NotStarted | ProcessState::Stopped => None,
        }
    }
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        if let ProcessState::Running(mut worker) =
            std::mem::replace(&mut self.state, ProcessState::Stopped)
        {
            debug!(target: TRANSPORT_TARGET, pid = worker.child.id(), "dropping live worker");
            let _ = kill_child(&mut worker.child);
        }
    }
}

impl RunningWorker {
    fn write(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            TransportError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "worker stdin is closed",
            ))
        })?;
        match self.handshake {
            HandshakeMode::Lsp => write_frame(writer, payload),
            HandshakeMode::None => {
                writer.write_all(payload)?;
                writer.flush()?;
                Ok(())
            }
        }
    }

    fn write_message<M: Serialize>(&mut self, message: &M) -> Result<(), TransportError> {
        let payload = serde_json::to_vec(message)?;
        self.write(&payload)
    }

    fn confirm_alive(&mut self) -> Result<(), TransportError> {
        match self.child.try_wait()? {
            Some(status) => {
                debug!(target: TRANSPORT_TARGET, ?status, "worker exited during start");
                Err(TransportError::ProcessExited)
            }
            None => Ok(()),
        }
    }

    fn initialize(&mut self, timeout: Duration) -> Result<(), TransportError> {
        let id = self.ids.next_id();
        let params = serde_json::to_value(initialize_params())?;
        self.write_message(&JsonRpcRequest::new(id, "initialize", Some(params)))?;

        let response = self.await_response(id, timeout)?;
        if let Some(error) = response.error {
            return Err(TransportError::HandshakeFailed {
                message: format!("{} (code: {})", error.message, error.code),
            });
        }
        debug!(
            target: TRANSPORT_TARGET,
            pid = self.child.id(),
            has_capabilities = response.result.is_some(),
            "worker initialised"
        );

        self.write_message(&JsonRpcNotification::new("initialized", Some(json!({}))))
    }

    /// Waits for the response to `request_id`, skipping interleaved traffic.
    fn await_response(
        &mut self,
        request_id: i64,
        timeout: Duration,
    ) -> Result<JsonRpcResponse, TransportError> {
        let deadline = Instant::now() + timeout;
        for _ in 0..MAX_RESPONSE_FRAMES {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let frame = match self.inbound.recv_timeout(remaining) {
                Ok(frame) => frame?,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(TransportError::HandshakeTimeout {
                        timeout_ms: timeout.as_millis(),
                    });
                }
                Err(RecvTimeoutError::Disconnected) => return Err(TransportError::ProcessExited),
            };

            match JsonRpcMessage::from_bytes(&frame)? {
                JsonRpcMessage::Response(response) if response.id == Some(request_id) => {
                    return Ok(response);
                }
                JsonRpcMessage::Response(response) => {
                    warn!(
                        target: TRANSPORT_TARGET,
                        expected = request_id,
                        received = ?response.id,
                        "skipping response with non-matching ID"
                    );
                }
                JsonRpcMessage::ServerRequest { method } => {
                    debug!(target: TRANSPORT_TARGET, %method, "ignoring worker request");
                }
                JsonRpcMessage::Notification { method } => {
                    debug!(target: TRANSPORT_TARGET, %method, "skipping worker notification");
                }
            }
        }

        Err(TransportError::HandshakeFailed {
            message: format!("no response to request {request_id} after {MAX_RESPONSE_FRAMES} messages"),
        })
    }

    fn shutdown(mut self, grace: Duration) -> Result<(), TransportError> {
        let pid = self.child.id();
        if let Ok(Some(status)) = self.child.try_wait() {
            debug!(target: TRANSPORT_TARGET, pid, ?status, "worker had already exited");
            return Ok(());
        }

        if let Some(writer) = self.writer.as_mut()
            && let Err(error) = writer.flush()
        {
            debug!(target: TRANSPORT_TARGET, pid, error = %error, "flush before stop failed");
        }

        if self.handshake == HandshakeMode::Lsp {
            self.request_shutdown(grace);
        }

        // Closing stdin signals end of input to the worker.
        drop(self.writer.take());
        terminate_child(&mut self.child, grace).map_err(TransportError::Io)
    }

    fn request_shutdown(&mut self, grace: Duration) {
        let id = self.ids.next_id();
        let outcome = self
            .write_message(&JsonRpcRequest::new(id, "shutdown", None))
            .and_then(|()| self.await_response(id, grace))
            .and_then(|_| self.write_message(&JsonRpcNotification::new("exit", None)));
        if let Err(error) = outcome {
            debug!(
                target: TRANSPORT_TARGET,
                pid = self.child.id(),
                error = %error,
                "graceful shutdown exchange failed"
            );
        }
    }
}

fn initialize_params() -> InitializeParams {
    InitializeParams {
        process_id: Some(std::process::id()),
        capabilities: ClientCapabilities::default(),
        client_info: Some(ClientInfo {
            name: String::from(CLIENT_NAME),
            version: Some(String::from(env!("CARGO_PKG_VERSION"))),
        }),
        ..InitializeParams::default()
    }
}

fn drain_stderr(pid: u32, stderr: ChildStderr) {
    thread::spawn(move || {
        for line in BufReader::new(stderr).lines() {
            match line {
                Ok(text) => debug!(target: TRANSPORT_TARGET, pid, stderr = %text, "worker stderr"),
                Err(_) => break,
            }
        }
    });
}

fn forward_frames(stdout: ChildStdout, sender: Sender<Inbound>) {
    thread::spawn(move || {
        let mut reader = BufReader::new(stdout);
        loop {
            match read_frame(&mut reader) {
                Ok(Some(frame)) => {
                    if sender.send(Ok(frame)).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(error) => {
                    let _ = sender.send(Err(error));
                    break;
                }
            }
        }
    });
}

fn forward_chunks(mut stdout: ChildStdout, sender: Sender<Inbound>) {
    thread::spawn(move || {
        let mut buffer = vec![0_u8; RAW_CHUNK_BYTES];
        loop {
            match stdout.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => {
                    let chunk = buffer.get(..read).map(<[u8]>::to_vec).unwrap_or_default();
                    if sender.send(Ok(chunk)).is_err() {
                        break;
                    }
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => {
                    let _ = sender.send(Err(TransportError::Io(error)));
                    break;
                }
            }
        }
    });
}

/// Creates [`StdioTransport`]s sharing one set of settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StdioTransportFactory {
    settings: StdioSettings,
}

impl StdioTransportFactory {
    /// Creates a factory with explicit settings.
    #[must_use]
    pub const fn new(settings: StdioSettings) -> Self {
        Self { settings }
    }

    /// Settings handed to every transport.
    #[must_use]
    pub const fn settings(&self) -> StdioSettings {
        self.settings
    }
}

impl TransportFactory for StdioTransportFactory {
    fn create(&self, command: &ResolvedCommand) -> Box<dyn Transport> {
        Box::new(StdioTransport::new(command.clone(), self.settings))
    }
}
