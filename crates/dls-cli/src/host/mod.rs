//! `dls-host`: a line-oriented stand-in for the editor that owns the worker.
//!
//! The host activates the worker on launch, applies one command per input
//! line and stops the worker on `quit`, end of input or a termination signal.

mod command;
#[cfg(unix)]
mod signals;

use std::ffi::OsString;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use dls_config::Config;
use dls_supervisor::transport::StdioSettings;
use dls_supervisor::{
    OrthoConfigSource, StdioTransportFactory, Supervisor, SupervisorError, SupervisorOptions,
    SupervisorState, Watchdog,
};
use tracing::{debug, warn};

pub use command::{HostCommand, HostCommandParseError};

use crate::errors::AppError;
use crate::telemetry;

const HOST_TARGET: &str = "dls_cli::host";

/// How often the watchdog checks whether the worker is still alive.
const WATCHDOG_INTERVAL: Duration = Duration::from_secs(1);

enum HostInput {
    Line(String),
    Eof,
    #[cfg(unix)]
    Signal(i32),
}

/// Whether the host loop should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// Stop the worker and exit.
    Quit,
}

/// Applies text commands to a supervisor, writing one line per command.
///
/// Status lines read `state: <state>`, with ` (pid N)` appended while a
/// worker is running. Failed operations print `error: <reason>` instead.
pub struct Host<W: Write> {
    supervisor: Arc<Supervisor>,
    output: W,
}

impl<W: Write> Host<W> {
    /// Wraps `supervisor`, reporting to `output`.
    pub const fn new(supervisor: Arc<Supervisor>, output: W) -> Self {
        Self { supervisor, output }
    }

    /// Supervisor driven by this host.
    #[must_use]
    pub const fn supervisor(&self) -> &Arc<Supervisor> {
        &self.supervisor
    }

    /// Consumes the host, returning its output sink.
    #[must_use]
    pub fn into_output(self) -> W {
        self.output
    }

    /// Starts the worker unless configuration disables it.
    ///
    /// # Errors
    /// Returns an error when the status line cannot be written.
    pub fn activate(&mut self) -> io::Result<()> {
        if self.supervisor.state() == SupervisorState::Disabled {
            debug!(target: HOST_TARGET, "worker disabled; not starting");
            return self.write_status();
        }
        let outcome = self.supervisor.start().map(drop);
        self.write_outcome(outcome)
    }

    /// Parses and applies one input line. Blank lines are ignored.
    ///
    /// # Errors
    /// Returns an error when output cannot be written.
    pub fn handle_line(&mut self, line: &str) -> io::Result<Flow> {
        if line.trim().is_empty() {
            return Ok(Flow::Continue);
        }
        match line.parse::<HostCommand>() {
            Ok(command) => self.execute(command),
            Err(error) => {
                writeln!(self.output, "error: {error}")?;
                self.output.flush()?;
                Ok(Flow::Continue)
            }
        }
    }

    /// Applies one command.
    ///
    /// # Errors
    /// Returns an error when output cannot be written.
    pub fn execute(&mut self, command: HostCommand) -> io::Result<Flow> {
        let outcome = match command {
            HostCommand::Start => self.supervisor.start().map(drop),
            HostCommand::Stop => self.supervisor.stop().map(drop),
            HostCommand::Restart => self.supervisor.restart().map(drop),
            HostCommand::Toggle => self.supervisor.toggle_enabled().map(drop),
            HostCommand::Status => {
                self.supervisor.reconcile();
                Ok(())
            }
            HostCommand::Quit => return Ok(Flow::Quit),
        };
        self.write_outcome(outcome)?;
        Ok(Flow::Continue)
    }

    /// Stops the worker for good.
    ///
    /// # Errors
    /// Returns an error when output cannot be written.
    pub fn deactivate(&mut self) -> io::Result<()> {
        let outcome = self.supervisor.shutdown();
        self.write_outcome(outcome)
    }

    fn write_outcome(&mut self, outcome: Result<(), SupervisorError>) -> io::Result<()> {
        match outcome {
            Ok(()) => self.write_status(),
            Err(error) => {
                writeln!(self.output, "error: {error}")?;
                self.output.flush()
            }
        }
    }

    fn write_status(&mut self) -> io::Result<()> {
        let line = status_line(&self.supervisor);
        writeln!(self.output, "{line}")?;
        self.output.flush()
    }
}

fn status_line(supervisor: &Supervisor) -> String {
    let state = supervisor.state();
    match supervisor.worker().and_then(|worker| worker.pid) {
        Some(pid) if state.is_running() => format!("state: {state} (pid {pid})"),
        _ => format!("state: {state}"),
    }
}

/// Runs `dls-host` with `args`, reading commands from `input`.
///
/// Exits successfully once the worker has been stopped, whatever the final
/// worker state. Only configuration, telemetry and output failures are
/// reported as a failing exit code.
pub fn run_host<I, R, W, E>(args: I, input: R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: BufRead + Send + 'static,
    W: Write,
    E: Write,
{
    let args: Vec<OsString> = args.into_iter().collect();
    match serve(args, input, stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(stderr, "dls-host: {error}");
            ExitCode::FAILURE
        }
    }
}

fn serve<R, W>(args: Vec<OsString>, input: R, stdout: &mut W) -> Result<(), AppError>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    let config = Config::load_from_args(args.clone()).map_err(AppError::LoadConfiguration)?;
    telemetry::initialise(config.log_filter(), config.log_format())?;

    let supervisor = Arc::new(build_supervisor(&config, args));
    let watchdog = match Watchdog::spawn(&supervisor, WATCHDOG_INTERVAL) {
        Ok(watchdog) => Some(watchdog),
        Err(error) => {
            warn!(target: HOST_TARGET, error = %error, "watchdog unavailable");
            None
        }
    };
    let inputs = spawn_inputs(input);

    let mut host = Host::new(supervisor, stdout);
    host.activate()?;
    loop {
        match inputs.recv() {
            Ok(HostInput::Line(line)) => {
                if host.handle_line(&line)? == Flow::Quit {
                    break;
                }
            }
            Ok(HostInput::Eof) | Err(_) => break,
            #[cfg(unix)]
            Ok(HostInput::Signal(_)) => break,
        }
    }

    if let Some(running) = watchdog {
        running.stop();
    }
    host.deactivate()?;
    Ok(())
}

fn build_supervisor(config: &Config, args: Vec<OsString>) -> Supervisor {
    Supervisor::new(
        Arc::new(OrthoConfigSource::new(args)),
        Arc::new(StdioTransportFactory::new(StdioSettings::from_config(config))),
        SupervisorOptions::from_config(config),
    )
}

fn spawn_inputs<R>(input: R) -> Receiver<HostInput>
where
    R: BufRead + Send + 'static,
{
    let (sender, receiver) = mpsc::channel();
    forward_signals(&sender);
    thread::spawn(move || {
        for line in input.lines() {
            match line {
                Ok(text) => {
                    if sender.send(HostInput::Line(text)).is_err() {
                        return;
                    }
                }
                Err(error) => {
                    warn!(target: HOST_TARGET, error = %error, "reading input failed");
                    break;
                }
            }
        }
        let _ = sender.send(HostInput::Eof);
    });
    receiver
}

#[cfg(unix)]
fn forward_signals(sender: &Sender<HostInput>) {
    if let Err(error) = signals::forward_signals(sender.clone()) {
        warn!(target: HOST_TARGET, error = %error, "signal handlers unavailable");
    }
}

#[cfg(not(unix))]
fn forward_signals(_sender: &Sender<HostInput>) {}
