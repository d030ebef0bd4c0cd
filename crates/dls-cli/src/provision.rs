//! `dls-provision`: argument parsing and reporting around the pipeline.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use clap::error::ErrorKind;
use dls_config::{DEFAULT_LOG_FILTER, LogFormat};
use dls_provision::{
    GoToolchain, MIN_ARTIFACT_BYTES, ProvisionOptions, ProvisionReport, provision, select_targets,
};
use tracing::warn;

use crate::errors::AppError;
use crate::telemetry;

const PROVISION_TARGET: &str = "dls_cli::provision";

/// Cross-compiles the DLiteScript worker for every supported platform.
#[derive(Parser, Debug)]
#[command(name = "dls-provision", version)]
pub(crate) struct ProvisionCli {
    /// Repository root containing the `dlitescript` source tree.
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub(crate) repo_root: Utf8PathBuf,
    /// Worker source tree; defaults to `<repo-root>/dlitescript`.
    #[arg(long, value_name = "PATH")]
    pub(crate) source_dir: Option<Utf8PathBuf>,
    /// Destination for binaries; defaults to `<repo-root>/resources`.
    #[arg(long, value_name = "PATH")]
    pub(crate) output_dir: Option<Utf8PathBuf>,
    /// Smallest artifact size, in bytes, accepted as a real binary.
    #[arg(long, value_name = "BYTES", default_value_t = MIN_ARTIFACT_BYTES)]
    pub(crate) min_size: u64,
    /// Restricts the run to one platform key; repeatable.
    #[arg(long = "only", value_name = "PLATFORM_KEY")]
    pub(crate) only: Vec<String>,
    /// Skips `git submodule update` before building.
    #[arg(long)]
    pub(crate) skip_sync: bool,
    /// Go executable used for compilation.
    #[arg(long, value_name = "PATH")]
    pub(crate) go: Option<String>,
    /// `tracing` filter expression.
    #[arg(long, default_value = DEFAULT_LOG_FILTER)]
    pub(crate) log_filter: String,
    /// Log output format (`compact` or `json`).
    #[arg(long, default_value_t = LogFormat::Compact)]
    pub(crate) log_format: LogFormat,
}

impl ProvisionCli {
    /// Translates flags into pipeline options.
    pub(crate) fn options(&self) -> Result<ProvisionOptions, AppError> {
        let mut options = ProvisionOptions::new(self.repo_root.clone());
        if let Some(source_dir) = &self.source_dir {
            options.source_dir = source_dir.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            options.output_dir = output_dir.clone();
        }
        options.minimum_size = self.min_size;
        options.sync_sources = !self.skip_sync;

        if !self.only.is_empty() {
            let (selected, skipped) = select_targets(&self.only);
            for key in &skipped {
                warn!(target: PROVISION_TARGET, platform_key = %key, "skipping unsupported platform key");
            }
            if selected.is_empty() {
                return Err(AppError::NoTargets {
                    keys: skipped.join(", "),
                });
            }
            options.targets = selected;
        }
        Ok(options)
    }

    fn toolchain(&self) -> GoToolchain {
        self.go
            .as_ref()
            .map_or_else(GoToolchain::new, GoToolchain::with_go)
    }
}

/// Runs `dls-provision` with `args`, returning the process exit code.
///
/// Built artifacts are listed on `stdout`; the failing step, naming its
/// platform where there is one, is written to `stderr`.
pub fn run_provision<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match ProvisionCli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) if matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            return match write!(stdout, "{error}") {
                Ok(()) => ExitCode::SUCCESS,
                Err(_) => ExitCode::FAILURE,
            };
        }
        Err(error) => return report_failure(stderr, &AppError::CliUsage(error)),
    };

    match execute(&cli, stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => report_failure(stderr, &error),
    }
}

fn execute<W: Write>(cli: &ProvisionCli, stdout: &mut W) -> Result<(), AppError> {
    telemetry::initialise(&cli.log_filter, cli.log_format)?;
    let options = cli.options()?;
    let report = provision(&options, &cli.toolchain())?;
    write_report(stdout, &report)?;
    Ok(())
}

fn write_report<W: Write>(stdout: &mut W, report: &ProvisionReport) -> Result<(), AppError> {
    for removed in &report.removed {
        writeln!(stdout, "removed {removed}")?;
    }
    for outcome in &report.outcomes {
        writeln!(
            stdout,
            "built {} ({} bytes)",
            outcome.output_path, outcome.size_bytes
        )?;
    }
    writeln!(stdout, "provisioned {} platform binaries", report.outcomes.len())?;
    Ok(())
}

fn report_failure<E: Write>(stderr: &mut E, error: &AppError) -> ExitCode {
    let _ = writeln!(stderr, "dls-provision: {error}");
    ExitCode::FAILURE
}
