//! External commands the pipeline depends on.

use std::process::{Command, Output};

use camino::Utf8Path;
use dls_targets::PlatformTarget;
use tracing::debug;

use crate::error::CommandError;

const GO_PROGRAM: &str = "go";
const GIT_PROGRAM: &str = "git";
const STRIP_FLAGS: &str = "-ldflags=-s -w";

/// Toolchain operations invoked by the provisioning pipeline.
pub trait Toolchain {
    /// Confirms the cross-compiler can be executed.
    ///
    /// # Errors
    /// Returns an error when the compiler is missing or fails its probe.
    fn ensure_available(&self) -> Result<(), CommandError>;

    /// Fetches or updates the source tree's submodules, run at `repo_root`.
    ///
    /// # Errors
    /// Returns an error when the update command fails.
    fn sync_sources(&self, repo_root: &Utf8Path) -> Result<(), CommandError>;

    /// Builds the artefact for `target` from `source_dir` into `output`.
    ///
    /// The pipeline always passes absolute paths; the compiler runs with
    /// `source_dir` as its working directory.
    ///
    /// # Errors
    /// Returns an error when the compiler exits unsuccessfully.
    fn compile(
        &self,
        source_dir: &Utf8Path,
        target: PlatformTarget,
        output: &Utf8Path,
    ) -> Result<(), CommandError>;
}

/// Production toolchain backed by `go` and `git` on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct GoToolchain {
    go: Option<String>,
    git: Option<String>,
}

impl GoToolchain {
    /// Uses `go` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an explicit Go executable.
    #[must_use]
    pub fn with_go(go: impl Into<String>) -> Self {
        Self {
            go: Some(go.into()),
            git: None,
        }
    }

    /// Replaces the `git` executable used for submodule updates.
    #[must_use]
    pub fn with_git(self, git: impl Into<String>) -> Self {
        Self {
            git: Some(git.into()),
            ..self
        }
    }

    fn go_program(&self) -> &str {
        self.go.as_deref().unwrap_or(GO_PROGRAM)
    }

    fn git_program(&self) -> &str {
        self.git.as_deref().unwrap_or(GIT_PROGRAM)
    }
}

impl Toolchain for GoToolchain {
    fn ensure_available(&self) -> Result<(), CommandError> {
        let program = self.go_program();
        let mut command = Command::new(program);
        command.arg("version");
        let output = run(program, &mut command)?;
        debug!(
            target: crate::pipeline::PIPELINE_TARGET,
            version = %String::from_utf8_lossy(&output.stdout).trim(),
            "cross-compiler available"
        );
        Ok(())
    }

    fn sync_sources(&self, repo_root: &Utf8Path) -> Result<(), CommandError> {
        let program = self.git_program();
        let mut command = Command::new(program);
        command
            .args(["submodule", "update", "--init", "--recursive"])
            .current_dir(repo_root);
        run(program, &mut command).map(drop)
    }

    fn compile(
        &self,
        source_dir: &Utf8Path,
        target: PlatformTarget,
        output: &Utf8Path,
    ) -> Result<(), CommandError> {
        let program = self.go_program();
        let mut command = Command::new(program);
        command
            .arg("build")
            .arg(STRIP_FLAGS)
            .arg("-o")
            .arg(output)
            .current_dir(source_dir)
            .env("GOOS", target.os().compiler_token())
            .env("GOARCH", target.arch().compiler_token())
            .env("CGO_ENABLED", "0");
        run(program, &mut command).map(drop)
    }
}

fn run(program: &str, command: &mut Command) -> Result<Output, CommandError> {
    let output = command.output().map_err(|source| CommandError::Launch {
        program: program.to_owned(),
        source,
    })?;
    if output.status.success() {
        return Ok(output);
    }
    Err(CommandError::Failed {
        program: program.to_owned(),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
    })
}
