//! Entry point for `dls-provision`, which cross-compiles the bundled
//! DLiteScript worker binaries.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    dls_cli::run_provision(std::env::args_os(), &mut stdout, &mut stderr)
}
