//! Entry point for `dls-host`, a line-oriented host that supervises the
//! DLiteScript language worker.

use std::io::{self, BufReader};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    dls_cli::run_host(
        std::env::args_os(),
        BufReader::new(io::stdin()),
        &mut stdout,
        &mut stderr,
    )
}
