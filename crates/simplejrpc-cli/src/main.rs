//! CLI entrypoint for issuing single simplejrpc calls.
//!
//! The binary delegates to [`simplejrpc_cli::run`], which parses arguments,
//! resolves the socket path, performs the call, and prints the response
//! envelope.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    simplejrpc_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
