//! Argument definitions for `jrpc`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command-line client for simplejrpc servers.
#[derive(Parser, Debug)]
#[command(name = "jrpc", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Socket to dial; defaults to the configured socket path.
    #[arg(long, value_name = "PATH")]
    pub(crate) socket: Option<PathBuf>,
    /// Fails the call if no reply arrives within this many milliseconds.
    #[arg(long, value_name = "N")]
    pub(crate) timeout_ms: Option<u64>,
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum CliCommand {
    /// Calls a method and prints the response envelope.
    Call {
        /// Method name.
        #[arg(value_name = "METHOD")]
        method: String,
        /// Parameters as a JSON document.
        #[arg(value_name = "PARAMS_JSON")]
        params: Option<String>,
        /// Explicit request id.
        #[arg(long, value_name = "N")]
        id: Option<u64>,
    },
}
