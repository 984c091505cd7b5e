//! Runtime for `jrpc`, a command-line client for simplejrpc servers.
//!
//! `run` is usable from the binary and from tests, where the output streams
//! and configuration loader can be substituted.

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use ortho_config::OrthoConfig;
use serde_json::Value;

use simplejrpc::{CallContext, CallOptions, Client, Response};
use simplejrpc_config::Config;

mod cli;
mod errors;

use cli::{Cli, CliCommand};
use errors::AppError;

/// Source of the configured socket path when `--socket` is absent.
pub(crate) trait ConfigLoader {
    fn load(&self) -> Result<Config, Arc<ortho_config::OrthoError>>;
}

/// Loads defaults, the configuration file and `SIMPLEJRPC_*` variables.
pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self) -> Result<Config, Arc<ortho_config::OrthoError>> {
        // Only the program name is forwarded so jrpc's own flags never reach
        // the configuration parser.
        Config::load_from_iter([OsString::from("jrpc")])
    }
}

/// Parses `args`, performs one call and prints the response envelope.
///
/// Exits successfully only when the envelope carries code 200.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    match execute(args, stdout, loader) {
        Ok(response) if response.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(AppError::CliUsage(error)) => {
            let rendered = error.render();
            if error.use_stderr() {
                let _ = write!(stderr, "{rendered}");
                ExitCode::FAILURE
            } else {
                let _ = write!(stdout, "{rendered}");
                ExitCode::SUCCESS
            }
        }
        Err(error) => {
            let _ = writeln!(stderr, "jrpc: {error}");
            ExitCode::FAILURE
        }
    }
}

fn execute<I, W, L>(args: I, stdout: &mut W, loader: &L) -> Result<Response, AppError>
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    L: ConfigLoader,
{
    let cli = Cli::try_parse_from(args).map_err(AppError::CliUsage)?;
    let socket = resolve_socket(cli.socket, loader)?;

    let CliCommand::Call { method, params, id } = cli.command;
    let params = parse_params(params.as_deref())?;

    let mut context = CallContext::background();
    if let Some(millis) = cli.timeout_ms {
        context = context.with_timeout(Duration::from_millis(millis));
    }
    let mut options = CallOptions::new();
    if let Some(id) = id {
        options = options.with_id(id);
    }

    let response: Response = Client::new(socket).request(&context, &method, &params, options)?;
    let rendered = serde_json::to_string_pretty(&response).map_err(AppError::Render)?;
    writeln!(stdout, "{rendered}").map_err(AppError::Output)?;
    Ok(response)
}

fn resolve_socket<L: ConfigLoader>(flag: Option<PathBuf>, loader: &L) -> Result<PathBuf, AppError> {
    if let Some(path) = flag {
        return Ok(path);
    }
    let config = loader.load().map_err(AppError::LoadConfiguration)?;
    Ok(config.socket_path.into_std_path_buf())
}

fn parse_params(raw: Option<&str>) -> Result<Value, AppError> {
    raw.map_or(Ok(Value::Null), |text| {
        serde_json::from_str(text).map_err(AppError::InvalidParams)
    })
}
