use std::io;
use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("params must be valid JSON: {0}")]
    InvalidParams(serde_json::Error),
    #[error("call failed: {0}")]
    Call(#[from] simplejrpc::ClientError),
    #[error("failed to render response: {0}")]
    Render(serde_json::Error),
    #[error("failed to write output: {0}")]
    Output(io::Error),
}
