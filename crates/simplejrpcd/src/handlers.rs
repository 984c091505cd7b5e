//! Methods served by the daemon.

use serde::{Deserialize, Serialize};

use simplejrpc::{HandlerError, Request, Service, ServiceOptions, TracingMiddleware};
use simplejrpc_config::Config;

/// Parameters accepted by `multiply`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct MultiplyParams {
    /// Left operand.
    #[serde(rename = "A")]
    pub a: i64,
    /// Right operand.
    #[serde(rename = "B")]
    pub b: i64,
}

/// Builds the daemon's service from `config`.
#[must_use]
pub fn build_service(config: &Config) -> Service {
    let options = ServiceOptions::new().max_frame_bytes(config.max_frame_bytes());
    let mut service = Service::with_options(options).with_middleware(TracingMiddleware::new());
    service
        .register_handle("ping", ping)
        .register_handle("multiply", multiply)
        .register_handle("hello", hello);
    service
}

fn ping(_request: &Request) -> Result<&'static str, HandlerError> {
    Ok("pong")
}

fn hello(_request: &Request) -> Result<&'static str, HandlerError> {
    Ok("Hello World")
}

fn multiply(request: &Request) -> Result<i64, HandlerError> {
    let params: MultiplyParams = request.decode_params()?;
    params
        .a
        .checked_mul(params.b)
        .ok_or_else(|| HandlerError::new("multiplication overflow"))
}
