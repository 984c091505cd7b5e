//! Demonstration daemon serving simplejrpc handlers on a Unix socket.
//!
//! The daemon loads [`simplejrpc_config::Config`], installs structured
//! telemetry, prepares the socket directory, and serves three methods until
//! SIGINT or SIGTERM:
//!
//! - `ping` returns `"pong"`;
//! - `multiply` takes `{"A": <int>, "B": <int>}` and returns the product;
//! - `hello` returns `"Hello World"`.

mod bootstrap;
mod errors;
mod handlers;
mod launch;
pub mod telemetry;

pub use bootstrap::{ConfigLoader, StaticConfigLoader, SystemConfigLoader};
pub use errors::LaunchError;
pub use handlers::{MultiplyParams, build_service};
pub use launch::{Daemon, run_daemon};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
