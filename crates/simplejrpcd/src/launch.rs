//! Daemon launch sequencing.

use simplejrpc::{CancellationToken, Server, ServerOptions};
use simplejrpc_config::Config;
use tracing::info;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader};
use crate::errors::LaunchError;
use crate::handlers::build_service;
use crate::telemetry::{self, TelemetryHandle};

const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Bootstrapped daemon ready to serve.
#[derive(Debug)]
pub struct Daemon {
    config: Config,
    server: Server,
    telemetry: TelemetryHandle,
}

impl Daemon {
    /// Loads configuration, installs telemetry, prepares the socket directory
    /// and builds the server.
    ///
    /// `options` supplies signal handling; the drain timeout always comes from
    /// the configuration.
    ///
    /// # Errors
    ///
    /// Returns `LaunchError` if configuration, telemetry or socket directory
    /// preparation fails.
    pub fn bootstrap(loader: &dyn ConfigLoader, options: ServerOptions) -> Result<Self, LaunchError> {
        let config = loader.load()?;
        let telemetry = telemetry::initialise(&config)?;
        config.prepare_socket_directory()?;

        let service = build_service(&config);
        let server = Server::with_options(service, options.drain_timeout(config.drain_timeout()));
        Ok(Self {
            config,
            server,
            telemetry,
        })
    }

    /// Resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Token that stops the daemon when cancelled.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.server.shutdown_token()
    }

    /// Serves until shutdown.
    ///
    /// # Errors
    ///
    /// Returns `LaunchError::Server` if the server fails to bind or accept.
    pub fn run(&self) -> Result<(), LaunchError> {
        info!(
            target: PROCESS_TARGET,
            socket = %self.config.socket_path(),
            "starting daemon"
        );
        self.server.start_server(self.config.socket_path())?;
        info!(target: PROCESS_TARGET, "shutdown sequence completed");
        Ok(())
    }
}

/// Runs the daemon using the production collaborators.
///
/// # Errors
///
/// Returns `LaunchError` if bootstrapping or serving fails.
pub fn run_daemon() -> Result<(), LaunchError> {
    Daemon::bootstrap(&SystemConfigLoader, ServerOptions::new())?.run()
}
