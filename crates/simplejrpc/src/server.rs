//! Server lifecycle: bind, accept, drain, close.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::SERVER_TARGET;
use crate::context::CancellationToken;
use crate::dispatch::Service;
use crate::shutdown::SignalWatcher;
use crate::transport::{
    ConnectionHandler, ConnectionTracker, ListenerError, ServiceConnectionHandler, SocketListener,
};

/// Errors returned by [`Server::start_server`].
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding or running the listener failed.
    #[error(transparent)]
    Listener(#[from] ListenerError),
    /// Installing the signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Signals {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The server was already started once.
    #[error("server is already running")]
    AlreadyStarted,
    /// The server was shut down before it could start.
    #[error("server has already been shut down")]
    AlreadyShutDown,
}

/// Lifecycle options for a [`Server`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerOptions {
    drain_timeout: Option<Duration>,
    handle_signals: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            drain_timeout: None,
            handle_signals: true,
        }
    }
}

impl ServerOptions {
    /// Signal handling on, no drain wait.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits up to `timeout` for open connections after the listener stops.
    #[must_use]
    pub const fn drain_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Enables or disables SIGINT/SIGTERM handling.
    #[must_use]
    pub const fn handle_signals(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }
}

/// Serves a [`Service`] on a Unix domain socket.
///
/// The server owns its service, so handlers and middleware can no longer
/// change once it exists. [`Server::start_server`] blocks until shutdown is
/// requested through a signal, [`Server::shutdown`] or the token returned by
/// [`Server::shutdown_token`].
#[derive(Debug)]
pub struct Server {
    service: Arc<Service>,
    options: ServerOptions,
    root: CancellationToken,
    started: AtomicBool,
}

impl Server {
    /// Wraps `service` with default options.
    #[must_use]
    pub fn new(service: Service) -> Self {
        Self::with_options(service, ServerOptions::default())
    }

    /// Wraps `service` with explicit lifecycle options.
    #[must_use]
    pub fn with_options(service: Service, options: ServerOptions) -> Self {
        Self {
            service: Arc::new(service),
            options,
            root: CancellationToken::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Service handled by this server.
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Token whose cancellation stops the server.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.root.clone()
    }

    /// Requests shutdown. Repeated calls have no further effect.
    pub fn shutdown(&self) {
        if !self.root.is_cancelled() {
            info!(target: SERVER_TARGET, "shutdown requested");
        }
        self.root.cancel();
    }

    /// Binds `socket_path` and serves connections until shutdown.
    ///
    /// Any file already at the path is removed first. The socket file is
    /// removed again on the way out. Connections still open are left to
    /// finish; with a drain timeout the call waits up to that long for them.
    /// A failure before the listener is bound leaves the server startable.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::AlreadyShutDown` or `ServerError::AlreadyStarted`
    /// when the server cannot start, `ServerError::Signals` if signal handlers
    /// cannot be installed, and `ServerError::Listener` for bind or fatal
    /// accept failures.
    pub fn start_server(&self, socket_path: impl AsRef<Path>) -> Result<(), ServerError> {
        if self.root.is_cancelled() {
            return Err(ServerError::AlreadyShutDown);
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyStarted);
        }

        let (listener, watcher) = match self.open(socket_path.as_ref()) {
            Ok(parts) => parts,
            Err(error) => {
                self.started.store(false, Ordering::SeqCst);
                return Err(error);
            }
        };
        let result = self.serve(listener, watcher);
        self.root.cancel();
        result
    }

    fn open(
        &self,
        socket_path: &Path,
    ) -> Result<(SocketListener, Option<SignalWatcher>), ServerError> {
        let watcher = if self.options.handle_signals {
            let watcher = SignalWatcher::install(self.root.clone())
                .map_err(|source| ServerError::Signals { source })?;
            Some(watcher)
        } else {
            None
        };

        let listener = SocketListener::bind(socket_path)?;
        info!(
            target: SERVER_TARGET,
            path = %socket_path.display(),
            "server listening"
        );
        Ok((listener, watcher))
    }

    fn serve(
        &self,
        listener: SocketListener,
        watcher: Option<SignalWatcher>,
    ) -> Result<(), ServerError> {
        let handler: Arc<dyn ConnectionHandler> =
            Arc::new(ServiceConnectionHandler::new(Arc::clone(&self.service)));
        let tracker = ConnectionTracker::new();
        let result = listener.run(&handler, &self.root, &tracker);

        if let Some(watcher) = watcher {
            watcher.stop();
        }
        if let Some(timeout) = self.options.drain_timeout {
            drain(&tracker, timeout);
        }

        result?;
        info!(target: SERVER_TARGET, "server closed");
        Ok(())
    }
}

fn drain(tracker: &ConnectionTracker, timeout: Duration) {
    if tracker.wait_idle(timeout) {
        info!(target: SERVER_TARGET, "connections drained");
    } else {
        warn!(
            target: SERVER_TARGET,
            active = tracker.active(),
            timeout_ms = timeout.as_millis(),
            "drain timeout elapsed with open connections"
        );
    }
}
