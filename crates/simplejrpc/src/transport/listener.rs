//! Listener implementation for the Unix domain socket.

use std::fs;
use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::context::CancellationToken;

use super::{ConnectionHandler, ConnectionTracker, LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);

/// Listener bound to a socket path; owns the socket file until it stops.
#[derive(Debug)]
pub(crate) struct SocketListener {
    path: PathBuf,
    listener: UnixListener,
}

impl SocketListener {
    /// Removes whatever file sits at `path` and binds a fresh listener.
    pub(crate) fn bind(path: &Path) -> Result<Self, ListenerError> {
        remove_existing(path)?;
        let listener = UnixListener::bind(path).map_err(|source| ListenerError::Bind {
            path: path.display().to_string(),
            source,
        })?;
        if let Err(source) = listener.set_nonblocking(true) {
            drop(listener);
            cleanup_unix_socket(path);
            return Err(ListenerError::NonBlocking { source });
        }
        info!(
            target: LISTENER_TARGET,
            path = %path.display(),
            "socket listener bound"
        );
        Ok(Self {
            path: path.to_path_buf(),
            listener,
        })
    }

    #[cfg(test)]
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Accepts connections until `shutdown` is cancelled, then releases the
    /// listener and removes the socket file.
    ///
    /// Every connection runs on its own thread with a child of `shutdown`.
    /// Connections still open when the loop stops are left to finish.
    pub(crate) fn run(
        self,
        handler: &Arc<dyn ConnectionHandler>,
        shutdown: &CancellationToken,
        tracker: &ConnectionTracker,
    ) -> Result<(), ListenerError> {
        let Self { path, listener } = self;
        let result = accept_loop(&listener, &path, handler, shutdown, tracker);
        drop(listener);
        cleanup_unix_socket(&path);
        info!(
            target: LISTENER_TARGET,
            path = %path.display(),
            "socket listener stopped"
        );
        result
    }
}

fn accept_loop(
    listener: &UnixListener,
    path: &Path,
    handler: &Arc<dyn ConnectionHandler>,
    shutdown: &CancellationToken,
    tracker: &ConnectionTracker,
) -> Result<(), ListenerError> {
    while !shutdown.is_cancelled() {
        match accept_connection(listener) {
            Ok(Some(stream)) => spawn_connection(stream, handler, shutdown, tracker),
            Ok(None) => thread::sleep(ACCEPT_BACKOFF),
            Err(error) if is_transient(&error) => {
                debug!(
                    target: LISTENER_TARGET,
                    error = %error,
                    "transient accept error"
                );
            }
            Err(source) => {
                warn!(
                    target: LISTENER_TARGET,
                    error = %source,
                    "socket accept error"
                );
                shutdown.cancel();
                return Err(ListenerError::Accept {
                    path: path.display().to_string(),
                    source,
                });
            }
        }
    }
    Ok(())
}

fn accept_connection(listener: &UnixListener) -> io::Result<Option<UnixStream>> {
    match listener.accept() {
        Ok((stream, _)) => {
            stream.set_nonblocking(false)?;
            Ok(Some(stream))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::ConnectionAborted
    )
}

fn spawn_connection(
    stream: UnixStream,
    handler: &Arc<dyn ConnectionHandler>,
    shutdown: &CancellationToken,
    tracker: &ConnectionTracker,
) {
    let handler = Arc::clone(handler);
    let token = shutdown.child();
    let guard = tracker.track();
    thread::spawn(move || {
        let _guard = guard;
        handler.handle(stream, token);
    });
}

fn remove_existing(path: &Path) -> Result<(), ListenerError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(
                target: LISTENER_TARGET,
                path = %path.display(),
                "removed stale socket file"
            );
            Ok(())
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ListenerError::Cleanup {
            path: path.display().to_string(),
            source,
        }),
    }
}

pub(crate) fn cleanup_unix_socket(path: &Path) {
    if let Err(error) = fs::remove_file(path)
        && error.kind() != io::ErrorKind::NotFound
    {
        warn!(
            target: LISTENER_TARGET,
            error = %error,
            path = %path.display(),
            "failed to remove unix socket file"
        );
    }
}
