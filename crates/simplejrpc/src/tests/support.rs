//! Shared harness: a server on a temporary socket, stopped on drop.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Deserialize;
use tempfile::TempDir;

use crate::{
    CancellationToken, HandlerError, Request, Server, ServerError, ServerOptions, Service,
};

/// Parameters of the `multiply` test handler.
#[derive(Debug, Deserialize)]
pub struct Operands {
    #[serde(rename = "A")]
    pub a: i64,
    #[serde(rename = "B")]
    pub b: i64,
}

/// Service with `ping`, `multiply`, and `sleep` handlers.
pub fn demo_service() -> Service {
    let mut service = Service::new();
    register_demo_handlers(&mut service);
    service
}

pub fn register_demo_handlers(service: &mut Service) {
    service.register_handle("ping", |_: &Request| Ok("pong"));
    service.register_handle("multiply", |request: &Request| {
        let operands: Operands = request.decode_params()?;
        Ok::<_, HandlerError>(operands.a * operands.b)
    });
    service.register_handle("sleep", |request: &Request| {
        let millis: u64 = request.decode_params()?;
        thread::sleep(Duration::from_millis(millis));
        Ok::<_, HandlerError>(millis)
    });
}

/// Running server bound to a socket inside a temporary directory.
pub struct RunningServer {
    _dir: TempDir,
    path: PathBuf,
    server: Arc<Server>,
    thread: Option<JoinHandle<Result<(), ServerError>>>,
}

impl RunningServer {
    pub fn start(service: Service) -> Self {
        Self::start_with(service, ServerOptions::new())
    }

    pub fn start_with(service: Service, options: ServerOptions) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("simplejrpc.sock");
        let server = Arc::new(Server::with_options(service, options.handle_signals(false)));
        let thread = {
            let server = Arc::clone(&server);
            let path = path.clone();
            thread::spawn(move || server.start_server(&path))
        };
        wait_for_socket(&path);
        Self {
            _dir: dir,
            path,
            server,
            thread: Some(thread),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.server.shutdown_token()
    }

    /// Requests shutdown and returns the `start_server` result.
    pub fn stop(mut self) -> Result<(), ServerError> {
        self.server.shutdown();
        self.join()
    }

    /// Waits for `start_server` to return without requesting shutdown.
    pub fn join(&mut self) -> Result<(), ServerError> {
        self.thread
            .take()
            .map_or(Ok(()), |thread| thread.join().expect("join server thread"))
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        self.server.shutdown();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn wait_for_socket(path: &Path) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if std::os::unix::net::UnixStream::connect(path).is_ok() {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("server did not start listening on {}", path.display());
}

/// Polls `condition` for up to two seconds.
pub fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}
