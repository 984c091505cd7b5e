//! Server lifecycle and request round trips over a real socket.

use std::os::unix::net::UnixListener;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rstest::{fixture, rstest};
use serde_json::{Value, json};
use signal_hook::consts::SIGTERM;

use super::support::{RunningServer, demo_service, eventually};
use crate::{
    CallContext, CallOptions, Client, Response, Server, ServerError, ServerOptions,
};

#[fixture]
fn running() -> RunningServer {
    RunningServer::start(demo_service())
}

fn call(path: &std::path::Path, method: &str, params: &Value) -> Response {
    Client::new(path)
        .request(&CallContext::background(), method, params, CallOptions::new())
        .expect("call")
}

#[rstest]
fn multiply_round_trip(running: RunningServer) {
    let response = call(running.path(), "multiply", &json!({"A": 10, "B": 5}));
    assert_eq!(response.code, 200);
    assert_eq!(response.message, "OK");
    assert_eq!(response.data_as::<i64>().expect("decode data"), 50);
    assert_eq!(response.meta.endpoint, "multiply");
}

#[rstest]
fn unknown_method_reports_not_found(running: RunningServer) {
    let response = call(running.path(), "divide", &json!({"A": 10, "B": 5}));
    assert_eq!(response.code, 404);
    assert_eq!(response.message, "Not Found");
    assert!(response.data.is_none());
}

#[rstest]
fn invalid_params_report_bad_request(running: RunningServer) {
    let response = call(running.path(), "multiply", &json!({"A": "ten"}));
    assert_eq!(response.code, 400);
    assert!(response.message.starts_with("invalid params"));
}

#[rstest]
fn hundred_concurrent_clients_each_get_pong(running: RunningServer) {
    let path = Arc::new(running.path().to_path_buf());
    let workers: Vec<_> = (0..100)
        .map(|_| {
            let path = Arc::clone(&path);
            thread::spawn(move || call(&path, "ping", &Value::Null))
        })
        .collect();

    for worker in workers {
        let response = worker.join().expect("join client");
        assert_eq!(response.code, 200);
        assert_eq!(response.data, Some(json!("pong")));
    }
}

#[rstest]
fn shutdown_removes_socket_and_returns_ok(running: RunningServer) {
    let path = running.path().to_path_buf();
    assert!(path.exists());
    running.stop().expect("graceful shutdown");
    assert!(!path.exists(), "socket file should be removed");
}

#[rstest]
fn repeated_shutdown_is_harmless(running: RunningServer) {
    let token = running.shutdown_token();
    running.server().shutdown();
    token.cancel();
    running.server().shutdown();
    running.stop().expect("graceful shutdown");
}

#[rstest]
fn restart_after_shutdown_is_rejected(mut running: RunningServer) {
    running.server().shutdown();
    running.join().expect("graceful shutdown");
    let result = running.server().start_server(running.path());
    assert!(matches!(result, Err(ServerError::AlreadyShutDown)));
}

#[rstest]
fn second_start_is_rejected(running: RunningServer) {
    let other = tempfile::tempdir().expect("temp dir");
    let result = running.server().start_server(other.path().join("second.sock"));
    assert!(matches!(result, Err(ServerError::AlreadyStarted)));
}

#[rstest]
fn stale_socket_file_is_replaced() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("stale.sock");
    drop(UnixListener::bind(&path).expect("bind stale socket"));
    assert!(path.exists());

    let server = Arc::new(Server::with_options(
        demo_service(),
        ServerOptions::new().handle_signals(false),
    ));
    let worker = {
        let server = Arc::clone(&server);
        let path = path.clone();
        thread::spawn(move || server.start_server(&path))
    };
    assert!(eventually(|| std::os::unix::net::UnixStream::connect(&path).is_ok()));
    assert_eq!(call(&path, "ping", &Value::Null).code, 200);

    server.shutdown();
    worker.join().expect("join server").expect("server result");
    assert!(!path.exists());
}

#[rstest]
fn bind_failure_is_reported() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("missing").join("server.sock");
    let server = Server::with_options(demo_service(), ServerOptions::new().handle_signals(false));
    let result = server.start_server(&path);
    assert!(matches!(result, Err(ServerError::Listener(_))));
}

#[rstest]
fn server_can_start_after_bind_failure() {
    let dir = tempfile::tempdir().expect("temp dir");
    let server = Arc::new(Server::with_options(
        demo_service(),
        ServerOptions::new().handle_signals(false),
    ));
    let missing = dir.path().join("missing").join("server.sock");
    assert!(matches!(
        server.start_server(&missing),
        Err(ServerError::Listener(_))
    ));
    assert!(!server.shutdown_token().is_cancelled());

    let path = dir.path().join("retry.sock");
    let worker = {
        let server = Arc::clone(&server);
        let path = path.clone();
        thread::spawn(move || server.start_server(&path))
    };
    assert!(eventually(|| std::os::unix::net::UnixStream::connect(&path).is_ok()));
    assert_eq!(call(&path, "ping", &Value::Null).code, 200);

    server.shutdown();
    worker.join().expect("join server").expect("server result");
}

#[rstest]
fn repeated_sigterm_shuts_down_gracefully() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("signals.sock");
    let server = Arc::new(Server::new(demo_service()));
    let worker = {
        let server = Arc::clone(&server);
        let path = path.clone();
        thread::spawn(move || server.start_server(&path))
    };
    // The watcher is installed before the socket is bound.
    assert!(eventually(|| std::os::unix::net::UnixStream::connect(&path).is_ok()));

    signal_hook::low_level::raise(SIGTERM).expect("raise first SIGTERM");
    signal_hook::low_level::raise(SIGTERM).expect("raise second SIGTERM");

    worker
        .join()
        .expect("join server")
        .expect("signal shutdown is graceful");
    assert!(server.shutdown_token().is_cancelled());
    assert!(!path.exists(), "socket file should be removed");
}

#[rstest]
fn open_connections_survive_shutdown_and_drain() {
    let running = RunningServer::start_with(
        demo_service(),
        ServerOptions::new().drain_timeout(Some(Duration::from_secs(5))),
    );
    let client = Client::keep_alive(running.path());
    let context = CallContext::background();
    let _: Response = client
        .request(&context, "ping", &(), CallOptions::new())
        .expect("open connection");

    let slow = {
        let path = running.path().to_path_buf();
        thread::spawn(move || call(&path, "sleep", &json!(300)))
    };
    thread::sleep(Duration::from_millis(100));

    let started = Instant::now();
    running.server().shutdown();
    let response: Response = client
        .request(&context, "ping", &(), CallOptions::new())
        .expect("existing connection keeps working");
    assert_eq!(response.code, 200);
    assert_eq!(slow.join().expect("join slow call").data, Some(json!(300)));

    client.close();
    running.stop().expect("graceful shutdown");
    assert!(started.elapsed() < Duration::from_secs(5));
}
