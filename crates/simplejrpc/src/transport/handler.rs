//! Connection handling for the socket listener.

use std::io::BufReader;
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::context::{CallContext, CancellationToken};
use crate::dispatch::{Request, Service};
use crate::protocol::{CodecError, RawRequest, RawResponse, RpcError, read_frame, write_frame};

use super::LISTENER_TARGET;

/// Handles accepted socket connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Serves one connection until it closes. `token` is cancelled by the
    /// caller's ancestors on shutdown; implementations cancel it on exit.
    fn handle(&self, stream: UnixStream, token: CancellationToken);
}

/// Whether the read loop keeps going after a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

type SharedWriter = Arc<Mutex<UnixStream>>;

/// Serves framed JSON-RPC requests through a [`Service`].
#[derive(Debug)]
pub(crate) struct ServiceConnectionHandler {
    service: Arc<Service>,
}

impl ServiceConnectionHandler {
    pub(crate) fn new(service: Arc<Service>) -> Self {
        Self { service }
    }

    fn serve(&self, stream: UnixStream, token: &CancellationToken) {
        let reader_stream = match stream.try_clone() {
            Ok(clone) => clone,
            Err(error) => {
                warn!(
                    target: LISTENER_TARGET,
                    error = %error,
                    "failed to clone connection stream"
                );
                return;
            }
        };
        let mut reader = BufReader::new(reader_stream);
        let writer: SharedWriter = Arc::new(Mutex::new(stream));
        let options = self.service.options();
        let mut in_flight: Vec<JoinHandle<()>> = Vec::new();

        loop {
            let request = match next_request(&mut reader, options.frame_limit(), token) {
                Ok(Some(request)) => request,
                Ok(None) => break,
                Err(error) if error.is_io() => {
                    debug!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "connection dropped mid-frame"
                    );
                    break;
                }
                Err(error) => {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "closing connection after decode failure"
                    );
                    break;
                }
            };

            if options.is_concurrent() {
                in_flight.retain(|handle| !handle.is_finished());
                let service = Arc::clone(&self.service);
                let writer = Arc::clone(&writer);
                in_flight.push(thread::spawn(move || {
                    if process(&service, request, &writer) == Flow::Close {
                        shutdown_stream(&writer);
                    }
                }));
            } else if process(&self.service, request, &writer) == Flow::Close {
                break;
            }
        }

        // Requests still running observe the closed connection.
        token.cancel();
        for handle in in_flight {
            if handle.join().is_err() {
                warn!(target: LISTENER_TARGET, "request thread panicked");
            }
        }
    }
}

impl ConnectionHandler for ServiceConnectionHandler {
    fn handle(&self, stream: UnixStream, token: CancellationToken) {
        debug!(target: LISTENER_TARGET, "connection opened");
        self.serve(stream, &token);
        token.cancel();
        debug!(target: LISTENER_TARGET, "connection closed");
    }
}

fn next_request(
    reader: &mut BufReader<UnixStream>,
    max_frame_bytes: usize,
    token: &CancellationToken,
) -> Result<Option<Request>, CodecError> {
    let Some(body) = read_frame(reader, max_frame_bytes)? else {
        return Ok(None);
    };
    let raw = RawRequest::parse(&body)?;
    Ok(Some(Request::new(CallContext::from_token(token.child()), raw)))
}

/// Runs one request through the pipeline and writes its reply, if any.
fn process(service: &Service, request: Request, writer: &SharedWriter) -> Flow {
    let id = request.id().cloned();
    let outcome = service.call(request);

    let Some(id) = id else {
        debug!(target: LISTENER_TARGET, "notification processed");
        return Flow::Continue;
    };

    let (reply, flow) = match outcome {
        Ok(response) => {
            let flow = if response.closes_connection() {
                Flow::Close
            } else {
                Flow::Continue
            };
            match serde_json::to_value(&response) {
                Ok(result) => (RawResponse::success(Some(id), result), flow),
                Err(error) => (
                    RawResponse::failure(Some(id), RpcError::internal(error.to_string())),
                    flow,
                ),
            }
        }
        Err(error) => (
            RawResponse::failure(Some(id), RpcError::internal(error.message())),
            Flow::Continue,
        ),
    };

    match write_reply(writer, &reply) {
        Ok(()) => flow,
        Err(error) => {
            warn!(
                target: LISTENER_TARGET,
                error = %error,
                "failed to write response"
            );
            Flow::Close
        }
    }
}

fn write_reply(writer: &SharedWriter, reply: &RawResponse) -> Result<(), CodecError> {
    let payload = serde_json::to_vec(reply)?;
    let mut stream = writer.lock().unwrap_or_else(PoisonError::into_inner);
    write_frame(&mut *stream, &payload)
}

fn shutdown_stream(writer: &SharedWriter) {
    let stream = writer.lock().unwrap_or_else(PoisonError::into_inner);
    if let Err(error) = stream.shutdown(Shutdown::Both) {
        debug!(
            target: LISTENER_TARGET,
            error = %error,
            "connection already closed"
        );
    }
}
