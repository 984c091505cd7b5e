//! Client for calling a [`crate::Server`] over its Unix socket.
//!
//! A [`Client`] either dials a fresh connection per call or, in keep-alive
//! mode, reuses one connection until [`Client::close`] or an I/O failure.
//! Each client numbers its calls from 1 upwards.

use std::io::{self, BufReader};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use socket2::{Domain, SockAddr, Socket, Type};
use thiserror::Error;
use tracing::debug;

use crate::context::{CallContext, ContextError};
use crate::protocol::{
    CodecError, Id, RawRequest, RawResponse, RpcError, read_frame, write_frame,
};

const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::client");

/// Upper bound on establishing a connection.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Default upper bound on a single reply body read by a [`Client`].
///
/// Servers only limit inbound requests, so replies get a wider default than
/// [`crate::protocol::DEFAULT_MAX_FRAME_BYTES`].
pub const DEFAULT_MAX_REPLY_BYTES: usize = 64 * 1024 * 1024;

/// Errors returned by client calls.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connecting to the socket failed.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        /// Socket path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Configuring or using the connection failed.
    #[error("transport error: {0}")]
    Io(#[source] io::Error),
    /// A frame could not be written or read.
    #[error("protocol error: {0}")]
    Protocol(#[from] CodecError),
    /// Parameters could not be serialized.
    #[error("failed to encode params: {0}")]
    Encode(#[source] serde_json::Error),
    /// The result did not match the expected type.
    #[error("failed to decode result: {0}")]
    Decode(#[source] serde_json::Error),
    /// The server answered with a JSON-RPC error object.
    #[error("rpc error {}: {}", .0.code, .0.message)]
    Rpc(RpcError),
    /// The server closed the connection before replying.
    #[error("connection closed before a response arrived")]
    Closed,
    /// The call context was cancelled.
    #[error("call cancelled")]
    Cancelled,
    /// The call deadline passed.
    #[error("call deadline exceeded")]
    DeadlineExceeded,
}

impl From<ContextError> for ClientError {
    fn from(error: ContextError) -> Self {
        match error {
            ContextError::Cancelled => Self::Cancelled,
            ContextError::DeadlineExceeded => Self::DeadlineExceeded,
        }
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOptions {
    id: Option<Id>,
}

impl CallOptions {
    /// Options with a generated id.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `id` instead of the client's next sequence number.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<Id>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[derive(Debug)]
struct Connection {
    reader: BufReader<UnixStream>,
    writer: UnixStream,
    max_reply_bytes: usize,
}

impl Connection {
    fn open(path: &Path, context: &CallContext, max_reply_bytes: usize) -> Result<Self, ClientError> {
        let timeout = context
            .remaining()
            .map_or(CONNECTION_TIMEOUT, |remaining| remaining.min(CONNECTION_TIMEOUT));
        if timeout.is_zero() {
            return Err(ClientError::DeadlineExceeded);
        }
        let writer = connect_unix(path, timeout).map_err(|source| ClientError::Connect {
            path: path.display().to_string(),
            source,
        })?;
        let reader = BufReader::new(writer.try_clone().map_err(ClientError::Io)?);
        Ok(Self {
            reader,
            writer,
            max_reply_bytes,
        })
    }

    fn apply_deadline(&self, context: &CallContext) -> Result<(), ClientError> {
        let timeout = match context.remaining() {
            Some(remaining) if remaining.is_zero() => return Err(ClientError::DeadlineExceeded),
            other => other,
        };
        self.writer
            .set_read_timeout(timeout)
            .map_err(ClientError::Io)?;
        self.writer
            .set_write_timeout(timeout)
            .map_err(ClientError::Io)
    }

    fn send(&mut self, request: &RawRequest, context: &CallContext) -> Result<(), ClientError> {
        let payload = serde_json::to_vec(request).map_err(ClientError::Encode)?;
        write_frame(&mut self.writer, &payload).map_err(|error| classify(error, context))
    }

    /// Reads frames until the one answering `id`; others are discarded.
    fn receive(&mut self, id: &Id, context: &CallContext) -> Result<RawResponse, ClientError> {
        loop {
            if let Some(error) = context.err() {
                return Err(error.into());
            }
            let body = read_frame(&mut self.reader, self.max_reply_bytes)
                .map_err(|error| classify(error, context))?
                .ok_or(ClientError::Closed)?;
            let response = RawResponse::parse(&body)?;
            if response.id.as_ref() == Some(id) {
                return Ok(response);
            }
            debug!(
                target: CLIENT_TARGET,
                expected = %id,
                received = ?response.id,
                "skipping response for another call"
            );
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(error) = self.writer.shutdown(Shutdown::Both) {
            debug!(target: CLIENT_TARGET, error = %error, "connection already closed");
        }
    }
}

fn connect_unix(path: &Path, timeout: Duration) -> io::Result<UnixStream> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path)?;
    socket.connect_timeout(&address, timeout)?;
    Ok(socket.into())
}

fn classify(error: CodecError, context: &CallContext) -> ClientError {
    match error {
        CodecError::Io(source)
            if matches!(
                source.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ) && context.deadline().is_some() =>
        {
            ClientError::DeadlineExceeded
        }
        other => ClientError::Protocol(other),
    }
}

/// Calls methods on a server's socket.
#[derive(Debug)]
pub struct Client {
    path: PathBuf,
    keep_alive: bool,
    max_reply_bytes: usize,
    next_id: AtomicU64,
    connection: Mutex<Option<Connection>>,
}

impl Client {
    /// Client that dials a new connection for every call.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::build(path.into(), false)
    }

    /// Client that reuses one connection across calls.
    #[must_use]
    pub fn keep_alive(path: impl Into<PathBuf>) -> Self {
        Self::build(path.into(), true)
    }

    fn build(path: PathBuf, keep_alive: bool) -> Self {
        Self {
            path,
            keep_alive,
            max_reply_bytes: DEFAULT_MAX_REPLY_BYTES,
            next_id: AtomicU64::new(1),
            connection: Mutex::new(None),
        }
    }

    /// Caps the body size of replies read by this client.
    #[must_use]
    pub fn with_max_frame_bytes(mut self, limit: usize) -> Self {
        self.max_reply_bytes = limit;
        self
    }

    /// Socket path this client dials.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Calls `method` and decodes the result into `R`.
    ///
    /// Servers built with this crate return the response envelope as the
    /// result, so `R` is typically [`crate::Response`].
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Cancelled` or `ClientError::DeadlineExceeded`
    /// when the context is done, `ClientError::Rpc` for a JSON-RPC error
    /// reply, and the matching variant for connect, framing or decode
    /// failures.
    pub fn request<P, R>(
        &self,
        context: &CallContext,
        method: &str,
        params: &P,
        options: CallOptions,
    ) -> Result<R, ClientError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        if let Some(error) = context.err() {
            return Err(error.into());
        }
        let id = options
            .id
            .unwrap_or_else(|| Id::Num(self.next_id.fetch_add(1, Ordering::SeqCst)));
        let request = RawRequest::call(id.clone(), method, encode_params(params)?);

        let response = self.with_connection(context, |connection| {
            connection.send(&request, context)?;
            connection.receive(&id, context)
        })?;

        if let Some(error) = response.error {
            return Err(ClientError::Rpc(error));
        }
        let result = response.result.unwrap_or(Value::Null);
        R::deserialize(&result).map_err(ClientError::Decode)
    }

    /// Sends a notification; no reply is expected.
    ///
    /// # Errors
    ///
    /// Returns the same context, connect and framing errors as
    /// [`Client::request`].
    pub fn notify<P>(&self, context: &CallContext, method: &str, params: &P) -> Result<(), ClientError>
    where
        P: Serialize + ?Sized,
    {
        if let Some(error) = context.err() {
            return Err(error.into());
        }
        let request = RawRequest::notification(method, encode_params(params)?);
        self.with_connection(context, |connection| connection.send(&request, context))
    }

    /// Drops the kept-alive connection, if any.
    pub fn close(&self) {
        let mut slot = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        slot.take();
    }

    fn with_connection<T>(
        &self,
        context: &CallContext,
        call: impl FnOnce(&mut Connection) -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        if !self.keep_alive {
            let mut connection = Connection::open(&self.path, context, self.max_reply_bytes)?;
            connection.apply_deadline(context)?;
            return call(&mut connection);
        }

        let mut slot = self.connection.lock().unwrap_or_else(PoisonError::into_inner);
        let mut connection = match slot.take() {
            Some(connection) => connection,
            None => Connection::open(&self.path, context, self.max_reply_bytes)?,
        };
        connection.apply_deadline(context)?;
        let result = call(&mut connection);
        if result.is_ok() {
            *slot = Some(connection);
        }
        result
    }
}

fn encode_params<P: Serialize + ?Sized>(params: &P) -> Result<Option<Value>, ClientError> {
    match serde_json::to_value(params).map_err(ClientError::Encode)? {
        Value::Null => Ok(None),
        value => Ok(Some(value)),
    }
}
