//! Embeddable JSON-RPC 2.0 service over a local Unix domain socket.
//!
//! Applications register handlers on a [`Service`], optionally wrap them in
//! [`Middleware`], and hand the service to a [`Server`] that listens on a
//! socket path. Frames use the `Content-Length` object framing known from the
//! Language Server Protocol; every reply carries a [`Response`] envelope with
//! an HTTP-style status code.
//!
//! ```no_run
//! use simplejrpc::{Request, Server, Service, TracingMiddleware};
//!
//! let mut service = Service::new().with_middleware(TracingMiddleware::new());
//! service.register_handle("ping", |_: &Request| Ok("pong"));
//! Server::new(service).start_server("/tmp/simplejrpc.sock")?;
//! # Ok::<(), simplejrpc::ServerError>(())
//! ```
//!
//! ## Lifecycle
//!
//! The server removes any stale file at the socket path, binds, and accepts
//! connections on their own threads until SIGINT, SIGTERM, or
//! [`Server::shutdown`]. It then removes the socket file and returns. Open
//! connections are not killed; an optional drain timeout waits for them.
//!
//! ## Cancellation
//!
//! Each request carries a [`CallContext`] whose token descends from its
//! connection's token, which in turn descends from the server's root token.
//! Handlers that run for long can poll [`CallContext::is_cancelled`].

mod client;
pub mod context;
mod dispatch;
pub mod protocol;
mod server;
mod shutdown;
mod transport;

pub use client::{CONNECTION_TIMEOUT, CallOptions, Client, ClientError, DEFAULT_MAX_REPLY_BYTES};
pub use context::{CallContext, CancellationToken, ContextError};
pub use dispatch::{
    Dispatcher, HandlerError, HandlerFn, HandlerResult, Meta, Middleware, MiddlewareChain,
    MiddlewareError, RegistrationError, Request, Response, STATUS_BAD_REQUEST,
    STATUS_INTERNAL_ERROR, STATUS_NOT_FOUND, STATUS_OK, Service, ServiceOptions,
    TracingMiddleware, status_text,
};
pub use server::{Server, ServerError, ServerOptions};
pub use transport::ListenerError;

/// Tracing target for server lifecycle events.
pub(crate) const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

#[cfg(test)]
mod tests;
