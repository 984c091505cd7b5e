//! Method dispatch and the middleware pipeline.
//!
//! A [`Service`] owns a [`Dispatcher`] mapping method names to handlers and an
//! ordered list of service-level [`Middleware`]. Every call runs:
//!
//! 1. service middleware `process_request`, in registration order;
//! 2. the handler's own middleware `process_request`, in registration order;
//! 3. the handler, through [`Dispatcher::handle`];
//! 4. the handler's own middleware `process_response`, in reverse order;
//! 5. service middleware `process_response`, in reverse order.
//!
//! Unknown methods and handler failures become well-formed [`Response`]
//! envelopes (404 and 400). Only a middleware failure on the response path
//! escapes the pipeline as an error.

mod errors;
mod middleware;
mod request;
mod response;
mod router;
mod service;

pub use self::errors::{HandlerError, MiddlewareError, RegistrationError};
pub use self::middleware::{Middleware, MiddlewareChain, TracingMiddleware};
pub use self::request::Request;
pub use self::response::{
    Meta, Response, STATUS_BAD_REQUEST, STATUS_INTERNAL_ERROR, STATUS_NOT_FOUND, STATUS_OK,
    status_text,
};
pub use self::router::{Dispatcher, HandlerFn, HandlerResult};
pub use self::service::{Service, ServiceOptions};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
