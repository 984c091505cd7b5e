//! Request/response interceptors composed around handlers.

use std::sync::Arc;

use tracing::{debug, info};

use super::DISPATCH_TARGET;
use super::errors::MiddlewareError;
use super::request::Request;
use super::response::Response;

/// Interceptor invoked around every call it is registered for.
///
/// Request-side hooks run in registration order; response-side hooks run in
/// reverse registration order, so the first registered middleware wraps the
/// others.
pub trait Middleware: Send + Sync {
    /// Inspects or annotates the request before the handler runs.
    fn process_request(&self, request: &mut Request);

    /// Inspects or replaces the response after the handler runs.
    ///
    /// # Errors
    ///
    /// Returning an error stops the remaining response-side middleware and
    /// makes the error the call's final result.
    fn process_response(&self, response: Response) -> Result<Response, MiddlewareError>;
}

impl<T> Middleware for Arc<T>
where
    T: Middleware + ?Sized,
{
    fn process_request(&self, request: &mut Request) {
        (**self).process_request(request);
    }

    fn process_response(&self, response: Response) -> Result<Response, MiddlewareError> {
        (**self).process_response(response)
    }
}

/// Ordered list of middleware applied as one unit.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("MiddlewareChain")
            .field("len", &self.middlewares.len())
            .finish()
    }
}

impl MiddlewareChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware; it runs after the existing ones on the request
    /// path and before them on the response path.
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// Number of middleware in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Reports whether the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Runs every request hook in registration order.
    pub fn process_request(&self, request: &mut Request) {
        for middleware in &self.middlewares {
            middleware.process_request(request);
        }
    }

    /// Runs the response hooks in reverse registration order.
    ///
    /// # Errors
    ///
    /// Returns the first middleware error; the remaining (outer) middleware
    /// do not run.
    pub fn process_response(&self, response: Response) -> Result<Response, MiddlewareError> {
        self.middlewares
            .iter()
            .rev()
            .try_fold(response, |current, middleware| {
                middleware.process_response(current)
            })
    }
}

impl FromIterator<Arc<dyn Middleware>> for MiddlewareChain {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Middleware>>>(iter: I) -> Self {
        Self {
            middlewares: iter.into_iter().collect(),
        }
    }
}

/// Logs each call's method on entry and its status on exit.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMiddleware;

impl TracingMiddleware {
    /// Builds a new tracing middleware.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for TracingMiddleware {
    fn process_request(&self, request: &mut Request) {
        debug!(
            target: DISPATCH_TARGET,
            method = request.method(),
            id = ?request.id(),
            "processing request"
        );
    }

    fn process_response(&self, response: Response) -> Result<Response, MiddlewareError> {
        info!(
            target: DISPATCH_TARGET,
            endpoint = %response.meta.endpoint,
            code = response.code,
            "request completed"
        );
        Ok(response)
    }
}
