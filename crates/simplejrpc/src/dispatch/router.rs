//! Method-name routing to registered handlers.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::DISPATCH_TARGET;
use super::errors::{HandlerError, RegistrationError};
use super::middleware::{Middleware, MiddlewareChain};
use super::request::Request;
use super::response::{Response, STATUS_BAD_REQUEST, STATUS_INTERNAL_ERROR, STATUS_NOT_FOUND};

/// Value produced by a type-erased handler.
pub type HandlerResult = Result<Value, HandlerError>;

/// Type-erased handler stored by the dispatcher.
pub type HandlerFn = Arc<dyn Fn(&Request) -> HandlerResult + Send + Sync>;

struct Registration {
    handler: HandlerFn,
    middlewares: MiddlewareChain,
}

/// Maps method names to handlers and their handler-scoped middleware.
///
/// Method names are matched exactly; no format validation is applied, so the
/// empty string is a valid name.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<String, Registration>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        methods.sort_unstable();
        formatter
            .debug_struct("Dispatcher")
            .field("methods", &methods)
            .finish()
    }
}

impl Dispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `method`, replacing any existing handler.
    pub fn register<F, T>(&mut self, method: impl Into<String>, handler: F)
    where
        F: Fn(&Request) -> Result<T, HandlerError> + Send + Sync + 'static,
        T: Serialize,
    {
        self.register_with(method, handler, Vec::new());
    }

    /// Registers `handler` with middleware that wraps only this method.
    pub fn register_with<F, T>(
        &mut self,
        method: impl Into<String>,
        handler: F,
        middlewares: Vec<Arc<dyn Middleware>>,
    ) where
        F: Fn(&Request) -> Result<T, HandlerError> + Send + Sync + 'static,
        T: Serialize,
    {
        let method = method.into();
        let registration = Registration {
            handler: erase(handler),
            middlewares: middlewares.into_iter().collect(),
        };
        if self.handlers.insert(method.clone(), registration).is_some() {
            warn!(
                target: DISPATCH_TARGET,
                method = %method,
                "replaced existing handler registration"
            );
        } else {
            debug!(target: DISPATCH_TARGET, method = %method, "registered handler");
        }
    }

    /// Registers `handler` unless `method` is already taken.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError::DuplicateMethod` if a handler already
    /// exists for `method`; the existing handler is kept.
    pub fn try_register<F, T>(
        &mut self,
        method: impl Into<String>,
        handler: F,
    ) -> Result<(), RegistrationError>
    where
        F: Fn(&Request) -> Result<T, HandlerError> + Send + Sync + 'static,
        T: Serialize,
    {
        let method = method.into();
        if self.handlers.contains_key(&method) {
            return Err(RegistrationError::DuplicateMethod { method });
        }
        self.register(method, handler);
        Ok(())
    }

    /// Reports whether a handler is registered for `method`.
    #[must_use]
    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Number of registered methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Reports whether no methods are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Handler-scoped middleware for `method`, if the method is registered.
    #[must_use]
    pub fn middlewares_for(&self, method: &str) -> Option<&MiddlewareChain> {
        self.handlers
            .get(method)
            .map(|registration| &registration.middlewares)
    }

    /// Invokes the handler registered for the request's method.
    ///
    /// Never fails: an unknown method yields 404, a handler error yields 400
    /// with the error text and any partial body, and a panicking handler
    /// yields 500. The endpoint is always the method name.
    #[must_use]
    pub fn handle(&self, request: &Request) -> Response {
        let method = request.method();
        let Some(registration) = self.handlers.get(method) else {
            debug!(target: DISPATCH_TARGET, method, "method not found");
            return endpoint(Response::status(STATUS_NOT_FOUND), method);
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| (registration.handler)(request)));
        let response = match outcome {
            Ok(Ok(data)) => Response::new().with_success(data),
            Ok(Err(failure)) => {
                debug!(
                    target: DISPATCH_TARGET,
                    method,
                    error = %failure,
                    "handler returned an error"
                );
                let message = failure.to_string();
                let mut response = Response::new().with_error(STATUS_BAD_REQUEST, message);
                response.data = failure.into_data();
                response
            }
            Err(_) => {
                error!(target: DISPATCH_TARGET, method, "handler panicked");
                Response::status(STATUS_INTERNAL_ERROR)
            }
        };
        endpoint(response, method)
    }
}

fn endpoint(mut response: Response, method: &str) -> Response {
    response.set_endpoint(method);
    response
}

fn erase<F, T>(handler: F) -> HandlerFn
where
    F: Fn(&Request) -> Result<T, HandlerError> + Send + Sync + 'static,
    T: Serialize,
{
    Arc::new(move |request: &Request| {
        let value = handler(request)?;
        serde_json::to_value(value)
            .map_err(|error| HandlerError::new(format!("failed to encode result: {error}")))
    })
}
