//! Dispatcher plus service-level middleware, run as one pipeline.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::protocol::DEFAULT_MAX_FRAME_BYTES;

use super::errors::{HandlerError, MiddlewareError, RegistrationError};
use super::middleware::{Middleware, MiddlewareChain};
use super::request::Request;
use super::response::Response;
use super::router::Dispatcher;

/// Per-connection processing options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    concurrent_requests: bool,
    max_frame_bytes: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            concurrent_requests: false,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl ServiceOptions {
    /// Sequential processing with the default frame limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs each request of a connection on its own thread when enabled.
    #[must_use]
    pub const fn concurrent_requests(mut self, enabled: bool) -> Self {
        self.concurrent_requests = enabled;
        self
    }

    /// Caps the body size of inbound frames.
    #[must_use]
    pub const fn max_frame_bytes(mut self, limit: usize) -> Self {
        self.max_frame_bytes = limit;
        self
    }

    /// Whether requests on one connection are processed concurrently.
    #[must_use]
    pub const fn is_concurrent(&self) -> bool {
        self.concurrent_requests
    }

    /// Inbound frame limit in bytes.
    #[must_use]
    pub const fn frame_limit(&self) -> usize {
        self.max_frame_bytes
    }
}

/// Handlers and middleware assembled before serving.
///
/// Once a [`crate::Server`] takes ownership the service is shared immutably
/// between connection threads.
#[derive(Default)]
pub struct Service {
    dispatcher: Dispatcher,
    middlewares: MiddlewareChain,
    options: ServiceOptions,
}

impl fmt::Debug for Service {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Service")
            .field("dispatcher", &self.dispatcher)
            .field("middlewares", &self.middlewares)
            .field("options", &self.options)
            .finish()
    }
}

impl Service {
    /// Creates a service with no handlers or middleware.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service with explicit options.
    #[must_use]
    pub fn with_options(options: ServiceOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Appends service-level middleware, builder style.
    #[must_use]
    pub fn with_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.use_middleware(middleware);
        self
    }

    /// Appends service-level middleware.
    pub fn use_middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Registers a handler, replacing any previous one for `method`.
    pub fn register_handle<F, T>(&mut self, method: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&Request) -> Result<T, HandlerError> + Send + Sync + 'static,
        T: Serialize,
    {
        self.dispatcher.register(method, handler);
        self
    }

    /// Registers a handler wrapped by middleware scoped to `method` alone.
    ///
    /// Handler middleware runs inside the service-level middleware.
    pub fn register_handle_with<F, T>(
        &mut self,
        method: impl Into<String>,
        handler: F,
        middlewares: Vec<Arc<dyn Middleware>>,
    ) -> &mut Self
    where
        F: Fn(&Request) -> Result<T, HandlerError> + Send + Sync + 'static,
        T: Serialize,
    {
        self.dispatcher.register_with(method, handler, middlewares);
        self
    }

    /// Registers a handler, refusing to replace an existing one.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError::DuplicateMethod` if `method` is taken.
    pub fn try_register_handle<F, T>(
        &mut self,
        method: impl Into<String>,
        handler: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&Request) -> Result<T, HandlerError> + Send + Sync + 'static,
        T: Serialize,
    {
        self.dispatcher.try_register(method, handler)?;
        Ok(self)
    }

    /// Registered handlers.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Connection processing options.
    #[must_use]
    pub fn options(&self) -> ServiceOptions {
        self.options
    }

    /// Runs the full pipeline for one request.
    ///
    /// # Errors
    ///
    /// Returns the first `MiddlewareError` raised on the response path. Unknown
    /// methods and handler failures are reported inside the `Response`.
    pub fn call(&self, mut request: Request) -> Result<Response, MiddlewareError> {
        self.middlewares.process_request(&mut request);

        let scoped = self.dispatcher.middlewares_for(request.method());
        if let Some(chain) = scoped {
            chain.process_request(&mut request);
        }

        let mut response = self.dispatcher.handle(&request);
        drop(request);

        if let Some(chain) = scoped {
            response = chain.process_response(response)?;
        }
        self.middlewares.process_response(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rstest::rstest;
    use serde_json::json;

    use crate::context::CallContext;
    use crate::protocol::{Id, RawRequest};

    use super::*;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        tag: &'static str,
        log: Log,
        fail_response: bool,
    }

    impl Recorder {
        fn new(tag: &'static str, log: &Log) -> Self {
            Self {
                tag,
                log: Arc::clone(log),
                fail_response: false,
            }
        }

        fn failing(tag: &'static str, log: &Log) -> Self {
            Self {
                fail_response: true,
                ..Self::new(tag, log)
            }
        }

        fn record(&self, phase: &str) {
            self.log
                .lock()
                .expect("log lock")
                .push(format!("{}-{phase}", self.tag));
        }
    }

    impl Middleware for Recorder {
        fn process_request(&self, request: &mut Request) {
            self.record("req");
            request.insert_metadata(self.tag, "seen");
        }

        fn process_response(&self, response: Response) -> Result<Response, MiddlewareError> {
            self.record("resp");
            if self.fail_response {
                return Err(MiddlewareError::new(format!("{} rejected", self.tag)));
            }
            Ok(response)
        }
    }

    fn request(method: &str) -> Request {
        Request::new(
            CallContext::background(),
            RawRequest::call(Id::Num(1), method, None),
        )
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().expect("log lock").clone()
    }

    #[rstest]
    fn service_middleware_wraps_handler_in_onion_order() {
        let log: Log = Arc::default();
        let mut service = Service::new()
            .with_middleware(Recorder::new("A", &log))
            .with_middleware(Recorder::new("B", &log));
        service.register_handle("ping", |_: &Request| Ok("pong"));

        let response = service.call(request("ping")).expect("call");
        assert_eq!(response.data, Some(json!("pong")));
        assert_eq!(entries(&log), ["A-req", "B-req", "B-resp", "A-resp"]);
    }

    #[rstest]
    fn handler_middleware_runs_inside_service_middleware() {
        let log: Log = Arc::default();
        let mut service = Service::new().with_middleware(Recorder::new("S", &log));
        service.register_handle_with(
            "wrapped",
            |request: &Request| Ok(request.metadata_value("H").is_some()),
            vec![Arc::new(Recorder::new("H", &log)) as Arc<dyn Middleware>],
        );
        service.register_handle("plain", |request: &Request| {
            Ok(request.metadata_value("H").is_some())
        });

        let wrapped = service.call(request("wrapped")).expect("call wrapped");
        assert_eq!(wrapped.data, Some(json!(true)));
        assert_eq!(entries(&log), ["S-req", "H-req", "H-resp", "S-resp"]);

        log.lock().expect("log lock").clear();
        let plain = service.call(request("plain")).expect("call plain");
        assert_eq!(plain.data, Some(json!(false)));
        assert_eq!(entries(&log), ["S-req", "S-resp"]);
    }

    #[rstest]
    fn response_error_skips_outer_middleware() {
        let log: Log = Arc::default();
        let mut service = Service::new()
            .with_middleware(Recorder::new("A", &log))
            .with_middleware(Recorder::failing("B", &log))
            .with_middleware(Recorder::new("C", &log));
        service.register_handle("ping", |_: &Request| Ok("pong"));

        let error = service.call(request("ping")).expect_err("call should fail");
        assert_eq!(error.message(), "B rejected");
        assert_eq!(entries(&log), ["A-req", "B-req", "C-req", "C-resp", "B-resp"]);
    }

    #[rstest]
    fn unknown_method_still_passes_through_middleware() {
        let log: Log = Arc::default();
        let service = Service::new().with_middleware(Recorder::new("A", &log));

        let response = service.call(request("missing")).expect("call");
        assert_eq!(response.code, 404);
        assert_eq!(entries(&log), ["A-req", "A-resp"]);
    }

    #[rstest]
    fn strict_registration_reports_duplicates() {
        let mut service = Service::new();
        service
            .try_register_handle("ping", |_: &Request| Ok("pong"))
            .expect("first registration");
        let error = service
            .try_register_handle("ping", |_: &Request| Ok("again"))
            .expect_err("duplicate registration");
        assert!(matches!(error, RegistrationError::DuplicateMethod { .. }));
    }

    #[rstest]
    fn options_default_to_sequential_with_frame_limit() {
        let options = ServiceOptions::default();
        assert!(!options.is_concurrent());
        assert_eq!(options.frame_limit(), DEFAULT_MAX_FRAME_BYTES);

        let options = options.concurrent_requests(true).max_frame_bytes(64);
        assert!(options.is_concurrent());
        assert_eq!(options.frame_limit(), 64);
    }
}
