//! Error types for handler, middleware, and registration failures.

use std::error::Error as StdError;

use serde_json::Value;
use thiserror::Error;

/// Failure reported by a handler.
///
/// The message becomes the response `msg` (with code 400). A handler may
/// attach a partial body that is still returned as the response `data`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    data: Option<Value>,
}

impl HandlerError {
    /// Creates a handler error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }

    /// Attaches a partial body returned alongside the error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Partial body, if the handler supplied one.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Consumes the error, returning the partial body.
    #[must_use]
    pub fn into_data(self) -> Option<Value> {
        self.data
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(source: serde_json::Error) -> Self {
        Self::new(format!("invalid params: {source}"))
    }
}

/// Failure raised by a middleware on the response path.
///
/// It halts the remaining response-side middleware and becomes the call's
/// final error.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct MiddlewareError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl MiddlewareError {
    /// Creates a middleware error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an underlying error, using its text as the message.
    pub fn from_source(source: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors raised by strict handler registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A handler is already registered under this method name.
    #[error("method '{method}' is already registered")]
    DuplicateMethod {
        /// Method name that was registered twice.
        method: String,
    },
}
