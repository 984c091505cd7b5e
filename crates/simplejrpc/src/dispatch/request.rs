//! Request envelope handed to middleware and handlers.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::CallContext;
use crate::protocol::{Id, RawRequest};

use super::errors::HandlerError;

/// Binds a call context to one decoded protocol request.
///
/// A request is created fresh for every inbound call and dropped once the
/// response-side middleware has finished. Middleware may annotate it through
/// the metadata map before the handler runs.
#[derive(Debug, Clone)]
pub struct Request {
    context: CallContext,
    raw: RawRequest,
    metadata: HashMap<String, String>,
}

impl Request {
    /// Wraps a decoded request with its call context.
    #[must_use]
    pub fn new(context: CallContext, raw: RawRequest) -> Self {
        Self {
            context,
            raw,
            metadata: HashMap::new(),
        }
    }

    /// Underlying protocol request.
    #[must_use]
    pub fn raw_request(&self) -> &RawRequest {
        &self.raw
    }

    /// Method name being called.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.raw.method
    }

    /// Call identifier; `None` for notifications.
    #[must_use]
    pub fn id(&self) -> Option<&Id> {
        self.raw.id.as_ref()
    }

    /// Raw parameters, if the caller sent any.
    #[must_use]
    pub fn params(&self) -> Option<&Value> {
        self.raw.params.as_ref()
    }

    /// Decodes the parameters into `T`. Absent parameters decode as `null`.
    ///
    /// # Errors
    ///
    /// Returns a `HandlerError` reading `invalid params: ...` when the
    /// parameters do not match `T`.
    pub fn decode_params<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        match &self.raw.params {
            Some(params) => Ok(T::deserialize(params)?),
            None => Ok(T::deserialize(&Value::Null)?),
        }
    }

    /// Call-scoped context carrying cancellation and deadline.
    #[must_use]
    pub fn context(&self) -> &CallContext {
        &self.context
    }

    /// Metadata attached by middleware.
    #[must_use]
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// Attaches a metadata entry, returning any previous value.
    pub fn insert_metadata(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.metadata.insert(key.into(), value.into())
    }

    /// Looks up a metadata entry.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}
