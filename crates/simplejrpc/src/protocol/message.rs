//! JSON-RPC 2.0 request and response objects.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::CodecError;

/// Protocol version carried by every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// Error code for failures inside the server pipeline.
pub const INTERNAL_ERROR: i64 = -32603;

/// Call identifier used to correlate requests and responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// Numeric identifier.
    Num(u64),
    /// String identifier.
    Str(String),
}

impl fmt::Display for Id {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(value) => write!(formatter, "{value}"),
            Self::Str(value) => write!(formatter, "{value:?}"),
        }
    }
}

impl From<u64> for Id {
    fn from(value: u64) -> Self {
        Self::Num(value)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

/// Decoded request frame. A missing `id` marks a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRequest {
    /// Protocol version, always `"2.0"` once parsed.
    pub jsonrpc: String,
    /// Correlation identifier; `None` for notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    /// Method name used for dispatch.
    pub method: String,
    /// Serialized parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RawRequest {
    /// Builds a call carrying `id`.
    pub fn call(id: Id, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id: Some(id),
            method: method.into(),
            params,
        }
    }

    /// Builds a notification, which expects no reply.
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id: None,
            method: method.into(),
            params,
        }
    }

    /// Parses a frame body into a request.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Malformed` if the body is not a JSON-RPC request
    /// object and `CodecError::UnsupportedVersion` for versions other than 2.0.
    pub fn parse(body: &[u8]) -> Result<Self, CodecError> {
        let request: Self = serde_json::from_slice(body)?;
        if request.jsonrpc != JSONRPC_VERSION {
            return Err(CodecError::UnsupportedVersion {
                version: request.jsonrpc,
            });
        }
        Ok(request)
    }

    /// Reports whether the request expects no reply.
    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Error object carried by a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable description.
    pub message: String,
    /// Optional structured detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Creates an internal error with the given message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: INTERNAL_ERROR,
            message: message.into(),
            data: None,
        }
    }
}

/// Response frame; exactly one of `result` and `error` is set on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    /// Protocol version.
    pub jsonrpc: String,
    /// Identifier copied from the request.
    pub id: Option<Id>,
    /// Successful result payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RawResponse {
    /// Builds a successful response.
    #[must_use]
    pub fn success(id: Option<Id>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response.
    #[must_use]
    pub fn failure(id: Option<Id>, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Parses a frame body into a response.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Malformed` if the body is not a response object.
    pub fn parse(body: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_json::from_slice(body)?)
    }
}
