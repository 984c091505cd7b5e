//! Response envelope returned for every dispatched call.
//!
//! The envelope is serialized as the JSON-RPC `result`:
//!
//! ```json
//! {"code":200,"data":50,"msg":"OK","meta":{"endpoint":"multiply","close":0}}
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Successful call.
pub const STATUS_OK: u16 = 200;
/// Handler reported an error.
pub const STATUS_BAD_REQUEST: u16 = 400;
/// No handler registered for the method.
pub const STATUS_NOT_FOUND: u16 = 404;
/// Handler panicked.
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// Metadata block of a response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// Method this response answers.
    #[serde(default)]
    pub endpoint: String,
    /// `1` asks the server to close the connection after writing the response.
    #[serde(default)]
    pub close: u8,
    /// Free-form extra data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

/// Status, message, payload, and metadata for one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// HTTP-style status code.
    pub code: u16,
    /// Handler payload; serialized as `null` when unset.
    #[serde(default)]
    pub data: Option<Value>,
    /// Human-readable status message.
    #[serde(rename = "msg")]
    pub message: String,
    /// Endpoint and connection metadata.
    #[serde(default)]
    pub meta: Meta,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Creates a 200 "OK" response with no data.
    #[must_use]
    pub fn new() -> Self {
        Self {
            code: STATUS_OK,
            data: None,
            message: status_text(STATUS_OK).to_owned(),
            meta: Meta::default(),
        }
    }

    /// Creates an error response with the canonical text for `code`.
    #[must_use]
    pub fn status(code: u16) -> Self {
        Self::new().with_error(code, status_text(code))
    }

    /// Marks the response successful and sets its data.
    #[must_use]
    pub fn with_success(mut self, data: Value) -> Self {
        self.code = STATUS_OK;
        self.message = status_text(STATUS_OK).to_owned();
        self.data = Some(data);
        self
    }

    /// Sets an error code and message, clearing any data.
    #[must_use]
    pub fn with_error(mut self, code: u16, message: impl Into<String>) -> Self {
        self.code = code;
        self.message = message.into();
        self.data = None;
        self
    }

    /// Sets the data and the endpoint it belongs to.
    #[must_use]
    pub fn with_data(mut self, data: Value, endpoint: impl Into<String>) -> Self {
        self.data = Some(data);
        self.meta.endpoint = endpoint.into();
        self
    }

    /// Attaches extra metadata.
    #[must_use]
    pub fn with_extra(mut self, extra: Value) -> Self {
        self.meta.extra = Some(extra);
        self
    }

    /// Records the endpoint this response answers.
    pub fn set_endpoint(&mut self, endpoint: impl Into<String>) {
        self.meta.endpoint = endpoint.into();
    }

    /// Sets or clears the close-connection flag.
    pub fn set_close(&mut self, close: bool) {
        self.meta.close = u8::from(close);
    }

    /// Reports whether the server should close the connection after writing.
    #[must_use]
    pub fn closes_connection(&self) -> bool {
        self.meta.close != 0
    }

    /// Reports whether the code is 200.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == STATUS_OK
    }

    /// Decodes the data payload into `T`. Unset data decodes as `null`.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error when the payload does not match `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.data {
            Some(data) => T::deserialize(data),
            None => T::deserialize(&Value::Null),
        }
    }
}

/// Canonical reason phrase for the status codes the pipeline produces.
#[must_use]
pub fn status_text(code: u16) -> &'static str {
    match code {
        STATUS_OK => "OK",
        STATUS_BAD_REQUEST => "Bad Request",
        STATUS_NOT_FOUND => "Not Found",
        STATUS_INTERNAL_ERROR => "Internal Server Error",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn new_response_is_ok() {
        let response = Response::new();
        assert_eq!(response.code, STATUS_OK);
        assert_eq!(response.message, "OK");
        assert!(response.data.is_none());
        assert!(!response.closes_connection());
    }

    #[test]
    fn serializes_wire_field_names() {
        let mut response = Response::new().with_data(json!(50), "multiply");
        response.set_close(true);
        let encoded = serde_json::to_value(&response).expect("encode");
        assert_eq!(
            encoded,
            json!({
                "code": 200,
                "data": 50,
                "msg": "OK",
                "meta": {"endpoint": "multiply", "close": 1}
            })
        );
    }

    #[test]
    fn unset_data_serializes_as_null() {
        let response = Response::status(STATUS_NOT_FOUND);
        let encoded = serde_json::to_value(&response).expect("encode");
        assert_eq!(encoded["data"], Value::Null);
        assert_eq!(encoded["msg"], "Not Found");
    }

    #[test]
    fn extra_is_emitted_when_set() {
        let response = Response::new().with_extra(json!({"trace": "abc"}));
        let encoded = serde_json::to_value(&response).expect("encode");
        assert_eq!(encoded["meta"]["extra"], json!({"trace": "abc"}));
    }

    #[test]
    fn with_error_clears_data() {
        let response = Response::new()
            .with_success(json!("partial"))
            .with_error(STATUS_BAD_REQUEST, "nope");
        assert!(response.data.is_none());
        assert!(!response.is_success());
    }

    #[test]
    fn decodes_data_payload() {
        let response = Response::new().with_success(json!(50));
        assert_eq!(response.data_as::<i64>().expect("decode"), 50);
    }
}
