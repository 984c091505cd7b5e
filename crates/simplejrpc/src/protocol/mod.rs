//! JSON-RPC 2.0 message types and their `Content-Length` framing.
//!
//! Each message travels as a header block followed by a JSON body:
//!
//! ```text
//! Content-Length: <length>\r\n
//! \r\n
//! <payload>
//! ```
//!
//! Client and server share this module so both sides agree on the codec.

mod codec;
mod errors;
mod message;

pub use self::codec::{DEFAULT_MAX_FRAME_BYTES, read_frame, write_frame};
pub use self::errors::CodecError;
pub use self::message::{
    INTERNAL_ERROR, Id, JSONRPC_VERSION, RawRequest, RawResponse, RpcError,
};
