//! Errors raised while framing or decoding protocol messages.

use std::io;

use thiserror::Error;

/// Failures while reading, writing, or decoding a single frame.
///
/// Any of these ends the connection that produced it; none of them is fatal
/// to the server.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The stream closed part-way through a frame.
    #[error("connection closed mid-frame")]
    UnexpectedEof,
    /// A header line could not be parsed.
    #[error("invalid frame header: {line}")]
    InvalidHeader {
        /// Offending header line, trimmed.
        line: String,
    },
    /// The header block ended without a `Content-Length`.
    #[error("frame is missing a Content-Length header")]
    MissingContentLength,
    /// The announced body exceeds the configured limit.
    #[error("frame too large: {size} bytes exceeds {max_size} byte limit")]
    FrameTooLarge {
        /// Announced body size.
        size: usize,
        /// Configured limit.
        max_size: usize,
    },
    /// The body is not a valid JSON-RPC 2.0 message.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The message declared a protocol version other than 2.0.
    #[error("unsupported jsonrpc version '{version}'")]
    UnsupportedVersion {
        /// Version string found in the message.
        version: String,
    },
    /// Reading from or writing to the stream failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl CodecError {
    /// Creates an invalid header error.
    pub fn invalid_header(line: impl Into<String>) -> Self {
        Self::InvalidHeader { line: line.into() }
    }

    /// Reports whether the error came from the underlying stream rather than
    /// the peer's bytes.
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::UnexpectedEof)
    }
}
