//! Layered configuration shared by the simplejrpc daemon and CLI.
//!
//! Values are merged from defaults, an optional configuration file
//! (`--config-path` or `SIMPLEJRPC_CONFIG_PATH`), `SIMPLEJRPC_*` environment
//! variables and command-line flags, in increasing order of precedence.

mod defaults;
mod logging;
mod socket;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_DRAIN_TIMEOUT_MS, DEFAULT_LOG_FILTER, DEFAULT_MAX_FRAME_BYTES, SOCKET_FILE_NAME,
    default_log_filter, default_log_format, default_socket_path,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketPreparationError, prepare_socket_directory};

/// Resolved configuration for the simplejrpc binaries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "SIMPLEJRPC")]
pub struct Config {
    /// Path of the Unix socket the daemon listens on and the CLI dials.
    #[ortho_config(default = default_socket_path())]
    pub socket_path: Utf8PathBuf,
    /// Tracing filter directive.
    #[ortho_config(default = default_log_filter().to_owned())]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Milliseconds to wait for open connections on shutdown; `0` disables
    /// the wait.
    #[ortho_config(default = DEFAULT_DRAIN_TIMEOUT_MS)]
    pub drain_timeout_ms: u64,
    /// Largest accepted request body, in bytes.
    #[ortho_config(default = DEFAULT_MAX_FRAME_BYTES)]
    pub max_frame_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            log_filter: default_log_filter().to_owned(),
            log_format: default_log_format(),
            drain_timeout_ms: DEFAULT_DRAIN_TIMEOUT_MS,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl Config {
    /// Socket path as a borrowed UTF-8 path.
    #[must_use]
    pub fn socket_path(&self) -> &Utf8Path {
        &self.socket_path
    }

    /// Tracing filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Drain wait on shutdown; `None` when disabled.
    #[must_use]
    pub fn drain_timeout(&self) -> Option<Duration> {
        (self.drain_timeout_ms > 0).then(|| Duration::from_millis(self.drain_timeout_ms))
    }

    /// Largest accepted request body, in bytes.
    #[must_use]
    pub fn max_frame_bytes(&self) -> usize {
        self.max_frame_bytes
    }

    /// Creates the socket's parent directory with owner-only permissions.
    ///
    /// # Errors
    ///
    /// Returns `SocketPreparationError` if the path has no parent or the
    /// directory cannot be created.
    pub fn prepare_socket_directory(&self) -> Result<(), SocketPreparationError> {
        prepare_socket_directory(&self.socket_path)
    }
}
