use camino::Utf8PathBuf;
use std::env;

#[cfg(unix)]
use libc::geteuid;

#[cfg(unix)]
use dirs::runtime_dir;

use crate::logging::LogFormat;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default drain wait on shutdown, in milliseconds; `0` disables it.
pub const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 0;

/// Default limit on a single request body.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// File name of the default socket.
pub const SOCKET_FILE_NAME: &str = "simplejrpc.sock";

const APP_DIRECTORY: &str = "simplejrpc";

/// Default log filter expression used by the binaries.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Computes the default socket path.
///
/// Uses `$XDG_RUNTIME_DIR/simplejrpc/` when a runtime directory exists and
/// falls back to a per-user directory under the system temporary directory.
#[must_use]
pub fn default_socket_path() -> Utf8PathBuf {
    let (mut base, apply_namespace) = match runtime_base_directory() {
        Some(dir) => (dir, false),
        None => (fallback_base_directory(), true),
    };

    base.push(APP_DIRECTORY);
    if apply_namespace {
        base.push(user_namespace());
    }
    base.join(SOCKET_FILE_NAME)
}

#[cfg(unix)]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

#[cfg(not(unix))]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    None
}

fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn user_namespace() -> String {
    // SAFETY: `geteuid` has no preconditions and cannot fail.
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}

#[cfg(not(unix))]
fn user_namespace() -> String {
    "shared".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_socket_lives_in_app_directory() {
        let path = default_socket_path();
        assert_eq!(path.file_name(), Some(SOCKET_FILE_NAME));
        let in_app_dir = path
            .ancestors()
            .any(|ancestor| ancestor.file_name() == Some(APP_DIRECTORY));
        assert!(in_app_dir, "unexpected default socket path: {path}");
    }
}
