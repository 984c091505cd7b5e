//! Configuration loaders and helpers shared by the daemon suites.

use std::ffi::OsString;
use std::sync::Arc;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use mockall::mock;
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use simplejrpc_config::{Config, LogFormat};

use crate::bootstrap::ConfigLoader;

mock! {
    pub Loader {}

    impl ConfigLoader for Loader {
        fn load(&self) -> Result<Config, Arc<OrthoError>>;
    }
}

/// Configuration with its socket inside a fresh temporary directory.
pub struct TempConfig {
    pub dir: TempDir,
    pub config: Config,
}

impl TempConfig {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let socket = dir.path().join("run").join("simplejrpcd.sock");
        let config = Config {
            socket_path: Utf8PathBuf::from_path_buf(socket).expect("utf8 socket path"),
            log_format: LogFormat::Compact,
            drain_timeout_ms: 500,
            ..Config::default()
        };
        Self { dir, config }
    }
}

/// Produces the error ortho_config reports for an unparsable flag.
pub fn invalid_flag_error() -> Arc<OrthoError> {
    let args = [
        OsString::from("simplejrpcd"),
        OsString::from("--drain-timeout-ms"),
        OsString::from("soon"),
    ];
    Config::load_from_iter(args).expect_err("invalid flag should fail to load")
}

pub fn wait_for_socket(path: &std::path::Path) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if std::os::unix::net::UnixStream::connect(path).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("daemon did not start listening on {}", path.display());
}
