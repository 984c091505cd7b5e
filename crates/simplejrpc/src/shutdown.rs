//! SIGINT/SIGTERM watcher that cancels the server's root token.

use std::io;
use std::thread::{self, JoinHandle};

use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use tracing::{info, warn};

use crate::SERVER_TARGET;
use crate::context::CancellationToken;

/// Background thread translating termination signals into cancellation.
///
/// Repeated signals only cancel an already cancelled token again.
#[derive(Debug)]
pub(crate) struct SignalWatcher {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl SignalWatcher {
    /// Installs handlers for SIGINT and SIGTERM.
    pub(crate) fn install(token: CancellationToken) -> io::Result<Self> {
        let mut signals = Signals::new([SIGINT, SIGTERM])?;
        let handle = signals.handle();
        let thread = thread::spawn(move || {
            for signal in signals.forever() {
                info!(target: SERVER_TARGET, signal, "shutdown signal received");
                token.cancel();
            }
        });
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }

    /// Unregisters the handlers and joins the watcher thread.
    pub(crate) fn stop(mut self) {
        self.close_and_join();
    }

    fn close_and_join(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!(target: SERVER_TARGET, "signal watcher thread panicked");
        }
    }
}

impl Drop for SignalWatcher {
    fn drop(&mut self) {
        self.close_and_join();
    }
}
