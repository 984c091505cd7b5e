//! Unix socket listener and per-connection protocol handling.
//!
//! The listener accepts connections on a non-blocking socket and hands each
//! one to a [`ConnectionHandler`] on its own thread. The service handler
//! decodes framed requests, runs them through the [`crate::Service`]
//! pipeline and writes framed replies.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod test_utils;
mod tracker;

pub use self::errors::ListenerError;
pub(crate) use self::handler::{ConnectionHandler, ServiceConnectionHandler};
pub(crate) use self::listener::SocketListener;
#[cfg(test)]
pub(crate) use self::test_utils::CountingHandler;
pub(crate) use self::tracker::ConnectionTracker;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
