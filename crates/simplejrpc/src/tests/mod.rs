//! End-to-end suites running real servers on temporary sockets.

mod server_behaviour;
mod support;
