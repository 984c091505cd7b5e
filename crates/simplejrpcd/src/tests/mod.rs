//! Test suites for the daemon bootstrap and runtime.

mod support;
