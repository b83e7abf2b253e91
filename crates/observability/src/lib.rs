//! Logging and tracing setup for the AGI node.
//!
//! Library crates only emit through the `tracing` facade; this crate is the
//! one place that installs a global subscriber, and only binaries call it.

mod logging;

pub use logging::{LogArgs, build_filter, init_logging};
