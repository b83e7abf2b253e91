//! Network control-plane configuration.
//!
//! Configuration arrives as a flat, string-keyed map (usually the process
//! environment). This crate is the single source of truth for key names,
//! defaults and coercion rules, and turns that map into one strongly typed
//! [`NetworkConfig`]. Missing or malformed values fall back to defaults; the
//! only hard failure is a malformed resource-limits override.

mod error;
mod network;
pub mod parse;
mod source;

pub mod dialer;
pub mod host;
pub mod pubsub;
pub mod resources;
pub mod transport;

pub use dialer::DialerSettings;
pub use error::ConfigError;
pub use host::HostSettings;
pub use network::NetworkConfig;
pub use pubsub::PubsubSettings;
pub use resources::{GlobalLimitSettings, LimitsOverride, ResourceSettings, ScopeLimits};
pub use source::{ConfigSource, ProcessEnv};
pub use transport::TransportSettings;
