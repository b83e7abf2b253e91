//! Dial pacing for the network host.
//!
//! [`DialerPolicy`] answers two questions for the external dial loop: how
//! long to wait before retrying a peer, and how many outbound dials are
//! needed to bring the outbound share of connections back to target. It
//! never dials or cancels anything itself.

mod config;
mod outbound;
mod policy;

pub use config::{BackoffConfig, DialerPolicyConfig, OutboundConfig};
pub use outbound::{ConnectionCounts, OutboundPlan};
pub use policy::{DialerPolicy, RetryDecision};
