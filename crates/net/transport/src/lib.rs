//! Transport planning for the network host.
//!
//! Decides which transports are enabled and what NAT and relay behaviour the
//! host runs with, classifies and ranks dialable multiaddrs, and picks which
//! addresses to announce given the node's current reachability.

mod announce;
mod error;
mod kind;
mod plan;
mod rank;
mod reachability;

pub use announce::{AnnounceCandidates, select_announceable_addrs};
pub use error::TransportError;
pub use kind::{TransportKind, classify_transport};
pub use plan::{
    AutonatPlan, RelayPlan, TransportPlan, TransportPreference, TransportToggles,
    build_transport_config,
};
pub use rank::{dedup_addrs, rank_dialable_multiaddrs};
pub use reachability::{
    DEFAULT_CONFIDENCE_THRESHOLD, ProbeOutcome, Reachability, ReachabilityTracker,
};
