//! Network resource manager (NRM) and connection manager.
//!
//! Every connection and stream the host opens passes through
//! [`ResourceManager`] admission first. Checks run in a fixed order against
//! ban lists, the global envelope, per-IP and per-ASN caps, and per-protocol
//! and per-peer scopes. A denial is a value, not an error, and never leaves
//! counters changed. [`ConnectionManager`] evicts the lowest value
//! connections once the live set passes the high watermark.

mod connmgr;
mod error;
mod limits;
mod manager;
mod pressure;
mod request;
mod snapshot;

pub use connmgr::{ConnectionManager, PeerConnection, TrimOutcome};
pub use error::ResourceError;
pub use limits::{GlobalLimits, IpLimiterConfig, ResourceLimits, WatermarkConfig};
pub use manager::ResourceManager;
pub use pressure::{PRESSURE_THRESHOLD, PRESSURE_WARN_INTERVAL, PressureResource};
pub use request::{
    Admission, ConnectionRequest, DenialReason, OTHER_PROTOCOL, StreamRequest, UNKNOWN_PROTOCOL,
};
pub use snapshot::{
    BanList, DenialStats, DirectionStats, LimitsView, ProtocolTraffic, ProtocolUsage,
    ResourceMetrics, ResourceUsage, Utilization,
};

pub use agi_net_config::ScopeLimits;
