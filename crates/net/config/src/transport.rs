//! Transport, NAT traversal and relay settings.

use serde::{Deserialize, Serialize};

use crate::parse::ConfigReader;
use crate::source::ConfigSource;

pub const TRANSPORT_ENABLE_QUIC: &str = "TRANSPORT_ENABLE_QUIC";
pub const TRANSPORT_ENABLE_TCP: &str = "TRANSPORT_ENABLE_TCP";
pub const ENABLE_HOLE_PUNCHING: &str = "ENABLE_HOLE_PUNCHING";
pub const AUTONAT_ENABLED: &str = "AUTONAT_ENABLED";
pub const AUTONAT_THROTTLE_SECONDS: &str = "AUTONAT_THROTTLE_SECONDS";
pub const RELAY_ENABLE_CLIENT: &str = "RELAY_ENABLE_CLIENT";
pub const RELAY_ENABLE_SERVER: &str = "RELAY_ENABLE_SERVER";
pub const RELAY_MAX_RESERVATIONS: &str = "RELAY_MAX_RESERVATIONS";
pub const RELAY_MAX_CIRCUITS_PER_PEER: &str = "RELAY_MAX_CIRCUITS_PER_PEER";
pub const RELAY_MAX_BANDWIDTH_BPS: &str = "RELAY_MAX_BANDWIDTH_BPS";

const DEFAULT_AUTONAT_THROTTLE_SECS: u64 = 60;
const DEFAULT_RELAY_MAX_RESERVATIONS: u64 = 128;
const DEFAULT_RELAY_MAX_CIRCUITS_PER_PEER: u64 = 16;

/// Raw transport toggles. Validation happens when a transport plan is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransportSettings {
    pub enable_quic: bool,
    pub enable_tcp: bool,
    pub hole_punching: bool,
    pub autonat_enabled: bool,
    pub autonat_throttle_secs: u64,
    pub relay_client: bool,
    pub relay_server: bool,
    pub relay_max_reservations: u64,
    pub relay_max_circuits_per_peer: u64,
    /// `None` = unlimited.
    pub relay_max_bandwidth_bps: Option<u64>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            enable_quic: true,
            enable_tcp: true,
            hole_punching: true,
            autonat_enabled: true,
            autonat_throttle_secs: DEFAULT_AUTONAT_THROTTLE_SECS,
            relay_client: true,
            relay_server: false,
            relay_max_reservations: DEFAULT_RELAY_MAX_RESERVATIONS,
            relay_max_circuits_per_peer: DEFAULT_RELAY_MAX_CIRCUITS_PER_PEER,
            relay_max_bandwidth_bps: None,
        }
    }
}

impl TransportSettings {
    pub fn from_source<S: ConfigSource + ?Sized>(source: &S) -> Self {
        let r = ConfigReader::new(source);
        let d = Self::default();
        Self {
            enable_quic: r.bool(TRANSPORT_ENABLE_QUIC, d.enable_quic),
            enable_tcp: r.bool(TRANSPORT_ENABLE_TCP, d.enable_tcp),
            hole_punching: r.bool(ENABLE_HOLE_PUNCHING, d.hole_punching),
            autonat_enabled: r.bool(AUTONAT_ENABLED, d.autonat_enabled),
            autonat_throttle_secs: r.u64(AUTONAT_THROTTLE_SECONDS, d.autonat_throttle_secs),
            relay_client: r.bool(RELAY_ENABLE_CLIENT, d.relay_client),
            relay_server: r.bool(RELAY_ENABLE_SERVER, d.relay_server),
            relay_max_reservations: r.u64(RELAY_MAX_RESERVATIONS, d.relay_max_reservations),
            relay_max_circuits_per_peer: r
                .u64(RELAY_MAX_CIRCUITS_PER_PEER, d.relay_max_circuits_per_peer),
            relay_max_bandwidth_bps: r.opt_u64(RELAY_MAX_BANDWIDTH_BPS),
        }
    }
}
