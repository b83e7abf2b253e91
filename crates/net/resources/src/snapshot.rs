//! Serialisable views returned by [`crate::ResourceManager::metrics`].

use std::collections::BTreeMap;

use agi_net_config::ScopeLimits;
use agi_net_dialer::OutboundPlan;
use serde::{Deserialize, Serialize};

use crate::limits::GlobalLimits;
use crate::request::DenialReason;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolUsage {
    pub connections: u64,
    pub streams: u64,
}

/// Cumulative traffic for one protocol label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolTraffic {
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub messages_in: u64,
    pub messages_out: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUsage {
    pub connections: u64,
    pub streams: u64,
    pub per_protocol: BTreeMap<String, ProtocolUsage>,
    pub per_peer_streams: BTreeMap<String, u64>,
    /// Keyed by bounded protocol label, see
    /// [`crate::ResourceManager::record_protocol_traffic`].
    pub traffic: BTreeMap<String, ProtocolTraffic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitsView {
    pub global: GlobalLimits,
    pub max_conns_per_ip: Option<u64>,
    pub max_conns_per_asn: Option<u64>,
    pub per_protocol: BTreeMap<String, ScopeLimits>,
    pub per_peer: BTreeMap<String, ScopeLimits>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DenialStats {
    pub total: u64,
    pub by_reason: BTreeMap<DenialReason, u64>,
}

/// Utilisation ratios in `[0, 1]`. `ip` and `asn` report the busiest entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utilization {
    pub connections: f64,
    pub streams: f64,
    pub ip: f64,
    pub asn: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionStats {
    pub inbound: u64,
    pub outbound: u64,
    pub ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<OutboundPlan>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanList {
    pub peers: Vec<String>,
    pub ips: Vec<String>,
    pub asns: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetrics {
    pub usage: ResourceUsage,
    pub limits: LimitsView,
    pub per_ip: BTreeMap<String, u64>,
    pub per_asn: BTreeMap<u32, u64>,
    pub denials: DenialStats,
    pub utilization: Utilization,
    pub direction: DirectionStats,
    pub bans: BanList,
}
