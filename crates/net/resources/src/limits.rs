use std::collections::{BTreeMap, HashSet};
use std::net::IpAddr;

use agi_net_config::{ResourceSettings, ScopeLimits};
use serde::{Deserialize, Serialize};

use crate::error::ResourceError;

/// Global resource envelope after scaling and overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalLimits {
    pub max_connections: u64,
    pub max_streams: u64,
    pub max_memory_bytes: u64,
    pub max_fds: u64,
    pub max_bandwidth_bps: Option<u64>,
}

/// Watermarks for [`crate::ConnectionManager`]. `high_water > low_water` always holds
/// for a validated config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkConfig {
    pub low_water: u64,
    pub high_water: u64,
    pub grace_period_secs: u64,
}

impl WatermarkConfig {
    pub fn validate(&self) -> Result<(), ResourceError> {
        if self.high_water <= self.low_water {
            return Err(ResourceError::InvalidWatermarks {
                low: self.low_water,
                high: self.high_water,
            });
        }
        Ok(())
    }
}

/// Network-origin caps and ban sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpLimiterConfig {
    /// `None` disables the cap.
    pub max_conns_per_ip: Option<u64>,
    /// `None` disables the cap.
    pub max_conns_per_asn: Option<u64>,
    pub banned_peers: HashSet<String>,
    pub banned_ips: HashSet<IpAddr>,
    pub banned_asns: HashSet<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLimits {
    pub global: GlobalLimits,
    pub per_protocol: BTreeMap<String, ScopeLimits>,
    pub per_peer: BTreeMap<String, ScopeLimits>,
    pub connection_manager: WatermarkConfig,
    pub ip_limiter: IpLimiterConfig,
}

fn scale(value: u64, factor: f64) -> u64 {
    if factor == 1.0 {
        return value;
    }
    let scaled = (value as f64 * factor).floor();
    // Float to int casts saturate.
    (scaled as u64).max(1)
}

fn non_zero(value: u64) -> Option<u64> {
    (value > 0).then_some(value)
}

impl ResourceLimits {
    /// Build validated limits from settings.
    ///
    /// The scale factor applies to the configured base envelope; explicit
    /// values from a limits override replace the scaled values.
    pub fn from_settings(settings: &ResourceSettings) -> Result<Self, ResourceError> {
        let connection_manager = WatermarkConfig {
            low_water: settings.low_water,
            high_water: settings.high_water,
            grace_period_secs: settings.grace_period_secs,
        };
        connection_manager.validate()?;

        let factor = settings.scale_factor;
        let base = &settings.global;
        let mut global = GlobalLimits {
            max_connections: scale(base.max_connections, factor),
            max_streams: scale(base.max_streams, factor),
            max_memory_bytes: scale(base.max_memory_bytes, factor),
            max_fds: scale(base.max_fds, factor),
            max_bandwidth_bps: base.max_bandwidth_bps.map(|bps| scale(bps, factor)),
        };

        let mut per_protocol = BTreeMap::new();
        let mut per_peer = BTreeMap::new();
        if let Some(overrides) = &settings.limits_override {
            if let Some(g) = &overrides.global {
                global.max_connections = g.max_connections.unwrap_or(global.max_connections);
                global.max_streams = g.max_streams.unwrap_or(global.max_streams);
                global.max_memory_bytes = g.max_memory_bytes.unwrap_or(global.max_memory_bytes);
                global.max_fds = g.max_fds.unwrap_or(global.max_fds);
                global.max_bandwidth_bps = g.max_bandwidth_bps.or(global.max_bandwidth_bps);
            }
            per_protocol = overrides.per_protocol.clone();
            per_peer = overrides.per_peer.clone();
        }

        Ok(Self {
            global,
            per_protocol,
            per_peer,
            connection_manager,
            ip_limiter: IpLimiterConfig {
                max_conns_per_ip: non_zero(settings.max_conns_per_ip),
                max_conns_per_asn: non_zero(settings.max_conns_per_asn),
                banned_peers: settings.banned_peers.iter().cloned().collect(),
                banned_ips: settings.banned_ips.iter().copied().collect(),
                banned_asns: settings.banned_asns.iter().copied().collect(),
            },
        })
    }
}
