use serde::{Deserialize, Serialize};

use crate::config::OutboundConfig;

/// Live connection counts fed to outbound planning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionCounts {
    pub outbound: u64,
    pub inbound: u64,
    /// Peers the caller could dial right now.
    pub dialable: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundPlan {
    pub total: u64,
    /// Outbound share of all connections; `1.0` with no connections.
    pub ratio: f64,
    pub target_ratio: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub desired_outbound: u64,
    pub deficit: u64,
    pub plan_dial_count: u64,
    pub should_dial: bool,
}

impl OutboundPlan {
    pub(crate) fn compute(config: &OutboundConfig, counts: ConnectionCounts) -> Self {
        let total = counts.outbound.saturating_add(counts.inbound);
        let ratio = if total == 0 {
            1.0
        } else {
            counts.outbound as f64 / total as f64
        };
        let lower_bound = (config.target_ratio - config.tolerance).max(0.0);
        let upper_bound = (config.target_ratio + config.tolerance).min(1.0);
        let desired_outbound =
            ((total as f64 * config.target_ratio).ceil() as u64).max(config.min_connections);
        let deficit = desired_outbound.saturating_sub(counts.outbound);
        // Reduces to `deficit`: `dialable` never bounds the dial count.
        let plan_dial_count = deficit.min(counts.dialable.max(deficit));

        Self {
            total,
            ratio,
            target_ratio: config.target_ratio,
            lower_bound,
            upper_bound,
            desired_outbound,
            deficit,
            plan_dial_count,
            should_dial: ratio < lower_bound,
        }
    }
}
