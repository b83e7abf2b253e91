use agi_net_config::DialerSettings;
use serde::{Deserialize, Serialize};

/// Backoff multiplier between consecutive attempts.
pub const BACKOFF_FACTOR: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackoffConfig {
    pub initial_ms: u64,
    pub max_ms: u64,
    pub factor: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundConfig {
    pub target_ratio: f64,
    pub tolerance: f64,
    pub min_connections: u64,
    pub reconcile_interval_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialerPolicyConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub backoff: BackoffConfig,
    pub outbound: OutboundConfig,
}

impl DialerPolicyConfig {
    pub fn from_settings(settings: &DialerSettings) -> Self {
        Self {
            timeout_ms: settings.timeout_ms,
            max_retries: settings.max_retries,
            backoff: BackoffConfig {
                initial_ms: settings.backoff_initial_ms,
                max_ms: settings.backoff_max_ms,
                factor: BACKOFF_FACTOR,
            },
            outbound: OutboundConfig {
                target_ratio: settings.outbound_target_ratio,
                tolerance: settings.outbound_ratio_tolerance,
                min_connections: settings.outbound_min_connections,
                reconcile_interval_ms: settings.reconcile_interval_ms,
            },
        }
    }
}

impl Default for DialerPolicyConfig {
    fn default() -> Self {
        Self::from_settings(&DialerSettings::default())
    }
}
