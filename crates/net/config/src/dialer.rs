//! Dial pacing and outbound ratio settings.

use serde::{Deserialize, Serialize};

use crate::parse::ConfigReader;
use crate::source::ConfigSource;

pub const DIAL_TIMEOUT_MS: &str = "DIAL_TIMEOUT_MS";
pub const DIAL_MAX_RETRIES: &str = "DIAL_MAX_RETRIES";
pub const DIAL_BACKOFF_INITIAL_MS: &str = "DIAL_BACKOFF_INITIAL_MS";
pub const DIAL_BACKOFF_MAX_MS: &str = "DIAL_BACKOFF_MAX_MS";
pub const DIAL_OUTBOUND_TARGET_RATIO: &str = "DIAL_OUTBOUND_TARGET_RATIO";
pub const DIAL_OUTBOUND_RATIO_TOLERANCE: &str = "DIAL_OUTBOUND_RATIO_TOLERANCE";
pub const DIAL_OUTBOUND_MIN_CONNECTIONS: &str = "DIAL_OUTBOUND_MIN_CONNECTIONS";
pub const DIAL_RECONCILE_INTERVAL_MS: &str = "DIAL_RECONCILE_INTERVAL_MS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DialerSettings {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub backoff_initial_ms: u64,
    pub backoff_max_ms: u64,
    /// Desired outbound share of all connections, in `[0, 1]`.
    pub outbound_target_ratio: f64,
    /// Accepted deviation around the target, in `[0, 1]`.
    pub outbound_ratio_tolerance: f64,
    pub outbound_min_connections: u64,
    pub reconcile_interval_ms: u64,
}

impl Default for DialerSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_retries: 5,
            backoff_initial_ms: 1_000,
            backoff_max_ms: 60_000,
            outbound_target_ratio: 0.6,
            outbound_ratio_tolerance: 0.1,
            outbound_min_connections: 8,
            reconcile_interval_ms: 30_000,
        }
    }
}

impl DialerSettings {
    pub fn from_source<S: ConfigSource + ?Sized>(source: &S) -> Self {
        let r = ConfigReader::new(source);
        let d = Self::default();
        Self {
            timeout_ms: r.u64(DIAL_TIMEOUT_MS, d.timeout_ms),
            max_retries: r.u32(DIAL_MAX_RETRIES, d.max_retries),
            backoff_initial_ms: r.u64(DIAL_BACKOFF_INITIAL_MS, d.backoff_initial_ms),
            backoff_max_ms: r.u64(DIAL_BACKOFF_MAX_MS, d.backoff_max_ms),
            outbound_target_ratio: r
                .f64(DIAL_OUTBOUND_TARGET_RATIO, d.outbound_target_ratio)
                .clamp(0.0, 1.0),
            outbound_ratio_tolerance: r
                .f64(DIAL_OUTBOUND_RATIO_TOLERANCE, d.outbound_ratio_tolerance)
                .clamp(0.0, 1.0),
            outbound_min_connections: r
                .u64(DIAL_OUTBOUND_MIN_CONNECTIONS, d.outbound_min_connections),
            reconcile_interval_ms: r.u64(DIAL_RECONCILE_INTERVAL_MS, d.reconcile_interval_ms),
        }
    }
}
