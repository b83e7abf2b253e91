use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use web_time::Instant;

/// Utilisation at or above which a pressure warning is logged.
pub const PRESSURE_THRESHOLD: f64 = 0.8;

/// Minimum gap between two warnings for the same resource.
pub const PRESSURE_WARN_INTERVAL: Duration = Duration::from_secs(15);

/// Limited resource a pressure reading refers to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PressureResource {
    Connections,
    Streams,
    Ip,
    Asn,
    ProtocolConnections,
    ProtocolStreams,
    PeerStreams,
}

impl PressureResource {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// `used / limit`; a zero limit with any usage counts as saturated.
pub(crate) fn ratio(used: u64, limit: u64) -> f64 {
    match (used, limit) {
        (0, _) => 0.0,
        (_, 0) => 1.0,
        (used, limit) => used as f64 / limit as f64,
    }
}

/// Rate limiter for pressure warnings, one window per resource.
#[derive(Debug)]
pub(crate) struct PressureMonitor {
    interval: Duration,
    last_warned: HashMap<PressureResource, Instant>,
}

impl PressureMonitor {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_warned: HashMap::new(),
        }
    }

    /// Returns true when `utilisation` crosses the threshold and the
    /// resource has not warned within the interval.
    pub(crate) fn should_warn(
        &mut self,
        resource: PressureResource,
        utilisation: f64,
        now: Instant,
    ) -> bool {
        if utilisation < PRESSURE_THRESHOLD {
            return false;
        }
        match self.last_warned.get(&resource) {
            Some(last) if now.saturating_duration_since(*last) < self.interval => false,
            _ => {
                self.last_warned.insert(resource, now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio() {
        assert_eq!(ratio(0, 0), 0.0);
        assert_eq!(ratio(3, 0), 1.0);
        assert_eq!(ratio(4, 5), 0.8);
    }

    #[test]
    fn test_warnings_are_rate_limited_per_resource() {
        let mut monitor = PressureMonitor::new(PRESSURE_WARN_INTERVAL);
        let start = Instant::now();

        assert!(!monitor.should_warn(PressureResource::Connections, 0.79, start));
        assert!(monitor.should_warn(PressureResource::Connections, 0.8, start));
        assert!(!monitor.should_warn(
            PressureResource::Connections,
            0.95,
            start + Duration::from_secs(14)
        ));
        assert!(monitor.should_warn(PressureResource::Streams, 0.9, start));
        assert!(monitor.should_warn(
            PressureResource::Connections,
            0.95,
            start + Duration::from_secs(15)
        ));
    }
}
