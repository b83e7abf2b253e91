use serde::{Deserialize, Serialize};

use crate::dialer::DialerSettings;
use crate::error::ConfigError;
use crate::host::HostSettings;
use crate::pubsub::PubsubSettings;
use crate::resources::ResourceSettings;
use crate::source::{ConfigSource, ProcessEnv};
use crate::transport::TransportSettings;

/// Complete, typed network control-plane configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkConfig {
    pub transport: TransportSettings,
    pub dialer: DialerSettings,
    pub resources: ResourceSettings,
    pub pubsub: PubsubSettings,
    pub host: HostSettings,
}

impl NetworkConfig {
    /// Parse every section from `source`.
    pub fn from_source<S: ConfigSource + ?Sized>(source: &S) -> Result<Self, ConfigError> {
        Ok(Self {
            transport: TransportSettings::from_source(source),
            dialer: DialerSettings::from_source(source),
            resources: ResourceSettings::from_source(source)?,
            pubsub: PubsubSettings::from_source(source),
            host: HostSettings::from_source(source),
        })
    }

    /// Parse from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&ProcessEnv::load())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn source(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_source_yields_defaults() {
        let config = NetworkConfig::from_source(&source(&[])).unwrap();
        assert_eq!(config, NetworkConfig::default());
    }

    #[test]
    fn test_sections_are_parsed() {
        let config = NetworkConfig::from_source(&source(&[
            ("TRANSPORT_ENABLE_QUIC", "off"),
            ("RELAY_MAX_BANDWIDTH_BPS", "1048576"),
            ("DIAL_OUTBOUND_TARGET_RATIO", "1.7"),
            ("DIAL_MAX_RETRIES", "not-a-number"),
            ("CONN_HIGH_WATER", "300"),
            ("PUBSUB_D", "10"),
            ("PUBSUB_FLOOD_PUBLISH", "no"),
            ("P2P_PUBLIC_ADDRS", "/ip4/1.2.3.4/tcp/4001, /ip4/1.2.3.4/udp/4001/quic-v1"),
        ]))
        .unwrap();

        assert!(!config.transport.enable_quic);
        assert!(config.transport.enable_tcp);
        assert_eq!(config.transport.relay_max_bandwidth_bps, Some(1_048_576));
        assert_eq!(config.dialer.outbound_target_ratio, 1.0);
        assert_eq!(config.dialer.max_retries, DialerSettings::default().max_retries);
        assert_eq!(config.resources.high_water, 300);
        assert_eq!(config.pubsub.d, 10);
        assert!(!config.pubsub.flood_publish);
        assert_eq!(config.host.public_addrs.len(), 2);
    }

    #[test]
    fn test_config_is_json_serialisable() {
        let json = serde_json::to_value(NetworkConfig::default()).unwrap();
        assert_eq!(json["transport"]["enableQuic"], true);
        assert_eq!(json["resources"]["lowWater"], 128);
    }
}
