//! Resource-manager limits, watermarks and ban seeds.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::parse::ConfigReader;
use crate::source::ConfigSource;

pub const CONN_LOW_WATER: &str = "CONN_LOW_WATER";
pub const CONN_HIGH_WATER: &str = "CONN_HIGH_WATER";
pub const CONN_GRACE_PERIOD_SEC: &str = "CONN_GRACE_PERIOD_SEC";
pub const MAX_CONNS_PER_IP: &str = "MAX_CONNS_PER_IP";
pub const MAX_CONNS_PER_ASN: &str = "MAX_CONNS_PER_ASN";
pub const NRM_SCALE_FACTOR: &str = "NRM_SCALE_FACTOR";
pub const NRM_MAX_CONNECTIONS: &str = "NRM_MAX_CONNECTIONS";
pub const NRM_MAX_STREAMS: &str = "NRM_MAX_STREAMS";
pub const NRM_MAX_MEMORY_BYTES: &str = "NRM_MAX_MEMORY_BYTES";
pub const NRM_MAX_FDS: &str = "NRM_MAX_FDS";
pub const NRM_MAX_BANDWIDTH_BPS: &str = "NRM_MAX_BANDWIDTH_BPS";
pub const NRM_LIMITS_JSON: &str = "NRM_LIMITS_JSON";
pub const NRM_LIMITS_PATH: &str = "NRM_LIMITS_PATH";
pub const NRM_BANNED_PEERS: &str = "NRM_BANNED_PEERS";
pub const NRM_BANNED_IPS: &str = "NRM_BANNED_IPS";
pub const NRM_BANNED_ASNS: &str = "NRM_BANNED_ASNS";

/// Connection/stream caps for one scope (a protocol or a peer). `None` = unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ScopeLimits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_streams: Option<u64>,
}

/// Global resource envelope before scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalLimitSettings {
    pub max_connections: u64,
    pub max_streams: u64,
    pub max_memory_bytes: u64,
    pub max_fds: u64,
    pub max_bandwidth_bps: Option<u64>,
}

impl Default for GlobalLimitSettings {
    fn default() -> Self {
        Self {
            max_connections: 512,
            max_streams: 4096,
            max_memory_bytes: 1 << 30,
            max_fds: 1024,
            max_bandwidth_bps: None,
        }
    }
}

/// Partial global limits inside an override document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct GlobalLimitsOverride {
    pub max_connections: Option<u64>,
    pub max_streams: Option<u64>,
    pub max_memory_bytes: Option<u64>,
    pub max_fds: Option<u64>,
    pub max_bandwidth_bps: Option<u64>,
}

/// Override document loaded from `NRM_LIMITS_JSON` or `NRM_LIMITS_PATH`.
///
/// ```json
/// {
///   "global": { "maxConnections": 1024 },
///   "perProtocol": { "/meshsub/1.1.0": { "maxStreams": 512 } },
///   "perPeer": { "12D3KooW...": { "maxStreams": 64 } }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct LimitsOverride {
    pub global: Option<GlobalLimitsOverride>,
    pub per_protocol: BTreeMap<String, ScopeLimits>,
    pub per_peer: BTreeMap<String, ScopeLimits>,
}

impl LimitsOverride {
    /// Parse an override document.
    pub fn from_json(raw: &str, origin: impl Into<String>) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|source| ConfigError::LimitsJson {
            origin: origin.into(),
            source,
        })
    }

    /// Read and parse an override file.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::LimitsFile {
            path: path.clone(),
            source,
        })?;
        Self::from_json(&raw, path.display().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceSettings {
    pub low_water: u64,
    pub high_water: u64,
    pub grace_period_secs: u64,
    /// `0` disables the per-IP cap.
    pub max_conns_per_ip: u64,
    /// `0` disables the per-ASN cap.
    pub max_conns_per_asn: u64,
    /// Multiplier applied to every global limit.
    pub scale_factor: f64,
    pub global: GlobalLimitSettings,
    pub limits_override: Option<LimitsOverride>,
    pub banned_peers: Vec<String>,
    pub banned_ips: Vec<IpAddr>,
    pub banned_asns: Vec<u32>,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            low_water: 128,
            high_water: 256,
            grace_period_secs: 120,
            max_conns_per_ip: 8,
            max_conns_per_asn: 64,
            scale_factor: 1.0,
            global: GlobalLimitSettings::default(),
            limits_override: None,
            banned_peers: Vec::new(),
            banned_ips: Vec::new(),
            banned_asns: Vec::new(),
        }
    }
}

impl ResourceSettings {
    /// Fails only on a malformed limits override.
    pub fn from_source<S: ConfigSource + ?Sized>(source: &S) -> Result<Self, ConfigError> {
        let r = ConfigReader::new(source);
        let d = Self::default();

        let scale_factor = match r.f64(NRM_SCALE_FACTOR, d.scale_factor) {
            factor if factor > 0.0 => factor,
            factor => {
                debug!(factor, "non-positive NRM scale factor, using 1.0");
                1.0
            }
        };

        let global = GlobalLimitSettings {
            max_connections: r.u64(NRM_MAX_CONNECTIONS, d.global.max_connections),
            max_streams: r.u64(NRM_MAX_STREAMS, d.global.max_streams),
            max_memory_bytes: r.u64(NRM_MAX_MEMORY_BYTES, d.global.max_memory_bytes),
            max_fds: r.u64(NRM_MAX_FDS, d.global.max_fds),
            max_bandwidth_bps: r.opt_u64(NRM_MAX_BANDWIDTH_BPS),
        };

        let limits_override = match (r.raw(NRM_LIMITS_JSON), r.raw(NRM_LIMITS_PATH)) {
            (Some(json), _) => Some(LimitsOverride::from_json(&json, NRM_LIMITS_JSON)?),
            (None, Some(path)) => Some(LimitsOverride::from_path(path)?),
            (None, None) => None,
        };

        Ok(Self {
            low_water: r.u64(CONN_LOW_WATER, d.low_water),
            high_water: r.u64(CONN_HIGH_WATER, d.high_water),
            grace_period_secs: r.u64(CONN_GRACE_PERIOD_SEC, d.grace_period_secs),
            max_conns_per_ip: r.u64(MAX_CONNS_PER_IP, d.max_conns_per_ip),
            max_conns_per_asn: r.u64(MAX_CONNS_PER_ASN, d.max_conns_per_asn),
            scale_factor,
            global,
            limits_override,
            banned_peers: r.list(NRM_BANNED_PEERS),
            banned_ips: r.parsed_list(NRM_BANNED_IPS),
            banned_asns: r
                .list(NRM_BANNED_ASNS)
                .into_iter()
                .filter_map(|raw| parse_asn(&raw))
                .collect(),
        })
    }
}

/// Accepts `64500` and `AS64500`.
fn parse_asn(raw: &str) -> Option<u32> {
    let digits = raw
        .strip_prefix("AS")
        .or_else(|| raw.strip_prefix("as"))
        .unwrap_or(raw);
    match digits.parse::<u32>() {
        Ok(asn) => Some(asn),
        Err(err) => {
            tracing::warn!(asn = %raw, %err, "skipping malformed banned ASN");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use assert_matches::assert_matches;

    use super::*;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_without_keys() {
        let settings = ResourceSettings::from_source(&source(&[])).unwrap();
        assert_eq!(settings, ResourceSettings::default());
    }

    #[test]
    fn test_ban_seeds_skip_malformed() {
        let settings = ResourceSettings::from_source(&source(&[
            (NRM_BANNED_PEERS, "peer-a, peer-b"),
            (NRM_BANNED_IPS, "10.0.0.1,garbage"),
            (NRM_BANNED_ASNS, "AS64500, 13335, x"),
        ]))
        .unwrap();

        assert_eq!(settings.banned_peers, vec!["peer-a", "peer-b"]);
        assert_eq!(settings.banned_ips, vec!["10.0.0.1".parse::<IpAddr>().unwrap()]);
        assert_eq!(settings.banned_asns, vec![64500, 13335]);
    }

    #[test]
    fn test_scale_factor_rejects_non_positive() {
        let settings =
            ResourceSettings::from_source(&source(&[(NRM_SCALE_FACTOR, "-2")])).unwrap();
        assert_eq!(settings.scale_factor, 1.0);

        let settings =
            ResourceSettings::from_source(&source(&[(NRM_SCALE_FACTOR, "2.5")])).unwrap();
        assert_eq!(settings.scale_factor, 2.5);
    }

    #[test]
    fn test_limits_json_override() {
        let json = r#"{"perProtocol":{"/meshsub/1.1.0":{"maxStreams":32}},"global":{"maxConnections":10}}"#;
        let settings = ResourceSettings::from_source(&source(&[(NRM_LIMITS_JSON, json)])).unwrap();
        let overrides = settings.limits_override.unwrap();
        assert_eq!(
            overrides.per_protocol["/meshsub/1.1.0"].max_streams,
            Some(32)
        );
        assert_eq!(overrides.global.unwrap().max_connections, Some(10));
    }

    #[test]
    fn test_malformed_limits_json_fails() {
        let err = ResourceSettings::from_source(&source(&[(NRM_LIMITS_JSON, "{not json")]))
            .unwrap_err();
        assert_matches!(err, ConfigError::LimitsJson { .. });

        let err = ResourceSettings::from_source(&source(&[(
            NRM_LIMITS_JSON,
            r#"{"perProtocl":{}}"#,
        )]))
        .unwrap_err();
        assert_matches!(err, ConfigError::LimitsJson { .. });
    }

    #[test]
    fn test_misspelled_scope_field_fails() {
        let json = r#"{"perProtocol":{"/meshsub/1.1.0":{"maxStream":32}}}"#;
        let err = ResourceSettings::from_source(&source(&[(NRM_LIMITS_JSON, json)])).unwrap_err();
        assert_matches!(err, ConfigError::LimitsJson { .. });

        let json = r#"{"perPeer":{"peer-a":{"maxConnection":1}}}"#;
        let err = LimitsOverride::from_json(json, "inline").unwrap_err();
        assert_matches!(err, ConfigError::LimitsJson { .. });
    }

    #[test]
    fn test_limits_path_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"perPeer":{{"peer-a":{{"maxStreams":4}}}}}}"#).unwrap();

        let path = file.path().to_string_lossy().to_string();
        let settings =
            ResourceSettings::from_source(&source(&[(NRM_LIMITS_PATH, path.as_str())])).unwrap();
        assert_eq!(
            settings.limits_override.unwrap().per_peer["peer-a"].max_streams,
            Some(4)
        );
    }

    #[test]
    fn test_missing_limits_path_fails() {
        let err = ResourceSettings::from_source(&source(&[(
            NRM_LIMITS_PATH,
            "/definitely/not/here/limits.json",
        )]))
        .unwrap_err();
        assert_matches!(err, ConfigError::LimitsFile { .. });
    }

    #[test]
    fn test_json_wins_over_path() {
        let settings = ResourceSettings::from_source(&source(&[
            (NRM_LIMITS_JSON, "{}"),
            (NRM_LIMITS_PATH, "/definitely/not/here/limits.json"),
        ]))
        .unwrap();
        assert_eq!(settings.limits_override, Some(LimitsOverride::default()));
    }
}
