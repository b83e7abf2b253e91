use std::net::IpAddr;

use agi_metrics::Direction;
use serde::{Deserialize, Serialize};

/// Protocol bucket used when a request names none.
pub const UNKNOWN_PROTOCOL: &str = "unknown";
/// Traffic label for protocols without a configured limit.
pub const OTHER_PROTOCOL: &str = "other";

#[derive(Debug, Clone, Copy)]
pub struct ConnectionRequest<'a> {
    pub peer_id: &'a str,
    pub ip: Option<IpAddr>,
    pub asn: Option<u32>,
    pub protocol: Option<&'a str>,
    pub direction: Direction,
}

impl<'a> ConnectionRequest<'a> {
    pub fn new(peer_id: &'a str, direction: Direction) -> Self {
        Self {
            peer_id,
            ip: None,
            asn: None,
            protocol: None,
            direction,
        }
    }

    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip = Some(ip);
        self
    }

    pub fn with_asn(mut self, asn: u32) -> Self {
        self.asn = Some(asn);
        self
    }

    pub fn with_protocol(mut self, protocol: &'a str) -> Self {
        self.protocol = Some(protocol);
        self
    }

    pub(crate) fn protocol(&self) -> &'a str {
        self.protocol.unwrap_or(UNKNOWN_PROTOCOL)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StreamRequest<'a> {
    pub peer_id: &'a str,
    pub protocol: Option<&'a str>,
    pub ip: Option<IpAddr>,
    pub asn: Option<u32>,
}

impl<'a> StreamRequest<'a> {
    pub fn new(peer_id: &'a str) -> Self {
        Self {
            peer_id,
            protocol: None,
            ip: None,
            asn: None,
        }
    }

    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip = Some(ip);
        self
    }

    pub fn with_asn(mut self, asn: u32) -> Self {
        self.asn = Some(asn);
        self
    }

    pub fn with_protocol(mut self, protocol: &'a str) -> Self {
        self.protocol = Some(protocol);
        self
    }

    pub(crate) fn protocol(&self) -> &'a str {
        self.protocol.unwrap_or(UNKNOWN_PROTOCOL)
    }
}

/// Why an admission request was refused.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DenialReason {
    BannedIp,
    BannedPeer,
    BannedAsn,
    GlobalConnectionCap,
    PerIpCap,
    PerAsnCap,
    ProtocolConnectionCap,
    GlobalStreamCap,
    ProtocolStreamCap,
    PeerStreamCap,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Outcome of an admission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenialReason>,
}

impl Admission {
    pub const fn accept() -> Self {
        Self {
            accepted: true,
            reason: None,
        }
    }

    pub const fn deny(reason: DenialReason) -> Self {
        Self {
            accepted: false,
            reason: Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_reason_strings_match_json() {
        for reason in DenialReason::iter() {
            let json = serde_json::to_value(reason).unwrap();
            assert_eq!(json, reason.as_str());
        }
        assert_eq!(DenialReason::PerIpCap.as_str(), "per-ip-cap");
    }

    #[test]
    fn test_admission_json() {
        let json = serde_json::to_value(Admission::deny(DenialReason::BannedAsn)).unwrap();
        assert_eq!(json["accepted"], false);
        assert_eq!(json["reason"], "banned-asn");

        let json = serde_json::to_value(Admission::accept()).unwrap();
        assert!(json.get("reason").is_none());
    }
}
