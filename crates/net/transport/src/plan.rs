use agi_net_config::TransportSettings;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Which transport a dialer should favour.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TransportPreference {
    PreferQuic,
    QuicOnly,
    TcpOnly,
}

impl TransportPreference {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportToggles {
    pub quic: bool,
    pub tcp: bool,
    pub preference: TransportPreference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutonatPlan {
    pub enabled: bool,
    pub throttle_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayPlan {
    pub client: bool,
    pub server: bool,
    pub max_reservations: u64,
    pub max_circuits_per_peer: u64,
    pub max_bandwidth_bps: Option<u64>,
}

/// Immutable transport, NAT and relay plan derived once at startup.
///
/// A plan always has at least one transport enabled; [`TransportPlan::build`]
/// is the only constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportPlan {
    transports: TransportToggles,
    hole_punching: bool,
    autonat: AutonatPlan,
    relay: RelayPlan,
}

impl TransportPlan {
    pub fn build(settings: &TransportSettings) -> Result<Self, TransportError> {
        let preference = match (settings.enable_quic, settings.enable_tcp) {
            (true, true) => TransportPreference::PreferQuic,
            (true, false) => TransportPreference::QuicOnly,
            (false, true) => TransportPreference::TcpOnly,
            (false, false) => return Err(TransportError::NoTransportEnabled),
        };

        Ok(Self {
            transports: TransportToggles {
                quic: settings.enable_quic,
                tcp: settings.enable_tcp,
                preference,
            },
            hole_punching: settings.hole_punching,
            autonat: AutonatPlan {
                enabled: settings.autonat_enabled,
                throttle_seconds: settings.autonat_throttle_secs,
            },
            relay: RelayPlan {
                client: settings.relay_client,
                server: settings.relay_server,
                max_reservations: settings.relay_max_reservations,
                max_circuits_per_peer: settings.relay_max_circuits_per_peer,
                max_bandwidth_bps: settings.relay_max_bandwidth_bps,
            },
        })
    }

    pub fn transports(&self) -> &TransportToggles {
        &self.transports
    }

    pub fn preference(&self) -> TransportPreference {
        self.transports.preference
    }

    pub fn quic_enabled(&self) -> bool {
        self.transports.quic
    }

    pub fn tcp_enabled(&self) -> bool {
        self.transports.tcp
    }

    pub fn hole_punching(&self) -> bool {
        self.hole_punching
    }

    pub fn autonat(&self) -> &AutonatPlan {
        &self.autonat
    }

    pub fn relay(&self) -> &RelayPlan {
        &self.relay
    }

    /// Wildcard listen addresses for every enabled transport, QUIC first.
    pub fn listen_addrs(&self, port: u16) -> Vec<String> {
        let mut addrs = Vec::with_capacity(2);
        if self.transports.quic {
            addrs.push(format!("/ip4/0.0.0.0/udp/{port}/quic-v1"));
        }
        if self.transports.tcp {
            addrs.push(format!("/ip4/0.0.0.0/tcp/{port}"));
        }
        addrs
    }
}

/// Build the transport plan from settings.
pub fn build_transport_config(settings: &TransportSettings) -> Result<TransportPlan, TransportError> {
    TransportPlan::build(settings)
}
