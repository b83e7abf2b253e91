//! Adapter from libp2p swarm events to [`TransportEvent`]s.

use std::time::Duration;

use agi_metrics::Direction;
use libp2p::gossipsub;
use libp2p::swarm::SwarmEvent;

use crate::descriptor::HostDescriptor;
use crate::event::TransportEvent;
use crate::tracer::TransportTracer;

/// Protocol label gossipsub traffic is accounted under.
pub const GOSSIPSUB_PROTOCOL: &str = "/meshsub/1.1.0";

/// Map a swarm lifecycle event. Events without a known peer are skipped.
pub fn transport_event_from_swarm<E>(event: &SwarmEvent<E>) -> Option<TransportEvent> {
    match event {
        SwarmEvent::Dialing {
            peer_id: Some(peer_id),
            ..
        } => Some(TransportEvent::DialStart {
            peer: peer_id.to_string(),
            address: None,
        }),
        SwarmEvent::ConnectionEstablished {
            peer_id, endpoint, ..
        } => {
            let peer = peer_id.to_string();
            let address = Some(endpoint.get_remote_address().to_string());
            Some(if endpoint.is_dialer() {
                TransportEvent::DialSuccess { peer, address }
            } else {
                TransportEvent::ConnectionOpen {
                    peer,
                    address,
                    direction: Direction::Inbound,
                }
            })
        }
        SwarmEvent::OutgoingConnectionError {
            peer_id: Some(peer_id),
            error,
            ..
        } => Some(TransportEvent::DialFailure {
            peer: peer_id.to_string(),
            address: None,
            error: Some(error.to_string()),
        }),
        SwarmEvent::ConnectionClosed {
            peer_id, endpoint, ..
        } => Some(TransportEvent::ConnectionClose {
            peer: peer_id.to_string(),
            address: Some(endpoint.get_remote_address().to_string()),
            direction: if endpoint.is_dialer() {
                Direction::Outbound
            } else {
                Direction::Inbound
            },
        }),
        _ => None,
    }
}

impl TransportTracer {
    /// Trace a swarm event if it is a dial or connection lifecycle event.
    pub fn observe_swarm_event<E>(&self, event: &SwarmEvent<E>) -> Option<Duration> {
        transport_event_from_swarm(event).and_then(|event| self.trace(&event))
    }
}

impl HostDescriptor {
    /// Account a received gossipsub message with the resource manager.
    pub fn observe_gossip_event(&self, event: &gossipsub::Event) {
        if let gossipsub::Event::Message { message, .. } = event {
            self.resource_manager.record_protocol_traffic(
                Some(GOSSIPSUB_PROTOCOL),
                Direction::Inbound,
                message.data.len() as u64,
            );
        }
    }

    /// Account a locally published gossipsub payload of `bytes`.
    pub fn record_gossip_publish(&self, bytes: usize) {
        self.resource_manager.record_protocol_traffic(
            Some(GOSSIPSUB_PROTOCOL),
            Direction::Outbound,
            bytes as u64,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use libp2p::PeerId;
    use libp2p::swarm::ConnectionId;

    #[test]
    fn test_dialing_maps_to_dial_start() {
        let peer = PeerId::random();
        let event = SwarmEvent::<()>::Dialing {
            peer_id: Some(peer),
            connection_id: ConnectionId::new_unchecked(1),
        };
        assert_matches!(
            transport_event_from_swarm(&event),
            Some(TransportEvent::DialStart { peer: p, address: None }) if p == peer.to_string()
        );

        let tracer = TransportTracer::default();
        tracer.observe_swarm_event(&event);
        assert_eq!(tracer.in_flight(), 1);
    }

    #[test]
    fn test_anonymous_dial_is_skipped() {
        let event = SwarmEvent::<()>::Dialing {
            peer_id: None,
            connection_id: ConnectionId::new_unchecked(2),
        };
        assert!(transport_event_from_swarm(&event).is_none());
    }
}
