//! Assembles a full host descriptor from a flat key map and drives it the
//! way a host would.

use std::collections::BTreeMap;
use std::sync::Arc;

use agi_metrics::Direction;
use agi_net_config::NetworkConfig;
use agi_net_host::{
    GOSSIPSUB_PROTOCOL, HostConfigError, HostConfigInputs, TracerOptions, TransportEvent,
    build_host_config,
};
use agi_net_resources::{
    ConnectionRequest, DenialReason, OTHER_PROTOCOL, PeerConnection, ResourceError,
};
use agi_net_transport::{
    ProbeOutcome, Reachability, ReachabilityTracker, TransportPreference,
};
use assert_matches::assert_matches;
use libp2p::PeerId;
use libp2p::gossipsub::{self, MessageId, TopicHash};

fn source(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn inputs(pairs: &[(&str, &str)]) -> HostConfigInputs {
    HostConfigInputs {
        config: NetworkConfig::from_source(&source(pairs)).unwrap(),
        reachability: None,
        tracer: TracerOptions::default(),
    }
}

#[test]
fn assembles_tcp_only_host() {
    let descriptor = build_host_config(inputs(&[
        ("TRANSPORT_ENABLE_QUIC", "false"),
        ("P2P_LISTEN_PORT", "9000"),
        ("P2P_LAN_ADDRS", "/ip4/192.168.1.5/tcp/9000"),
        ("NRM_MAX_CONNECTIONS", "2"),
        ("CONN_LOW_WATER", "1"),
        ("CONN_HIGH_WATER", "2"),
        ("PUBSUB_D", "6"),
    ]))
    .unwrap();

    assert_eq!(descriptor.dialer.preference(), TransportPreference::TcpOnly);
    assert!(descriptor.listen_addrs.iter().all(|a| a.contains("/tcp/9000")));
    assert_eq!(descriptor.announce_addrs, vec!["/ip4/192.168.1.5/tcp/9000"]);
    assert_eq!(descriptor.gossipsub.mesh.d, 6);

    let ranked = descriptor.dialer.rank([
        "/ip4/1.1.1.1/udp/4001/quic-v1",
        "/ip4/1.1.1.1/tcp/4001",
        "/ip4/1.1.1.1/tcp/4001",
    ]);
    assert_eq!(
        ranked,
        vec!["/ip4/1.1.1.1/tcp/4001", "/ip4/1.1.1.1/udp/4001/quic-v1"]
    );

    let summary = serde_json::to_value(descriptor.summary()).unwrap();
    assert_eq!(summary["transports"]["preference"], "tcp-only");
    assert_eq!(summary["limits"]["maxConnections"], 2);
    assert_eq!(summary["watermarks"]["highWater"], 2);
    assert_eq!(summary["scoredTopics"].as_array().unwrap().len(), 5);
}

#[test]
fn admission_and_trimming_share_the_descriptor_limits() {
    let descriptor = build_host_config(inputs(&[
        ("NRM_MAX_CONNECTIONS", "2"),
        ("CONN_LOW_WATER", "1"),
        ("CONN_HIGH_WATER", "2"),
        ("CONN_GRACE_PERIOD_SEC", "0"),
    ]))
    .unwrap();
    let nrm = &descriptor.resource_manager;

    for peer in ["a", "b"] {
        assert!(nrm.request_connection(ConnectionRequest::new(peer, Direction::Outbound)).accepted);
    }
    let denied = nrm.request_connection(ConnectionRequest::new("c", Direction::Inbound));
    assert!(!denied.accepted);
    assert_eq!(denied.reason, Some(DenialReason::GlobalConnectionCap));
    assert_eq!(nrm.current_connections(), 2);

    let peers = ["a", "b", "c"]
        .into_iter()
        .enumerate()
        .map(|(i, id)| PeerConnection {
            peer_id: id.to_string(),
            score: i as f64,
            connected_at_ms: 0,
            pinned: false,
            whitelisted: false,
        })
        .collect();
    let outcome = descriptor.connection_manager.trim(peers, 1_000_000);
    assert_eq!(outcome.kept.len(), 1);
    assert_eq!(outcome.kept[0].peer_id, "c");
}

#[test]
fn invalid_watermarks_fail_assembly() {
    let result = build_host_config(inputs(&[("CONN_LOW_WATER", "10"), ("CONN_HIGH_WATER", "10")]));
    assert_matches!(
        result,
        Err(HostConfigError::Resources(ResourceError::InvalidWatermarks { .. }))
    );
}

#[test]
fn reachability_is_sampled_at_assembly() {
    let tracker = Arc::new(ReachabilityTracker::new(1));
    tracker.record_probe(ProbeOutcome::Unreachable);

    let mut inputs = inputs(&[
        ("P2P_PUBLIC_ADDRS", "/ip4/8.8.8.8/tcp/4001"),
        ("P2P_RELAY_ADDRS", "/ip4/9.9.9.9/tcp/4001/p2p/QmRelay/p2p-circuit"),
    ]);
    inputs.reachability = Some(tracker.clone());
    let descriptor = build_host_config(inputs).unwrap();

    assert_eq!(descriptor.reachability, Reachability::Private);
    assert_eq!(
        descriptor.announce_addrs,
        vec!["/ip4/9.9.9.9/tcp/4001/p2p/QmRelay/p2p-circuit"]
    );

    tracker.record_probe(ProbeOutcome::Reachable);
    assert_eq!(descriptor.reachability_tracker.state(), Reachability::Public);
    assert_eq!(descriptor.reachability, Reachability::Private);
}

#[tokio::test]
async fn dialer_tracer_binds_to_host_events() {
    let descriptor = build_host_config(inputs(&[])).unwrap();
    let tracer = descriptor.dialer.tracer().clone();
    let (tx, rx) = tokio::sync::broadcast::channel(8);
    let _binding = tracer.bind_to(rx);

    tx.send(TransportEvent::DialStart {
        peer: "p".into(),
        address: Some("/ip4/1.1.1.1/tcp/4001".into()),
    })
    .unwrap();
    for _ in 0..50 {
        if tracer.in_flight() == 1 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_eq!(tracer.in_flight(), 1);

    descriptor.dialer.trace(&TransportEvent::DialSuccess {
        peer: "p".into(),
        address: Some("/ip4/1.1.1.1/tcp/4001".into()),
    });
    assert_eq!(tracer.in_flight(), 0);
}

fn gossip_message(len: usize) -> gossipsub::Event {
    gossipsub::Event::Message {
        propagation_source: PeerId::random(),
        message_id: MessageId::new(b"job-1"),
        message: gossipsub::Message {
            source: None,
            data: vec![0; len],
            sequence_number: None,
            topic: TopicHash::from_raw("agi.jobs"),
        },
    }
}

#[test]
fn gossip_traffic_is_accounted_per_protocol() {
    let limits = r#"{"perProtocol":{"/meshsub/1.1.0":{"maxStreams":64}}}"#;
    let descriptor = build_host_config(inputs(&[("NRM_LIMITS_JSON", limits)])).unwrap();

    descriptor.observe_gossip_event(&gossip_message(300));
    descriptor.observe_gossip_event(&gossip_message(200));
    descriptor.record_gossip_publish(50);
    descriptor.observe_gossip_event(&gossipsub::Event::GossipsubNotSupported {
        peer_id: PeerId::random(),
    });

    let traffic = descriptor.resource_manager.metrics().usage.traffic;
    assert_eq!(traffic.keys().collect::<Vec<_>>(), vec![GOSSIPSUB_PROTOCOL]);
    let meshsub = traffic[GOSSIPSUB_PROTOCOL];
    assert_eq!((meshsub.bytes_in, meshsub.messages_in), (500, 2));
    assert_eq!((meshsub.bytes_out, meshsub.messages_out), (50, 1));
}

#[test]
fn unlimited_protocols_share_one_traffic_label() {
    let descriptor = build_host_config(inputs(&[])).unwrap();
    descriptor.observe_gossip_event(&gossip_message(10));
    descriptor
        .resource_manager
        .record_protocol_traffic(Some("/ipfs/id/1.0.0"), Direction::Inbound, 5);

    let traffic = descriptor.resource_manager.metrics().usage.traffic;
    assert_eq!(traffic.keys().collect::<Vec<_>>(), vec![OTHER_PROTOCOL]);
    assert_eq!(traffic[OTHER_PROTOCOL].messages_in, 2);
}
