//! Metric names, bounded label values and metric descriptions.
//!
//! Every metric emitted by the network control plane is named here so that
//! exporters and dashboards have a single place to look. Label values are
//! restricted to small closed enums to keep series cardinality bounded.

mod labels;
pub mod names;

pub use labels::Direction;

/// Re-export metrics crate for convenience
pub use metrics;

/// Register descriptions and units for every control-plane metric.
///
/// Safe to call more than once; recorders ignore duplicate descriptions.
pub fn describe_metrics() {
    use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        names::DIAL_ATTEMPTS_TOTAL,
        Unit::Count,
        "Outbound dial attempts by transport and direction"
    );
    describe_counter!(
        names::DIAL_SUCCESSES_TOTAL,
        Unit::Count,
        "Successful dials by transport and direction"
    );
    describe_counter!(
        names::DIAL_FAILURES_TOTAL,
        Unit::Count,
        "Failed dials by transport and direction"
    );
    describe_counter!(
        names::INBOUND_CONNECTIONS_TOTAL,
        Unit::Count,
        "Inbound connections by transport"
    );
    describe_histogram!(
        names::CONNECTION_LATENCY_SECONDS,
        Unit::Seconds,
        "Time from dial start to outcome"
    );

    describe_gauge!(names::NRM_CONNECTIONS, "Connections admitted by the resource manager");
    describe_gauge!(names::NRM_STREAMS, "Streams admitted by the resource manager");
    describe_counter!(
        names::NRM_DENIALS_TOTAL,
        Unit::Count,
        "Admission denials by reason"
    );
    describe_gauge!(
        names::NRM_PRESSURE_RATIO,
        "Utilisation of a limited resource (0.0 - 1.0)"
    );
    describe_gauge!(names::NRM_BANS, "Active bans by kind");
    describe_counter!(
        names::PROTOCOL_BYTES_TOTAL,
        Unit::Bytes,
        "Bytes by protocol and direction"
    );
    describe_counter!(
        names::PROTOCOL_MESSAGES_TOTAL,
        Unit::Count,
        "Messages by protocol and direction"
    );

    describe_counter!(
        names::CONNMGR_TRIMMED_TOTAL,
        Unit::Count,
        "Connections trimmed by the connection manager"
    );
    describe_counter!(
        names::CONNMGR_TRIM_RUNS_TOTAL,
        Unit::Count,
        "Connection manager trim sweeps that evicted peers"
    );

    describe_gauge!(
        names::GOSSIP_PEER_SCORE_BUCKET,
        "Peers per gossip score bucket in the latest snapshot"
    );
    describe_gauge!(
        names::GOSSIP_TOPIC_SCORE_CONTRIBUTION,
        "Summed per-topic score contribution in the latest snapshot"
    );
    describe_counter!(
        names::GOSSIP_SCORE_SNAPSHOTS_TOTAL,
        Unit::Count,
        "Peer score snapshots recorded"
    );

    describe_gauge!(
        names::DIALER_OUTBOUND_RATIO,
        "Outbound share of live connections"
    );
}
