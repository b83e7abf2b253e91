//! Metric names.

// transport tracer
pub const DIAL_ATTEMPTS_TOTAL: &str = "transport_dial_attempts_total";
pub const DIAL_SUCCESSES_TOTAL: &str = "transport_dial_successes_total";
pub const DIAL_FAILURES_TOTAL: &str = "transport_dial_failures_total";
pub const INBOUND_CONNECTIONS_TOTAL: &str = "transport_inbound_connections_total";
pub const CONNECTION_LATENCY_SECONDS: &str = "transport_connection_latency_seconds";

// resource manager
pub const NRM_CONNECTIONS: &str = "nrm_connections";
pub const NRM_STREAMS: &str = "nrm_streams";
pub const NRM_DENIALS_TOTAL: &str = "nrm_denials_total";
pub const NRM_PRESSURE_RATIO: &str = "nrm_pressure_ratio";
pub const NRM_BANS: &str = "nrm_bans";
pub const PROTOCOL_BYTES_TOTAL: &str = "protocol_bytes_total";
pub const PROTOCOL_MESSAGES_TOTAL: &str = "protocol_messages_total";

// connection manager
pub const CONNMGR_TRIMMED_TOTAL: &str = "connmgr_trimmed_total";
pub const CONNMGR_TRIM_RUNS_TOTAL: &str = "connmgr_trim_runs_total";

// peer score
pub const GOSSIP_PEER_SCORE_BUCKET: &str = "gossip_peer_score_bucket";
pub const GOSSIP_TOPIC_SCORE_CONTRIBUTION: &str = "gossip_topic_score_contribution";
pub const GOSSIP_SCORE_SNAPSHOTS_TOTAL: &str = "gossip_score_snapshots_total";

// dialer
pub const DIALER_OUTBOUND_RATIO: &str = "dialer_outbound_ratio";
