#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("at least one transport must be enabled (TRANSPORT_ENABLE_QUIC or TRANSPORT_ENABLE_TCP)")]
    NoTransportEnabled,
}
