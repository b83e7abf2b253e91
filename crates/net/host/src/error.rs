use agi_net_resources::ResourceError;
use agi_net_transport::TransportError;

/// Fatal host assembly failures. Nothing is returned half-built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostConfigError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Resources(#[from] ResourceError),
}
