//! Network host assembly.
//!
//! [`build_host_config`] turns a [`NetworkConfig`](agi_net_config::NetworkConfig)
//! into a [`HostDescriptor`]: the transport plan, the addresses to listen on
//! and announce, the dialer, admission control, connection trimming and the
//! gossip routing config. [`TransportTracer`] instruments the host's dial and
//! connection lifecycle.

mod assemble;
mod descriptor;
mod error;
mod event;
mod swarm;
mod tracer;

pub use assemble::{HostConfigInputs, build_host_config};
pub use descriptor::{DialerHandle, HostDescriptor, HostSummary, NatSettings};
pub use error::HostConfigError;
pub use event::TransportEvent;
pub use swarm::{GOSSIPSUB_PROTOCOL, transport_event_from_swarm};
pub use tracer::{TracerBinding, TracerOptions, TransportTracer};
