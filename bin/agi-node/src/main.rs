//! AGI node network control plane binary.

mod cli;

use std::sync::Arc;

use agi_net_config::NetworkConfig;
use agi_net_host::{HostConfigInputs, TracerOptions, build_host_config};
use agi_net_transport::ReachabilityTracker;
use clap::Parser;
use eyre::WrapErr;
use tracing::info;

fn main() -> eyre::Result<()> {
    let cli = cli::Cli::parse();
    agi_observability::init_logging(&cli.logs)?;
    agi_metrics::describe_metrics();

    let config = NetworkConfig::from_env().wrap_err("invalid network configuration")?;

    let reachability = cli.reachability.map(|state| {
        let tracker = ReachabilityTracker::default();
        tracker.set_override(Some(state.into()));
        Arc::new(tracker)
    });
    let descriptor = build_host_config(HostConfigInputs {
        config,
        reachability,
        tracer: TracerOptions {
            spans: !cli.no_dial_spans,
        },
    })
    .wrap_err("failed to assemble network host")?;

    let summary = descriptor.summary();
    info!(
        preference = descriptor.dialer.preference().as_str(),
        listen = ?summary.listen_addrs,
        announce = ?summary.announce_addrs,
        reachability = summary.reachability.as_str(),
        max_connections = summary.limits.max_connections,
        low_water = summary.watermarks.low_water,
        high_water = summary.watermarks.high_water,
        mesh_d = summary.mesh.d,
        "Network host ready"
    );

    if cli.print_descriptor {
        let json = serde_json::to_string_pretty(&summary).wrap_err("failed to encode summary")?;
        println!("{json}");
    }

    Ok(())
}
