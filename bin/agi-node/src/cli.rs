//! Command line arguments.

use agi_net_transport::Reachability;
use agi_observability::LogArgs;
use clap::{Parser, ValueEnum};

/// AGI node network control plane.
///
/// Reads network configuration from the environment, validates it and
/// assembles the host descriptor.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) logs: LogArgs,

    /// Print the assembled host summary as JSON on stdout.
    #[arg(long)]
    pub(crate) print_descriptor: bool,

    /// Pin reachability instead of waiting for probes.
    #[arg(long, value_enum, value_name = "STATE")]
    pub(crate) reachability: Option<ReachabilityArg>,

    /// Disable per-dial tracing spans.
    #[arg(long)]
    pub(crate) no_dial_spans: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ReachabilityArg {
    Public,
    Private,
    Unknown,
}

impl From<ReachabilityArg> for Reachability {
    fn from(arg: ReachabilityArg) -> Self {
        match arg {
            ReachabilityArg::Public => Self::Public,
            ReachabilityArg::Private => Self::Private,
            ReachabilityArg::Unknown => Self::Unknown,
        }
    }
}
