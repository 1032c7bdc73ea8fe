//! Clap derive structures for the `vpcviz` CLI.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// vpcviz -- live views of cloud network and stack topology
#[derive(Debug, Parser)]
#[command(
    name = "vpcviz",
    version,
    about = "Serve live views of cloud network and stack topology",
    long_about = "Periodically inventories a cloud account's virtual networks, subnets,\n\
        instances, deployment stacks and autoscaling groups, and serves the\n\
        joined topology as HTML, JSON, and live WebSocket feeds.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "VPCVIZ_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the refresh engine and the HTTP server
    Serve(ServeArgs),

    /// Refresh one lineage once and print it as JSON
    Snapshot(SnapshotArgs),

    /// Inspect configuration
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides config)
    #[arg(long, short = 'l')]
    pub listen: Option<SocketAddr>,

    /// Serve a JSON fixture instead of calling the inventory API
    #[arg(long, value_name = "FILE")]
    pub fixture: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// Which lineage to refresh
    #[arg(value_enum)]
    pub lineage: LineageArg,

    /// Read inventory from a JSON fixture instead of the inventory API
    #[arg(long, value_name = "FILE")]
    pub fixture: Option<PathBuf>,

    /// Compact single-line JSON
    #[arg(long)]
    pub compact: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LineageArg {
    /// Networks, subnets and instances
    Vpc,
    /// Stacks, their instances and autoscaling groups
    Stack,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Print the config file path
    Path,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_serve_overrides() {
        let cli = Cli::try_parse_from(["vpcviz", "-vv", "serve", "--listen", "127.0.0.1:9000"])
            .unwrap();
        assert_eq!(cli.global.verbose, 2);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.listen, Some("127.0.0.1:9000".parse().unwrap()));
    }
}
