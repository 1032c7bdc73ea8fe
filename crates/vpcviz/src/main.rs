mod cli;
mod commands;
mod error;
mod feed;
mod render;
mod server;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, LogFormat};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose, cli.global.log_format);

    if let Err(err) = run(&cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// Logs go to stderr so `snapshot` output stays pipeable. `RUST_LOG`
/// overrides the verbosity flags.
fn init_tracing(verbosity: u8, format: LogFormat) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        // Config commands must work without a valid config
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Serve(args) => {
            let cfg = vpcviz_config::load_config(cli.global.config.as_deref())?;
            commands::serve::handle(args, &cfg).await
        }

        Command::Snapshot(args) => {
            let cfg = vpcviz_config::load_config(cli.global.config.as_deref())?;
            commands::snapshot::handle(args, &cfg).await
        }
    }
}
