use clap::Parser;

use helmscan_cli::cli::{Cli, Commands};
use helmscan_cli::commands;
use helmscan_cli::error::CliError;
use helmscan_cli::logging::init_tracing;
use helmscan_cli::output::OutputWriter;
use helmscan_core::config::HelmscanConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Config errors are reported by the command itself; logging only needs [general].
    let general = HelmscanConfig::read_or_default(&cli.config)
        .await
        .map(|c| c.general)
        .unwrap_or_default();

    if let Err(e) = init_tracing(&general, cli.log_level.as_deref()) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, exit_code = e.exit_code(), "helmscan failed");
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    match cli.command {
        Commands::Scan(args) => commands::scan::execute(args, &cli.config, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    }
}
