//! Strata CLI - Command-line interface for the Strata migration engine.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use strata_cli::cli::{Cli, Command};
use strata_cli::commands;
use strata_cli::error::CliResult;
use strata_cli::output;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        output::newline();
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Migrate(args) => commands::migrate::run(args).await,
        Command::Info(args) => commands::info::run(args).await,
        Command::Validate(args) => commands::validate::run(args).await,
        Command::Baseline(args) => commands::baseline::run(args).await,
        Command::Version => commands::version::run().await,
    }
}
