//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Strata CLI - database schema migrations
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(author = "Pegasus Heavy Industries LLC")]
#[command(version)]
#[command(about = "Strata CLI - database schema migrations", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply all pending migrations
    Migrate(MigrateArgs),

    /// Show the state of every known migration
    Info(InfoArgs),

    /// Validate resolved migrations against the schema history
    Validate(ValidateArgs),

    /// Mark an existing database as already migrated up to a version
    Baseline(BaselineArgs),

    /// Display version information
    Version,
}

/// Connection and configuration options shared by all commands
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Database location (for SQLite, the database file path)
    #[arg(short, long, env = "STRATA_URL")]
    pub url: Option<String>,

    /// Path to the strata.toml config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directories containing migration scripts
    #[arg(short, long)]
    pub locations: Vec<String>,

    /// Schema history table name
    #[arg(long)]
    pub table: Option<String>,
}

/// Arguments for the `migrate` command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Allow versioned migrations below the latest applied version
    #[arg(long)]
    pub out_of_order: bool,

    /// Skip validation before migrating
    #[arg(long)]
    pub skip_validation: bool,
}

/// Arguments for the `info` command
#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Arguments for the `validate` command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Tolerate applied migrations that are no longer on disk
    #[arg(long)]
    pub ignore_missing: bool,
}

/// Arguments for the `baseline` command
#[derive(Args, Debug)]
pub struct BaselineArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Version to baseline at (defaults to 1)
    #[arg(short = 'b', long)]
    pub baseline_version: Option<String>,
}
