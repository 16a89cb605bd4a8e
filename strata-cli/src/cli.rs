//! CLI argument definitions using clap.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CONFIG_FILE_NAME;

/// strata - versioned MySQL schema migrations
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(version)]
#[command(
    about = "strata - versioned MySQL schema migrations with sandbox dry-runs",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Lint, dry-run and install pending migration scripts
    Migrate(MigrateArgs),

    /// Lint every script without connecting to a database
    Lint(LintArgs),

    /// Show which scripts are installed, pending or modified
    Status(StatusArgs),

    /// Print the reversing SQL recorded for an installed script
    Reverse(ReverseArgs),

    /// Display version information
    Version,
}

// =============================================================================
// Shared arguments
// =============================================================================

/// Where the scripts live
#[derive(Args, Debug, Default, Clone)]
pub struct ScriptArgs {
    /// Project root the migrations directory is relative to
    #[arg(short, long)]
    pub workdir: Option<PathBuf>,

    /// Migrations directory, relative to the workdir
    #[arg(short = 'd', long)]
    pub migration_dir: Option<PathBuf>,

    /// Only handle these modules
    #[arg(short, long, value_delimiter = ',')]
    pub modules: Vec<String>,
}

/// Database connections
#[derive(Args, Debug, Default, Clone)]
pub struct ConnectionArgs {
    /// Live database URL
    #[arg(long, env = "STRATA_DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Sandbox database URL
    #[arg(long, env = "STRATA_SANDBOX_URL", hide_env_values = true)]
    pub sandbox_url: Option<String>,

    /// Log every SQL statement sent to either database
    #[arg(long)]
    pub debug_sql: bool,
}

// =============================================================================
// Migrate Command
// =============================================================================

/// Arguments for the `migrate` command
#[derive(Args, Debug, Default)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub scripts: ScriptArgs,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Skip the content lint rules
    #[arg(long)]
    pub skip_lint: bool,

    /// Skip the sandbox dry run
    #[arg(long)]
    pub skip_sandbox: bool,

    /// Skip the rolled-back dry run against the live database
    #[arg(long)]
    pub skip_pre_migrate: bool,

    /// Stop before installing anything
    #[arg(long)]
    pub skip_migrate: bool,

    /// Append the installed SQL to a file in this directory
    #[arg(long, value_name = "DIR")]
    pub sql_collector_dir: Option<PathBuf>,
}

// =============================================================================
// Lint Command
// =============================================================================

/// Arguments for the `lint` command
#[derive(Args, Debug, Default)]
pub struct LintArgs {
    #[command(flatten)]
    pub scripts: ScriptArgs,
}

// =============================================================================
// Status Command
// =============================================================================

/// Arguments for the `status` command
#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    #[command(flatten)]
    pub scripts: ScriptArgs,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

// =============================================================================
// Reverse Command
// =============================================================================

/// Arguments for the `reverse` command
#[derive(Args, Debug)]
pub struct ReverseArgs {
    /// Module the script belongs to
    #[arg(long)]
    pub module: String,

    /// Script file name
    #[arg(long)]
    pub filename: String,

    #[command(flatten)]
    pub scripts: ScriptArgs,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}
