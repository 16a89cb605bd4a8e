//! strata CLI - versioned MySQL schema migrations.

use clap::Parser;

use strata_cli::cli::{Cli, Command};
use strata_cli::commands;
use strata_cli::config::Config;
use strata_cli::logging;

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = Config::load_or_default(&cli.config)?;
    match cli.command {
        Command::Migrate(args) => commands::migrate::run(&config, args).await?,
        Command::Lint(args) => commands::lint::run(&config, args).await?,
        Command::Status(args) => commands::status::run(&config, args).await?,
        Command::Reverse(args) => commands::reverse::run(&config, args).await?,
        Command::Version => commands::version::run().await?,
    }
    Ok(())
}
