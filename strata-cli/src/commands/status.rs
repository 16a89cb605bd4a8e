//! `strata status` - per-script install state.

use strata_migrate::{Migrator, ScriptStatus};

use crate::cli::StatusArgs;
use crate::config::Config;
use crate::error::CliResult;
use crate::output::{self, success, warn};

/// Run the status command
pub async fn run(config: &Config, args: StatusArgs) -> CliResult<()> {
    output::header("Migration Status");

    let engine = config
        .online(&args.scripts, &args.connection)?
        .skip_sandbox(true);
    output::kv("Database", &engine.database.masked_url());
    output::newline();

    let mut migrator = Migrator::from_config(engine).await?;
    let states = migrator.status().await?;
    if states.is_empty() {
        output::dim("No migration scripts found");
        return Ok(());
    }

    let mut module = "";
    for state in &states {
        if state.module != module {
            module = state.module.as_str();
            output::section(module);
        }
        let baseline = if state.baseline { " (baseline)" } else { "" };
        println!(
            "  {} {}{}",
            output::status_label(state.status),
            state.filename,
            baseline
        );
    }
    output::newline();

    let count = |status: ScriptStatus| states.iter().filter(|s| s.status == status).count();
    let pending = count(ScriptStatus::Pending);
    let changed = count(ScriptStatus::ChecksumChanged);
    if changed > 0 {
        warn(&format!("{changed} installed script(s) were modified"));
    }
    if pending == 0 {
        success("Database is up to date");
    } else {
        output::info(&format!("{pending} pending script(s)"));
    }
    Ok(())
}
