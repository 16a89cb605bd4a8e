//! `strata reverse` - show the SQL that undoes an installed script.

use strata_migrate::Migrator;

use crate::cli::ReverseArgs;
use crate::config::Config;
use crate::error::{CliError, CliResult};
use crate::output;

/// Run the reverse command
pub async fn run(config: &Config, args: ReverseArgs) -> CliResult<()> {
    let engine = config
        .online(&args.scripts, &args.connection)?
        .skip_sandbox(true);
    let mut migrator = Migrator::from_config(engine).await?;

    let record = migrator
        .recorded_reversing(&args.module, &args.filename)
        .await?
        .ok_or_else(|| {
            CliError::NotFound(format!(
                "{}/{} is not recorded in {}",
                args.module,
                args.filename,
                strata_migrate::HISTORY_TABLE
            ))
        })?;

    output::header(&format!("Reversing SQL for {}/{}", args.module, args.filename));
    output::kv("Installed on", &record.installed_on);
    output::kv("Installed by", &record.installed_by);
    output::kv("Installed at", &record.created_at.to_string());

    if record.is_python() {
        output::newline();
        output::dim("Python scripts record no reversing SQL");
    } else {
        // Statements undo the script when run last-first.
        let mut sql = record.reversing();
        sql.reverse();
        if sql.is_empty() {
            output::newline();
            output::dim("Nothing to reverse");
        } else {
            output::code(&sql.join("\n"));
        }
    }
    Ok(())
}
