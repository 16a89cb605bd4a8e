//! `strata migrate` - lint, dry-run and install pending scripts.

use strata_migrate::{MigrationReport, Migrator};

use crate::cli::MigrateArgs;
use crate::config::Config;
use crate::error::CliResult;
use crate::output::{self, success, warn};

/// Run the migrate command
pub async fn run(config: &Config, args: MigrateArgs) -> CliResult<()> {
    output::header("Migrate");

    let engine = config.migrate(&args)?;
    output::kv("Migrations", &engine.migration_root().display().to_string());
    output::kv("Database", &engine.database.masked_url());
    if engine.skip_sandbox {
        output::kv("Sandbox", "skipped");
    } else {
        output::kv("Sandbox", &engine.sandbox.masked_url());
    }
    output::newline();

    let mut migrator = Migrator::from_config(engine).await?;
    output::info(&format!(
        "Loaded {} script(s) from {} module(s)",
        migrator.scripts().sorted().count(),
        migrator.scripts().modules.len()
    ));

    let report = migrator.run().await?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &MigrationReport) {
    output::kv("Installing type", report.installing_type.as_str());
    for phase in &report.skipped {
        warn(&format!("Skipped {phase}"));
    }

    if !report.baselined.is_empty() {
        output::newline();
        output::section("Baselined");
        for (module, filename) in &report.baselined {
            output::list_item(&format!("{module}/{filename}"));
        }
    }
    if !report.patched.is_empty() {
        output::newline();
        output::section("Patched");
        for (module, filename) in &report.patched {
            output::list_item(&format!("{module}/{filename}"));
        }
    }
    if !report.applied.is_empty() {
        output::newline();
        output::section("Applied");
        for (module, filename) in &report.applied {
            output::list_item(&format!("{module}/{filename}"));
        }
    }

    output::newline();
    success(&report.summary());
}
