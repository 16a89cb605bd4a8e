//! `strata lint` - check every script without a database.
//!
//! Every script counts as pending, so installed-changes checks that need
//! the history table do not run here.

use strata_migrate::{Scripts, default_rules};

use crate::cli::LintArgs;
use crate::config::Config;
use crate::error::{CliError, CliResult};
use crate::output::{self, success};

/// Run the lint command
pub async fn run(config: &Config, args: LintArgs) -> CliResult<()> {
    output::header("Lint");

    let engine = config.offline(&args.scripts);
    let root = engine.migration_root();
    if !root.is_dir() {
        return Err(CliError::Config(format!(
            "migrations directory {} does not exist",
            root.display()
        )));
    }
    output::kv("Migrations", &root.display().to_string());

    let mut scripts = Scripts::load(&engine).await?;
    scripts.mark_all_pending();
    output::kv("Scripts", &scripts.pending_count().to_string());
    output::newline();

    let report = scripts.lint(&default_rules(&engine.lint))?;
    if !report.is_empty() {
        for violation in &report.violations {
            output::error(&violation.to_string());
        }
        return Err(CliError::Lint(format!(
            "{} problem(s) in {} script(s)",
            report.len(),
            count_scripts(&report)
        )));
    }

    scripts.same_name_lint()?;
    scripts.alter_permission_lint()?;

    success("All scripts passed lint");
    Ok(())
}

fn count_scripts(report: &strata_migrate::LintReport) -> usize {
    let mut scripts: Vec<(&str, &str)> = report
        .violations
        .iter()
        .map(|v| (v.module.as_str(), v.script.as_str()))
        .collect();
    scripts.sort_unstable();
    scripts.dedup();
    scripts.len()
}
