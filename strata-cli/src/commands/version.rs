//! `strata version` command - Display version information.

use crate::error::CliResult;
use crate::output::{self, kv};

/// Package version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
const NAME: &str = env!("CARGO_PKG_NAME");

/// Run the version command
pub async fn run() -> CliResult<()> {
    output::header("strata");

    kv("Version", VERSION);
    kv("Binary", NAME);

    #[cfg(debug_assertions)]
    let build_mode = "debug";
    #[cfg(not(debug_assertions))]
    let build_mode = "release";

    kv("Build", build_mode);
    output::newline();

    output::section("Components");
    kv("strata-sql", VERSION);
    kv("strata-mysql", VERSION);
    kv("strata-migrate", VERSION);
    kv("history table", strata_migrate::HISTORY_TABLE);

    Ok(())
}
