//! Logging setup for the `strata` binary.
//!
//! # Environment Variables
//!
//! - `STRATA_DEBUG=true` or `STRATA_DEBUG=1` - Enable debug logging
//! - `STRATA_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific level
//! - `STRATA_LOG_FORMAT=pretty|compact|json` - Output format (default: compact)
//!
//! `-v` flags on the command line win over the environment.

use std::env;
use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static INIT: Once = Once::new();

/// Whether `STRATA_DEBUG` asks for debug logging.
pub fn is_debug_enabled() -> bool {
    env::var("STRATA_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Level from `-v` count, then `STRATA_LOG_LEVEL`, then `STRATA_DEBUG`.
pub fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => {}
        1 => return "info",
        2 => return "debug",
        _ => return "trace",
    }
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("STRATA_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// Output format from `STRATA_LOG_FORMAT`.
pub fn log_format() -> &'static str {
    env::var("STRATA_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "json" => "json",
            _ => "compact",
        })
        .unwrap_or("compact")
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(verbose: u8) {
    INIT.call_once(|| {
        let level = log_level(verbose);
        let filter = EnvFilter::try_new(format!(
            "strata={level},strata_cli={level},strata_migrate={level},strata_mysql={level},strata_sql={level}"
        ))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

        let registry = tracing_subscriber::registry().with(filter);
        let result = match log_format() {
            "json" => registry
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init(),
            "pretty" => registry
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init(),
            _ => registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .try_init(),
        };
        if result.is_ok() {
            tracing::debug!(level = level, format = log_format(), "Logging initialized");
        }
    });
}
