//! CLI error types and result alias.

use miette::Diagnostic;
use strata_migrate::MigrateError;
use strata_mysql::MysqlError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(strata::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(strata::config),
        help("check strata.toml and the STRATA_DATABASE_URL / STRATA_SANDBOX_URL variables")
    )]
    Config(String),

    /// Lint failures
    #[error("Lint failed: {0}")]
    #[diagnostic(
        code(strata::lint),
        help("fix the listed scripts; nothing was executed")
    )]
    Lint(String),

    /// Baseline scripts do not match the live schema
    #[error("{0}")]
    #[diagnostic(
        code(strata::baseline),
        help("make the MIGRATION_BASE scripts describe the live tables exactly")
    )]
    Baseline(String),

    /// Sandbox dry run failed
    #[error("{0}")]
    #[diagnostic(
        code(strata::sandbox),
        help("the script failed against a copy of the live schema; the live database was not touched")
    )]
    Sandbox(String),

    /// Migration error
    #[error("Migration error: {0}")]
    #[diagnostic(code(strata::migration))]
    Migration(String),

    /// Database error
    #[error("Database error: {0}")]
    #[diagnostic(code(strata::database))]
    Database(String),

    /// Lookup that found nothing
    #[error("{0}")]
    #[diagnostic(code(strata::not_found))]
    NotFound(String),
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Config(format!("Failed to parse TOML: {}", err))
    }
}

impl From<MysqlError> for CliError {
    fn from(err: MysqlError) -> Self {
        CliError::Database(err.to_string())
    }
}

impl From<MigrateError> for CliError {
    fn from(err: MigrateError) -> Self {
        let message = err.to_string();
        match err {
            MigrateError::Config(msg) => CliError::Config(msg),
            MigrateError::BaselineMismatch { .. } => CliError::Baseline(message),
            MigrateError::Sandbox(_) => CliError::Sandbox(message),
            MigrateError::Database(e) => CliError::Database(e.to_string()),
            e if e.is_lint() => CliError::Lint(message),
            _ => CliError::Migration(message),
        }
    }
}
