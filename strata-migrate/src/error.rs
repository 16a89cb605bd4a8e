//! Error types for the migration engine.

use std::path::PathBuf;

use strata_mysql::MysqlError;
use strata_sql::SqlError;
use thiserror::Error;

use crate::lint::LintReport;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrateError>;

/// Errors that can occur during migration operations.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// File system error.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid engine configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A script could not be parsed.
    #[error("failed to parse {script}: {source}")]
    Parse {
        script: String,
        #[source]
        source: SqlError,
    },

    /// A script is not valid UTF-8.
    #[error("{script} is not valid UTF-8: {source}")]
    Encoding {
        script: String,
        #[source]
        source: std::str::Utf8Error,
    },

    /// A script contains a statement outside DDL, DML and SET.
    #[error("{script}: {kind} is not allowed in a migration script: {sql}")]
    UnsupportedStatement {
        script: String,
        kind: String,
        sql: String,
    },

    /// Content lint rules reported violations.
    #[error("{0}")]
    Lint(LintReport),

    /// A module alters tables it does not create.
    #[error("alter permission lint failed:\n{0}")]
    AlterPermission(String),

    /// Two modules share a script filename.
    #[error("same name lint failed:\n{0}")]
    SameName(String),

    /// Installed scripts were reordered or edited.
    #[error("installed changes lint failed:\n{0}")]
    InstalledChanges(String),

    /// Baseline scripts do not describe the live schema.
    #[error(
        "baseline schema of module {module} differs from the live database, manual intervention is required:\n{reason}"
    )]
    BaselineMismatch { module: String, reason: String },

    /// The reversing SQL for a statement cannot be built.
    #[error("cannot reverse `{sql}`: {message}")]
    Reverse { sql: String, message: String },

    /// The live schema could not be captured or replayed.
    #[error("snapshot error on table {table}: {message}")]
    Snapshot { table: String, message: String },

    /// A script failed while being installed.
    #[error("failed to install {module}/{filename}: {source}")]
    Execution {
        module: String,
        filename: String,
        #[source]
        source: MysqlError,
    },

    /// The history record for an installed script could not be written.
    #[error(
        "failed to record {module}/{filename} in migration history, all migrations will be rolled back: {message}"
    )]
    History {
        module: String,
        filename: String,
        message: String,
    },

    /// The sandbox could not be prepared or used.
    #[error("sandbox error: {0}")]
    Sandbox(String),

    /// A Python script failed.
    #[error("python script {script} failed: {message}")]
    Python { script: String, message: String },

    /// Database error outside a script installation.
    #[error("database error: {0}")]
    Database(#[from] MysqlError),
}

impl MigrateError {
    /// Create an I/O error for a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a reversal error for a statement.
    pub fn reverse(sql: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Reverse {
            sql: sql.into(),
            message: msg.into(),
        }
    }

    /// Create a snapshot error for a table.
    pub fn snapshot(table: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Snapshot {
            table: table.into(),
            message: msg.into(),
        }
    }

    /// Create a sandbox error.
    pub fn sandbox(msg: impl Into<String>) -> Self {
        Self::Sandbox(msg.into())
    }

    /// Create a Python script error.
    pub fn python(script: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Python {
            script: script.into(),
            message: msg.into(),
        }
    }

    /// Whether this error was raised before anything touched the database.
    pub fn is_lint(&self) -> bool {
        matches!(
            self,
            Self::Lint(_)
                | Self::AlterPermission(_)
                | Self::SameName(_)
                | Self::InstalledChanges(_)
                | Self::BaselineMismatch { .. }
        )
    }
}
