//! Error types for MySQL operations.

use std::time::Duration;

use thiserror::Error;

/// Result type for MySQL operations.
pub type MysqlResult<T> = Result<T, MysqlError>;

/// Error type for MySQL operations.
#[derive(Debug, Error)]
pub enum MysqlError {
    /// MySQL driver error.
    #[error("MySQL error: {0}")]
    Mysql(#[from] mysql_async::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A statement failed; carries the SQL that was sent.
    #[error("Query error: {message}\n  in: {sql}")]
    Query { sql: String, message: String },

    /// Connecting did not succeed within the allotted time.
    #[error("Timeout error: {target} not reachable after {elapsed:?}: {last_error}")]
    Timeout {
        target: String,
        elapsed: Duration,
        last_error: String,
    },
}

impl MysqlError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a query error for the given SQL.
    pub fn query(sql: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Query {
            sql: sql.into(),
            message: msg.into(),
        }
    }

    /// Whether retrying the connection might succeed.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout { .. } => true,
            Self::Mysql(e) => matches!(e, mysql_async::Error::Io(_) | mysql_async::Error::Driver(_)),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MysqlError::config("invalid url");
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("invalid url"));
    }

    #[test]
    fn test_query_error_carries_sql() {
        let err = MysqlError::query("SELECT nope", "unknown column");
        let display = err.to_string();
        assert!(display.contains("unknown column"));
        assert!(display.contains("SELECT nope"));
        assert!(!err.is_connection_error());
    }

    #[test]
    fn test_error_constructors() {
        assert!(matches!(MysqlError::config("test"), MysqlError::Config(_)));
        assert!(MysqlError::connection("refused").is_connection_error());
    }
}
