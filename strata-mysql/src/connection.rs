//! MySQL connection wrapper.

use std::time::Duration;

use mysql_async::prelude::*;
use mysql_async::{Conn, Opts, Row};
use tracing::{debug, info};

use crate::config::MysqlConfig;
use crate::error::{MysqlError, MysqlResult};
use crate::row::TextRow;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A wrapper around a MySQL connection.
///
/// Statements go over the text protocol, so one call may carry several
/// `;`-separated statements.
pub struct MysqlConnection {
    conn: Conn,
    label: String,
    debug_sql: bool,
}

impl MysqlConnection {
    /// Open a connection described by `config`.
    ///
    /// `label` names the connection in logs (`database`, `sandbox`).
    pub async fn connect(config: &MysqlConfig, label: impl Into<String>) -> MysqlResult<Self> {
        let label = label.into();
        let limit = config.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let opts = Opts::from(config.to_opts_builder());

        debug!(target_db = %label, url = %config.masked_url(), "Connecting");
        let conn = match tokio::time::timeout(limit, Conn::new(opts)).await {
            Ok(conn) => conn?,
            Err(_) => {
                return Err(MysqlError::connection(format!(
                    "connecting to {} timed out after {:?}",
                    config.masked_url(),
                    limit
                )));
            }
        };

        Ok(Self {
            conn,
            label,
            debug_sql: false,
        })
    }

    /// Log every statement at `info` instead of `debug`.
    pub fn with_debug_sql(mut self, enabled: bool) -> Self {
        self.debug_sql = enabled;
        self
    }

    /// Name of this connection in logs.
    pub fn label(&self) -> &str {
        &self.label
    }

    fn trace(&self, sql: &str) {
        if self.debug_sql {
            info!(target_db = %self.label, sql = %sql, "Executing");
        } else {
            debug!(target_db = %self.label, sql = %sql, "Executing");
        }
    }

    /// Execute a statement and return the number of affected rows.
    pub async fn execute(&mut self, sql: &str) -> MysqlResult<u64> {
        self.trace(sql);
        self.conn
            .query_drop(sql)
            .await
            .map_err(|e| MysqlError::query(sql, e.to_string()))?;
        Ok(self.conn.affected_rows())
    }

    /// Execute a query and return all rows as text.
    pub async fn query(&mut self, sql: &str) -> MysqlResult<Vec<TextRow>> {
        self.trace(sql);
        let rows: Vec<Row> = self
            .conn
            .query(sql)
            .await
            .map_err(|e| MysqlError::query(sql, e.to_string()))?;
        Ok(rows.into_iter().map(TextRow::from_row).collect())
    }

    /// Execute a query and return the first row, if any.
    pub async fn query_first(&mut self, sql: &str) -> MysqlResult<Option<TextRow>> {
        self.trace(sql);
        let row: Option<Row> = self
            .conn
            .query_first(sql)
            .await
            .map_err(|e| MysqlError::query(sql, e.to_string()))?;
        Ok(row.map(TextRow::from_row))
    }

    pub async fn begin(&mut self) -> MysqlResult<()> {
        self.execute("BEGIN").await.map(|_| ())
    }

    pub async fn commit(&mut self) -> MysqlResult<()> {
        self.execute("COMMIT").await.map(|_| ())
    }

    pub async fn rollback(&mut self) -> MysqlResult<()> {
        self.execute("ROLLBACK").await.map(|_| ())
    }

    /// Switch the default database.
    pub async fn use_database(&mut self, database: &str) -> MysqlResult<()> {
        let sql = format!("USE `{}`", database.replace('`', "``"));
        self.execute(&sql).await.map(|_| ())
    }

    /// Check that the server still answers.
    pub async fn ping(&mut self) -> MysqlResult<()> {
        self.conn.ping().await?;
        Ok(())
    }

    /// Close the connection gracefully.
    pub async fn disconnect(self) -> MysqlResult<()> {
        debug!(target_db = %self.label, "Disconnecting");
        self.conn.disconnect().await?;
        Ok(())
    }
}

impl std::fmt::Debug for MysqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MysqlConnection")
            .field("label", &self.label)
            .field("debug_sql", &self.debug_sql)
            .finish()
    }
}
