//! The database handle the engine runs statements through.
//!
//! The migrator never talks to `mysql_async` directly. It goes through
//! [`Executor`], so the phase machine can run against any implementation,
//! and it obtains connections through a [`Connector`].

use async_trait::async_trait;
use strata_mysql::{
    MysqlConfig, MysqlConnection, MysqlResult, RetryPolicy, TextRow, connect_with_retry,
};

/// A SQL execution handle.
#[async_trait]
pub trait Executor: Send {
    /// Execute one or more `;`-separated statements.
    async fn execute(&mut self, sql: &str) -> MysqlResult<()>;

    /// Run a query and return its rows as text.
    async fn query(&mut self, sql: &str) -> MysqlResult<Vec<TextRow>>;

    async fn begin(&mut self) -> MysqlResult<()> {
        self.execute("BEGIN").await
    }

    async fn commit(&mut self) -> MysqlResult<()> {
        self.execute("COMMIT").await
    }

    async fn rollback(&mut self) -> MysqlResult<()> {
        self.execute("ROLLBACK").await
    }
}

#[async_trait]
impl Executor for MysqlConnection {
    async fn execute(&mut self, sql: &str) -> MysqlResult<()> {
        MysqlConnection::execute(self, sql).await.map(|_| ())
    }

    async fn query(&mut self, sql: &str) -> MysqlResult<Vec<TextRow>> {
        MysqlConnection::query(self, sql).await
    }

    async fn begin(&mut self) -> MysqlResult<()> {
        MysqlConnection::begin(self).await
    }

    async fn commit(&mut self) -> MysqlResult<()> {
        MysqlConnection::commit(self).await
    }

    async fn rollback(&mut self) -> MysqlResult<()> {
        MysqlConnection::rollback(self).await
    }
}

/// Opens the two connections a migration run needs.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connection to the live database.
    async fn database(&self) -> MysqlResult<Box<dyn Executor>>;

    /// Connection to the sandbox server, without a default database.
    ///
    /// The sandbox database itself is dropped and recreated by the caller.
    async fn sandbox(&self) -> MysqlResult<Box<dyn Executor>>;
}

/// [`Connector`] backed by `mysql_async`.
#[derive(Debug, Clone)]
pub struct MysqlConnector {
    database: MysqlConfig,
    sandbox: MysqlConfig,
    retry: RetryPolicy,
    debug_sql: bool,
}

impl MysqlConnector {
    pub fn new(database: MysqlConfig, sandbox: MysqlConfig) -> Self {
        Self {
            database,
            sandbox,
            retry: RetryPolicy::default(),
            debug_sql: false,
        }
    }

    /// Set how long to wait for the sandbox server.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Log every statement at `info`.
    pub fn debug_sql(mut self, enabled: bool) -> Self {
        self.debug_sql = enabled;
        self
    }
}

#[async_trait]
impl Connector for MysqlConnector {
    async fn database(&self) -> MysqlResult<Box<dyn Executor>> {
        let conn = MysqlConnection::connect(&self.database, "database").await?;
        Ok(Box::new(conn.with_debug_sql(self.debug_sql)))
    }

    async fn sandbox(&self) -> MysqlResult<Box<dyn Executor>> {
        let config = self.sandbox.without_database();
        let conn = connect_with_retry(&config, "sandbox", self.retry).await?;
        Ok(Box::new(conn.with_debug_sql(self.debug_sql)))
    }
}
