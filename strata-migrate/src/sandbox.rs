//! The sandbox database used for dry runs.
//!
//! Every run starts from an empty sandbox, replays the live schema into it,
//! then applies the pending scripts. Nothing in the sandbox is kept.

use strata_sql::quote_ident;
use tracing::{debug, info};

use crate::db::Executor;
use crate::error::{MigrateError, MigrateResult};
use crate::module::Module;
use crate::script::Script;
use crate::snapshot::Snapshot;

/// Where the sandbox is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxState {
    /// Empty database, just (re)created.
    Fresh,
    /// Live schema replayed.
    Recovered,
    /// Pending scripts applied.
    Migrated,
    /// A step failed; reset before reuse.
    Failed,
}

/// A connection to the sandbox server and the database it owns there.
pub struct Sandbox {
    exec: Box<dyn Executor>,
    database: String,
    state: SandboxState,
    applied: Vec<String>,
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox")
            .field("database", &self.database)
            .field("state", &self.state)
            .field("applied", &self.applied.len())
            .finish()
    }
}

impl Sandbox {
    /// Wrap a connection to the sandbox server. Call [`Sandbox::reset`]
    /// before use.
    pub fn new(exec: Box<dyn Executor>, database: impl Into<String>) -> Self {
        Self {
            exec,
            database: database.into(),
            state: SandboxState::Failed,
            applied: Vec::new(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn state(&self) -> SandboxState {
        self.state
    }

    /// `module/filename` of every script applied since the last reset.
    pub fn applied(&self) -> &[String] {
        &self.applied
    }

    pub fn executor(&mut self) -> &mut dyn Executor {
        self.exec.as_mut()
    }

    /// Drop and recreate the sandbox database, then switch to it.
    pub async fn reset(&mut self) -> MigrateResult<()> {
        let name = quote_ident(&self.database);
        for sql in [
            format!("DROP DATABASE IF EXISTS {name}"),
            format!("CREATE DATABASE {name}"),
            format!("USE {name}"),
        ] {
            if let Err(e) = self.exec.execute(&sql).await {
                self.state = SandboxState::Failed;
                return Err(MigrateError::sandbox(format!("{sql}: {e}")));
            }
        }
        self.applied.clear();
        self.state = SandboxState::Fresh;
        debug!(database = %self.database, "Sandbox reset");
        Ok(())
    }

    /// Replay the live schema into the fresh sandbox.
    pub async fn recover(&mut self, snapshot: &Snapshot) -> MigrateResult<()> {
        self.expect_state(SandboxState::Fresh)?;
        if let Err(e) = snapshot.recover_to(self.exec.as_mut()).await {
            self.state = SandboxState::Failed;
            return Err(e);
        }
        self.state = SandboxState::Recovered;
        info!(tables = snapshot.len(), "Recovered live schema into sandbox");
        Ok(())
    }

    /// Apply one SQL script in its own transaction.
    ///
    /// The first failing statement rolls the script back and leaves the
    /// sandbox in [`SandboxState::Failed`].
    pub async fn apply(&mut self, module: &Module, script: &Script) -> MigrateResult<()> {
        self.expect_state(SandboxState::Recovered)?;
        let label = format!("{}/{}", module.name, script.name);

        let result = self.apply_nodes(script).await;
        if let Err(e) = result {
            let _ = self.exec.rollback().await;
            self.state = SandboxState::Failed;
            return Err(MigrateError::sandbox(format!("{label}: {e}")));
        }
        debug!(script = %label, "Applied script in sandbox");
        self.applied.push(label);
        Ok(())
    }

    async fn apply_nodes(&mut self, script: &Script) -> strata_mysql::MysqlResult<()> {
        self.exec.begin().await?;
        for node in script.nodes() {
            self.exec.execute(&node.text).await?;
        }
        self.exec.commit().await
    }

    /// Record that every pending script was applied.
    pub fn finish(&mut self) -> MigrateResult<()> {
        self.expect_state(SandboxState::Recovered)?;
        self.state = SandboxState::Migrated;
        Ok(())
    }

    /// Mark the sandbox unusable until the next reset.
    pub fn fail(&mut self) {
        self.state = SandboxState::Failed;
    }

    fn expect_state(&self, expected: SandboxState) -> MigrateResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(MigrateError::sandbox(format!(
                "sandbox is {:?}, expected {expected:?}",
                self.state
            )))
        }
    }
}
