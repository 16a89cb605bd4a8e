//! Collecting the SQL a run commits.
//!
//! With a collector directory configured, every statement installed on the
//! live database is appended to one file per run, grouped by script:
//!
//! ```text
//! -- orders/20240201-name.sql
//! ALTER TABLE t ADD COLUMN name VARCHAR(32) NOT NULL DEFAULT '';
//! ```
//!
//! Python scripts append the statements their cursors execute to the same
//! file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokio::io::AsyncWriteExt;

use crate::error::{MigrateError, MigrateResult};
use crate::script::Script;

/// File name for a run started at `now`.
pub fn collector_filename(now: DateTime<Local>) -> String {
    format!("strata-collected-{}.sql", now.format("%Y%m%d%H%M%S"))
}

/// Appends installed SQL to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlCollector {
    path: PathBuf,
}

impl SqlCollector {
    /// A collector writing into `dir`, named after the current time.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self::at(dir.as_ref().join(collector_filename(Local::now())))
    }

    /// A collector writing to exactly `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append every statement of `script` under a header naming it.
    pub async fn collect(&self, module: &str, script: &Script) -> MigrateResult<()> {
        let mut text = format!("-- {module}/{}\n", script.name);
        for node in script.nodes() {
            let statement = node.text.trim().trim_end_matches(';').trim_end();
            if statement.is_empty() {
                continue;
            }
            text.push_str(statement);
            text.push_str(";\n");
        }
        self.append(&text).await
    }

    async fn append(&self, text: &str) -> MigrateResult<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| MigrateError::io(dir, e))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| MigrateError::io(&self.path, e))?;
        file.write_all(text.as_bytes())
            .await
            .map_err(|e| MigrateError::io(&self.path, e))?;
        file.flush().await.map_err(|e| MigrateError::io(&self.path, e))
    }
}
