//! Running `.py` migration scripts.
//!
//! A script is copied into a temporary package next to a generated
//! `main.py`. The wrapper opens a `mysql.connector` connection from
//! `settings.json`, hands it to the script's `entry(db)` function and then
//! commits or rolls back. When the settings name a collector file, the
//! connection handed to `entry` appends every executed statement to it.

use std::path::Path;
use std::process::Output;

use serde::Serialize;
use strata_mysql::MysqlConfig;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{MigrateError, MigrateResult};
use crate::script::Script;

/// Requirements installed when a module ships no `requirements.txt`.
pub const BASE_REQUIREMENTS: &str = "mysql-connector-python\n";

/// File name the developer's script is copied to.
pub const ENTRY_MODULE: &str = "developer_script";

const TIME_ZONE: &str = "+08:00";

/// Connection settings handed to the wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PythonSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub time_zone: String,
    /// File executed statements are appended to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collector: Option<String>,
}

impl From<&MysqlConfig> for PythonSettings {
    fn from(config: &MysqlConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            user: config.username.clone().unwrap_or_default(),
            password: config.password.clone().unwrap_or_default(),
            database: config.database.clone(),
            time_zone: TIME_ZONE.to_string(),
            collector: None,
        }
    }
}

/// One Python script ready to run.
#[derive(Debug)]
pub struct Package<'a> {
    script: &'a Script,
    requirements: &'a str,
    settings: PythonSettings,
    commit: bool,
}

impl<'a> Package<'a> {
    pub fn new(script: &'a Script, requirements: Option<&'a str>, settings: PythonSettings) -> Self {
        Self {
            script,
            requirements: requirements
                .filter(|r| !r.trim().is_empty())
                .unwrap_or(BASE_REQUIREMENTS),
            settings,
            commit: false,
        }
    }

    /// Append the statements the script executes to `path`.
    pub fn collector(mut self, path: Option<&Path>) -> Self {
        self.settings.collector = path.map(|p| p.display().to_string());
        self
    }

    /// Commit the script's changes instead of rolling them back.
    pub fn commit(mut self, commit: bool) -> Self {
        self.commit = commit;
        self
    }

    pub fn requirements(&self) -> &str {
        self.requirements
    }

    /// The generated wrapper.
    pub fn main_py(&self) -> String {
        let finish = if self.commit { "db.commit()" } else { "db.rollback()" };
        format!(
            r#"import json
import os

import mysql.connector

from {ENTRY_MODULE} import entry


class CollectingCursor:
    def __init__(self, cursor, path):
        self._cursor = cursor
        self._path = path

    def execute(self, operation, params=None, *args, **kwargs):
        result = self._cursor.execute(operation, params, *args, **kwargs)
        statement = getattr(self._cursor, "statement", None) or operation
        with open(self._path, "a") as f:
            f.write(statement.strip().rstrip(";") + ";\n")
        return result

    def __getattr__(self, name):
        return getattr(self._cursor, name)


class CollectingConnection:
    def __init__(self, db, path):
        self._db = db
        self._path = path

    def cursor(self, *args, **kwargs):
        return CollectingCursor(self._db.cursor(*args, **kwargs), self._path)

    def __getattr__(self, name):
        return getattr(self._db, name)


def main():
    here = os.path.dirname(os.path.abspath(__file__))
    with open(os.path.join(here, "settings.json")) as f:
        settings = json.load(f)
    db = mysql.connector.connect(
        host=settings["host"],
        port=settings["port"],
        user=settings["user"],
        password=settings["password"],
        database=settings["database"],
        time_zone=settings["time_zone"],
        autocommit=False,
    )
    collector = settings.get("collector")
    try:
        entry(CollectingConnection(db, collector) if collector else db)
        {finish}
    except Exception:
        db.rollback()
        raise
    finally:
        db.close()


if __name__ == "__main__":
    main()
"#
        )
    }

    /// Write the package into a fresh temporary directory.
    pub async fn make(&self) -> MigrateResult<TempDir> {
        let dir = tempfile::Builder::new()
            .prefix("strata-py-")
            .tempdir()
            .map_err(|e| MigrateError::io(std::env::temp_dir(), e))?;

        let settings = serde_json::to_string(&self.settings)
            .map_err(|e| MigrateError::python(&self.script.name, e.to_string()))?;
        let main = self.main_py();
        let files: [(&str, &[u8]); 4] = [
            ("main.py", main.as_bytes()),
            ("developer_script.py", self.script.raw()),
            ("requirements.txt", self.requirements.as_bytes()),
            ("settings.json", settings.as_bytes()),
        ];
        for (name, contents) in files {
            let path = dir.path().join(name);
            tokio::fs::write(&path, contents)
                .await
                .map_err(|e| MigrateError::io(&path, e))?;
        }
        Ok(dir)
    }

    /// Install the requirements and run the wrapper with `python`.
    ///
    /// The temporary package is removed afterwards.
    pub async fn run(&self, python: &Path) -> MigrateResult<()> {
        let dir = self.make().await?;
        debug!(script = %self.script.name, dir = %dir.path().display(), "Prepared python package");

        let pip = Command::new(python)
            .args(["-m", "pip", "install", "--quiet", "-r", "requirements.txt"])
            .current_dir(dir.path())
            .output()
            .await
            .map_err(|e| self.spawn_error(python, e))?;
        self.check("pip install", &pip)?;

        let run = Command::new(python)
            .arg("main.py")
            .current_dir(dir.path())
            .output()
            .await
            .map_err(|e| self.spawn_error(python, e))?;
        self.check("run", &run)?;

        info!(script = %self.script.name, commit = self.commit, "Ran python script");
        Ok(())
    }

    fn spawn_error(&self, python: &Path, e: std::io::Error) -> MigrateError {
        MigrateError::python(
            &self.script.name,
            format!("failed to start {}: {e}", python.display()),
        )
    }

    fn check(&self, step: &str, output: &Output) -> MigrateResult<()> {
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(MigrateError::python(
            &self.script.name,
            format!("{step} exited with {}: {}", output.status, stderr.trim()),
        ))
    }
}
