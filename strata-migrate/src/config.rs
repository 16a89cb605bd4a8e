//! Migrator configuration.

use std::path::PathBuf;
use std::time::Duration;

use strata_mysql::{MysqlConfig, RetryPolicy};

use crate::error::{MigrateError, MigrateResult};
use crate::lint::LintConfig;

/// Everything one migration run needs to know.
#[derive(Debug, Clone)]
pub struct MigratorConfig {
    /// Working directory; script paths are relative to it.
    pub workdir: PathBuf,
    /// Directory under `workdir` holding one subdirectory per module.
    pub migration_dir: PathBuf,
    /// Only these modules are loaded; empty means all.
    pub modules: Vec<String>,
    /// The live database.
    pub database: MysqlConfig,
    /// The throwaway sandbox database.
    pub sandbox: MysqlConfig,
    /// Log every statement at `info`.
    pub debug_sql: bool,
    pub skip_lint: bool,
    pub skip_sandbox: bool,
    pub skip_pre_migrate: bool,
    pub skip_migrate: bool,
    /// How long to wait for the sandbox server.
    pub sandbox_retry: RetryPolicy,
    /// Recorded in history as `installed_by`.
    pub installed_by: String,
    /// Recorded in history as `installed_on`.
    pub installed_on: String,
    /// Python interpreter for `.py` scripts.
    pub python: PathBuf,
    /// Where installed SQL is collected, relative to `workdir`; unset
    /// collects nothing.
    pub sql_collector_dir: Option<PathBuf>,
    pub lint: LintConfig,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("."),
            migration_dir: PathBuf::from("migrations"),
            modules: Vec::new(),
            database: MysqlConfig::default(),
            sandbox: MysqlConfig::new("strata_sandbox"),
            debug_sql: false,
            skip_lint: false,
            skip_sandbox: false,
            skip_pre_migrate: false,
            skip_migrate: false,
            sandbox_retry: RetryPolicy::new()
                .interval(Duration::from_secs(3))
                .timeout(Duration::from_secs(150)),
            installed_by: String::new(),
            installed_on: String::new(),
            python: PathBuf::from("python3"),
            sql_collector_dir: None,
            lint: LintConfig::default(),
        }
    }
}

impl MigratorConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the working directory.
    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = dir.into();
        self
    }

    /// Set the migrations directory, relative to the working directory.
    pub fn migration_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migration_dir = dir.into();
        self
    }

    /// Restrict the run to the named modules.
    pub fn modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules = modules.into_iter().map(Into::into).collect();
        self
    }

    pub fn database(mut self, database: MysqlConfig) -> Self {
        self.database = database;
        self
    }

    pub fn sandbox(mut self, sandbox: MysqlConfig) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn debug_sql(mut self, enabled: bool) -> Self {
        self.debug_sql = enabled;
        self
    }

    pub fn skip_lint(mut self, skip: bool) -> Self {
        self.skip_lint = skip;
        self
    }

    pub fn skip_sandbox(mut self, skip: bool) -> Self {
        self.skip_sandbox = skip;
        self
    }

    pub fn skip_pre_migrate(mut self, skip: bool) -> Self {
        self.skip_pre_migrate = skip;
        self
    }

    pub fn skip_migrate(mut self, skip: bool) -> Self {
        self.skip_migrate = skip;
        self
    }

    pub fn sandbox_retry(mut self, retry: RetryPolicy) -> Self {
        self.sandbox_retry = retry;
        self
    }

    pub fn installed_by(mut self, who: impl Into<String>) -> Self {
        self.installed_by = who.into();
        self
    }

    pub fn installed_on(mut self, host: impl Into<String>) -> Self {
        self.installed_on = host.into();
        self
    }

    pub fn python(mut self, interpreter: impl Into<PathBuf>) -> Self {
        self.python = interpreter.into();
        self
    }

    /// Collect installed SQL under `dir`.
    pub fn sql_collector_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sql_collector_dir = Some(dir.into());
        self
    }

    pub fn lint(mut self, lint: LintConfig) -> Self {
        self.lint = lint;
        self
    }

    /// Absolute-or-relative path of the migrations directory.
    pub fn migration_root(&self) -> PathBuf {
        self.workdir.join(&self.migration_dir)
    }

    /// Absolute-or-relative path of the collector directory, if set.
    pub fn sql_collector_root(&self) -> Option<PathBuf> {
        self.sql_collector_dir
            .as_ref()
            .map(|dir| self.workdir.join(dir))
    }

    /// Whether `module` passes the allow-list.
    pub fn includes_module(&self, module: &str) -> bool {
        self.modules.is_empty() || self.modules.iter().any(|m| m == module)
    }

    /// Check the configuration before anything connects.
    pub fn validate(&self) -> MigrateResult<()> {
        if self.database.database.is_empty() {
            return Err(MigrateError::config("no database name configured"));
        }
        if !self.skip_sandbox {
            if self.sandbox.database.is_empty() {
                return Err(MigrateError::config("no sandbox database name configured"));
            }
            if self.sandbox.same_target(&self.database) {
                return Err(MigrateError::config(format!(
                    "the sandbox {} is the live database; it would be dropped",
                    self.sandbox.masked_url()
                )));
            }
        }
        if !self.migration_root().is_dir() {
            return Err(MigrateError::config(format!(
                "migrations directory {} does not exist",
                self.migration_root().display()
            )));
        }
        Ok(())
    }
}
