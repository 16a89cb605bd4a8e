//! `strata.toml` handling.
//!
//! Every section and field is optional. Command-line flags and the
//! `STRATA_DATABASE_URL` / `STRATA_SANDBOX_URL` variables override the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use strata_migrate::{LintConfig, MigratorConfig};
use strata_mysql::{MysqlConfig, RetryPolicy};

use crate::cli::{ConnectionArgs, MigrateArgs, ScriptArgs};
use crate::error::{CliError, CliResult};

/// Default config file name (lives in project root)
pub const CONFIG_FILE_NAME: &str = "strata.toml";

/// Default migrations directory (relative to the workdir)
pub const MIGRATIONS_DIR: &str = "migrations";

/// strata CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub migration: MigrationConfig,
    pub database: DatabaseConfig,
    pub sandbox: SandboxConfig,
    pub lint: LintConfig,
    pub python: PythonConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path`, or fall back to defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> CliResult<Self> {
        if path.is_file() {
            tracing::debug!(path = %path.display(), "Loading configuration");
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Engine settings for commands that only read scripts.
    pub fn offline(&self, scripts: &ScriptArgs) -> MigratorConfig {
        let migration = &self.migration;
        MigratorConfig::new()
            .workdir(scripts.workdir.clone().unwrap_or_else(|| migration.workdir.clone()))
            .migration_dir(
                scripts
                    .migration_dir
                    .clone()
                    .unwrap_or_else(|| migration.directory.clone()),
            )
            .modules(if scripts.modules.is_empty() {
                migration.modules.clone()
            } else {
                scripts.modules.clone()
            })
            .lint(self.lint.clone())
    }

    /// Engine settings for commands that connect.
    pub fn online(
        &self,
        scripts: &ScriptArgs,
        connection: &ConnectionArgs,
    ) -> CliResult<MigratorConfig> {
        let database = resolve_url(
            "database",
            connection.database_url.as_deref(),
            self.database.url.as_deref(),
        )?;
        let sandbox = resolve_url(
            "sandbox",
            connection.sandbox_url.as_deref(),
            self.sandbox.url.as_deref(),
        )?;

        Ok(self
            .offline(scripts)
            .database(database)
            .sandbox(sandbox)
            .debug_sql(connection.debug_sql || self.database.debug_sql)
            .sandbox_retry(
                RetryPolicy::new()
                    .interval(Duration::from_secs(self.sandbox.retry_interval_secs))
                    .timeout(Duration::from_secs(self.sandbox.retry_timeout_secs)),
            )
            .installed_by(self.migration.installed_by.clone().unwrap_or_else(current_user))
            .installed_on(self.migration.installed_on.clone().unwrap_or_else(current_host))
            .python(self.python.interpreter.clone()))
    }

    /// Engine settings for `strata migrate`.
    pub fn migrate(&self, args: &MigrateArgs) -> CliResult<MigratorConfig> {
        let skip = &self.migration;
        let config = self
            .online(&args.scripts, &args.connection)?
            .skip_lint(args.skip_lint || skip.skip_lint)
            .skip_sandbox(args.skip_sandbox || skip.skip_sandbox)
            .skip_pre_migrate(args.skip_pre_migrate || skip.skip_pre_migrate)
            .skip_migrate(args.skip_migrate || skip.skip_migrate);
        Ok(
            match args.sql_collector_dir.as_ref().or(skip.sql_collector_dir.as_ref()) {
                Some(dir) => config.sql_collector_dir(dir),
                None => config,
            },
        )
    }
}

/// `[migration]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Project root
    pub workdir: PathBuf,
    /// Migrations directory, relative to `workdir`
    pub directory: PathBuf,
    /// Module allow-list; empty means every module
    pub modules: Vec<String>,
    pub installed_by: Option<String>,
    pub installed_on: Option<String>,
    pub skip_lint: bool,
    pub skip_sandbox: bool,
    pub skip_pre_migrate: bool,
    pub skip_migrate: bool,
    /// Directory the installed SQL is collected in
    pub sql_collector_dir: Option<PathBuf>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("."),
            directory: PathBuf::from(MIGRATIONS_DIR),
            modules: Vec::new(),
            installed_by: None,
            installed_on: None,
            skip_lint: false,
            skip_sandbox: false,
            skip_pre_migrate: false,
            skip_migrate: false,
            sql_collector_dir: None,
        }
    }
}

/// `[database]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Live database URL
    pub url: Option<String>,
    /// Log every statement
    pub debug_sql: bool,
}

/// `[sandbox]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Sandbox URL; the database named here is dropped and recreated
    pub url: Option<String>,
    pub retry_interval_secs: u64,
    pub retry_timeout_secs: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            url: None,
            retry_interval_secs: 3,
            retry_timeout_secs: 150,
        }
    }
}

/// `[python]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PythonConfig {
    pub interpreter: PathBuf,
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            interpreter: PathBuf::from("python3"),
        }
    }
}

fn resolve_url(which: &str, flag: Option<&str>, file: Option<&str>) -> CliResult<MysqlConfig> {
    let url = flag.or(file).ok_or_else(|| {
        CliError::Config(format!(
            "no {which} URL: set [{which}] url in {CONFIG_FILE_NAME}, pass --{which}-url or set STRATA_{}_URL",
            which.to_uppercase()
        ))
    })?;
    MysqlConfig::from_url(url).map_err(|e| CliError::Config(format!("invalid {which} URL: {e}")))
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "strata".to_string())
}

fn current_host() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(
            r#"
            [migration]
            workdir = "/srv/app"
            directory = "db/migrations"
            modules = ["orders", "billing"]
            skip_pre_migrate = true
            sql_collector_dir = "collected"

            [database]
            url = "mysql://root:pw@db:3306/app"

            [sandbox]
            url = "mysql://root:pw@sandbox:3306/app_sandbox"
            retry_timeout_secs = 30

            [lint]
            rules = ["table-comment"]

            [python]
            interpreter = "/usr/bin/python3.11"
            "#,
        )
        .unwrap();

        assert_eq!(config.migration.directory, PathBuf::from("db/migrations"));
        assert_eq!(config.migration.modules, vec!["orders", "billing"]);
        assert_eq!(config.sandbox.retry_interval_secs, 3);
        assert_eq!(config.lint.rules, vec!["table-comment"]);
        assert_eq!(config.lint.max_varchar_length, 5000);

        let engine = config
            .migrate(&MigrateArgs::default())
            .expect("urls are configured");
        assert_eq!(engine.database.database, "app");
        assert_eq!(engine.sandbox.host, "sandbox");
        assert!(engine.skip_pre_migrate);
        assert_eq!(
            engine.sql_collector_root(),
            Some(PathBuf::from("/srv/app/collected"))
        );
        assert_eq!(engine.sandbox_retry.timeout, Duration::from_secs(30));
        assert_eq!(engine.python, PathBuf::from("/usr/bin/python3.11"));
    }

    #[test]
    fn test_flags_override_file() {
        let mut config = Config::default();
        config.database.url = Some("mysql://root@db/app".into());
        config.sandbox.url = Some("mysql://root@sandbox/app_sandbox".into());
        config.migration.modules = vec!["orders".into()];

        let scripts = ScriptArgs {
            workdir: Some(PathBuf::from("/tmp/project")),
            migration_dir: None,
            modules: vec!["billing".into()],
        };
        let connection = ConnectionArgs {
            database_url: Some("mysql://root@other/live".into()),
            sandbox_url: None,
            debug_sql: true,
        };
        let engine = config.online(&scripts, &connection).unwrap();

        assert_eq!(engine.workdir, PathBuf::from("/tmp/project"));
        assert_eq!(engine.migration_dir, PathBuf::from(MIGRATIONS_DIR));
        assert_eq!(engine.modules, vec!["billing"]);
        assert_eq!(engine.database.database, "live");
        assert_eq!(engine.sandbox.database, "app_sandbox");
        assert!(engine.debug_sql);
    }

    #[test]
    fn test_missing_url() {
        let err = Config::default()
            .online(&ScriptArgs::default(), &ConnectionArgs::default())
            .unwrap_err();
        assert!(err.to_string().contains("STRATA_DATABASE_URL"));
    }

    #[test]
    fn test_load_or_default() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Config::load_or_default(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(missing, Config::default());

        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[migration]\ndirectory = \"sql\"\n").unwrap();
        let loaded = Config::load_or_default(&path).unwrap();
        assert_eq!(loaded.migration.directory, PathBuf::from("sql"));

        std::fs::write(&path, "[migration\n").unwrap();
        assert!(matches!(
            Config::load_or_default(&path),
            Err(CliError::Config(_))
        ));
    }
}
