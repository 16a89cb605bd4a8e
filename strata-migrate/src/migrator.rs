//! The migration state machine.
//!
//! A run captures the live schema, decides how the database is being
//! installed, applies due patches, lints the scripts, dry-runs them in the
//! sandbox, applies them to the live database and rolls that back
//! (pre-migrate), and finally applies them for real, one transaction per
//! script.

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::collector::SqlCollector;
use crate::config::MigratorConfig;
use crate::db::{Connector, Executor, MysqlConnector};
use crate::error::{MigrateError, MigrateResult};
use crate::history::{self, HISTORY_TABLE, HistoryRecord};
use crate::lint::{LintRule, default_rules};
use crate::module::Module;
use crate::pygrator::{Package, PythonSettings};
use crate::reverser::{reverse_create_table_stmts, reverse_ddl_with_snapshot};
use crate::sandbox::Sandbox;
use crate::script::Script;
use crate::scripts::Scripts;
use crate::snapshot::{Snapshot, schema_equal_with};

/// How the live database is being installed, decided once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallingType {
    /// No application tables yet.
    FirstTimeInstall,
    /// The history table has rows.
    NormalUpdate,
    /// Tables exist but nothing is recorded; baselines must match.
    FirstTimeUpdate,
}

impl InstallingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstTimeInstall => "first_time_install",
            Self::NormalUpdate => "normal_update",
            Self::FirstTimeUpdate => "first_time_update",
        }
    }
}

impl fmt::Display for InstallingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A phase that configuration or safety checks can skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lint,
    Sandbox,
    PreMigrate,
    Migrate,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lint => "lint",
            Self::Sandbox => "sandbox",
            Self::PreMigrate => "pre-migrate",
            Self::Migrate => "migrate",
        })
    }
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub installing_type: InstallingType,
    /// `(module, filename)` of every script installed, in order.
    pub applied: Vec<(String, String)>,
    /// `(module, filename)` of baseline scripts recorded without running.
    pub baselined: Vec<(String, String)>,
    /// `(module, patch filename)` of every patch applied.
    pub patched: Vec<(String, String)>,
    pub skipped: Vec<Phase>,
    pub elapsed: Duration,
}

impl MigrationReport {
    fn new(installing_type: InstallingType) -> Self {
        Self {
            installing_type,
            applied: Vec::new(),
            baselined: Vec::new(),
            patched: Vec::new(),
            skipped: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.applied.is_empty() || !self.baselined.is_empty() || !self.patched.is_empty()
    }

    /// One-line summary.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.applied.is_empty() {
            parts.push(format!("{} applied", self.applied.len()));
        }
        if !self.baselined.is_empty() {
            parts.push(format!("{} baselined", self.baselined.len()));
        }
        if !self.patched.is_empty() {
            parts.push(format!("{} patched", self.patched.len()));
        }
        if !self.skipped.is_empty() {
            let skipped = self
                .skipped
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            parts.push(format!("skipped {skipped}"));
        }
        if parts.is_empty() {
            format!("{}: no migrations applied", self.installing_type)
        } else {
            format!(
                "{}: {} in {}ms",
                self.installing_type,
                parts.join(", "),
                self.elapsed.as_millis()
            )
        }
    }
}

/// Install state of one script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStatus {
    Installed,
    Pending,
    /// Installed, but the file no longer matches the recorded checksum.
    ChecksumChanged,
}

impl fmt::Display for ScriptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Installed => "installed",
            Self::Pending => "pending",
            Self::ChecksumChanged => "checksum changed",
        })
    }
}

/// One line of [`Migrator::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptState {
    pub module: String,
    pub filename: String,
    pub baseline: bool,
    pub status: ScriptStatus,
}

/// Drives one migration run.
pub struct Migrator {
    config: MigratorConfig,
    scripts: Scripts,
    rules: Vec<Box<dyn LintRule>>,
    connector: Box<dyn Connector>,
    db: Option<Box<dyn Executor>>,
    sandbox: Option<Sandbox>,
    snapshot: Snapshot,
    installing_type: Option<InstallingType>,
    /// Reversing SQL collected by pre-migrate, replayed last-first.
    reversing: Vec<String>,
    collector: Option<SqlCollector>,
}

impl fmt::Debug for Migrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migrator")
            .field("modules", &self.scripts.modules.len())
            .field("rules", &self.rules.len())
            .field("connected", &self.db.is_some())
            .field("installing_type", &self.installing_type)
            .finish()
    }
}

impl Migrator {
    /// Create a migrator over scripts already loaded.
    pub fn new(
        config: MigratorConfig,
        scripts: Scripts,
        rules: Vec<Box<dyn LintRule>>,
        connector: Box<dyn Connector>,
    ) -> Self {
        let collector = config.sql_collector_root().map(SqlCollector::new);
        Self {
            config,
            scripts,
            rules,
            connector,
            db: None,
            sandbox: None,
            snapshot: Snapshot::default(),
            installing_type: None,
            reversing: Vec::new(),
            collector,
        }
    }

    /// Validate `config` and load its scripts.
    pub async fn load(
        config: MigratorConfig,
        rules: Vec<Box<dyn LintRule>>,
        connector: Box<dyn Connector>,
    ) -> MigrateResult<Self> {
        config.validate()?;
        let scripts = Scripts::load(&config).await?;
        Ok(Self::new(config, scripts, rules, connector))
    }

    /// Load with the configured lint rules and MySQL connections.
    pub async fn from_config(config: MigratorConfig) -> MigrateResult<Self> {
        let rules = default_rules(&config.lint);
        let connector = MysqlConnector::new(config.database.clone(), config.sandbox.clone())
            .retry(config.sandbox_retry)
            .debug_sql(config.debug_sql);
        Self::load(config, rules, Box::new(connector)).await
    }

    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    pub fn scripts(&self) -> &Scripts {
        &self.scripts
    }

    /// Decided by [`Migrator::run`].
    pub fn installing_type(&self) -> Option<InstallingType> {
        self.installing_type
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn sandbox(&self) -> Option<&Sandbox> {
        self.sandbox.as_ref()
    }

    /// Where installed SQL is collected, if configured.
    pub fn collector(&self) -> Option<&SqlCollector> {
        self.collector.as_ref()
    }

    /// Run every phase against the live database.
    pub async fn run(&mut self) -> MigrateResult<MigrationReport> {
        let started = Instant::now();
        self.connect().await?;

        self.snapshot = Snapshot::from(live(&mut self.db)?, &[HISTORY_TABLE]).await?;
        let installing_type = self.detect_installing_type().await?;
        self.installing_type = Some(installing_type);
        info!(
            installing_type = %installing_type,
            tables = self.snapshot.len(),
            modules = self.scripts.modules.len(),
            "Starting migration"
        );

        let mut report = MigrationReport::new(installing_type);
        match installing_type {
            InstallingType::FirstTimeInstall => self.first_time_install(&mut report).await?,
            InstallingType::FirstTimeUpdate => {
                self.first_time_update(&mut report).await?;
                self.normal_update(&mut report).await?;
            }
            InstallingType::NormalUpdate => self.normal_update(&mut report).await?,
        }

        report.elapsed = started.elapsed();
        info!(summary = %report.summary(), "Migration finished");
        Ok(report)
    }

    /// Per-script install state, without changing the database.
    pub async fn status(&mut self) -> MigrateResult<Vec<ScriptState>> {
        self.connect().await?;
        self.scripts.mark_pending(live(&mut self.db)?).await?;
        Ok(self
            .scripts
            .sorted()
            .map(|(module, script)| ScriptState {
                module: module.name.clone(),
                filename: script.name.clone(),
                baseline: script.is_baseline(),
                status: match &script.record {
                    None => ScriptStatus::Pending,
                    Some(record) if record.checksum != script.checksum() => {
                        ScriptStatus::ChecksumChanged
                    }
                    Some(_) => ScriptStatus::Installed,
                },
            })
            .collect())
    }

    /// The history record of one installed script.
    pub async fn recorded_reversing(
        &mut self,
        module: &str,
        filename: &str,
    ) -> MigrateResult<Option<HistoryRecord>> {
        self.connect().await?;
        let db = live(&mut self.db)?;
        if !history::table_exists(db).await? {
            return Ok(None);
        }
        history::find(db, module, filename).await
    }

    async fn connect(&mut self) -> MigrateResult<()> {
        if self.db.is_none() {
            self.db = Some(self.connector.database().await?);
        }
        Ok(())
    }

    async fn detect_installing_type(&mut self) -> MigrateResult<InstallingType> {
        if !self.snapshot.has_any_table() {
            return Ok(InstallingType::FirstTimeInstall);
        }
        let db = live(&mut self.db)?;
        if history::table_exists(db).await? && history::count(db).await? > 0 {
            Ok(InstallingType::NormalUpdate)
        } else {
            Ok(InstallingType::FirstTimeUpdate)
        }
    }

    async fn first_time_install(&mut self, report: &mut MigrationReport) -> MigrateResult<()> {
        let db = live(&mut self.db)?;
        history::create_table(db).await?;
        self.scripts.mark_pending(db).await?;

        self.lint(report, false)?;
        self.migrate_sandbox(report).await?;
        self.pre_migrate(report).await?;
        self.migrate(report).await
    }

    async fn normal_update(&mut self, report: &mut MigrationReport) -> MigrateResult<()> {
        self.scripts.mark_pending(live(&mut self.db)?).await?;
        self.patch(report).await?;

        self.lint(report, true)?;
        self.migrate_sandbox(report).await?;
        self.pre_migrate(report).await?;
        self.migrate(report).await
    }

    /// Check every baseline against the live schema, then record the
    /// baselines as installed.
    async fn first_time_update(&mut self, report: &mut MigrationReport) -> MigrateResult<()> {
        let db = live(&mut self.db)?;
        let baselines: Vec<&Module> = self
            .scripts
            .modules
            .iter()
            .filter(|m| m.has_baseline())
            .collect();
        if baselines.is_empty() {
            info!("No baseline scripts to compare");
        }

        for module in &baselines {
            info!(module = %module.name, "Comparing baseline with live schema");
            let equality = schema_equal_with(&module.baseline_schema(), db).await?;
            if !equality.is_equal() {
                return Err(MigrateError::BaselineMismatch {
                    module: module.name.clone(),
                    reason: equality.reason(),
                });
            }
        }

        history::create_table(db).await?;
        for module in &baselines {
            for script in module.scripts.iter().filter(|s| s.is_baseline()) {
                let reversing = reverse_create_table_stmts(script.ddl_nodes());
                let record = HistoryRecord::for_script(
                    &module.name,
                    script,
                    &reversing,
                    &self.config.installed_by,
                    &self.config.installed_on,
                );
                history::insert(db, &record).await?;
                info!(module = %module.name, script = %script.name, "Recorded baseline");
                report
                    .baselined
                    .push((module.name.clone(), script.name.clone()));
            }
        }
        Ok(())
    }

    /// Apply every due patch to the live database and correct the
    /// checksum of the script it repairs.
    ///
    /// A patch is due when its target is installed and the target file no
    /// longer matches the recorded checksum. Each patch runs in its own
    /// transaction with the checksum update; DDL that committed is
    /// reversed on failure. The snapshot is taken again afterwards so the
    /// sandbox starts from the patched schema.
    async fn patch(&mut self, report: &mut MigrationReport) -> MigrateResult<()> {
        let db = live(&mut self.db)?;
        let mut corrected = Vec::new();
        for module in &self.scripts.modules {
            for (patch, checksum) in module.due_patches() {
                let Some(target) = patch.patch_target() else {
                    continue;
                };
                info!(module = %module.name, patch = %patch.name, script = target, "Applying patch");
                apply_patch(db, module, patch, target, &checksum).await?;
                if let Some(collector) = &self.collector {
                    if let Err(e) = collector.collect(&module.name, patch).await {
                        warn!(patch = %patch.name, error = %e, "Failed to collect patch SQL");
                    }
                }
                report.patched.push((module.name.clone(), patch.name.clone()));
                corrected.push((module.name.clone(), target.to_string(), checksum));
            }
        }
        if corrected.is_empty() {
            return Ok(());
        }

        for (module, filename, checksum) in corrected {
            if let Some(record) = self
                .scripts
                .script_mut(&module, &filename)
                .and_then(|script| script.record.as_mut())
            {
                record.checksum = checksum;
            }
        }
        self.snapshot = Snapshot::from(db, &[HISTORY_TABLE]).await?;
        info!(patches = report.patched.len(), "Patches applied");
        Ok(())
    }

    fn lint(&self, report: &mut MigrationReport, installed: bool) -> MigrateResult<()> {
        if self.config.skip_lint {
            warn!("Skipping lint");
            report.skipped.push(Phase::Lint);
        } else {
            let lint = self.scripts.lint(&self.rules)?;
            if !lint.is_empty() {
                return Err(MigrateError::Lint(lint));
            }
        }

        self.scripts.same_name_lint()?;
        self.scripts.alter_permission_lint()?;
        if installed {
            self.scripts.installed_changes_lint()?;
        }
        info!(pending = self.scripts.pending_count(), "Lint passed");
        Ok(())
    }

    /// Recreate the live schema in the sandbox and apply every pending
    /// script there, stopping at the first failure.
    async fn migrate_sandbox(&mut self, report: &mut MigrationReport) -> MigrateResult<()> {
        if self.config.skip_sandbox {
            warn!("Skipping sandbox");
            report.skipped.push(Phase::Sandbox);
            return Ok(());
        }
        if self.sandbox.is_none() {
            let exec = self
                .connector
                .sandbox()
                .await
                .map_err(|e| MigrateError::sandbox(format!("cannot connect: {e}")))?;
            self.sandbox = Some(Sandbox::new(exec, self.config.sandbox.database.clone()));
        }
        let Some(sandbox) = self.sandbox.as_mut() else {
            return Err(MigrateError::sandbox("sandbox is not connected"));
        };

        sandbox.reset().await?;
        sandbox.recover(&self.snapshot).await?;
        for (module, script) in self.scripts.pending() {
            if script.is_sql() {
                sandbox.apply(module, script).await?;
                continue;
            }
            let settings = PythonSettings::from(&self.config.sandbox);
            if let Err(e) = run_python(module, script, settings, true, &self.config, None).await {
                sandbox.fail();
                return Err(MigrateError::sandbox(e.to_string()));
            }
        }
        sandbox.finish()?;
        info!(scripts = sandbox.applied().len(), "Sandbox migration passed");
        Ok(())
    }

    /// Apply every pending script to the live database and roll it back.
    ///
    /// DML is discarded by the rollback; DDL is undone by replaying the
    /// reversing SQL last-first, whether or not the pass succeeded.
    async fn pre_migrate(&mut self, report: &mut MigrationReport) -> MigrateResult<()> {
        if self.config.skip_pre_migrate {
            warn!("Skipping pre-migrate");
            report.skipped.push(Phase::PreMigrate);
            return Ok(());
        }
        if let Some(statement) = self.scripts.has_destructive_operation_in_pending() {
            warn!(%statement, "Pending scripts contain a destructive statement, skipping pre-migrate");
            report.skipped.push(Phase::PreMigrate);
            return Ok(());
        }

        let db = live(&mut self.db)?;
        self.reversing.clear();
        let mut outcome = Ok(());
        for (module, script) in self.scripts.pending() {
            outcome = if script.is_sql() {
                dry_run(db, module, script, &mut self.reversing).await
            } else {
                let settings = PythonSettings::from(&self.config.database);
                run_python(module, script, settings, false, &self.config, None).await
            };
            if outcome.is_err() {
                break;
            }
        }

        replay(db, &self.reversing).await;
        self.reversing.clear();
        outcome?;
        info!("Pre-migrate passed");
        Ok(())
    }

    /// Install every pending script, committing each one with its history
    /// record.
    async fn migrate(&mut self, report: &mut MigrationReport) -> MigrateResult<()> {
        if self.config.skip_migrate {
            warn!("Skipping migrate");
            report.skipped.push(Phase::Migrate);
            return Ok(());
        }

        let db = live(&mut self.db)?;
        let collector = self.collector.as_ref();
        let mut outcome = Ok(());
        for (module, script) in self.scripts.pending() {
            outcome = install(db, module, script, &self.config, collector).await;
            if outcome.is_err() {
                break;
            }
            info!(module = %module.name, script = %script.name, "Installed script");
            if let Some(collector) = collector.filter(|_| script.is_sql()) {
                if let Err(e) = collector.collect(&module.name, script).await {
                    warn!(script = %script.name, error = %e, "Failed to collect installed SQL");
                }
            }
            report.applied.push((module.name.clone(), script.name.clone()));
        }

        for (module, filename) in &report.applied {
            if let Some(script) = self.scripts.script_mut(module, filename) {
                script.pending = false;
            }
        }
        outcome
    }
}

fn live(db: &mut Option<Box<dyn Executor>>) -> MigrateResult<&mut dyn Executor> {
    match db.as_deref_mut() {
        Some(db) => Ok(db),
        None => Err(MigrateError::config("not connected to the database")),
    }
}

fn execution_error(module: &Module, script: &Script, source: strata_mysql::MysqlError) -> MigrateError {
    MigrateError::Execution {
        module: module.name.clone(),
        filename: script.name.clone(),
        source,
    }
}

fn history_error(module: &Module, script: &Script, e: MigrateError) -> MigrateError {
    MigrateError::History {
        module: module.name.clone(),
        filename: script.name.clone(),
        message: e.to_string(),
    }
}

/// Execute every statement of `script`, collecting reversing SQL.
///
/// A statement's reverse is computed before it runs and kept only once it
/// succeeded.
async fn execute_script(
    db: &mut dyn Executor,
    module: &Module,
    script: &Script,
    reversing: &mut Vec<String>,
) -> MigrateResult<()> {
    for node in script.nodes() {
        let reverse = if node.statement.is_ddl() {
            reverse_ddl_with_snapshot(db, node).await?
        } else {
            None
        };
        db.execute(&node.text)
            .await
            .map_err(|e| execution_error(module, script, e))?;
        if let Some(reverse) = reverse {
            reversing.push(reverse);
        }
    }
    Ok(())
}

async fn dry_run(
    db: &mut dyn Executor,
    module: &Module,
    script: &Script,
    reversing: &mut Vec<String>,
) -> MigrateResult<()> {
    db.begin()
        .await
        .map_err(|e| execution_error(module, script, e))?;
    let outcome = execute_script(db, module, script, reversing).await;
    if let Err(e) = db.rollback().await {
        warn!(script = %script.name, error = %e, "Rollback failed");
    }
    outcome
}

/// Install one script and record it in history.
async fn install(
    db: &mut dyn Executor,
    module: &Module,
    script: &Script,
    config: &MigratorConfig,
    collector: Option<&SqlCollector>,
) -> MigrateResult<()> {
    if script.is_sql() {
        return install_sql(db, module, script, config).await;
    }

    let settings = PythonSettings::from(&config.database);
    let collector = collector.map(SqlCollector::path);
    run_python(module, script, settings, true, config, collector).await?;
    let record = HistoryRecord::for_script(
        &module.name,
        script,
        &[],
        &config.installed_by,
        &config.installed_on,
    );
    history::insert(db, &record)
        .await
        .map_err(|e| history_error(module, script, e))
}

/// Install one SQL script in its own transaction.
///
/// The history record is written inside the same transaction. On failure
/// the transaction is rolled back and the script's reversing SQL is
/// replayed to undo DDL that committed implicitly.
async fn install_sql(
    db: &mut dyn Executor,
    module: &Module,
    script: &Script,
    config: &MigratorConfig,
) -> MigrateResult<()> {
    let mut reversing = Vec::new();
    db.begin()
        .await
        .map_err(|e| execution_error(module, script, e))?;

    if let Err(e) = execute_script(db, module, script, &mut reversing).await {
        abort(db, &reversing).await;
        return Err(e);
    }

    let record = HistoryRecord::for_script(
        &module.name,
        script,
        &reversing,
        &config.installed_by,
        &config.installed_on,
    );
    if let Err(e) = history::insert(db, &record).await {
        abort(db, &reversing).await;
        return Err(history_error(module, script, e));
    }

    db.commit()
        .await
        .map_err(|e| execution_error(module, script, e))
}

/// Execute `patch` and point the history record of `target` at
/// `checksum`, both in one transaction.
async fn apply_patch(
    db: &mut dyn Executor,
    module: &Module,
    patch: &Script,
    target: &str,
    checksum: &str,
) -> MigrateResult<()> {
    let mut reversing = Vec::new();
    db.begin()
        .await
        .map_err(|e| execution_error(module, patch, e))?;

    if let Err(e) = execute_script(db, module, patch, &mut reversing).await {
        abort(db, &reversing).await;
        return Err(e);
    }
    if let Err(e) = history::update_checksum(db, &module.name, target, checksum).await {
        abort(db, &reversing).await;
        return Err(history_error(module, patch, e));
    }

    db.commit()
        .await
        .map_err(|e| execution_error(module, patch, e))
}

async fn abort(db: &mut dyn Executor, reversing: &[String]) {
    if let Err(e) = db.rollback().await {
        warn!(error = %e, "Rollback failed");
    }
    replay(db, reversing).await;
}

/// Execute reversing SQL last-first. Failures are logged, not returned.
async fn replay(db: &mut dyn Executor, reversing: &[String]) {
    for sql in reversing.iter().rev() {
        match db.execute(sql).await {
            Ok(()) => info!(sql = %sql.trim_end(), "Replayed reversing SQL"),
            Err(e) => error!(sql = %sql.trim_end(), error = %e, "Failed to replay reversing SQL"),
        }
    }
}

async fn run_python(
    module: &Module,
    script: &Script,
    settings: PythonSettings,
    commit: bool,
    config: &MigratorConfig,
    collector: Option<&Path>,
) -> MigrateResult<()> {
    Package::new(script, module.python_requirements.as_deref(), settings)
        .commit(commit)
        .collector(collector)
        .run(&config.python)
        .await
}
