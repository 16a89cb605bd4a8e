//! The registry of every module under the migrations directory, and the
//! lints that run across modules.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::OnceLock;

use strata_sql::{AlterSpec, Statement};
use tracing::debug;

use crate::config::MigratorConfig;
use crate::db::Executor;
use crate::error::{MigrateError, MigrateResult};
use crate::history::{self, HistoryRecord};
use crate::lint::{LintReport, LintRule};
use crate::module::Module;
use crate::script::Script;

/// All loaded modules, ordered by name.
#[derive(Debug, Default)]
pub struct Scripts {
    pub modules: Vec<Module>,
    pending_marked: bool,
    /// Unset until first asked; then the first destructive statement found.
    destructive: OnceLock<Option<String>>,
}

impl Scripts {
    /// Build a registry from modules already in memory.
    pub fn new(modules: Vec<Module>) -> Self {
        let mut modules = modules;
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        for module in &mut modules {
            module.sort();
        }
        Self {
            modules,
            ..Default::default()
        }
    }

    /// Load every module directory under the configured migrations root.
    pub async fn load(config: &MigratorConfig) -> MigrateResult<Self> {
        let root = config.migration_root();
        let mut entries = tokio::fs::read_dir(&root)
            .await
            .map_err(|e| MigrateError::io(&root, e))?;

        let mut modules = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| MigrateError::io(&root, e))?
        {
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !config.includes_module(&name) {
                debug!(module = %name, "Skipping module");
                continue;
            }
            let relative = config.migration_dir.join(&name);
            modules.push(Module::load(&config.workdir, Path::new(&relative)).await?);
        }

        for wanted in &config.modules {
            if !modules.iter().any(|m| &m.name == wanted) {
                return Err(MigrateError::config(format!(
                    "module {wanted} not found under {}",
                    root.display()
                )));
            }
        }

        Ok(Self::new(modules))
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Every script with its module, in execution order.
    pub fn sorted(&self) -> impl Iterator<Item = (&Module, &Script)> {
        self.modules
            .iter()
            .flat_map(|m| m.scripts.iter().map(move |s| (m, s)))
    }

    /// Scripts not yet installed, in execution order.
    pub fn pending(&self) -> impl Iterator<Item = (&Module, &Script)> {
        self.sorted().filter(|(_, s)| s.pending)
    }

    pub fn pending_count(&self) -> usize {
        self.pending().count()
    }

    /// Mark scripts as pending or installed from the history table.
    pub async fn mark_pending(&mut self, db: &mut dyn Executor) -> MigrateResult<()> {
        let records = if history::table_exists(db).await? {
            history::records(db).await?
        } else {
            Vec::new()
        };
        self.apply_history(records);
        Ok(())
    }

    /// Mark scripts against history records already loaded.
    pub fn apply_history(&mut self, records: Vec<HistoryRecord>) {
        let mut by_key: HashMap<(String, String), HistoryRecord> = records
            .into_iter()
            .map(|r| ((r.service_name.clone(), r.filename.clone()), r))
            .collect();

        for module in &mut self.modules {
            for script in &mut module.scripts {
                let record = by_key.remove(&(module.name.clone(), script.name.clone()));
                script.pending = record.is_none();
                script.record = record;
            }
        }
        self.pending_marked = true;
        self.destructive = OnceLock::new();
    }

    /// Treat every script as pending, for linting without a database.
    pub fn mark_all_pending(&mut self) {
        self.apply_history(Vec::new());
    }

    pub fn is_pending_marked(&self) -> bool {
        self.pending_marked
    }

    /// Run content rules over every pending, non-baseline SQL script.
    pub fn lint(&self, rules: &[Box<dyn LintRule>]) -> MigrateResult<LintReport> {
        if !self.pending_marked {
            return Err(MigrateError::config(
                "pending scripts must be marked before linting",
            ));
        }

        let mut report = LintReport::default();
        for (module, script) in self.pending() {
            if script.is_baseline() || !script.is_sql() {
                continue;
            }
            for node in script.nodes() {
                report.check(rules, &module.name, &script.name, node);
            }
        }
        Ok(report)
    }

    /// Every ALTER TABLE must target a table created in the same module.
    pub fn alter_permission_lint(&self) -> MigrateResult<()> {
        let mut problems = Vec::new();
        for module in &self.modules {
            let created = module.created_tables();
            for script in &module.scripts {
                for node in script.ddl_nodes() {
                    if let Statement::AlterTable(alter) = &node.statement {
                        let table = alter.name.name.as_str();
                        if !created.contains(table) {
                            problems.push(format!(
                                "module {} script {} alters table {table}, which the module does not create: {}",
                                module.name, script.name, node.text
                            ));
                        }
                    }
                }
            }
        }
        join_problems(problems).map_err(MigrateError::AlterPermission)
    }

    /// No two modules may contain a script with the same file name.
    pub fn same_name_lint(&self) -> MigrateResult<()> {
        let mut owners: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (module, script) in self.sorted() {
            owners
                .entry(script.name.as_str())
                .or_default()
                .push(module.name.as_str());
        }

        let problems = owners
            .into_iter()
            .filter(|(_, modules)| modules.len() > 1)
            .map(|(file, modules)| {
                format!("{file} appears in modules {}", modules.join(", "))
            })
            .collect();
        join_problems(problems).map_err(MigrateError::SameName)
    }

    /// Installed scripts must form an unchanged prefix of each module.
    pub fn installed_changes_lint(&self) -> MigrateResult<()> {
        if !self.pending_marked {
            return Err(MigrateError::config(
                "pending scripts must be marked before checking installed changes",
            ));
        }

        let mut problems = Vec::new();
        for module in &self.modules {
            let mut first_pending: Option<&str> = None;
            for script in &module.scripts {
                if script.pending {
                    first_pending.get_or_insert(script.name.as_str());
                    continue;
                }
                if let Some(pending) = first_pending {
                    problems.push(format!(
                        "module {}: installed script {} sorts after pending script {pending}",
                        module.name, script.name
                    ));
                }
                if let Some(record) = &script.record {
                    if record.checksum != script.checksum() {
                        problems.push(format!(
                            "module {}: installed script {} was modified (checksum {} is now {})",
                            module.name,
                            script.name,
                            record.checksum,
                            script.checksum()
                        ));
                    }
                }
            }
        }
        join_problems(problems).map_err(MigrateError::InstalledChanges)
    }

    /// The first pending statement that loses data, if any.
    ///
    /// Computed once; the scripts do not change after loading.
    pub fn has_destructive_operation_in_pending(&self) -> Option<&str> {
        self.destructive
            .get_or_init(|| {
                self.pending()
                    .flat_map(|(_, s)| s.nodes())
                    .find(|node| is_destructive(&node.statement))
                    .map(|node| node.text.clone())
            })
            .as_deref()
    }

    /// Modules whose baseline scripts are all still pending.
    pub fn fresh_baseline_modules(&self) -> Vec<&Module> {
        self.modules
            .iter()
            .filter(|m| m.has_baseline())
            .filter(|m| {
                m.scripts
                    .iter()
                    .filter(|s| s.is_baseline())
                    .all(|s| s.pending)
            })
            .collect()
    }

    pub fn get_script(&self, module: &str, filename: &str) -> Option<&Script> {
        self.module(module)?.get_script(filename)
    }

    pub(crate) fn script_mut(&mut self, module: &str, filename: &str) -> Option<&mut Script> {
        self.modules
            .iter_mut()
            .find(|m| m.name == module)?
            .scripts
            .iter_mut()
            .find(|s| s.name == filename)
    }
}

/// Statements that lose data.
pub fn is_destructive(statement: &Statement) -> bool {
    match statement {
        Statement::DropDatabase { .. } | Statement::DropTable { .. } | Statement::Truncate(_) => {
            true
        }
        Statement::AlterTable(alter) => alter.specs.iter().any(AlterSpec::is_destructive),
        _ => false,
    }
}

fn join_problems(problems: Vec<String>) -> Result<(), String> {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("\n"))
    }
}
