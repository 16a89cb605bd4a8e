//! A module: one directory of migration scripts.

use std::collections::BTreeSet;
use std::path::Path;

use strata_sql::{Schema, Statement};
use tracing::debug;

use crate::error::{MigrateError, MigrateResult};
use crate::script::{PATCH_PREFIX, Script, ScriptType};

/// File holding a module's Python dependencies.
pub const REQUIREMENTS_FILE: &str = "requirements.txt";

/// The scripts of one module (a service), in execution order once sorted.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub name: String,
    pub scripts: Vec<Script>,
    /// `patch-*.sql` files; never installed on their own.
    pub patches: Vec<Script>,
    /// Contents of `requirements.txt`, if the module has one.
    pub python_requirements: Option<String>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a script.
    pub fn script(mut self, script: Script) -> Self {
        self.scripts.push(script);
        self
    }

    /// Add a patch.
    pub fn patch(mut self, patch: Script) -> Self {
        self.patches.push(patch);
        self
    }

    /// Load every `.sql` and `.py` file of `workdir/relative_dir`.
    ///
    /// Files named `patch-*` are kept apart as patches and must be SQL.
    pub async fn load(workdir: &Path, relative_dir: &Path) -> MigrateResult<Self> {
        let dir = workdir.join(relative_dir);
        let name = relative_dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MigrateError::config(format!("invalid module path {}", dir.display())))?;
        let mut module = Module::new(name);

        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| MigrateError::io(&dir, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| MigrateError::io(&dir, e))?
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };

            if file_name == REQUIREMENTS_FILE {
                let text = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| MigrateError::io(&path, e))?;
                module.python_requirements = Some(text);
            } else if file_name.starts_with(PATCH_PREFIX) {
                if ScriptType::from_path(&path) != Some(ScriptType::Sql) {
                    return Err(MigrateError::config(format!(
                        "module {}: patch {file_name} is not a .sql file",
                        module.name
                    )));
                }
                module
                    .patches
                    .push(Script::load(workdir, relative_dir.join(file_name)).await?);
            } else if ScriptType::from_path(&path).is_some() {
                module
                    .scripts
                    .push(Script::load(workdir, relative_dir.join(file_name)).await?);
            } else {
                debug!(module = %module.name, file = %file_name, "Ignoring file");
            }
        }

        module.sort();
        Ok(module)
    }

    /// Baseline scripts first, then by file name without extension.
    pub fn sort(&mut self) {
        self.scripts.sort_by(|a, b| {
            b.is_baseline()
                .cmp(&a.is_baseline())
                .then_with(|| a.stem().cmp(b.stem()))
        });
    }

    /// Schema folded from the DDL of every script.
    pub fn schema(&self) -> Schema {
        fold(self.scripts.iter())
    }

    /// Schema folded from the DDL of baseline scripts only.
    pub fn baseline_schema(&self) -> Schema {
        fold(self.scripts.iter().filter(|s| s.is_baseline()))
    }

    pub fn has_baseline(&self) -> bool {
        self.scripts.iter().any(Script::is_baseline)
    }

    /// Tables created by any script of this module.
    pub fn created_tables(&self) -> BTreeSet<String> {
        self.scripts
            .iter()
            .flat_map(|s| s.ddl_nodes())
            .filter_map(|node| match &node.statement {
                Statement::CreateTable(create) => Some(create.name.name.to_string()),
                _ => None,
            })
            .collect()
    }

    /// Names of the tables in [`Module::schema`].
    pub fn table_names(&self) -> Vec<String> {
        self.schema()
            .table_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect()
    }

    pub fn get_script(&self, filename: &str) -> Option<&Script> {
        self.scripts.iter().find(|s| s.name == filename)
    }

    /// Patches whose target is installed but no longer matches its
    /// recorded checksum, with the target's current checksum.
    pub fn due_patches(&self) -> Vec<(&Script, String)> {
        self.patches
            .iter()
            .filter_map(|patch| {
                let target = self.get_script(patch.patch_target()?)?;
                let record = target.record.as_ref()?;
                (record.checksum != target.checksum())
                    .then(|| (patch, target.checksum().to_string()))
            })
            .collect()
    }
}

fn fold<'a>(scripts: impl Iterator<Item = &'a Script>) -> Schema {
    let mut schema = Schema::new();
    for script in scripts {
        for node in script.ddl_nodes() {
            schema.enter(&node.statement);
        }
    }
    schema
}
