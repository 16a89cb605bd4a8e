//! Point-in-time capture of the live schema.
//!
//! A [`Snapshot`] holds the parsed `SHOW CREATE TABLE` of every table so it
//! can be replayed into the sandbox and consulted when building reversing
//! SQL.

use std::collections::HashSet;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex_lite::Regex;
use strata_sql::{CreateTable, Equality, Schema, Statement, parse_create_table, quote_ident};
use tracing::{debug, warn};

use crate::db::Executor;
use crate::error::{MigrateError, MigrateResult};

static DEFAULT_CHARSET: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*DEFAULT\s+(CHARSET|CHARACTER\s+SET)\s*=?\s*\w+").ok()
});

/// Remove `DEFAULT CHARSET=x` clauses from CREATE TABLE text.
pub fn strip_default_charset(sql: &str) -> String {
    match DEFAULT_CHARSET.as_ref() {
        Some(re) => re.replace_all(sql, "").into_owned(),
        None => sql.to_string(),
    }
}

/// The parsed `SHOW CREATE TABLE` of `table`, or `None` if it does not exist.
pub async fn show_create_table(
    db: &mut dyn Executor,
    table: &str,
) -> MigrateResult<Option<CreateTable>> {
    let sql = format!("SHOW CREATE TABLE {}", quote_ident(table));
    let rows = match db.query(&sql).await {
        Ok(rows) => rows,
        Err(e) if is_missing_table(&e.to_string()) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let Some(text) = rows.first().and_then(|row| row.get(1)) else {
        return Ok(None);
    };
    parse_create_table(&strip_default_charset(text))
        .map(Some)
        .map_err(|e| MigrateError::snapshot(table, e.to_string()))
}

fn is_missing_table(message: &str) -> bool {
    message.contains("1146") || message.contains("doesn't exist")
}

/// Compare `schema` with the live definitions of the same tables.
pub async fn schema_equal_with(schema: &Schema, db: &mut dyn Executor) -> MigrateResult<Equality> {
    let mut live = Schema::new();
    for name in schema.table_names() {
        if let Some(create) = show_create_table(db, &name).await? {
            live.enter(&Statement::CreateTable(create));
        }
    }
    Ok(schema.equal(&live))
}

/// Every table of a database, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub tables: IndexMap<String, CreateTable>,
}

impl Snapshot {
    /// Capture every table of `db` except those named in `ignore`.
    pub async fn from(db: &mut dyn Executor, ignore: &[&str]) -> MigrateResult<Self> {
        let mut snapshot = Self::default();
        for row in db.query("SHOW TABLES").await? {
            let Some(name) = row.get(0) else {
                continue;
            };
            if ignore.contains(&name) {
                continue;
            }
            let create = show_create_table(db, name)
                .await?
                .ok_or_else(|| MigrateError::snapshot(name, "table disappeared during snapshot"))?;
            snapshot.tables.insert(name.to_string(), create);
        }
        debug!(tables = snapshot.tables.len(), "Captured schema snapshot");
        Ok(snapshot)
    }

    pub fn has_any_table(&self) -> bool {
        !self.tables.is_empty()
    }

    pub fn table(&self, name: &str) -> Option<&CreateTable> {
        self.tables.get(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Table names ordered so referenced tables come before referencing ones.
    ///
    /// Foreign-key cycles are logged and broken at the table that closes
    /// the cycle.
    pub fn install_order(&self) -> Vec<&str> {
        let mut installed = HashSet::new();
        let mut visiting = HashSet::new();
        let mut order = Vec::with_capacity(self.tables.len());
        for name in self.tables.keys() {
            self.visit(name, &mut installed, &mut visiting, &mut order);
        }
        order
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        installed: &mut HashSet<&'a str>,
        visiting: &mut HashSet<&'a str>,
        order: &mut Vec<&'a str>,
    ) {
        if installed.contains(name) {
            return;
        }
        let Some((key, create)) = self.tables.get_key_value(name) else {
            return;
        };
        if !visiting.insert(key.as_str()) {
            warn!(table = %name, "Foreign key cycle detected, installing anyway");
            return;
        }
        for referenced in create.referenced_tables() {
            if referenced.name.as_str() != name {
                self.visit(&referenced.name, installed, visiting, order);
            }
        }
        visiting.remove(key.as_str());
        if installed.insert(key.as_str()) {
            order.push(key.as_str());
        }
    }

    /// Recreate every captured table in `db`, referenced tables first.
    ///
    /// Collations and CHECK constraints are dropped on the way. The first
    /// failing statement aborts the recovery.
    pub async fn recover_to(&self, db: &mut dyn Executor) -> MigrateResult<()> {
        for name in self.install_order() {
            let Some(create) = self.tables.get(name) else {
                continue;
            };
            let mut create = create.clone();
            create.strip_collations();
            create.strip_checks();
            let sql = create.to_string();
            db.execute(&sql)
                .await
                .map_err(|e| MigrateError::snapshot(name, format!("{e}: {sql}")))?;
        }
        Ok(())
    }
}
