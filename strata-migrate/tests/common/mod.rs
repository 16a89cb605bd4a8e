//! In-memory stand-in for a MySQL server.
//!
//! Understands just enough SQL for the migrator: table DDL, row counting
//! for INSERT, the history table queries and checksum updates, and SHOW
//! CREATE TABLE. DDL
//! commits implicitly and ends an open transaction, the same way MySQL
//! does, so rollback only discards DML.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use indexmap::IndexMap;
use strata_migrate::{Connector, Executor, HISTORY_TABLE, MigratorConfig};
use strata_mysql::{MysqlConfig, MysqlError, MysqlResult, TextRow};
use strata_sql::{
    AlterSpec, ConstraintKind, CreateTable, DmlKind, IndexClass, Statement, TableConstraint,
    parse_statement,
};

const HISTORY_COLUMNS: [&str; 10] = [
    "id",
    "created_at",
    "updated_at",
    "service_name",
    "filename",
    "checksum",
    "installed_by",
    "installed_on",
    "language_type",
    "reversed",
];

#[derive(Debug, Clone)]
pub struct FakeTable {
    pub create: CreateTable,
    pub rows: usize,
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub tables: IndexMap<String, FakeTable>,
    pub history_exists: bool,
    pub history: Vec<Vec<String>>,
    /// Every statement received, in order.
    pub log: Vec<String>,
    /// Statements containing this text fail.
    pub fail_on: Option<String>,
    in_tx: bool,
    buffered: Vec<Buffered>,
}

#[derive(Debug)]
enum Buffered {
    Row(String),
    History(Vec<String>),
    /// `[checksum, updated_at, service_name, filename]`
    Checksum(Vec<String>),
}

impl FakeState {
    fn commit(&mut self) {
        for write in std::mem::take(&mut self.buffered) {
            match write {
                Buffered::Row(table) => {
                    if let Some(t) = self.tables.get_mut(&table) {
                        t.rows += 1;
                    }
                }
                Buffered::History(values) => self.push_history(values),
                Buffered::Checksum(values) => self.update_checksum(&values),
            }
        }
        self.in_tx = false;
    }

    fn push_history(&mut self, values: Vec<String>) {
        let mut row = vec![(self.history.len() + 1).to_string()];
        row.extend(values);
        self.history.push(row);
    }

    fn update_checksum(&mut self, values: &[String]) {
        let [checksum, updated_at, service, filename] = values else {
            return;
        };
        for row in &mut self.history {
            if row[3] == *service && row[4] == *filename {
                row[5] = checksum.clone();
                row[2] = updated_at.clone();
            }
        }
    }

    fn execute(&mut self, sql: &str) -> MysqlResult<()> {
        self.log.push(sql.to_string());
        if let Some(needle) = &self.fail_on {
            if sql.contains(needle.as_str()) {
                return Err(MysqlError::query(sql, "injected failure"));
            }
        }

        let trimmed = sql.trim().trim_end_matches(';').trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "BEGIN" | "START TRANSACTION" => {
                self.commit();
                self.in_tx = true;
                return Ok(());
            }
            "COMMIT" => {
                self.commit();
                return Ok(());
            }
            "ROLLBACK" => {
                self.buffered.clear();
                self.in_tx = false;
                return Ok(());
            }
            _ => {}
        }

        if trimmed.contains(HISTORY_TABLE) {
            return self.history_statement(sql, trimmed);
        }

        let statement =
            parse_statement(trimmed).map_err(|e| MysqlError::query(sql, e.to_string()))?;
        if statement.is_ddl() {
            self.commit();
        }
        match statement {
            Statement::CreateTable(create) => {
                let name = create.name.name.to_string();
                if self.tables.contains_key(&name) {
                    if create.if_not_exists {
                        return Ok(());
                    }
                    return Err(MysqlError::query(
                        sql,
                        format!("Table '{name}' already exists (1050)"),
                    ));
                }
                self.tables.insert(name, FakeTable { create, rows: 0 });
            }
            Statement::DropTable {
                if_exists, tables, ..
            } => {
                for table in tables {
                    if self.tables.shift_remove(table.name.as_str()).is_none() && !if_exists {
                        return Err(MysqlError::query(
                            sql,
                            format!("Unknown table '{}' (1051)", table.name),
                        ));
                    }
                }
            }
            Statement::RenameTable(pairs) => {
                for pair in pairs {
                    let mut table = self.table(sql, &pair.from.name)?;
                    self.tables.shift_remove(pair.from.name.as_str());
                    table.create.name.name = pair.to.name.clone();
                    self.tables.insert(pair.to.name.to_string(), table);
                }
            }
            Statement::AlterTable(alter) => {
                let mut table = self.table(sql, &alter.name.name)?;
                let mut name = alter.name.name.to_string();
                self.tables.shift_remove(name.as_str());
                for spec in alter.specs {
                    if let AlterSpec::RenameTable(to) = &spec {
                        name = to.name.to_string();
                        table.create.name.name = to.name.clone();
                    }
                    alter_table(&mut table.create, spec);
                }
                self.tables.insert(name, table);
            }
            Statement::CreateIndex(index) => {
                let table = self.table_mut(sql, &index.table.name)?;
                let kind = match index.class {
                    IndexClass::Unique => ConstraintKind::Unique,
                    IndexClass::FullText => ConstraintKind::FullText,
                    IndexClass::Spatial => ConstraintKind::Spatial,
                    IndexClass::Plain => ConstraintKind::Index,
                };
                let mut constraint = TableConstraint::new(kind);
                constraint.name = Some(index.name);
                constraint.keys = index.keys;
                constraint.options = index.options;
                table.create.constraints.push(constraint);
            }
            Statement::DropIndex { name, table } => {
                let table = self.table_mut(sql, &table.name)?;
                table.create.constraints.retain(|c| !c.is_named(&name));
            }
            Statement::DropDatabase { .. } => {
                self.tables.clear();
                self.history.clear();
                self.history_exists = false;
            }
            Statement::Dml {
                kind: DmlKind::Insert,
                ..
            } => {
                let name = insert_target(trimmed);
                self.table(sql, &name)?;
                if self.in_tx {
                    self.buffered.push(Buffered::Row(name));
                } else if let Some(table) = self.tables.get_mut(&name) {
                    table.rows += 1;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn history_statement(&mut self, sql: &str, trimmed: &str) -> MysqlResult<()> {
        let upper = trimmed.to_ascii_uppercase();
        if upper.starts_with("CREATE TABLE") {
            self.commit();
            self.history_exists = true;
            return Ok(());
        }
        if !self.history_exists {
            return Err(MysqlError::query(
                sql,
                format!("Table '{HISTORY_TABLE}' doesn't exist (1146)"),
            ));
        }
        if upper.starts_with("INSERT") {
            let values = quoted_values(trimmed);
            if self.in_tx {
                self.buffered.push(Buffered::History(values));
            } else {
                self.push_history(values);
            }
        }
        if upper.starts_with("UPDATE") {
            let values = quoted_values_after(trimmed, "SET");
            if self.in_tx {
                self.buffered.push(Buffered::Checksum(values));
            } else {
                self.update_checksum(&values);
            }
        }
        Ok(())
    }

    fn query(&mut self, sql: &str) -> MysqlResult<Vec<TextRow>> {
        self.log.push(sql.to_string());
        let trimmed = sql.trim();
        let upper = trimmed.to_ascii_uppercase();

        if upper == "SHOW TABLES" {
            let mut names: Vec<String> = self.tables.keys().cloned().collect();
            if self.history_exists {
                names.push(HISTORY_TABLE.to_string());
            }
            return Ok(names
                .into_iter()
                .map(|name| TextRow::new(vec!["Tables_in_app".into()], vec![Some(name)]))
                .collect());
        }
        if upper.starts_with("SHOW TABLES LIKE") {
            let rows = if self.history_exists && trimmed.contains(HISTORY_TABLE) {
                vec![TextRow::new(
                    vec!["Tables_in_app".into()],
                    vec![Some(HISTORY_TABLE.into())],
                )]
            } else {
                Vec::new()
            };
            return Ok(rows);
        }
        if upper.starts_with("SHOW CREATE TABLE") {
            let name = trimmed["SHOW CREATE TABLE".len()..].trim().trim_matches('`');
            let table = self.table(sql, name)?;
            return Ok(vec![TextRow::new(
                vec!["Table".into(), "Create Table".into()],
                vec![Some(name.to_string()), Some(table.create.to_string())],
            )]);
        }
        if upper.starts_with("SELECT COUNT(*)") && trimmed.contains(HISTORY_TABLE) {
            self.require_history(sql)?;
            return Ok(vec![TextRow::new(
                vec!["COUNT(*)".into()],
                vec![Some(self.history.len().to_string())],
            )]);
        }
        if upper.starts_with("SELECT") && trimmed.contains(HISTORY_TABLE) {
            self.require_history(sql)?;
            let columns: Vec<String> = HISTORY_COLUMNS.iter().map(|c| c.to_string()).collect();
            // `WHERE service_name = 'm' AND filename = 'f'` narrows to one script.
            let wanted = upper
                .contains("WHERE")
                .then(|| quoted_values_after(trimmed, "WHERE"));
            return Ok(self
                .history
                .iter()
                .filter(|row| match &wanted {
                    Some(wanted) => row.get(3..5).is_some_and(|key| key == wanted.as_slice()),
                    None => true,
                })
                .map(|row| {
                    TextRow::new(columns.clone(), row.iter().cloned().map(Some).collect())
                })
                .collect());
        }
        Err(MysqlError::query(sql, "unsupported query"))
    }

    fn require_history(&self, sql: &str) -> MysqlResult<()> {
        if self.history_exists {
            Ok(())
        } else {
            Err(MysqlError::query(
                sql,
                format!("Table '{HISTORY_TABLE}' doesn't exist (1146)"),
            ))
        }
    }

    fn table(&self, sql: &str, name: &str) -> MysqlResult<FakeTable> {
        self.tables.get(name).cloned().ok_or_else(|| missing(sql, name))
    }

    fn table_mut(&mut self, sql: &str, name: &str) -> MysqlResult<&mut FakeTable> {
        self.tables.get_mut(name).ok_or_else(|| missing(sql, name))
    }
}

fn missing(sql: &str, name: &str) -> MysqlError {
    MysqlError::query(sql, format!("Table 'app.{name}' doesn't exist (1146)"))
}

fn alter_table(create: &mut CreateTable, spec: AlterSpec) {
    match spec {
        AlterSpec::AddColumns { columns, .. } => create.columns.extend(columns),
        AlterSpec::AddConstraint(constraint) => create.constraints.push(constraint),
        AlterSpec::DropColumn(name) => create.columns.retain(|c| !c.is_named(&name)),
        AlterSpec::DropIndex(name)
        | AlterSpec::DropForeignKey(name)
        | AlterSpec::DropCheck(name) => create
            .constraints
            .retain(|c| !c.is_named(&name) && c.symbol.as_deref() != Some(name.as_str())),
        AlterSpec::DropPrimaryKey => create
            .constraints
            .retain(|c| c.kind != ConstraintKind::PrimaryKey),
        AlterSpec::ModifyColumn { column, .. } => {
            if let Some(slot) = create.columns.iter_mut().find(|c| c.is_named(&column.name)) {
                *slot = column;
            }
        }
        AlterSpec::ChangeColumn {
            old_name, column, ..
        } => {
            if let Some(slot) = create.columns.iter_mut().find(|c| c.is_named(&old_name)) {
                *slot = column;
            }
        }
        AlterSpec::RenameColumn { from, to } => {
            if let Some(slot) = create.columns.iter_mut().find(|c| c.is_named(&from)) {
                slot.name = to;
            }
        }
        AlterSpec::Options(options) => {
            for option in options {
                let same = std::mem::discriminant(&option);
                create
                    .options
                    .retain(|o| std::mem::discriminant(o) != same);
                create.options.push(option);
            }
        }
        _ => {}
    }
}

/// Table named by `INSERT INTO name ...`.
fn insert_target(sql: &str) -> String {
    sql.split_whitespace()
        .skip_while(|w| !w.eq_ignore_ascii_case("INTO"))
        .nth(1)
        .unwrap_or_default()
        .split('(')
        .next()
        .unwrap_or_default()
        .trim_matches('`')
        .to_string()
}

/// Every single-quoted literal after `VALUES`, unescaped.
fn quoted_values(sql: &str) -> Vec<String> {
    quoted_values_after(sql, "VALUES")
}

/// Every single-quoted literal after `keyword`, unescaped.
fn quoted_values_after(sql: &str, keyword: &str) -> Vec<String> {
    let start = sql.find(keyword).unwrap_or(0);
    let mut values = Vec::new();
    let mut chars = sql[start..].chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\'' {
            continue;
        }
        let mut value = String::new();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('0') => value.push('\0'),
                    Some('n') => value.push('\n'),
                    Some('r') => value.push('\r'),
                    Some('Z') => value.push('\u{1a}'),
                    Some(other) => value.push(other),
                    None => {}
                },
                '\'' if chars.peek() == Some(&'\'') => {
                    chars.next();
                    value.push('\'');
                }
                '\'' => break,
                other => value.push(other),
            }
        }
        values.push(value);
    }
    values
}

/// A shared handle to one fake server.
#[derive(Debug, Clone, Default)]
pub struct FakeDb {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Run setup SQL directly, bypassing the migrator.
    pub fn seed(&self, sql: &str) {
        let mut state = self.state();
        for statement in strata_sql::split_script(sql).unwrap() {
            state.execute(&statement.text).unwrap();
        }
        state.log.clear();
    }

    pub fn fail_on(&self, needle: &str) {
        self.state().fail_on = Some(needle.to_string());
    }

    pub fn table_names(&self) -> Vec<String> {
        self.state().tables.keys().cloned().collect()
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.state().tables.contains_key(name)
    }

    pub fn rows(&self, table: &str) -> usize {
        self.state().tables.get(table).map_or(0, |t| t.rows)
    }

    pub fn column_names(&self, table: &str) -> Vec<String> {
        self.state()
            .tables
            .get(table)
            .map(|t| t.create.columns.iter().map(|c| c.name.to_string()).collect())
            .unwrap_or_default()
    }

    /// History rows as `(service_name, filename, reversed)`.
    pub fn history(&self) -> Vec<(String, String, String)> {
        self.state()
            .history
            .iter()
            .map(|row| (row[3].clone(), row[4].clone(), row[9].clone()))
            .collect()
    }

    /// History checksums as `(filename, checksum)`.
    pub fn checksums(&self) -> Vec<(String, String)> {
        self.state()
            .history
            .iter()
            .map(|row| (row[4].clone(), row[5].clone()))
            .collect()
    }

    pub fn log(&self) -> Vec<String> {
        self.state().log.clone()
    }

    pub fn clear_log(&self) {
        self.state().log.clear();
    }
}

#[async_trait]
impl Executor for FakeDb {
    async fn execute(&mut self, sql: &str) -> MysqlResult<()> {
        self.state().execute(sql)
    }

    async fn query(&mut self, sql: &str) -> MysqlResult<Vec<TextRow>> {
        self.state().query(sql)
    }
}

/// Hands out connections to a live and a sandbox [`FakeDb`].
#[derive(Debug, Clone, Default)]
pub struct FakeConnector {
    pub live: FakeDb,
    pub sandbox: FakeDb,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn database(&self) -> MysqlResult<Box<dyn Executor>> {
        Ok(Box::new(self.live.clone()))
    }

    async fn sandbox(&self) -> MysqlResult<Box<dyn Executor>> {
        Ok(Box::new(self.sandbox.clone()))
    }
}

/// Engine settings pointing at the fake servers.
pub fn config() -> MigratorConfig {
    MigratorConfig::new()
        .database(MysqlConfig::new("app"))
        .sandbox(MysqlConfig::new("app_sandbox"))
        .installed_by("tests")
        .installed_on("localhost")
}
