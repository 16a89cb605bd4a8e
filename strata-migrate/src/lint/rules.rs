//! Shipped lint rules.

use std::collections::HashSet;

use strata_sql::{
    AlterSpec, ColumnDef, ColumnOption, ConstraintKind, CreateTable, Statement, StatementNode,
    TypeCode,
};

use super::LintRule;

/// Columns a statement defines or redefines.
fn touched_columns(statement: &Statement) -> Vec<&ColumnDef> {
    match statement {
        Statement::CreateTable(create) => create.columns.iter().collect(),
        Statement::AlterTable(alter) => alter
            .specs
            .iter()
            .flat_map(|spec| match spec {
                AlterSpec::AddColumns { columns, .. } => columns.iter().collect::<Vec<_>>(),
                AlterSpec::ModifyColumn { column, .. } | AlterSpec::ChangeColumn { column, .. } => {
                    vec![column]
                }
                _ => Vec::new(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn create_table(node: &StatementNode) -> Option<&CreateTable> {
    match &node.statement {
        Statement::CreateTable(create) if create.like.is_none() => Some(create),
        _ => None,
    }
}

/// Only allow-listed statement and ALTER TABLE spec kinds.
#[derive(Debug, Clone)]
pub struct AllowedStatementRule {
    ddl: HashSet<String>,
    dml: HashSet<String>,
}

impl AllowedStatementRule {
    pub const NAME: &'static str = "allowed-statement";

    pub fn new(ddl: impl IntoIterator<Item = String>, dml: impl IntoIterator<Item = String>) -> Self {
        Self {
            ddl: ddl.into_iter().collect(),
            dml: dml.into_iter().collect(),
        }
    }
}

impl LintRule for AllowedStatementRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn check(&self, node: &StatementNode) -> Vec<String> {
        let statement = &node.statement;
        match statement {
            Statement::Set(_) | Statement::LockTables(_) | Statement::UnlockTables(_) => Vec::new(),
            Statement::AlterTable(alter) => alter
                .specs
                .iter()
                .filter(|spec| !self.ddl.contains(spec.kind_name()))
                .map(|spec| format!("{} is not allowed", spec.kind_name()))
                .collect(),
            _ if statement.is_dml() => {
                if self.dml.contains(statement.kind_name()) {
                    Vec::new()
                } else {
                    vec![format!("{} is not allowed", statement.kind_name())]
                }
            }
            _ => {
                if self.ddl.contains(statement.kind_name()) {
                    Vec::new()
                } else {
                    vec![format!("{} is not allowed", statement.kind_name())]
                }
            }
        }
    }
}

/// CREATE TABLE must carry a table comment.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableCommentRule;

impl TableCommentRule {
    pub const NAME: &'static str = "table-comment";
}

impl LintRule for TableCommentRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn check(&self, node: &StatementNode) -> Vec<String> {
        match create_table(node) {
            Some(create) if create.comment().is_none_or(|c| c.trim().is_empty()) => {
                vec![format!("table {} has no comment", create.name.unquoted())]
            }
            _ => Vec::new(),
        }
    }
}

/// New or redefined columns must carry a comment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnCommentRule;

impl ColumnCommentRule {
    pub const NAME: &'static str = "column-comment";
}

impl LintRule for ColumnCommentRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn check(&self, node: &StatementNode) -> Vec<String> {
        touched_columns(&node.statement)
            .into_iter()
            .filter(|c| c.comment().is_none_or(|text| text.trim().is_empty()))
            .map(|c| format!("column {} has no comment", c.name))
            .collect()
    }
}

/// CREATE TABLE must use `id` as its primary key.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimaryIdRule;

impl PrimaryIdRule {
    pub const NAME: &'static str = "primary-id";
}

impl LintRule for PrimaryIdRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn check(&self, node: &StatementNode) -> Vec<String> {
        let Some(create) = create_table(node) else {
            return Vec::new();
        };
        let table = create.name.unquoted();
        if create.column("id").is_none() {
            return vec![format!("table {table} has no id column")];
        }
        let keys = create.primary_key_columns();
        match keys.as_slice() {
            [only] if only.eq_ignore_ascii_case("id") => Vec::new(),
            [] => vec![format!("table {table} has no primary key")],
            _ => vec![format!(
                "primary key of {table} must be `id`, found ({})",
                keys.join(", ")
            )],
        }
    }
}

/// CREATE TABLE must define `created_at` and `updated_at`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampsRule;

impl TimestampsRule {
    pub const NAME: &'static str = "timestamps";
    const COLUMNS: [&'static str; 2] = ["created_at", "updated_at"];
}

impl LintRule for TimestampsRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn check(&self, node: &StatementNode) -> Vec<String> {
        let Some(create) = create_table(node) else {
            return Vec::new();
        };
        Self::COLUMNS
            .iter()
            .filter_map(|name| match create.column(name) {
                None => Some(format!("table {} has no {name} column", create.name.unquoted())),
                Some(column)
                    if !matches!(
                        column.data_type.code,
                        TypeCode::DateTime | TypeCode::Timestamp
                    ) =>
                {
                    Some(format!(
                        "{name} must be DATETIME or TIMESTAMP, found {}",
                        column.data_type.code
                    ))
                }
                Some(_) => None,
            })
            .collect()
    }
}

/// FLOAT and DOUBLE lose precision; use DECIMAL.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatDoubleRule;

impl FloatDoubleRule {
    pub const NAME: &'static str = "float-double";
}

impl LintRule for FloatDoubleRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn check(&self, node: &StatementNode) -> Vec<String> {
        touched_columns(&node.statement)
            .into_iter()
            .filter(|c| matches!(c.data_type.code, TypeCode::Float | TypeCode::Double))
            .map(|c| {
                format!(
                    "column {} is {}, use DECIMAL",
                    c.name, c.data_type.code
                )
            })
            .collect()
    }
}

/// No foreign key constraints.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForeignKeyRule;

impl ForeignKeyRule {
    pub const NAME: &'static str = "foreign-key";
}

impl LintRule for ForeignKeyRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn check(&self, node: &StatementNode) -> Vec<String> {
        let mut found = Vec::new();
        for column in touched_columns(&node.statement) {
            if column
                .options
                .iter()
                .any(|o| matches!(o, ColumnOption::References(_)))
            {
                found.push(format!("column {} references another table", column.name));
            }
        }

        let constraints: Vec<_> = match &node.statement {
            Statement::CreateTable(create) => create.constraints.iter().collect(),
            Statement::AlterTable(alter) => alter
                .specs
                .iter()
                .filter_map(|spec| match spec {
                    AlterSpec::AddConstraint(constraint) => Some(constraint),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        for constraint in constraints {
            if constraint.kind == ConstraintKind::ForeignKey {
                found.push(match constraint.identifier() {
                    Some(name) => format!("foreign key {name} is not allowed"),
                    None => "foreign key is not allowed".to_string(),
                });
            }
        }
        found
    }
}

/// VARCHAR columns must stay under a length limit.
#[derive(Debug, Clone, Copy)]
pub struct VarcharLengthRule {
    max: i64,
}

impl VarcharLengthRule {
    pub const NAME: &'static str = "varchar-length";

    pub fn new(max: i64) -> Self {
        Self { max }
    }
}

impl LintRule for VarcharLengthRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn check(&self, node: &StatementNode) -> Vec<String> {
        touched_columns(&node.statement)
            .into_iter()
            .filter(|c| c.data_type.code == TypeCode::VarChar && c.data_type.length > self.max)
            .map(|c| {
                format!(
                    "column {} is VARCHAR({}), the limit is {}",
                    c.name, c.data_type.length, self.max
                )
            })
            .collect()
    }
}

/// Columns must not be renamed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnRenameRule;

impl ColumnRenameRule {
    pub const NAME: &'static str = "column-rename";
}

impl LintRule for ColumnRenameRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn check(&self, node: &StatementNode) -> Vec<String> {
        let Statement::AlterTable(alter) = &node.statement else {
            return Vec::new();
        };
        alter
            .specs
            .iter()
            .filter_map(|spec| match spec {
                AlterSpec::ChangeColumn {
                    old_name, column, ..
                } if !column.is_named(old_name) => {
                    Some(format!("column {old_name} is renamed to {}", column.name))
                }
                AlterSpec::RenameColumn { from, to } => {
                    Some(format!("column {from} is renamed to {to}"))
                }
                _ => None,
            })
            .collect()
    }
}
