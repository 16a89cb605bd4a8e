//! Reversing SQL for DDL statements.
//!
//! Every forward DDL statement a script runs gets a compensating statement
//! built from the table's definition as it was just before the statement.
//! [`reverse_ddl`] is the pure core; [`reverse_ddl_with_snapshot`] fetches the
//! "before" definition from the database.
//!
//! ```text
//! CREATE TABLE t1 (...)      -> DROP TABLE IF EXISTS t1;
//! RENAME TABLE a TO b        -> RENAME TABLE b TO a;
//! ALTER TABLE t ADD COLUMN c -> ALTER TABLE `t` DROP COLUMN `c`;
//! DROP TABLE / DATABASE      -> (not reversible)
//! ```

use strata_sql::{
    AlterSpec, AlterTable, ConstraintKind, CreateTable, Statement, StatementNode, TableConstraint,
    TableName,
};
use tracing::warn;

use crate::db::Executor;
use crate::error::{MigrateError, MigrateResult};
use crate::snapshot::show_create_table;

const PRIMARY: &str = "PRIMARY";

/// Reverse `node`, reading the table it touches from `db` first.
///
/// Must be called before the forward statement executes.
pub async fn reverse_ddl_with_snapshot(
    db: &mut dyn Executor,
    node: &StatementNode,
) -> MigrateResult<Option<String>> {
    let snapshot = match &node.statement {
        Statement::AlterTable(AlterTable { name, .. }) | Statement::DropIndex { table: name, .. } => {
            show_create_table(db, &name.name).await?
        }
        _ => None,
    };
    reverse_ddl(&node.statement, snapshot.as_ref())
        .map_err(|e| match e {
            MigrateError::Reverse { message, .. } => MigrateError::reverse(&node.text, message),
            other => other,
        })
}

/// Reverse one statement given the current definition of its table.
///
/// `Ok(None)` means there is nothing to reverse: the statement is not
/// reversible (DROP TABLE, DROP DATABASE), is not schema DDL this module
/// models, or reverses to no change.
pub fn reverse_ddl(
    statement: &Statement,
    snapshot: Option<&CreateTable>,
) -> MigrateResult<Option<String>> {
    let reversed = match statement {
        Statement::CreateTable(create) => {
            Some(format!("DROP TABLE IF EXISTS {};\n", create.name.unquoted()))
        }
        Statement::RenameTable(pairs) => {
            let pairs = pairs
                .iter()
                .map(|p| format!("{} TO {}", p.to.unquoted(), p.from.unquoted()))
                .collect::<Vec<_>>()
                .join(", ");
            Some(format!("RENAME TABLE {pairs};\n"))
        }
        Statement::DropTable { .. } | Statement::DropDatabase { .. } => None,
        Statement::CreateIndex(index) => Some(format!(
            "{};\n",
            Statement::DropIndex {
                name: index.name.clone(),
                table: index.table.clone(),
            }
        )),
        Statement::DropIndex { name, table } => Some(reverse_drop_index(
            statement, name, table, snapshot,
        )?),
        Statement::AlterTable(alter) => reverse_alter_table(statement, alter, snapshot)?,
        _ => None,
    };
    Ok(reversed)
}

fn reverse_drop_index(
    statement: &Statement,
    name: &str,
    table: &TableName,
    snapshot: Option<&CreateTable>,
) -> MigrateResult<String> {
    if name.eq_ignore_ascii_case(PRIMARY) {
        return Err(MigrateError::reverse(
            statement.to_string(),
            "not allowed to drop primary key",
        ));
    }
    let constraint = snapshot
        .and_then(|create| create.constraint(name))
        .ok_or_else(|| {
            MigrateError::reverse(
                statement.to_string(),
                format!("index not found: {name} on {}", table.unquoted()),
            )
        })?;
    let alter = AlterTable::new(table.clone()).spec(AlterSpec::AddConstraint(constraint.clone()));
    Ok(format!("{alter};\n"))
}

fn reverse_alter_table(
    statement: &Statement,
    alter: &AlterTable,
    snapshot: Option<&CreateTable>,
) -> MigrateResult<Option<String>> {
    let fail = |message: String| MigrateError::reverse(statement.to_string(), message);

    let Some(snapshot) = snapshot else {
        return Err(fail(format!("table not found: {}", alter.name.unquoted())));
    };
    if !snapshot.name.name.eq_ignore_ascii_case(&alter.name.name) {
        return Err(fail(format!(
            "table name mismatch: altering {} but snapshot holds {}",
            alter.name.unquoted(),
            snapshot.name.unquoted()
        )));
    }

    // After a RENAME TO, the reversing statement has to address the new name.
    let mut target = alter.name.clone();
    let mut specs = Vec::new();
    let mut options_restored = false;

    for spec in &alter.specs {
        match spec {
            AlterSpec::Options(_) | AlterSpec::ConvertCharset { .. } => {
                if !options_restored && !snapshot.options.is_empty() {
                    specs.push(AlterSpec::Options(snapshot.options.clone()));
                }
                options_restored = true;
            }
            AlterSpec::AddColumns { columns, .. } => {
                specs.extend(columns.iter().map(|c| AlterSpec::DropColumn(c.name.clone())));
            }
            AlterSpec::AddConstraint(constraint) => {
                specs.push(drop_constraint(constraint).ok_or_else(|| {
                    fail(format!("cannot reverse unnamed constraint: {constraint}"))
                })?);
            }
            AlterSpec::DropIndex(name) => {
                if name.eq_ignore_ascii_case(PRIMARY) {
                    return Err(fail(format!("not allowed to {} PRIMARY", spec.kind_name())));
                }
                match snapshot.constraint(name) {
                    Some(constraint) => specs.push(AlterSpec::AddConstraint(constraint.clone())),
                    None => warn!(
                        table = %alter.name.name,
                        index = %name,
                        "Dropped index not found in snapshot, it will not be restored"
                    ),
                }
            }
            AlterSpec::ModifyColumn { column, .. } => {
                specs.push(restore_column(snapshot, &column.name, &column.name).map_err(fail)?);
            }
            AlterSpec::AlterColumn { name, .. } => {
                specs.push(restore_column(snapshot, name, name).map_err(fail)?);
            }
            AlterSpec::ChangeColumn {
                old_name, column, ..
            } => {
                specs.push(restore_column(snapshot, old_name, &column.name).map_err(fail)?);
            }
            AlterSpec::RenameColumn { from, to } => specs.push(AlterSpec::RenameColumn {
                from: to.clone(),
                to: from.clone(),
            }),
            AlterSpec::RenameIndex { from, to } => specs.push(AlterSpec::RenameIndex {
                from: to.clone(),
                to: from.clone(),
            }),
            AlterSpec::RenameTable(to) => {
                specs.push(AlterSpec::RenameTable(alter.name.clone()));
                target = to.clone();
            }
            other => return Err(fail(format!("not allowed to {}", other.kind_name()))),
        }
    }

    if specs.is_empty() {
        return Ok(None);
    }
    let reversed = AlterTable {
        name: target,
        specs,
    };
    Ok(Some(format!("{reversed};\n")))
}

/// `CHANGE COLUMN current <definition of original>`.
fn restore_column(
    snapshot: &CreateTable,
    original: &str,
    current: &str,
) -> Result<AlterSpec, String> {
    let column = snapshot
        .column(original)
        .ok_or_else(|| format!("column {original} not found in {}", snapshot.name.unquoted()))?;
    Ok(AlterSpec::ChangeColumn {
        old_name: current.into(),
        column: column.clone(),
        position: None,
    })
}

fn drop_constraint(constraint: &TableConstraint) -> Option<AlterSpec> {
    match constraint.kind {
        ConstraintKind::PrimaryKey => Some(AlterSpec::DropPrimaryKey),
        ConstraintKind::ForeignKey => constraint
            .symbol
            .as_ref()
            .or(constraint.name.as_ref())
            .map(|name| AlterSpec::DropForeignKey(name.clone())),
        ConstraintKind::Check => constraint.identifier().cloned().map(AlterSpec::DropCheck),
        _ => constraint.identifier().cloned().map(AlterSpec::DropIndex),
    }
}

/// `DROP TABLE IF EXISTS` for every CREATE TABLE among `nodes`.
///
/// Used to tear down a baseline without a snapshot.
pub fn reverse_create_table_stmts<'a>(
    nodes: impl IntoIterator<Item = &'a StatementNode>,
) -> Vec<String> {
    nodes
        .into_iter()
        .filter_map(|node| match &node.statement {
            Statement::CreateTable(create) => {
                Some(format!("DROP TABLE IF EXISTS {};\n", create.name.unquoted()))
            }
            _ => None,
        })
        .collect()
}
