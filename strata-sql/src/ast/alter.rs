//! ALTER TABLE and its specifications.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::table::{ColumnDef, TableConstraint, TableName, TableOption};
use crate::quote::quote_ident;

/// A parsed ALTER TABLE statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlterTable {
    pub name: TableName,
    pub specs: Vec<AlterSpec>,
}

impl AlterTable {
    pub fn new(name: TableName) -> Self {
        Self {
            name,
            specs: Vec::new(),
        }
    }

    /// Add a specification.
    pub fn spec(mut self, spec: AlterSpec) -> Self {
        self.specs.push(spec);
        self
    }
}

impl fmt::Display for AlterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ALTER TABLE {}", self.name)?;
        for (i, spec) in self.specs.iter().enumerate() {
            f.write_str(if i == 0 { " " } else { ", " })?;
            write!(f, "{spec}")?;
        }
        Ok(())
    }
}

/// Where ADD / MODIFY / CHANGE places a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnPosition {
    First,
    After(SmolStr),
}

impl fmt::Display for ColumnPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => f.write_str("FIRST"),
            Self::After(column) => write!(f, "AFTER {}", quote_ident(column)),
        }
    }
}

/// Operation of `ALTER COLUMN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlterColumnOp {
    SetDefault(String),
    DropDefault,
    SetVisible(bool),
}

/// Partition maintenance operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartitionKind {
    Add,
    Drop,
    Discard,
    Import,
    Truncate,
    Coalesce,
    Reorganize,
    Exchange,
    Analyze,
    Check,
    Optimize,
    Rebuild,
    Repair,
    /// `PARTITION BY ...`
    Partition,
    RemovePartitioning,
}

impl PartitionKind {
    /// The verb preceding `PARTITION`.
    pub fn verb(&self) -> Option<&'static str> {
        Some(match self {
            Self::Add => "ADD",
            Self::Drop => "DROP",
            Self::Discard => "DISCARD",
            Self::Import => "IMPORT",
            Self::Truncate => "TRUNCATE",
            Self::Coalesce => "COALESCE",
            Self::Reorganize => "REORGANIZE",
            Self::Exchange => "EXCHANGE",
            Self::Analyze => "ANALYZE",
            Self::Check => "CHECK",
            Self::Optimize => "OPTIMIZE",
            Self::Rebuild => "REBUILD",
            Self::Repair => "REPAIR",
            Self::Partition | Self::RemovePartitioning => return None,
        })
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Add => "AlterTableAddPartitions",
            Self::Drop => "AlterTableDropPartition",
            Self::Discard => "AlterTableDiscardPartitionTablespace",
            Self::Import => "AlterTableImportPartitionTablespace",
            Self::Truncate => "AlterTableTruncatePartition",
            Self::Coalesce => "AlterTableCoalescePartitions",
            Self::Reorganize => "AlterTableReorganizePartition",
            Self::Exchange => "AlterTableExchangePartition",
            Self::Analyze => "AlterTableAnalyzePartition",
            Self::Check => "AlterTableCheckPartitions",
            Self::Optimize => "AlterTableOptimizePartition",
            Self::Rebuild => "AlterTableRebuildPartition",
            Self::Repair => "AlterTableRepairPartition",
            Self::Partition => "AlterTablePartition",
            Self::RemovePartitioning => "AlterTableRemovePartitioning",
        }
    }
}

/// A partition operation with its trailing text as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionOp {
    pub kind: PartitionKind,
    pub text: String,
}

/// One comma-separated specification of an ALTER TABLE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AlterSpec {
    Options(Vec<TableOption>),
    AddColumns {
        columns: Vec<ColumnDef>,
        position: Option<ColumnPosition>,
    },
    AddConstraint(TableConstraint),
    DropColumn(SmolStr),
    DropPrimaryKey,
    DropIndex(SmolStr),
    DropForeignKey(SmolStr),
    DropCheck(SmolStr),
    ModifyColumn {
        column: ColumnDef,
        position: Option<ColumnPosition>,
    },
    ChangeColumn {
        old_name: SmolStr,
        column: ColumnDef,
        position: Option<ColumnPosition>,
    },
    AlterColumn {
        name: SmolStr,
        op: AlterColumnOp,
    },
    AlterIndexVisibility {
        name: SmolStr,
        visible: bool,
    },
    AlterCheck {
        name: SmolStr,
        enforced: bool,
    },
    RenameColumn {
        from: SmolStr,
        to: SmolStr,
    },
    RenameIndex {
        from: SmolStr,
        to: SmolStr,
    },
    RenameTable(TableName),
    ConvertCharset {
        charset: SmolStr,
        collate: Option<SmolStr>,
    },
    Lock(SmolStr),
    Algorithm(SmolStr),
    Force,
    Keys {
        enable: bool,
    },
    OrderBy(Vec<SmolStr>),
    Validation {
        with: bool,
    },
    Tablespace {
        discard: bool,
    },
    Partition(PartitionOp),
}

impl AlterSpec {
    /// Stable name of the specification kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Options(_) | Self::ConvertCharset { .. } => "AlterTableOption",
            Self::AddColumns { .. } => "AlterTableAddColumns",
            Self::AddConstraint(_) => "AlterTableAddConstraint",
            Self::DropColumn(_) => "AlterTableDropColumn",
            Self::DropPrimaryKey => "AlterTableDropPrimaryKey",
            Self::DropIndex(_) => "AlterTableDropIndex",
            Self::DropForeignKey(_) => "AlterTableDropForeignKey",
            Self::DropCheck(_) => "AlterTableDropCheck",
            Self::ModifyColumn { .. } => "AlterTableModifyColumn",
            Self::ChangeColumn { .. } => "AlterTableChangeColumn",
            Self::AlterColumn { .. } => "AlterTableAlterColumn",
            Self::AlterIndexVisibility { .. } => "AlterTableIndexInvisible",
            Self::AlterCheck { .. } => "AlterTableAlterCheck",
            Self::RenameColumn { .. } => "AlterTableRenameColumn",
            Self::RenameIndex { .. } => "AlterTableRenameIndex",
            Self::RenameTable(_) => "AlterTableRenameTable",
            Self::Lock(_) => "AlterTableLock",
            Self::Algorithm(_) => "AlterTableAlgorithm",
            Self::Force => "AlterTableForce",
            Self::Keys { enable: true } => "AlterTableEnableKeys",
            Self::Keys { enable: false } => "AlterTableDisableKeys",
            Self::OrderBy(_) => "AlterTableOrderByColumns",
            Self::Validation { with: true } => "AlterTableWithValidation",
            Self::Validation { with: false } => "AlterTableWithoutValidation",
            Self::Tablespace { discard: true } => "AlterTableDiscardTablespace",
            Self::Tablespace { discard: false } => "AlterTableImportTablespace",
            Self::Partition(op) => op.kind.kind_name(),
        }
    }

    /// Whether applying this spec loses data.
    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::DropColumn(_))
    }
}

fn write_position(f: &mut fmt::Formatter<'_>, position: &Option<ColumnPosition>) -> fmt::Result {
    match position {
        Some(position) => write!(f, " {position}"),
        None => Ok(()),
    }
}

impl fmt::Display for AlterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Options(options) => {
                let rendered = options
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                f.write_str(&rendered)
            }
            Self::AddColumns { columns, position } => {
                if let [column] = columns.as_slice() {
                    write!(f, "ADD COLUMN {column}")?;
                    write_position(f, position)
                } else {
                    let rendered = columns
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ");
                    write!(f, "ADD COLUMN ({rendered})")
                }
            }
            Self::AddConstraint(constraint) => write!(f, "ADD {constraint}"),
            Self::DropColumn(name) => write!(f, "DROP COLUMN {}", quote_ident(name)),
            Self::DropPrimaryKey => f.write_str("DROP PRIMARY KEY"),
            Self::DropIndex(name) => write!(f, "DROP INDEX {}", quote_ident(name)),
            Self::DropForeignKey(name) => write!(f, "DROP FOREIGN KEY {}", quote_ident(name)),
            Self::DropCheck(name) => write!(f, "DROP CHECK {}", quote_ident(name)),
            Self::ModifyColumn { column, position } => {
                write!(f, "MODIFY COLUMN {column}")?;
                write_position(f, position)
            }
            Self::ChangeColumn {
                old_name,
                column,
                position,
            } => {
                write!(f, "CHANGE COLUMN {} {column}", quote_ident(old_name))?;
                write_position(f, position)
            }
            Self::AlterColumn { name, op } => {
                write!(f, "ALTER COLUMN {} ", quote_ident(name))?;
                match op {
                    AlterColumnOp::SetDefault(expr) => write!(f, "SET DEFAULT {expr}"),
                    AlterColumnOp::DropDefault => f.write_str("DROP DEFAULT"),
                    AlterColumnOp::SetVisible(true) => f.write_str("SET VISIBLE"),
                    AlterColumnOp::SetVisible(false) => f.write_str("SET INVISIBLE"),
                }
            }
            Self::AlterIndexVisibility { name, visible } => write!(
                f,
                "ALTER INDEX {} {}",
                quote_ident(name),
                if *visible { "VISIBLE" } else { "INVISIBLE" }
            ),
            Self::AlterCheck { name, enforced } => write!(
                f,
                "ALTER CHECK {} {}",
                quote_ident(name),
                if *enforced { "ENFORCED" } else { "NOT ENFORCED" }
            ),
            Self::RenameColumn { from, to } => write!(
                f,
                "RENAME COLUMN {} TO {}",
                quote_ident(from),
                quote_ident(to)
            ),
            Self::RenameIndex { from, to } => write!(
                f,
                "RENAME INDEX {} TO {}",
                quote_ident(from),
                quote_ident(to)
            ),
            Self::RenameTable(to) => write!(f, "RENAME TO {to}"),
            Self::ConvertCharset { charset, collate } => {
                write!(f, "CONVERT TO CHARACTER SET {charset}")?;
                if let Some(collate) = collate {
                    write!(f, " COLLATE {collate}")?;
                }
                Ok(())
            }
            Self::Lock(lock) => write!(f, "LOCK = {lock}"),
            Self::Algorithm(algorithm) => write!(f, "ALGORITHM = {algorithm}"),
            Self::Force => f.write_str("FORCE"),
            Self::Keys { enable } => {
                f.write_str(if *enable { "ENABLE KEYS" } else { "DISABLE KEYS" })
            }
            Self::OrderBy(columns) => {
                let rendered = columns
                    .iter()
                    .map(|c| quote_ident(c))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "ORDER BY {rendered}")
            }
            Self::Validation { with } => f.write_str(if *with {
                "WITH VALIDATION"
            } else {
                "WITHOUT VALIDATION"
            }),
            Self::Tablespace { discard } => f.write_str(if *discard {
                "DISCARD TABLESPACE"
            } else {
                "IMPORT TABLESPACE"
            }),
            Self::Partition(op) => match op.kind {
                PartitionKind::RemovePartitioning => f.write_str("REMOVE PARTITIONING"),
                kind => {
                    if let Some(verb) = kind.verb() {
                        write!(f, "{verb} ")?;
                    }
                    write!(f, "PARTITION {}", op.text)
                }
            },
        }
    }
}
