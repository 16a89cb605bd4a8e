//! Top-level statements.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::alter::AlterTable;
use super::table::{CreateTable, IndexOption, KeyPart, TableName};
use crate::quote::quote_ident;

/// Kind of a data manipulation (or query) statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DmlKind {
    Select,
    Insert,
    Update,
    Delete,
    Show,
    LoadData,
    Do,
    Call,
}

impl DmlKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Select => "SelectStmt",
            Self::Insert => "InsertStmt",
            Self::Update => "UpdateStmt",
            Self::Delete => "DeleteStmt",
            Self::Show => "ShowStmt",
            Self::LoadData => "LoadDataStmt",
            Self::Do => "DoStmt",
            Self::Call => "CallStmt",
        }
    }
}

/// One side of `RENAME TABLE a TO b`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamePair {
    pub from: TableName,
    pub to: TableName,
}

/// Class of index created by CREATE INDEX.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexClass {
    Plain,
    Unique,
    FullText,
    Spatial,
}

/// A standalone CREATE INDEX.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateIndex {
    pub class: IndexClass,
    pub name: SmolStr,
    pub table: TableName,
    pub keys: Vec<KeyPart>,
    pub options: Vec<IndexOption>,
}

/// A parsed SQL statement.
///
/// Structured variants are produced for the DDL the migrator reasons
/// about. Everything else keeps its original text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    CreateTable(CreateTable),
    AlterTable(AlterTable),
    DropTable {
        if_exists: bool,
        temporary: bool,
        tables: Vec<TableName>,
    },
    RenameTable(Vec<RenamePair>),
    CreateIndex(CreateIndex),
    DropIndex {
        name: SmolStr,
        table: TableName,
    },
    DropDatabase {
        if_exists: bool,
        name: SmolStr,
    },
    Truncate(TableName),
    LockTables(String),
    UnlockTables(String),
    /// DDL this crate recognizes but does not model, such as CREATE VIEW.
    OtherDdl { kind: SmolStr, text: String },
    Dml { kind: DmlKind, text: String },
    Set(String),
    /// A statement outside the supported set, keyed by its first keyword.
    Unsupported { keyword: SmolStr, text: String },
}

impl Statement {
    /// Stable name of the statement kind, as used by lint allow-lists.
    pub fn kind_name(&self) -> &str {
        match self {
            Self::CreateTable(_) => "CreateTableStmt",
            Self::AlterTable(_) => "AlterTableStmt",
            Self::DropTable { .. } => "DropTableStmt",
            Self::RenameTable(_) => "RenameTableStmt",
            Self::CreateIndex(_) => "CreateIndexStmt",
            Self::DropIndex { .. } => "DropIndexStmt",
            Self::DropDatabase { .. } => "DropDatabaseStmt",
            Self::Truncate(_) => "TruncateTableStmt",
            Self::LockTables(_) => "LockTablesStmt",
            Self::UnlockTables(_) => "UnlockTablesStmt",
            Self::OtherDdl { kind, .. } => kind,
            Self::Dml { kind, .. } => kind.kind_name(),
            Self::Set(_) => "SetStmt",
            Self::Unsupported { .. } => "UnsupportedStmt",
        }
    }

    pub fn is_ddl(&self) -> bool {
        matches!(
            self,
            Self::CreateTable(_)
                | Self::AlterTable(_)
                | Self::DropTable { .. }
                | Self::RenameTable(_)
                | Self::CreateIndex(_)
                | Self::DropIndex { .. }
                | Self::DropDatabase { .. }
                | Self::Truncate(_)
                | Self::LockTables(_)
                | Self::UnlockTables(_)
                | Self::OtherDdl { .. }
        )
    }

    pub fn is_dml(&self) -> bool {
        matches!(self, Self::Dml { .. })
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    /// The table a single-table DDL statement targets.
    pub fn table_name(&self) -> Option<&TableName> {
        match self {
            Self::CreateTable(create) => Some(&create.name),
            Self::AlterTable(alter) => Some(&alter.name),
            Self::CreateIndex(index) => Some(&index.table),
            Self::DropIndex { table, .. } | Self::Truncate(table) => Some(table),
            _ => None,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateTable(create) => write!(f, "{create}"),
            Self::AlterTable(alter) => write!(f, "{alter}"),
            Self::DropTable {
                if_exists,
                temporary,
                tables,
            } => {
                f.write_str("DROP ")?;
                if *temporary {
                    f.write_str("TEMPORARY ")?;
                }
                f.write_str("TABLE ")?;
                if *if_exists {
                    f.write_str("IF EXISTS ")?;
                }
                let tables = tables
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                f.write_str(&tables)
            }
            Self::RenameTable(pairs) => {
                let pairs = pairs
                    .iter()
                    .map(|p| format!("{} TO {}", p.from, p.to))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "RENAME TABLE {pairs}")
            }
            Self::CreateIndex(index) => {
                f.write_str("CREATE ")?;
                match index.class {
                    IndexClass::Plain => {}
                    IndexClass::Unique => f.write_str("UNIQUE ")?,
                    IndexClass::FullText => f.write_str("FULLTEXT ")?,
                    IndexClass::Spatial => f.write_str("SPATIAL ")?,
                }
                let keys = index
                    .keys
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                write!(
                    f,
                    "INDEX {} ON {} ({keys})",
                    quote_ident(&index.name),
                    index.table
                )?;
                for option in &index.options {
                    write!(f, " {option}")?;
                }
                Ok(())
            }
            Self::DropIndex { name, table } => {
                write!(f, "DROP INDEX {} ON {table}", quote_ident(name))
            }
            Self::DropDatabase { if_exists, name } => {
                f.write_str("DROP DATABASE ")?;
                if *if_exists {
                    f.write_str("IF EXISTS ")?;
                }
                f.write_str(&quote_ident(name))
            }
            Self::Truncate(table) => write!(f, "TRUNCATE TABLE {table}"),
            Self::LockTables(text)
            | Self::UnlockTables(text)
            | Self::OtherDdl { text, .. }
            | Self::Dml { text, .. }
            | Self::Set(text)
            | Self::Unsupported { text, .. } => f.write_str(text),
        }
    }
}

/// A statement together with the text it was parsed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementNode {
    /// The statement text with comments removed, without the terminator.
    pub text: String,
    /// Byte offset of the statement in the script.
    pub offset: usize,
    pub statement: Statement,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let drop = Statement::DropTable {
            if_exists: true,
            temporary: false,
            tables: vec![TableName::new("a"), TableName::new("b")],
        };
        assert!(drop.is_ddl());
        assert_eq!(drop.kind_name(), "DropTableStmt");
        assert_eq!(drop.to_string(), "DROP TABLE IF EXISTS `a`, `b`");

        let insert = Statement::Dml {
            kind: DmlKind::Insert,
            text: "INSERT INTO t VALUES (1)".into(),
        };
        assert!(insert.is_dml());
        assert!(!insert.is_ddl());
        assert_eq!(insert.kind_name(), "InsertStmt");
        assert_eq!(insert.to_string(), "INSERT INTO t VALUES (1)");

        let set = Statement::Set("SET NAMES utf8mb4".into());
        assert!(set.is_set());
        assert!(!set.is_ddl() && !set.is_dml());
    }

    #[test]
    fn test_render_rename_and_index() {
        let rename = Statement::RenameTable(vec![RenamePair {
            from: TableName::new("a"),
            to: TableName::new("b"),
        }]);
        assert_eq!(rename.to_string(), "RENAME TABLE `a` TO `b`");

        let index = Statement::CreateIndex(CreateIndex {
            class: IndexClass::Unique,
            name: "uk_email".into(),
            table: TableName::new("users"),
            keys: vec![KeyPart::column("email")],
            options: Vec::new(),
        });
        assert_eq!(
            index.to_string(),
            "CREATE UNIQUE INDEX `uk_email` ON `users` (`email`)"
        );
        assert_eq!(index.table_name(), Some(&TableName::new("users")));
    }
}
