//! CREATE TABLE and its building blocks.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::types::DataType;
use crate::quote::{quote_ident, quote_string};

/// A possibly schema-qualified table name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableName {
    pub schema: Option<SmolStr>,
    pub name: SmolStr,
}

impl TableName {
    /// Create an unqualified table name.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// The name without quoting, `schema.table` when qualified.
    pub fn unquoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.name),
            None => self.name.to_string(),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{}.", quote_ident(schema))?;
        }
        f.write_str(&quote_ident(&self.name))
    }
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: SmolStr,
    pub data_type: DataType,
    pub options: Vec<ColumnOption>,
}

impl ColumnDef {
    pub fn new(name: impl Into<SmolStr>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            options: Vec::new(),
        }
    }

    /// Add an option.
    pub fn option(mut self, option: ColumnOption) -> Self {
        self.options.push(option);
        self
    }

    /// Case-insensitive name match, as MySQL compares column names.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// The column COMMENT, if any.
    pub fn comment(&self) -> Option<&str> {
        self.options.iter().find_map(|o| match o {
            ColumnOption::Comment(c) => Some(c.as_str()),
            _ => None,
        })
    }

    /// Effective collation from the type or a trailing COLLATE option.
    pub fn collation(&self) -> Option<&SmolStr> {
        self.data_type.collate.as_ref().or_else(|| {
            self.options.iter().find_map(|o| match o {
                ColumnOption::Collate(c) => Some(c),
                _ => None,
            })
        })
    }

    pub fn is_not_null(&self) -> bool {
        self.options.contains(&ColumnOption::NotNull)
    }

    pub fn is_primary_key(&self) -> bool {
        self.options.contains(&ColumnOption::PrimaryKey)
    }

    /// Remove every collation this column declares.
    pub fn strip_collation(&mut self) {
        self.data_type.collate = None;
        self.options
            .retain(|o| !matches!(o, ColumnOption::Collate(_)));
    }

    /// Remove inline CHECK constraints.
    pub fn strip_checks(&mut self) {
        self.options
            .retain(|o| !matches!(o, ColumnOption::Check { .. }));
    }
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", quote_ident(&self.name), self.data_type)?;
        for option in &self.options {
            write!(f, " {option}")?;
        }
        Ok(())
    }
}

/// Options that follow a column's data type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnOption {
    NotNull,
    Null,
    /// DEFAULT with the expression as written.
    Default(String),
    AutoIncrement,
    PrimaryKey,
    UniqueKey,
    Comment(String),
    Collate(SmolStr),
    /// ON UPDATE with the expression as written.
    OnUpdate(String),
    Generated {
        expr: String,
        stored: bool,
    },
    Check {
        symbol: Option<SmolStr>,
        expr: String,
        enforced: Option<bool>,
    },
    ColumnFormat(SmolStr),
    Storage(SmolStr),
    Visible,
    Invisible,
    Srid(u32),
    References(Reference),
}

impl fmt::Display for ColumnOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotNull => f.write_str("NOT NULL"),
            Self::Null => f.write_str("NULL"),
            Self::Default(expr) => write!(f, "DEFAULT {expr}"),
            Self::AutoIncrement => f.write_str("AUTO_INCREMENT"),
            Self::PrimaryKey => f.write_str("PRIMARY KEY"),
            Self::UniqueKey => f.write_str("UNIQUE KEY"),
            Self::Comment(comment) => write!(f, "COMMENT {}", quote_string(comment)),
            Self::Collate(collate) => write!(f, "COLLATE {collate}"),
            Self::OnUpdate(expr) => write!(f, "ON UPDATE {expr}"),
            Self::Generated { expr, stored } => write!(
                f,
                "GENERATED ALWAYS AS {expr} {}",
                if *stored { "STORED" } else { "VIRTUAL" }
            ),
            Self::Check {
                symbol,
                expr,
                enforced,
            } => {
                if let Some(symbol) = symbol {
                    write!(f, "CONSTRAINT {} ", quote_ident(symbol))?;
                }
                write!(f, "CHECK {expr}")?;
                write_enforcement(f, *enforced)
            }
            Self::ColumnFormat(format) => write!(f, "COLUMN_FORMAT {format}"),
            Self::Storage(storage) => write!(f, "STORAGE {storage}"),
            Self::Visible => f.write_str("VISIBLE"),
            Self::Invisible => f.write_str("INVISIBLE"),
            Self::Srid(srid) => write!(f, "SRID {srid}"),
            Self::References(reference) => write!(f, "{reference}"),
        }
    }
}

fn write_enforcement(f: &mut fmt::Formatter<'_>, enforced: Option<bool>) -> fmt::Result {
    match enforced {
        Some(true) => f.write_str(" ENFORCED"),
        Some(false) => f.write_str(" NOT ENFORCED"),
        None => Ok(()),
    }
}

/// A FOREIGN KEY target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub table: TableName,
    pub columns: Vec<SmolStr>,
    pub match_type: Option<SmolStr>,
    pub on_delete: Option<SmolStr>,
    pub on_update: Option<SmolStr>,
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns = self
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "REFERENCES {} ({columns})", self.table)?;
        if let Some(match_type) = &self.match_type {
            write!(f, " MATCH {match_type}")?;
        }
        if let Some(action) = &self.on_delete {
            write!(f, " ON DELETE {action}")?;
        }
        if let Some(action) = &self.on_update {
            write!(f, " ON UPDATE {action}")?;
        }
        Ok(())
    }
}

/// Index algorithm named by `USING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexType {
    BTree,
    Hash,
    RTree,
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BTree => "BTREE",
            Self::Hash => "HASH",
            Self::RTree => "RTREE",
        })
    }
}

/// Options trailing an index definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexOption {
    KeyBlockSize(u64),
    Using(IndexType),
    Comment(String),
    Visible,
    Invisible,
    Parser(SmolStr),
}

impl fmt::Display for IndexOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyBlockSize(size) => write!(f, "KEY_BLOCK_SIZE={size}"),
            Self::Using(kind) => write!(f, "USING {kind}"),
            Self::Comment(comment) => write!(f, "COMMENT {}", quote_string(comment)),
            Self::Visible => f.write_str("VISIBLE"),
            Self::Invisible => f.write_str("INVISIBLE"),
            Self::Parser(parser) => write!(f, "WITH PARSER {}", quote_ident(parser)),
        }
    }
}

/// What a key part indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyTarget {
    Column(SmolStr),
    /// A functional key part, parentheses included.
    Expr(String),
}

/// One element of an index's key list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPart {
    pub target: KeyTarget,
    pub length: Option<u32>,
    /// `Some(true)` for DESC, `Some(false)` for an explicit ASC.
    pub descending: Option<bool>,
}

impl KeyPart {
    pub fn column(name: impl Into<SmolStr>) -> Self {
        Self {
            target: KeyTarget::Column(name.into()),
            length: None,
            descending: None,
        }
    }

    /// The indexed column name, if this is not a functional part.
    pub fn column_name(&self) -> Option<&SmolStr> {
        match &self.target {
            KeyTarget::Column(name) => Some(name),
            KeyTarget::Expr(_) => None,
        }
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            KeyTarget::Column(name) => f.write_str(&quote_ident(name))?,
            KeyTarget::Expr(expr) => f.write_str(expr)?,
        }
        if let Some(length) = self.length {
            write!(f, "({length})")?;
        }
        match self.descending {
            Some(true) => f.write_str(" DESC"),
            Some(false) => f.write_str(" ASC"),
            None => Ok(()),
        }
    }
}

/// Kind of table-level constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    Index,
    FullText,
    Spatial,
    ForeignKey,
    Check,
}

/// A table-level index or constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConstraint {
    pub kind: ConstraintKind,
    /// Symbol given by `CONSTRAINT symbol`.
    pub symbol: Option<SmolStr>,
    /// Index name.
    pub name: Option<SmolStr>,
    pub keys: Vec<KeyPart>,
    pub options: Vec<IndexOption>,
    pub reference: Option<Reference>,
    /// CHECK expression, parentheses included.
    pub check: Option<String>,
    pub enforced: Option<bool>,
}

impl TableConstraint {
    /// Create an empty constraint of the given kind.
    pub fn new(kind: ConstraintKind) -> Self {
        Self {
            kind,
            symbol: None,
            name: None,
            keys: Vec::new(),
            options: Vec::new(),
            reference: None,
            check: None,
            enforced: None,
        }
    }

    /// The name MySQL uses to identify this index or constraint.
    pub fn identifier(&self) -> Option<&SmolStr> {
        self.name.as_ref().or(self.symbol.as_ref())
    }

    /// Whether DROP INDEX / DROP FOREIGN KEY with `name` targets this.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name) || self.symbol.as_deref() == Some(name)
    }
}

impl fmt::Display for TableConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(symbol) = &self.symbol {
            write!(f, "CONSTRAINT {} ", quote_ident(symbol))?;
        }
        let keyword = match self.kind {
            ConstraintKind::PrimaryKey => "PRIMARY KEY",
            ConstraintKind::Unique => "UNIQUE KEY",
            ConstraintKind::Index => "KEY",
            ConstraintKind::FullText => "FULLTEXT KEY",
            ConstraintKind::Spatial => "SPATIAL KEY",
            ConstraintKind::ForeignKey => "FOREIGN KEY",
            ConstraintKind::Check => {
                write!(f, "CHECK {}", self.check.as_deref().unwrap_or("(TRUE)"))?;
                return write_enforcement(f, self.enforced);
            }
        };
        f.write_str(keyword)?;
        if let Some(name) = &self.name {
            write!(f, " {}", quote_ident(name))?;
        }
        let keys = self
            .keys
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        write!(f, " ({keys})")?;
        if let Some(reference) = &self.reference {
            write!(f, " {reference}")?;
        }
        for option in &self.options {
            write!(f, " {option}")?;
        }
        Ok(())
    }
}

/// A table option such as ENGINE or COMMENT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableOption {
    Engine(SmolStr),
    Charset(SmolStr),
    Collate(SmolStr),
    Comment(String),
    AutoIncrement(u64),
    /// Any other option, with the value as written.
    Other { name: SmolStr, value: String },
}

impl fmt::Display for TableOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine(engine) => write!(f, "ENGINE={engine}"),
            Self::Charset(charset) => write!(f, "DEFAULT CHARSET={charset}"),
            Self::Collate(collate) => write!(f, "COLLATE={collate}"),
            Self::Comment(comment) => write!(f, "COMMENT={}", quote_string(comment)),
            Self::AutoIncrement(value) => write!(f, "AUTO_INCREMENT={value}"),
            Self::Other { name, value } => write!(f, "{name}={value}"),
        }
    }
}

/// A parsed CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTable {
    pub temporary: bool,
    pub if_not_exists: bool,
    pub name: TableName,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<TableConstraint>,
    pub options: Vec<TableOption>,
    /// PARTITION BY clause body, as written.
    pub partition: Option<String>,
    /// Source table of `CREATE TABLE ... LIKE`.
    pub like: Option<TableName>,
    /// Query of `CREATE TABLE ... AS SELECT`, as written.
    pub select: Option<CreateSelect>,
}

/// The query part of `CREATE TABLE ... SELECT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSelect {
    /// `IGNORE` or `REPLACE` for duplicate keys.
    pub duplicates: Option<SmolStr>,
    pub query: String,
}

impl CreateTable {
    pub fn new(name: TableName) -> Self {
        Self {
            temporary: false,
            if_not_exists: false,
            name,
            columns: Vec::new(),
            constraints: Vec::new(),
            options: Vec::new(),
            partition: None,
            like: None,
            select: None,
        }
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.is_named(name))
    }

    /// Look up an index or constraint by name.
    pub fn constraint(&self, name: &str) -> Option<&TableConstraint> {
        self.constraints.iter().find(|c| c.is_named(name))
    }

    /// The table COMMENT, if any.
    pub fn comment(&self) -> Option<&str> {
        self.options.iter().find_map(|o| match o {
            TableOption::Comment(c) => Some(c.as_str()),
            _ => None,
        })
    }

    /// The primary key constraint, from either a table or column definition.
    pub fn primary_key_columns(&self) -> Vec<SmolStr> {
        let mut columns: Vec<SmolStr> = self
            .constraints
            .iter()
            .filter(|c| c.kind == ConstraintKind::PrimaryKey)
            .flat_map(|c| c.keys.iter().filter_map(KeyPart::column_name).cloned())
            .collect();
        columns.extend(
            self.columns
                .iter()
                .filter(|c| c.is_primary_key())
                .map(|c| c.name.clone()),
        );
        columns
    }

    /// Tables this table references through foreign keys.
    pub fn referenced_tables(&self) -> Vec<&TableName> {
        let from_constraints = self
            .constraints
            .iter()
            .filter_map(|c| c.reference.as_ref().map(|r| &r.table));
        let from_columns = self.columns.iter().flat_map(|c| {
            c.options.iter().filter_map(|o| match o {
                ColumnOption::References(r) => Some(&r.table),
                _ => None,
            })
        });
        from_constraints.chain(from_columns).collect()
    }

    /// Remove column and table collations.
    pub fn strip_collations(&mut self) {
        for column in &mut self.columns {
            column.strip_collation();
        }
        self.options.retain(|o| !matches!(o, TableOption::Collate(_)));
    }

    /// Remove CHECK constraints, both table-level and inline.
    pub fn strip_checks(&mut self) {
        self.constraints.retain(|c| c.kind != ConstraintKind::Check);
        for column in &mut self.columns {
            column.strip_checks();
        }
    }
}

impl fmt::Display for CreateTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CREATE ")?;
        if self.temporary {
            f.write_str("TEMPORARY ")?;
        }
        f.write_str("TABLE ")?;
        if self.if_not_exists {
            f.write_str("IF NOT EXISTS ")?;
        }
        write!(f, "{}", self.name)?;

        if let Some(like) = &self.like {
            return write!(f, " LIKE {like}");
        }

        if !self.columns.is_empty() || !self.constraints.is_empty() || self.select.is_none() {
            let definitions = self
                .columns
                .iter()
                .map(ToString::to_string)
                .chain(self.constraints.iter().map(ToString::to_string))
                .map(|d| format!("  {d}"))
                .collect::<Vec<_>>()
                .join(",\n");
            write!(f, " (\n{definitions}\n)")?;
        }

        for option in &self.options {
            write!(f, " {option}")?;
        }
        if let Some(partition) = &self.partition {
            write!(f, "\nPARTITION BY {partition}")?;
        }
        if let Some(select) = &self.select {
            if let Some(duplicates) = &select.duplicates {
                write!(f, " {duplicates}")?;
            }
            write!(f, " AS {}", select.query)?;
        }
        Ok(())
    }
}
