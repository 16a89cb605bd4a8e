//! Logical schema folded from DDL, and structural equality.
//!
//! A [`Schema`] is built by entering DDL statements in order. It tracks only
//! what the equality check needs: each table's columns and their types.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::ast::{AlterSpec, ColumnDef, CreateTable, Statement, TypeCode, UNSPECIFIED_LENGTH};

/// The comparable part of a column type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldType {
    pub code: TypeCode,
    pub length: i64,
    pub scale: i64,
    pub collation: String,
    pub unsigned: bool,
    pub elems: Vec<String>,
}

impl FieldType {
    pub fn from_column(column: &ColumnDef) -> Self {
        let data_type = &column.data_type;
        Self {
            code: data_type.code,
            length: data_type.length,
            scale: data_type.scale,
            collation: column
                .collation()
                .map(ToString::to_string)
                .unwrap_or_default(),
            unsigned: data_type.unsigned,
            elems: data_type.elems.clone(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)?;
        if self.code.has_elements() {
            write!(f, "({})", self.elems.join(","))?;
        } else if self.length != UNSPECIFIED_LENGTH {
            if self.scale != UNSPECIFIED_LENGTH {
                write!(f, "({},{})", self.length, self.scale)?;
            } else {
                write!(f, "({})", self.length)?;
            }
        }
        if self.unsigned {
            f.write_str(" UNSIGNED")?;
        }
        if !self.collation.is_empty() {
            write!(f, " COLLATE {}", self.collation)?;
        }
        Ok(())
    }
}

/// Outcome of a structural comparison, with the reasons for any mismatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Equality {
    reasons: Vec<String>,
}

impl Equality {
    pub fn equal() -> Self {
        Self::default()
    }

    pub fn unequal(reason: impl Into<String>) -> Self {
        Self {
            reasons: vec![reason.into()],
        }
    }

    pub fn is_equal(&self) -> bool {
        self.reasons.is_empty()
    }

    /// All reasons joined into one line per mismatch.
    pub fn reason(&self) -> String {
        self.reasons.join("\n")
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    /// Record a mismatch.
    pub fn push(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }

    /// Absorb another comparison's reasons.
    pub fn merge(&mut self, other: Equality) {
        self.reasons.extend(other.reasons);
    }
}

/// Compare two column types, returning the first difference.
pub fn field_type_equal(left: &FieldType, right: &FieldType) -> Equality {
    if left.code != right.code {
        return Equality::unequal(format!(
            "type mismatch: {} vs {}",
            left.code, right.code
        ));
    }

    let unspecified = |v: i64| v == UNSPECIFIED_LENGTH;
    if !left.code.is_integer()
        && !unspecified(left.length)
        && !unspecified(right.length)
        && left.length != right.length
    {
        return Equality::unequal(format!(
            "length mismatch: {} vs {}",
            left.length, right.length
        ));
    }

    if !unspecified(left.scale) && !unspecified(right.scale) && left.scale != right.scale {
        return Equality::unequal(format!(
            "decimal scale mismatch: {} vs {}",
            left.scale, right.scale
        ));
    }

    if left.collation != right.collation {
        return Equality::unequal(format!(
            "collation mismatch: {:?} vs {:?}",
            left.collation, right.collation
        ));
    }

    if left.unsigned != right.unsigned {
        return Equality::unequal(format!(
            "unsigned mismatch: {} vs {}",
            left.unsigned, right.unsigned
        ));
    }

    if left.code.has_elements() {
        if left.elems.len() != right.elems.len() {
            return Equality::unequal(format!(
                "element count mismatch: {} vs {}",
                left.elems.len(),
                right.elems.len()
            ));
        }
        let mut l = left.elems.clone();
        let mut r = right.elems.clone();
        l.sort();
        r.sort();
        if let Some((a, b)) = l.iter().zip(&r).find(|(a, b)| a != b) {
            return Equality::unequal(format!("element mismatch: {a:?} vs {b:?}"));
        }
    }

    Equality::equal()
}

/// Columns of one table, folded from CREATE and ALTER statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: SmolStr,
    pub columns: IndexMap<SmolStr, FieldType>,
}

impl TableDefinition {
    pub fn from_create(create: &CreateTable) -> Self {
        Self {
            name: create.name.name.clone(),
            columns: create
                .columns
                .iter()
                .map(|c| (c.name.clone(), FieldType::from_column(c)))
                .collect(),
        }
    }

    /// Fold the column-affecting specs of an ALTER TABLE.
    ///
    /// CHANGE COLUMN replaces the type of the column named by the new
    /// definition; renames are not tracked.
    pub fn apply_alter(&mut self, specs: &[AlterSpec]) {
        for spec in specs {
            match spec {
                AlterSpec::AddColumns { columns, .. } => {
                    for column in columns {
                        self.columns
                            .insert(column.name.clone(), FieldType::from_column(column));
                    }
                }
                AlterSpec::ModifyColumn { column, .. } | AlterSpec::ChangeColumn { column, .. } => {
                    if let Some(field) = self.column_mut(&column.name) {
                        *field = FieldType::from_column(column);
                    }
                }
                _ => {}
            }
        }
    }

    fn column_mut(&mut self, name: &str) -> Option<&mut FieldType> {
        self.columns
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, field)| field)
    }

    pub fn column(&self, name: &str) -> Option<&FieldType> {
        self.columns
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, field)| field)
    }

    /// Compare column sets and types, stopping at the first difference.
    pub fn equal(&self, other: &TableDefinition) -> Equality {
        if self.columns.len() != other.columns.len() {
            return Equality::unequal(format!(
                "table `{}`: column count mismatch: {} vs {}",
                self.name,
                self.columns.len(),
                other.columns.len()
            ));
        }
        for (name, field) in &self.columns {
            let Some(theirs) = other.column(name) else {
                return Equality::unequal(format!(
                    "table `{}`: column `{name}` is missing on the other side",
                    self.name
                ));
            };
            let equality = field_type_equal(field, theirs);
            if !equality.is_equal() {
                return Equality::unequal(format!(
                    "table `{}`: column `{name}`: {}",
                    self.name,
                    equality.reason()
                ));
            }
        }
        Equality::equal()
    }
}

/// Tables by name, in the order they were created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub tables: IndexMap<SmolStr, TableDefinition>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one statement into the schema.
    pub fn enter(&mut self, statement: &Statement) {
        match statement {
            Statement::CreateTable(create) => {
                self.tables
                    .insert(create.name.name.clone(), TableDefinition::from_create(create));
            }
            Statement::DropTable { tables, .. } => {
                for table in tables {
                    self.tables.shift_remove(&table.name);
                }
            }
            Statement::AlterTable(alter) => {
                if let Some(table) = self.tables.get_mut(&alter.name.name) {
                    table.apply_alter(&alter.specs);
                }
            }
            _ => {}
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.get(name)
    }

    pub fn table_names(&self) -> Vec<SmolStr> {
        self.tables.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Compare table sets and every table pair, accumulating all reasons.
    pub fn equal(&self, other: &Schema) -> Equality {
        let mut equality = Equality::equal();
        if self.tables.len() != other.tables.len() {
            equality.push(format!(
                "table count mismatch: {} vs {}",
                self.tables.len(),
                other.tables.len()
            ));
        }
        for (name, table) in &self.tables {
            match other.tables.get(name) {
                Some(theirs) => equality.merge(table.equal(theirs)),
                None => equality.push(format!("table `{name}` is missing on the other side")),
            }
        }
        equality
    }
}

impl<'a> FromIterator<&'a Statement> for Schema {
    fn from_iter<I: IntoIterator<Item = &'a Statement>>(iter: I) -> Self {
        let mut schema = Schema::new();
        for statement in iter {
            schema.enter(statement);
        }
        schema
    }
}
