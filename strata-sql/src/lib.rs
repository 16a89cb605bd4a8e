//! # strata-sql
//!
//! MySQL script parsing for the strata migration engine.
//!
//! This crate provides:
//! - A script splitter that understands quotes, comments and version hints
//! - A pest-based parser for the DDL forms the migrator reasons about
//! - A typed AST that renders back to MySQL text
//! - A logical [`Schema`] model with structural equality
//!
//! ## Example
//!
//! ```rust
//! use strata_sql::{Schema, Statement, parse_script};
//!
//! let nodes = parse_script(
//!     "CREATE TABLE t (id BIGINT NOT NULL); INSERT INTO t VALUES (1);",
//! ).unwrap();
//! assert!(matches!(nodes[0].statement, Statement::CreateTable(_)));
//! assert!(nodes[1].statement.is_dml());
//!
//! let schema: Schema = nodes.iter().map(|n| &n.statement).collect();
//! assert_eq!(schema.table_names(), vec!["t"]);
//! ```

pub mod ast;
pub mod error;
pub mod parser;
pub mod quote;
pub mod schema;

pub use ast::*;
pub use error::{SqlError, SqlResult};
pub use parser::{RawStatement, parse_create_table, parse_script, parse_statement, split_script};
pub use quote::{quote_ident, quote_string};
pub use schema::{Equality, FieldType, Schema, TableDefinition, field_type_equal};
