//! Abstract syntax tree for the MySQL statements the migrator works with.

mod alter;
mod statement;
mod table;
mod types;

pub use alter::{AlterColumnOp, AlterSpec, AlterTable, ColumnPosition, PartitionKind, PartitionOp};
pub use statement::{CreateIndex, DmlKind, IndexClass, RenamePair, Statement, StatementNode};
pub use table::{
    ColumnDef, ColumnOption, ConstraintKind, CreateSelect, CreateTable, IndexOption, IndexType, KeyPart,
    KeyTarget, Reference, TableConstraint, TableName, TableOption,
};
pub use types::{DataType, TypeCode, UNSPECIFIED_LENGTH};
