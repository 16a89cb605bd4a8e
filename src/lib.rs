//! # strata
//!
//! Versioned MySQL schema migrations with sandbox dry-runs and automatic
//! reversal.
//!
//! strata provides:
//! - Per-module migration scripts in SQL or Python
//! - Content lint rules checked before anything executes
//! - A dry run in a disposable sandbox database seeded with the live schema
//! - A rolled-back dry run against the live database
//! - Reversing SQL recorded for every installed DDL statement
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use strata::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), MigrateError> {
//!     let config = MigratorConfig::new()
//!         .migration_dir("migrations")
//!         .database(MysqlConfig::from_url("mysql://root@localhost/app")?)
//!         .sandbox(MysqlConfig::from_url("mysql://root@localhost:3307/app_sandbox")?);
//!
//!     let report = Migrator::from_config(config).await?.run().await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Script splitting, DDL parsing and the schema model.
pub mod sql {
    pub use strata_sql::*;
}

/// MySQL connectivity.
pub mod mysql {
    pub use strata_mysql::*;
}

/// The migration engine.
pub mod migrate {
    pub use strata_migrate::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::migrate::{
        InstallingType, MigrateError, MigrateResult, MigrationReport, Migrator, MigratorConfig,
        Module, Script, Scripts,
    };
    pub use crate::mysql::{MysqlConfig, RetryPolicy};
    pub use crate::sql::{Schema, Statement, parse_script};
}

// Re-export key types at the crate root
pub use migrate::{MigrateError, Migrator, MigratorConfig};
pub use sql::{Schema, SqlError};
