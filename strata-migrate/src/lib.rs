//! # strata-migrate
//!
//! Migration engine for MySQL schemas.
//!
//! This crate provides functionality for:
//! - Loading per-module `.sql` and `.py` migration scripts
//! - Linting scripts before anything touches the database
//! - Dry runs in a throwaway sandbox database
//! - Automatic reversing SQL for every DDL statement
//! - Per-script transactional installation with a history table
//! - `patch-*.sql` scripts that repair installed scripts in place
//! - Collecting the installed SQL into one file per run
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌─────────────┐
//! │ Live DB      │────▶│ Snapshot       │────▶│ Sandbox     │
//! └──────────────┘     └────────────────┘     └─────────────┘
//!        │                                           │
//!        ▼                                           ▼
//! ┌──────────────┐     ┌────────────────┐     ┌─────────────┐
//! │ Scripts+Lint │────▶│ Pre-migrate    │────▶│ Migrate     │
//! └──────────────┘     │ (rolled back)  │     └─────────────┘
//!                      └────────────────┘            │
//!                                                    ▼
//!                                            ┌─────────────┐
//!                                            │ History Tbl │
//!                                            └─────────────┘
//! ```
//!
//! How much of that runs depends on the live database:
//!
//! | State | Condition | Extra work |
//! |---|---|---|
//! | first_time_install | no application tables | creates the history table |
//! | first_time_update | tables but no history rows | baselines must match the live schema |
//! | normal_update | history rows exist | installed scripts must be unchanged |
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_migrate::{Migrator, MigratorConfig};
//! use strata_mysql::MysqlConfig;
//!
//! async fn migrate() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MigratorConfig::new()
//!         .workdir(".")
//!         .migration_dir("migrations")
//!         .database(MysqlConfig::from_url("mysql://root@localhost/app")?)
//!         .sandbox(MysqlConfig::from_url("mysql://root@localhost:3307/app_sandbox")?);
//!
//!     let mut migrator = Migrator::from_config(config).await?;
//!     let report = migrator.run().await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```
//!
//! ## Migration Files
//!
//! ```text
//! migrations/
//! ├── billing/
//! │   ├── 20230101-base.sql      # -- MIGRATION_BASE
//! │   ├── 20240210-invoices.sql
//! │   ├── 20240301-backfill.py
//! │   └── patch-20240210-invoices.sql
//! └── orders/
//!     ├── 20240115-orders.sql
//!     └── requirements.txt
//! ```

pub mod collector;
pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod lint;
pub mod migrator;
pub mod module;
pub mod pygrator;
pub mod reverser;
pub mod sandbox;
pub mod script;
pub mod scripts;
pub mod snapshot;

pub use collector::SqlCollector;
pub use config::MigratorConfig;
pub use db::{Connector, Executor, MysqlConnector};
pub use error::{MigrateError, MigrateResult};
pub use history::{HISTORY_TABLE, HistoryRecord};
pub use lint::{LintConfig, LintReport, LintRule, Violation, default_rules};
pub use migrator::{InstallingType, MigrationReport, Migrator, Phase, ScriptState, ScriptStatus};
pub use module::Module;
pub use pygrator::{Package, PythonSettings};
pub use reverser::{reverse_create_table_stmts, reverse_ddl, reverse_ddl_with_snapshot};
pub use sandbox::{Sandbox, SandboxState};
pub use script::{PATCH_PREFIX, Script, ScriptType};
pub use scripts::Scripts;
pub use snapshot::Snapshot;
