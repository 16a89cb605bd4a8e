//! Migration history tracking.
//!
//! Every installed script gets one row in [`HISTORY_TABLE`], together with
//! the SQL that undoes it. Rows are inserted once; a patch may later
//! correct the checksum of the script it repairs.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strata_mysql::TextRow;
use strata_sql::quote_string;

use crate::db::Executor;
use crate::error::{MigrateError, MigrateResult};
use crate::script::{Script, ScriptType};

/// Name of the history table.
pub const HISTORY_TABLE: &str = "schema_migration_history";

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SQL for creating the history table.
pub const CREATE_HISTORY_TABLE_SQL: &str = r#"CREATE TABLE IF NOT EXISTS `schema_migration_history` (
    `id` BIGINT UNSIGNED NOT NULL AUTO_INCREMENT COMMENT 'primary key',
    `created_at` DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP COMMENT 'created time',
    `updated_at` DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP COMMENT 'updated time',
    `service_name` VARCHAR(32) NOT NULL COMMENT 'module name',
    `filename` VARCHAR(191) NOT NULL COMMENT 'script file name',
    `checksum` CHAR(64) NOT NULL COMMENT 'sha256 of the script content',
    `installed_by` VARCHAR(32) NOT NULL COMMENT 'installer',
    `installed_on` VARCHAR(32) NOT NULL COMMENT 'install host',
    `language_type` VARCHAR(16) NOT NULL COMMENT 'sql or python',
    `reversed` LONGTEXT NOT NULL COMMENT 'SQL that undoes the script',
    PRIMARY KEY (`id`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COMMENT='schema migration history'"#;

const SELECT_COLUMNS: &str = "id, created_at, updated_at, service_name, filename, checksum, installed_by, installed_on, language_type, reversed";

/// A record of an installed script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: u64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    /// Module the script belongs to.
    pub service_name: String,
    pub filename: String,
    pub checksum: String,
    pub installed_by: String,
    pub installed_on: String,
    pub language_type: String,
    /// Reversing statements in forward order, as a JSON array of strings.
    pub reversed: String,
}

impl HistoryRecord {
    /// A record for `script`, not yet inserted.
    pub fn for_script(
        module: &str,
        script: &Script,
        reversing: &[String],
        installed_by: &str,
        installed_on: &str,
    ) -> Self {
        let now = Local::now().naive_local();
        Self {
            id: 0,
            created_at: now,
            updated_at: now,
            service_name: module.to_string(),
            filename: script.name.clone(),
            checksum: script.checksum().to_string(),
            installed_by: installed_by.to_string(),
            installed_on: installed_on.to_string(),
            language_type: script.script_type.as_str().to_string(),
            reversed: serde_json::to_string(reversing).unwrap_or_default(),
        }
    }

    /// Decode a row selected with the history columns.
    pub fn from_row(row: &TextRow) -> MigrateResult<Self> {
        let text = |name: &str| row.get_by_name(name).unwrap_or_default().to_string();
        let time = |name: &str| -> MigrateResult<NaiveDateTime> {
            let value = row.get_by_name(name).unwrap_or_default();
            // DATETIME(6) columns carry a fractional part.
            let value = value.split('.').next().unwrap_or_default();
            NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).map_err(|e| {
                MigrateError::snapshot(HISTORY_TABLE, format!("invalid {name} `{value}`: {e}"))
            })
        };

        Ok(Self {
            id: row
                .get_by_name("id")
                .and_then(|id| id.parse().ok())
                .unwrap_or_default(),
            created_at: time("created_at")?,
            updated_at: time("updated_at")?,
            service_name: text("service_name"),
            filename: text("filename"),
            checksum: text("checksum"),
            installed_by: text("installed_by"),
            installed_on: text("installed_on"),
            language_type: text("language_type"),
            reversed: text("reversed"),
        })
    }

    pub fn is_python(&self) -> bool {
        self.language_type == ScriptType::Python.as_str()
    }

    /// The reversing statements, in forward order.
    ///
    /// Rows whose `reversed` column is not a JSON array are read as one
    /// statement per line.
    pub fn reversing(&self) -> Vec<String> {
        let statements = match serde_json::from_str::<Vec<String>>(&self.reversed) {
            Ok(statements) => statements,
            Err(_) => self.reversed.lines().map(String::from).collect(),
        };
        statements
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// INSERT statement for this record.
    pub fn insert_sql(&self) -> String {
        let values = [
            self.created_at.format(DATETIME_FORMAT).to_string(),
            self.updated_at.format(DATETIME_FORMAT).to_string(),
            self.service_name.clone(),
            self.filename.clone(),
            self.checksum.clone(),
            self.installed_by.clone(),
            self.installed_on.clone(),
            self.language_type.clone(),
            self.reversed.clone(),
        ]
        .iter()
        .map(|v| quote_string(v))
        .collect::<Vec<_>>()
        .join(", ");

        format!(
            "INSERT INTO {HISTORY_TABLE} (created_at, updated_at, service_name, filename, checksum, installed_by, installed_on, language_type, reversed) VALUES ({values})"
        )
    }
}

/// Create the history table if it does not exist.
pub async fn create_table(db: &mut dyn Executor) -> MigrateResult<()> {
    db.execute(CREATE_HISTORY_TABLE_SQL).await?;
    Ok(())
}

/// Whether the history table exists.
pub async fn table_exists(db: &mut dyn Executor) -> MigrateResult<bool> {
    let rows = db
        .query(&format!("SHOW TABLES LIKE {}", quote_string(HISTORY_TABLE)))
        .await?;
    Ok(!rows.is_empty())
}

/// Number of history rows.
pub async fn count(db: &mut dyn Executor) -> MigrateResult<u64> {
    let rows = db
        .query(&format!("SELECT COUNT(*) FROM {HISTORY_TABLE}"))
        .await?;
    Ok(rows
        .first()
        .and_then(|row| row.get(0))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0))
}

/// Every history row, oldest first.
pub async fn records(db: &mut dyn Executor) -> MigrateResult<Vec<HistoryRecord>> {
    let rows = db
        .query(&format!(
            "SELECT {SELECT_COLUMNS} FROM {HISTORY_TABLE} ORDER BY id"
        ))
        .await?;
    rows.iter().map(HistoryRecord::from_row).collect()
}

/// Point the record of one script at a new checksum.
pub async fn update_checksum(
    db: &mut dyn Executor,
    module: &str,
    filename: &str,
    checksum: &str,
) -> MigrateResult<()> {
    let now = Local::now().naive_local().format(DATETIME_FORMAT).to_string();
    db.execute(&update_checksum_sql(module, filename, checksum, &now))
        .await?;
    Ok(())
}

fn update_checksum_sql(module: &str, filename: &str, checksum: &str, now: &str) -> String {
    format!(
        "UPDATE {HISTORY_TABLE} SET checksum = {}, updated_at = {} WHERE service_name = {} AND filename = {}",
        quote_string(checksum),
        quote_string(now),
        quote_string(module),
        quote_string(filename)
    )
}

/// The record for one script, if installed.
pub async fn find(
    db: &mut dyn Executor,
    module: &str,
    filename: &str,
) -> MigrateResult<Option<HistoryRecord>> {
    let rows = db
        .query(&format!(
            "SELECT {SELECT_COLUMNS} FROM {HISTORY_TABLE} WHERE service_name = {} AND filename = {} ORDER BY id LIMIT 1",
            quote_string(module),
            quote_string(filename)
        ))
        .await?;
    rows.first().map(HistoryRecord::from_row).transpose()
}

/// Insert one record.
pub async fn insert(db: &mut dyn Executor, record: &HistoryRecord) -> MigrateResult<()> {
    db.execute(&record.insert_sql()).await?;
    Ok(())
}
