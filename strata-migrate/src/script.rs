//! A single versioned migration script.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strata_sql::{Statement, StatementNode, parse_script};

use crate::error::{MigrateError, MigrateResult};
use crate::history::HistoryRecord;

/// Marker that opens a baseline script.
pub const BASELINE_MARKER: &str = "MIGRATION_BASE";

/// File name prefix of a patch: `patch-<script>` repairs the installed
/// `<script>` of the same module.
pub const PATCH_PREFIX: &str = "patch-";

/// The language a script is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptType {
    Sql,
    Python,
}

impl ScriptType {
    /// Classify a file by extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "sql" => Some(Self::Sql),
            "py" => Some(Self::Python),
            _ => None,
        }
    }

    /// Value stored in the history `language_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sql => "sql",
            Self::Python => "python",
        }
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A migration script loaded from disk.
#[derive(Debug, Clone)]
pub struct Script {
    /// File name, unique within a module.
    pub name: String,
    /// Path relative to the working directory.
    pub path: PathBuf,
    pub script_type: ScriptType,
    /// Raw file content.
    raw: Vec<u8>,
    /// Parsed statements; empty for Python scripts.
    nodes: Vec<StatementNode>,
    baseline: bool,
    checksum: String,
    /// Not yet recorded in the history table.
    pub pending: bool,
    /// The history record, once the script is known to be installed.
    pub record: Option<HistoryRecord>,
}

impl Script {
    /// Read and parse `relative` under `workdir`.
    pub async fn load(workdir: &Path, relative: impl AsRef<Path>) -> MigrateResult<Self> {
        let relative = relative.as_ref();
        let full = workdir.join(relative);
        let raw = tokio::fs::read(&full)
            .await
            .map_err(|e| MigrateError::io(&full, e))?;
        let name = relative
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MigrateError::config(format!("invalid script path {}", full.display())))?
            .to_string();
        let script_type = ScriptType::from_path(relative).ok_or_else(|| {
            MigrateError::config(format!("{name} is neither a .sql nor a .py script"))
        })?;
        let mut script = Self::from_bytes(name, script_type, raw)?;
        script.path = relative.to_path_buf();
        Ok(script)
    }

    /// Build a script from content held in memory.
    pub fn from_bytes(
        name: impl Into<String>,
        script_type: ScriptType,
        raw: Vec<u8>,
    ) -> MigrateResult<Self> {
        let name = name.into();
        let checksum = checksum(&raw);
        let text = std::str::from_utf8(&raw)
            .map_err(|source| MigrateError::Encoding {
                script: name.clone(),
                source,
            })?
            .trim_start();
        let baseline = is_baseline(text);

        let nodes = match script_type {
            ScriptType::Python => Vec::new(),
            ScriptType::Sql => parse_sql(&name, text, baseline)?,
        };

        Ok(Self {
            path: PathBuf::from(&name),
            name,
            script_type,
            raw,
            nodes,
            baseline,
            checksum,
            pending: true,
            record: None,
        })
    }

    /// Build a SQL script from text.
    pub fn sql(name: impl Into<String>, text: &str) -> MigrateResult<Self> {
        Self::from_bytes(name, ScriptType::Sql, text.as_bytes().to_vec())
    }

    /// File name without its extension; scripts sort by this.
    pub fn stem(&self) -> &str {
        self.name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&self.name)
    }

    pub fn is_baseline(&self) -> bool {
        self.baseline
    }

    /// The script this patch repairs, if it is a patch.
    pub fn patch_target(&self) -> Option<&str> {
        self.name
            .strip_prefix(PATCH_PREFIX)
            .filter(|target| !target.is_empty())
    }

    pub fn is_sql(&self) -> bool {
        self.script_type == ScriptType::Sql
    }

    /// SHA-256 of the raw file content, hex encoded.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Raw content as text. Scripts are valid UTF-8 once loaded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }

    /// Every parsed statement, in file order.
    pub fn nodes(&self) -> &[StatementNode] {
        &self.nodes
    }

    /// DDL statements, without LOCK/UNLOCK TABLES.
    pub fn ddl_nodes(&self) -> impl Iterator<Item = &StatementNode> {
        self.nodes.iter().filter(|n| {
            n.statement.is_ddl()
                && !matches!(
                    n.statement,
                    Statement::LockTables(_) | Statement::UnlockTables(_)
                )
        })
    }

    /// DML and SET statements.
    pub fn dml_nodes(&self) -> impl Iterator<Item = &StatementNode> {
        self.nodes
            .iter()
            .filter(|n| n.statement.is_dml() || n.statement.is_set())
    }

    /// Whether there is nothing to execute.
    pub fn is_empty(&self) -> bool {
        match self.script_type {
            ScriptType::Sql => self.nodes.is_empty(),
            ScriptType::Python => self.raw.iter().all(u8::is_ascii_whitespace),
        }
    }
}

/// Hex-encoded SHA-256 of `data`.
pub fn checksum(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Whether text (leading whitespace already trimmed) opens with the
/// baseline marker comment.
pub fn is_baseline(text: &str) -> bool {
    let first_line = text.lines().next().unwrap_or("").trim();
    let body = if let Some(rest) = first_line.strip_prefix("--") {
        rest
    } else if let Some(rest) = first_line.strip_prefix('#') {
        rest
    } else if let Some(rest) = first_line.strip_prefix("/*") {
        match rest.split_once("*/") {
            Some((inner, _)) => inner,
            None => return false,
        }
    } else {
        return false;
    };
    body.split_whitespace()
        .next()
        .is_some_and(|word| word.eq_ignore_ascii_case(BASELINE_MARKER))
}

fn parse_sql(name: &str, text: &str, baseline: bool) -> MigrateResult<Vec<StatementNode>> {
    let nodes = parse_script(text).map_err(|source| MigrateError::Parse {
        script: name.to_string(),
        source,
    })?;

    let mut kept = Vec::with_capacity(nodes.len());
    for node in nodes {
        let statement = &node.statement;
        if statement.is_ddl() || statement.is_dml() || statement.is_set() {
            kept.push(node);
        } else if !baseline {
            return Err(MigrateError::UnsupportedStatement {
                script: name.to_string(),
                kind: statement.kind_name().to_string(),
                sql: node.text,
            });
        }
    }
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_checksum_stability() {
        let a = Script::sql("a.sql", "CREATE TABLE t (id BIGINT);").unwrap();
        let b = Script::sql("b.sql", "CREATE TABLE t (id BIGINT);").unwrap();
        let c = Script::sql("c.sql", "CREATE TABLE t (id BIGINT) ;").unwrap();
        assert_eq!(a.checksum(), b.checksum());
        assert_ne!(a.checksum(), c.checksum());
        assert_eq!(a.checksum().len(), 64);
    }

    #[test]
    fn test_baseline_markers() {
        assert!(is_baseline("# MIGRATION_BASE\nCREATE TABLE t (id INT);"));
        assert!(is_baseline("-- MIGRATION_BASE\n"));
        assert!(is_baseline("/* MIGRATION_BASE */ CREATE TABLE t (id INT);"));
        assert!(!is_baseline("CREATE TABLE t (id INT); -- MIGRATION_BASE"));
        assert!(!is_baseline("-- migration base"));
    }

    #[test]
    fn test_leading_whitespace_before_marker() {
        let script = Script::sql("base.sql", "\n\n  -- MIGRATION_BASE\nCREATE TABLE t (id INT);").unwrap();
        assert!(script.is_baseline());
    }

    #[test]
    fn test_ddl_and_dml_nodes() {
        let script = Script::sql(
            "0001.sql",
            "LOCK TABLES t WRITE;
             CREATE TABLE t (id BIGINT);
             SET NAMES utf8mb4;
             INSERT INTO t VALUES (1);
             UNLOCK TABLES;",
        )
        .unwrap();

        let ddl: Vec<_> = script.ddl_nodes().map(|n| n.statement.kind_name()).collect();
        assert_eq!(ddl, vec!["CreateTableStmt"]);
        let dml: Vec<_> = script.dml_nodes().map(|n| n.statement.kind_name()).collect();
        assert_eq!(dml, vec!["SetStmt", "InsertStmt"]);
        assert_eq!(script.nodes().len(), 5);
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let mut raw = b"INSERT INTO t (name) VALUES ('caf".to_vec();
        raw.extend([0xE9, b'\'', b')', b';']);
        let err = Script::from_bytes("0003.sql", ScriptType::Sql, raw).unwrap_err();
        assert!(matches!(err, MigrateError::Encoding { ref script, .. } if script == "0003.sql"), "{err}");
        assert!(err.to_string().contains("not valid UTF-8"));

        let err = Script::from_bytes("0003.py", ScriptType::Python, vec![0xFF, 0xFE]).unwrap_err();
        assert!(matches!(err, MigrateError::Encoding { .. }));
    }

    #[test]
    fn test_unsupported_statement_rejected() {
        let err = Script::sql("0002.sql", "GRANT ALL ON *.* TO 'u';").unwrap_err();
        assert!(matches!(err, MigrateError::UnsupportedStatement { .. }), "{err}");
    }

    #[test]
    fn test_baseline_skips_unsupported_statement() {
        let script = Script::sql(
            "base.sql",
            "# MIGRATION_BASE\nGRANT ALL ON *.* TO 'u';\nCREATE TABLE t (id BIGINT);",
        )
        .unwrap();
        assert_eq!(script.nodes().len(), 1);
    }

    #[test]
    fn test_version_hints_are_inert() {
        let script = Script::sql(
            "0003.sql",
            "/*!40101 SET @OLD_CHARACTER_SET_CLIENT=@@CHARACTER_SET_CLIENT */;\nCREATE TABLE t (id BIGINT);",
        )
        .unwrap();
        assert_eq!(script.nodes().len(), 1);
    }

    #[test]
    fn test_python_script() {
        let script = Script::from_bytes(
            "0004.py",
            ScriptType::Python,
            b"def entry(db):\n    pass\n".to_vec(),
        )
        .unwrap();
        assert!(script.nodes().is_empty());
        assert!(!script.is_empty());
        assert_eq!(script.stem(), "0004");
        assert_eq!(script.script_type.as_str(), "python");
    }

    #[test]
    fn test_patch_target() {
        let patch = Script::sql("patch-20240101-init.sql", "UPDATE t SET x = 1;").unwrap();
        assert_eq!(patch.patch_target(), Some("20240101-init.sql"));
        assert_eq!(Script::sql("20240101-init.sql", "").unwrap().patch_target(), None);
        assert_eq!(Script::sql("patch-", "").unwrap().patch_target(), None);
    }

    #[tokio::test]
    async fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("orders")).unwrap();
        std::fs::write(
            dir.path().join("orders/20240101-init.sql"),
            "CREATE TABLE orders (id BIGINT);",
        )
        .unwrap();

        let script = Script::load(dir.path(), "orders/20240101-init.sql")
            .await
            .unwrap();
        assert_eq!(script.name, "20240101-init.sql");
        assert_eq!(script.path, PathBuf::from("orders/20240101-init.sql"));
        assert!(script.pending);
    }
}
