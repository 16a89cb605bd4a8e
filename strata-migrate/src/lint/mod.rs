//! Content lint rules for pending scripts.
//!
//! A rule inspects one statement at a time and reports what is wrong with
//! it. Rules are handed to the migrator explicitly; [`default_rules`] builds
//! the configured set.

mod rules;

use std::fmt;

use serde::{Deserialize, Serialize};
use strata_sql::StatementNode;

pub use rules::{
    AllowedStatementRule, ColumnCommentRule, ColumnRenameRule, FloatDoubleRule, ForeignKeyRule,
    PrimaryIdRule, TableCommentRule, TimestampsRule, VarcharLengthRule,
};

/// Names of every shipped rule, in reporting order.
pub const RULE_NAMES: &[&str] = &[
    AllowedStatementRule::NAME,
    TableCommentRule::NAME,
    ColumnCommentRule::NAME,
    PrimaryIdRule::NAME,
    TimestampsRule::NAME,
    FloatDoubleRule::NAME,
    ForeignKeyRule::NAME,
    VarcharLengthRule::NAME,
    ColumnRenameRule::NAME,
];

/// A check applied to every statement of every pending script.
pub trait LintRule: Send + Sync {
    /// Stable rule name, as used in configuration.
    fn name(&self) -> &'static str;

    /// Problems found in one statement; empty when it passes.
    fn check(&self, node: &StatementNode) -> Vec<String>;
}

/// Which rules run and how they are tuned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LintConfig {
    /// Enabled rule names.
    pub rules: Vec<String>,
    /// DDL statement and ALTER TABLE spec kinds that may appear.
    pub allowed_ddl: Vec<String>,
    /// DML statement kinds that may appear.
    pub allowed_dml: Vec<String>,
    pub max_varchar_length: i64,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            rules: RULE_NAMES.iter().map(|s| s.to_string()).collect(),
            allowed_ddl: [
                "CreateTableStmt",
                "CreateIndexStmt",
                "DropIndexStmt",
                "AlterTableOption",
                "AlterTableAddColumns",
                "AlterTableAddConstraint",
                "AlterTableDropIndex",
                "AlterTableModifyColumn",
                "AlterTableChangeColumn",
                "AlterTableAlterColumn",
                "AlterTableRenameIndex",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            allowed_dml: ["SelectStmt", "InsertStmt", "UpdateStmt", "ShowStmt"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_varchar_length: 5000,
        }
    }
}

/// Build the rules enabled in `config`.
///
/// Unknown rule names are ignored with a warning.
pub fn default_rules(config: &LintConfig) -> Vec<Box<dyn LintRule>> {
    let mut rules: Vec<Box<dyn LintRule>> = Vec::new();
    for name in &config.rules {
        let rule: Box<dyn LintRule> = match name.as_str() {
            AllowedStatementRule::NAME => Box::new(AllowedStatementRule::new(
                config.allowed_ddl.clone(),
                config.allowed_dml.clone(),
            )),
            TableCommentRule::NAME => Box::new(TableCommentRule),
            ColumnCommentRule::NAME => Box::new(ColumnCommentRule),
            PrimaryIdRule::NAME => Box::new(PrimaryIdRule),
            TimestampsRule::NAME => Box::new(TimestampsRule),
            FloatDoubleRule::NAME => Box::new(FloatDoubleRule),
            ForeignKeyRule::NAME => Box::new(ForeignKeyRule),
            VarcharLengthRule::NAME => Box::new(VarcharLengthRule::new(config.max_varchar_length)),
            ColumnRenameRule::NAME => Box::new(ColumnRenameRule),
            other => {
                tracing::warn!(rule = %other, "Unknown lint rule");
                continue;
            }
        };
        rules.push(rule);
    }
    rules
}

/// One problem found by a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub module: String,
    pub script: String,
    pub rule: String,
    pub message: String,
    pub sql: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}/{}: {}\n    {}",
            self.rule, self.module, self.script, self.message, self.sql
        )
    }
}

/// All violations of a lint pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintReport {
    pub violations: Vec<Violation>,
}

impl LintReport {
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Run `rules` over one statement and record what they report.
    pub fn check(
        &mut self,
        rules: &[Box<dyn LintRule>],
        module: &str,
        script: &str,
        node: &StatementNode,
    ) {
        for rule in rules {
            for message in rule.check(node) {
                self.violations.push(Violation {
                    module: module.to_string(),
                    script: script.to_string(),
                    rule: rule.name().to_string(),
                    message,
                    sql: node.text.clone(),
                });
            }
        }
    }
}

impl fmt::Display for LintReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "lint found {} problem(s):", self.violations.len())?;
        for violation in &self.violations {
            writeln!(f, "{violation}")?;
        }
        Ok(())
    }
}
