//! Error types for script splitting and statement parsing.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

use crate::parser::Rule;

/// Result type for SQL parsing operations.
pub type SqlResult<T> = Result<T, SqlError>;

/// Errors that can occur while splitting or parsing SQL.
#[derive(Error, Debug, Diagnostic)]
pub enum SqlError {
    /// The input does not match the grammar.
    #[error("syntax error: {message}")]
    #[diagnostic(code(strata::sql::syntax_error))]
    Syntax {
        #[source_code]
        src: String,
        #[label("error here")]
        span: miette::SourceSpan,
        message: String,
    },

    /// A column uses a data type this parser does not know.
    #[error("unknown data type `{name}`")]
    #[diagnostic(
        code(strata::sql::unknown_type),
        help("only MySQL built-in column types are supported")
    )]
    UnknownType { name: String },

    /// A numeric literal could not be represented.
    #[error("invalid number `{value}`")]
    #[diagnostic(code(strata::sql::invalid_number))]
    InvalidNumber { value: String },

    /// The statement was expected to be a specific kind but was not.
    #[error("expected {expected}, found {found}")]
    #[diagnostic(code(strata::sql::unexpected_statement))]
    UnexpectedStatement { expected: String, found: String },

    /// A parse tree node is missing a child the grammar guarantees.
    #[error("malformed parse tree: missing {what}")]
    #[diagnostic(code(strata::sql::malformed))]
    Malformed { what: String },
}

impl SqlError {
    /// Create a syntax error with source location.
    pub fn syntax(
        src: impl Into<String>,
        offset: usize,
        len: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::Syntax {
            src: src.into(),
            span: (offset, len).into(),
            message: message.into(),
        }
    }

    /// Create an error for a missing parse tree node.
    pub fn malformed(what: impl Into<String>) -> Self {
        Self::Malformed { what: what.into() }
    }

    /// Create an unexpected statement error.
    pub fn unexpected(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedStatement {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Convert a pest error into a syntax error pointing at the failure.
    pub(crate) fn from_pest(src: &str, err: pest::error::Error<Rule>) -> Self {
        let (offset, len) = match err.location {
            pest::error::InputLocation::Pos(pos) => (pos, 0),
            pest::error::InputLocation::Span((start, end)) => (start, end - start),
        };
        let message = match &err.variant {
            pest::error::ErrorVariant::ParsingError { positives, .. } if !positives.is_empty() => {
                let expected = positives
                    .iter()
                    .take(6)
                    .map(|rule| format!("{rule:?}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("unexpected input at offset {offset}, expected one of: {expected}")
            }
            _ => format!("unexpected input at offset {offset}"),
        };
        Self::syntax(src, offset, len, message)
    }

    /// Whether this error came from malformed SQL text.
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }
}
