//! Script splitting and statement parsing.

mod grammar;

use std::str::FromStr;

use pest::Parser;
use pest::iterators::Pair;
use smol_str::SmolStr;

use crate::ast::*;
use crate::error::{SqlError, SqlResult};
use crate::quote::{unquote_ident, unquote_string};

pub use grammar::{MysqlParser, Rule};

/// One statement cut out of a script, comments removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStatement {
    pub text: String,
    /// Byte offset of the first significant character in the script.
    pub offset: usize,
}

/// Split a script into statements.
///
/// Statements are separated by `;` outside quotes and comments. Comments and
/// `/*! ... */` version hints are replaced by a space; empty statements are
/// dropped.
pub fn split_script(input: &str) -> SqlResult<Vec<RawStatement>> {
    let mut pairs =
        MysqlParser::parse(Rule::script, input).map_err(|e| SqlError::from_pest(input, e))?;
    let script = pairs
        .next()
        .ok_or_else(|| SqlError::malformed("script"))?;

    let mut statements = Vec::new();
    for segment in script.into_inner() {
        if segment.as_rule() != Rule::segment {
            continue;
        }
        let mut text = String::new();
        let mut offset = None;
        for piece in segment.into_inner() {
            match piece.as_rule() {
                Rule::version_hint | Rule::block_comment | Rule::line_comment => text.push(' '),
                _ => {
                    let s = piece.as_str();
                    if offset.is_none() && !s.trim().is_empty() {
                        offset = Some(piece.as_span().start() + (s.len() - s.trim_start().len()));
                    }
                    text.push_str(s);
                }
            }
        }
        let trimmed = text.trim();
        if let Some(offset) = offset.filter(|_| !trimmed.is_empty()) {
            statements.push(RawStatement {
                text: trimmed.to_string(),
                offset,
            });
        }
    }
    Ok(statements)
}

/// Split and parse every statement of a script.
///
/// Statements outside the supported set come back as
/// [`Statement::Unsupported`]; whether that is an error is up to the caller.
pub fn parse_script(input: &str) -> SqlResult<Vec<StatementNode>> {
    split_script(input)?
        .into_iter()
        .map(|raw| {
            let statement = parse_statement(&raw.text)?;
            Ok(StatementNode {
                text: raw.text,
                offset: raw.offset,
                statement,
            })
        })
        .collect()
}

/// Parse text holding exactly one CREATE TABLE statement.
pub fn parse_create_table(input: &str) -> SqlResult<CreateTable> {
    let raw = split_script(input)?;
    let [only] = raw.as_slice() else {
        return Err(SqlError::unexpected(
            "a single CREATE TABLE statement",
            format!("{} statements", raw.len()),
        ));
    };
    match parse_statement(&only.text)? {
        Statement::CreateTable(create) => Ok(create),
        other => Err(SqlError::unexpected("CreateTableStmt", other.kind_name())),
    }
}

/// Parse a single statement with comments already removed.
pub fn parse_statement(text: &str) -> SqlResult<Statement> {
    let text = text.trim().trim_end_matches(';').trim_end();
    if text.starts_with('(') {
        return Ok(dml(DmlKind::Select, text));
    }

    let words = leading_words(text, 2);
    let first = words.first().map(String::as_str).unwrap_or("");
    let second = words.get(1).map(String::as_str).unwrap_or("");

    let statement = match first {
        "CREATE" => match second {
            "TABLE" | "TEMPORARY" => build_create_table(parse_rule(Rule::create_table, text)?)?,
            "UNIQUE" | "FULLTEXT" | "SPATIAL" | "INDEX" => {
                build_create_index(parse_rule(Rule::create_index, text)?)?
            }
            "DATABASE" | "SCHEMA" => other_ddl("CreateDatabaseStmt", text),
            "VIEW" => other_ddl("CreateViewStmt", text),
            "OR" | "ALGORITHM" | "DEFINER" | "SQL" if mentions(text, "VIEW") => {
                other_ddl("CreateViewStmt", text)
            }
            "SEQUENCE" => other_ddl("CreateSequenceStmt", text),
            "TRIGGER" => other_ddl("CreateTriggerStmt", text),
            "PROCEDURE" => other_ddl("CreateProcedureStmt", text),
            "FUNCTION" => other_ddl("CreateFunctionStmt", text),
            "DEFINER" if mentions(text, "TRIGGER") => other_ddl("CreateTriggerStmt", text),
            _ => unsupported(&format!("{first} {second}"), text),
        },
        "ALTER" => match second {
            "TABLE" | "IGNORE" => build_alter_table(parse_rule(Rule::alter_table, text)?)?,
            "DATABASE" | "SCHEMA" => other_ddl("AlterDatabaseStmt", text),
            "VIEW" => other_ddl("AlterViewStmt", text),
            "SEQUENCE" => other_ddl("AlterSequenceStmt", text),
            _ => unsupported(&format!("{first} {second}"), text),
        },
        "DROP" => match second {
            "TABLE" | "TEMPORARY" => build_drop_table(parse_rule(Rule::drop_table, text)?)?,
            "DATABASE" | "SCHEMA" => build_drop_database(parse_rule(Rule::drop_database, text)?)?,
            "INDEX" => build_drop_index(parse_rule(Rule::drop_index, text)?)?,
            "VIEW" => other_ddl("DropViewStmt", text),
            "SEQUENCE" => other_ddl("DropSequenceStmt", text),
            "TRIGGER" => other_ddl("DropTriggerStmt", text),
            "PROCEDURE" => other_ddl("DropProcedureStmt", text),
            "FUNCTION" => other_ddl("DropFunctionStmt", text),
            _ => unsupported(&format!("{first} {second}"), text),
        },
        "RENAME" if second == "TABLE" => build_rename_table(parse_rule(Rule::rename_table, text)?)?,
        "TRUNCATE" => build_truncate(parse_rule(Rule::truncate_table, text)?)?,
        "LOCK" => Statement::LockTables(text.to_string()),
        "UNLOCK" => Statement::UnlockTables(text.to_string()),
        "INSERT" | "REPLACE" => dml(DmlKind::Insert, text),
        "UPDATE" => dml(DmlKind::Update, text),
        "DELETE" => dml(DmlKind::Delete, text),
        "SELECT" | "WITH" | "TABLE" | "VALUES" => dml(DmlKind::Select, text),
        "SHOW" => dml(DmlKind::Show, text),
        "LOAD" => dml(DmlKind::LoadData, text),
        "DO" => dml(DmlKind::Do, text),
        "CALL" => dml(DmlKind::Call, text),
        "SET" => Statement::Set(text.to_string()),
        _ => unsupported(first, text),
    };
    Ok(statement)
}

/// Uppercased leading keywords of a statement.
fn leading_words(text: &str, count: usize) -> Vec<String> {
    text.split_whitespace()
        .take(count)
        .map(|word| {
            word.chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect::<String>()
                .to_ascii_uppercase()
        })
        .collect()
}

fn mentions(text: &str, keyword: &str) -> bool {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .any(|word| word.eq_ignore_ascii_case(keyword))
}

fn dml(kind: DmlKind, text: &str) -> Statement {
    Statement::Dml {
        kind,
        text: text.to_string(),
    }
}

fn other_ddl(kind: &str, text: &str) -> Statement {
    Statement::OtherDdl {
        kind: SmolStr::new(kind),
        text: text.to_string(),
    }
}

fn unsupported(keyword: &str, text: &str) -> Statement {
    Statement::Unsupported {
        keyword: SmolStr::new(keyword.trim()),
        text: text.to_string(),
    }
}

// =============================================================================
// Pair helpers
// =============================================================================

fn parse_rule(rule: Rule, text: &str) -> SqlResult<Pair<'_, Rule>> {
    MysqlParser::parse(rule, text)
        .map_err(|e| SqlError::from_pest(text, e))?
        .next()
        .ok_or_else(|| SqlError::malformed(format!("{rule:?}")))
}

/// The first child of `pair` with the given rule.
fn child<'i>(pair: &Pair<'i, Rule>, rule: Rule) -> SqlResult<Pair<'i, Rule>> {
    find_child(pair, rule).ok_or_else(|| SqlError::malformed(format!("{rule:?}")))
}

fn find_child<'i>(pair: &Pair<'i, Rule>, rule: Rule) -> Option<Pair<'i, Rule>> {
    pair.clone().into_inner().find(|p| p.as_rule() == rule)
}

fn has_child(pair: &Pair<'_, Rule>, rule: Rule) -> bool {
    find_child(pair, rule).is_some()
}

/// The only child of a rule that wraps a choice.
fn first_inner<'i>(pair: Pair<'i, Rule>, what: &str) -> SqlResult<Pair<'i, Rule>> {
    pair.into_inner()
        .next()
        .ok_or_else(|| SqlError::malformed(what))
}

fn idents(pair: &Pair<'_, Rule>) -> Vec<SmolStr> {
    pair.clone()
        .into_inner()
        .filter(|p| p.as_rule() == Rule::ident)
        .map(|p| unquote_ident(p.as_str()))
        .collect()
}

fn ident_at(pair: &Pair<'_, Rule>, index: usize) -> SqlResult<SmolStr> {
    idents(pair)
        .into_iter()
        .nth(index)
        .ok_or_else(|| SqlError::malformed("identifier"))
}

fn name_value(pair: Pair<'_, Rule>) -> SqlResult<SmolStr> {
    let value = first_inner(pair, "name")?;
    Ok(match value.as_rule() {
        Rule::string_literal => SmolStr::new(unquote_string(value.as_str())),
        _ => unquote_ident(value.as_str()),
    })
}

fn number<T: FromStr>(pair: &Pair<'_, Rule>) -> SqlResult<T> {
    pair.as_str()
        .trim()
        .parse()
        .map_err(|_| SqlError::InvalidNumber {
            value: pair.as_str().to_string(),
        })
}

fn string_value(pair: &Pair<'_, Rule>) -> SqlResult<String> {
    Ok(unquote_string(child(pair, Rule::string_literal)?.as_str()))
}

/// Keyword text with whitespace normalized, e.g. `SET NULL`.
fn keyword_text(pair: &Pair<'_, Rule>) -> SmolStr {
    SmolStr::new(
        pair.as_str()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase(),
    )
}

// =============================================================================
// Names and types
// =============================================================================

fn build_table_name(pair: Pair<'_, Rule>) -> SqlResult<TableName> {
    let mut parts = idents(&pair);
    match parts.len() {
        1 => Ok(TableName::new(parts.remove(0))),
        2 => {
            let name = parts.remove(1);
            Ok(TableName {
                schema: Some(parts.remove(0)),
                name,
            })
        }
        _ => Err(SqlError::malformed("table name")),
    }
}

fn build_data_type(pair: Pair<'_, Rule>) -> SqlResult<DataType> {
    let mut inner = pair.into_inner();
    let word = inner
        .next()
        .ok_or_else(|| SqlError::malformed("type name"))?;
    let (code, implied_length) =
        TypeCode::from_keyword(word.as_str()).ok_or_else(|| SqlError::UnknownType {
            name: word.as_str().to_string(),
        })?;

    let mut data_type = DataType::new(code);
    if let Some(length) = implied_length {
        data_type.length = length;
    }

    for part in inner {
        match part.as_rule() {
            Rule::type_args => {
                let args = part
                    .into_inner()
                    .map(|arg| first_inner(arg, "type argument"))
                    .collect::<SqlResult<Vec<_>>>()?;
                if code.has_elements() {
                    data_type.elems = args.iter().map(|a| unquote_string(a.as_str())).collect();
                } else {
                    if let Some(length) = args.first() {
                        data_type.length = number(length)?;
                    }
                    if let Some(scale) = args.get(1) {
                        data_type.scale = number(scale)?;
                    }
                }
            }
            Rule::type_attr => {
                let attr = first_inner(part, "type attribute")?;
                match attr.as_rule() {
                    Rule::k_unsigned => data_type.unsigned = true,
                    // ZEROFILL implies UNSIGNED
                    Rule::k_zerofill => {
                        data_type.zerofill = true;
                        data_type.unsigned = true;
                    }
                    Rule::k_binary => data_type.binary = true,
                    Rule::type_charset => {
                        data_type.charset = Some(name_value(child(&attr, Rule::name_value)?)?);
                    }
                    Rule::type_collate => {
                        data_type.collate = Some(name_value(child(&attr, Rule::name_value)?)?);
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }
    Ok(data_type)
}

// =============================================================================
// Columns
// =============================================================================

fn build_column_def(pair: Pair<'_, Rule>) -> SqlResult<ColumnDef> {
    let name = ident_at(&pair, 0)?;
    let data_type = build_data_type(child(&pair, Rule::data_type)?)?;
    let mut column = ColumnDef::new(name, data_type);
    for option in pair.into_inner().filter(|p| p.as_rule() == Rule::column_option) {
        column.options.push(build_column_option(option)?);
    }
    Ok(column)
}

fn build_column_option(pair: Pair<'_, Rule>) -> SqlResult<ColumnOption> {
    let option = first_inner(pair, "column option")?;
    Ok(match option.as_rule() {
        Rule::not_null_opt => ColumnOption::NotNull,
        Rule::null_opt => ColumnOption::Null,
        Rule::default_opt => ColumnOption::Default(child(&option, Rule::expr_value)?.as_str().to_string()),
        Rule::auto_increment_opt => ColumnOption::AutoIncrement,
        // a bare KEY on a column means PRIMARY KEY
        Rule::primary_key_opt | Rule::key_opt => ColumnOption::PrimaryKey,
        Rule::unique_key_opt => ColumnOption::UniqueKey,
        Rule::comment_opt => ColumnOption::Comment(string_value(&option)?),
        Rule::collate_opt => ColumnOption::Collate(name_value(child(&option, Rule::name_value)?)?),
        Rule::on_update_opt => {
            ColumnOption::OnUpdate(child(&option, Rule::expr_value)?.as_str().to_string())
        }
        Rule::generated_opt => ColumnOption::Generated {
            expr: child(&option, Rule::paren_expr)?.as_str().to_string(),
            stored: has_child(&option, Rule::k_stored),
        },
        Rule::check_opt => ColumnOption::Check {
            symbol: find_child(&option, Rule::constraint_symbol)
                .and_then(|s| idents(&s).into_iter().next()),
            expr: child(&option, Rule::paren_expr)?.as_str().to_string(),
            enforced: find_child(&option, Rule::enforcement).map(|e| build_enforcement(&e)),
        },
        Rule::column_format_opt => ColumnOption::ColumnFormat(ident_at(&option, 0)?),
        Rule::storage_opt => ColumnOption::Storage(ident_at(&option, 0)?),
        Rule::visibility_opt => {
            if has_child(&option, Rule::k_visible) {
                ColumnOption::Visible
            } else {
                ColumnOption::Invisible
            }
        }
        Rule::srid_opt => ColumnOption::Srid(number(&child(&option, Rule::number)?)?),
        Rule::reference_def => ColumnOption::References(build_reference(option)?),
        rule => return Err(SqlError::malformed(format!("column option {rule:?}"))),
    })
}

fn build_enforcement(pair: &Pair<'_, Rule>) -> bool {
    !has_child(pair, Rule::k_not)
}

fn build_column_position(pair: Pair<'_, Rule>) -> SqlResult<ColumnPosition> {
    if has_child(&pair, Rule::k_first) {
        Ok(ColumnPosition::First)
    } else {
        Ok(ColumnPosition::After(ident_at(&pair, 0)?))
    }
}

// =============================================================================
// Constraints and indexes
// =============================================================================

fn build_reference(pair: Pair<'_, Rule>) -> SqlResult<Reference> {
    let mut reference = Reference {
        table: build_table_name(child(&pair, Rule::table_name)?)?,
        columns: idents(&child(&pair, Rule::column_list)?),
        match_type: None,
        on_delete: None,
        on_update: None,
    };
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::match_clause => {
                reference.match_type = part
                    .into_inner()
                    .nth(1)
                    .map(|kind| keyword_text(&kind));
            }
            Rule::reference_action => {
                let action = keyword_text(&child(&part, Rule::ref_option)?);
                if has_child(&part, Rule::k_delete) {
                    reference.on_delete = Some(action);
                } else {
                    reference.on_update = Some(action);
                }
            }
            _ => {}
        }
    }
    Ok(reference)
}

fn build_key_parts(pair: Pair<'_, Rule>) -> SqlResult<Vec<KeyPart>> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::key_part)
        .map(|part| {
            let mut key = KeyPart::column("");
            for piece in part.into_inner() {
                match piece.as_rule() {
                    Rule::ident => key.target = KeyTarget::Column(unquote_ident(piece.as_str())),
                    Rule::paren_expr => key.target = KeyTarget::Expr(piece.as_str().to_string()),
                    Rule::prefix_length => {
                        key.length = Some(number(&child(&piece, Rule::number)?)?);
                    }
                    Rule::sort_order => key.descending = Some(has_child(&piece, Rule::k_desc)),
                    _ => {}
                }
            }
            Ok(key)
        })
        .collect()
}

fn build_index_type(pair: &Pair<'_, Rule>) -> IndexType {
    if has_child(pair, Rule::k_hash) {
        IndexType::Hash
    } else if has_child(pair, Rule::k_rtree) {
        IndexType::RTree
    } else {
        IndexType::BTree
    }
}

fn build_index_option(pair: Pair<'_, Rule>) -> SqlResult<IndexOption> {
    let option = first_inner(pair, "index option")?;
    Ok(match option.as_rule() {
        Rule::key_block_size_opt => IndexOption::KeyBlockSize(number(&child(&option, Rule::number)?)?),
        Rule::index_type => IndexOption::Using(build_index_type(&option)),
        Rule::index_comment => IndexOption::Comment(string_value(&option)?),
        Rule::k_visible => IndexOption::Visible,
        Rule::k_invisible => IndexOption::Invisible,
        Rule::parser_opt => IndexOption::Parser(ident_at(&option, 0)?),
        rule => return Err(SqlError::malformed(format!("index option {rule:?}"))),
    })
}

/// Shared body of PRIMARY KEY, UNIQUE, KEY and FULLTEXT definitions.
fn build_index_constraint(pair: Pair<'_, Rule>, kind: ConstraintKind) -> SqlResult<TableConstraint> {
    let mut constraint = TableConstraint::new(kind);
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::k_spatial => constraint.kind = ConstraintKind::Spatial,
            Rule::index_name => constraint.name = Some(ident_at(&part, 0)?),
            Rule::index_type => constraint.options.push(IndexOption::Using(build_index_type(&part))),
            Rule::key_parts => constraint.keys = build_key_parts(part)?,
            Rule::index_option => constraint.options.push(build_index_option(part)?),
            _ => {}
        }
    }
    Ok(constraint)
}

fn build_table_constraint(pair: Pair<'_, Rule>) -> SqlResult<TableConstraint> {
    let mut symbol = None;
    let mut constraint = None;
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::constraint_symbol => symbol = idents(&part).into_iter().next(),
            Rule::primary_key_def => {
                constraint = Some(build_index_constraint(part, ConstraintKind::PrimaryKey)?);
            }
            Rule::unique_def => {
                constraint = Some(build_index_constraint(part, ConstraintKind::Unique)?);
            }
            Rule::index_def => {
                constraint = Some(build_index_constraint(part, ConstraintKind::Index)?);
            }
            Rule::fulltext_def => {
                constraint = Some(build_index_constraint(part, ConstraintKind::FullText)?);
            }
            Rule::foreign_key_def => {
                let mut fk = TableConstraint::new(ConstraintKind::ForeignKey);
                if let Some(name) = find_child(&part, Rule::index_name) {
                    fk.name = Some(ident_at(&name, 0)?);
                }
                fk.keys = idents(&child(&part, Rule::column_list)?)
                    .into_iter()
                    .map(KeyPart::column)
                    .collect();
                fk.reference = Some(build_reference(child(&part, Rule::reference_def)?)?);
                constraint = Some(fk);
            }
            Rule::check_def => {
                let mut check = TableConstraint::new(ConstraintKind::Check);
                check.check = Some(child(&part, Rule::paren_expr)?.as_str().to_string());
                check.enforced = find_child(&part, Rule::enforcement).map(|e| build_enforcement(&e));
                constraint = Some(check);
            }
            _ => {}
        }
    }
    let mut constraint = constraint.ok_or_else(|| SqlError::malformed("constraint body"))?;
    constraint.symbol = symbol;
    Ok(constraint)
}

// =============================================================================
// Table options
// =============================================================================

fn build_table_options(pair: Pair<'_, Rule>) -> SqlResult<Vec<TableOption>> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::table_option)
        .map(|option| {
            let option = first_inner(option, "table option")?;
            Ok(match option.as_rule() {
                Rule::engine_option => TableOption::Engine(name_value(child(&option, Rule::name_value)?)?),
                Rule::charset_option => TableOption::Charset(name_value(child(&option, Rule::name_value)?)?),
                Rule::collate_option => TableOption::Collate(name_value(child(&option, Rule::name_value)?)?),
                Rule::comment_option => TableOption::Comment(string_value(&option)?),
                Rule::auto_increment_option => {
                    TableOption::AutoIncrement(number(&child(&option, Rule::number)?)?)
                }
                Rule::generic_option => TableOption::Other {
                    name: SmolStr::new(
                        child(&option, Rule::generic_option_name)?
                            .as_str()
                            .to_ascii_uppercase(),
                    ),
                    value: child(&option, Rule::option_value)?.as_str().to_string(),
                },
                rule => return Err(SqlError::malformed(format!("table option {rule:?}"))),
            })
        })
        .collect()
}

// =============================================================================
// Statements
// =============================================================================

fn build_create_table(pair: Pair<'_, Rule>) -> SqlResult<Statement> {
    let mut create = CreateTable::new(TableName::default());
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::k_temporary => create.temporary = true,
            Rule::if_not_exists => create.if_not_exists = true,
            Rule::table_name => create.name = build_table_name(part)?,
            Rule::like_clause => {
                create.like = Some(build_table_name(child(&part, Rule::table_name)?)?);
            }
            Rule::create_select => create.select = Some(build_create_select(part)?),
            Rule::table_body => {
                for item in part.into_inner() {
                    match item.as_rule() {
                        Rule::create_def => {
                            let def = first_inner(item, "create definition")?;
                            match def.as_rule() {
                                Rule::column_def => create.columns.push(build_column_def(def)?),
                                _ => create.constraints.push(build_table_constraint(def)?),
                            }
                        }
                        Rule::table_options => create.options = build_table_options(item)?,
                        Rule::partition_options => {
                            create.partition = Some(child(&item, Rule::rest)?.as_str().to_string());
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    Ok(Statement::CreateTable(create))
}

fn build_create_select(pair: Pair<'_, Rule>) -> SqlResult<CreateSelect> {
    let mut select = CreateSelect {
        duplicates: None,
        query: String::new(),
    };
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::k_ignore | Rule::k_replace => select.duplicates = Some(keyword_text(&part)),
            Rule::select_query => select.query = part.as_str().trim().to_string(),
            _ => {}
        }
    }
    Ok(select)
}

fn build_alter_table(pair: Pair<'_, Rule>) -> SqlResult<Statement> {
    let mut alter = AlterTable::new(build_table_name(child(&pair, Rule::table_name)?)?);
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::alter_specs => {
                for spec in part.into_inner() {
                    alter.specs.push(build_alter_spec(first_inner(spec, "alter spec")?)?);
                }
            }
            Rule::partition_spec => alter.specs.push(AlterSpec::Partition(build_partition_op(part)?)),
            _ => {}
        }
    }
    Ok(Statement::AlterTable(alter))
}

fn position_of(pair: &Pair<'_, Rule>) -> SqlResult<Option<ColumnPosition>> {
    find_child(pair, Rule::column_position)
        .map(build_column_position)
        .transpose()
}

fn build_alter_spec(spec: Pair<'_, Rule>) -> SqlResult<AlterSpec> {
    Ok(match spec.as_rule() {
        Rule::add_constraint_spec => {
            AlterSpec::AddConstraint(build_table_constraint(child(&spec, Rule::table_constraint)?)?)
        }
        Rule::add_columns_spec | Rule::add_column_spec => {
            let position = position_of(&spec)?;
            let columns = spec
                .into_inner()
                .filter(|p| p.as_rule() == Rule::column_def)
                .map(build_column_def)
                .collect::<SqlResult<Vec<_>>>()?;
            AlterSpec::AddColumns { columns, position }
        }
        Rule::drop_primary_key_spec => AlterSpec::DropPrimaryKey,
        Rule::drop_foreign_key_spec => AlterSpec::DropForeignKey(ident_at(&spec, 0)?),
        Rule::drop_index_spec => AlterSpec::DropIndex(ident_at(&spec, 0)?),
        Rule::drop_check_spec => AlterSpec::DropCheck(ident_at(&spec, 0)?),
        Rule::drop_column_spec => AlterSpec::DropColumn(ident_at(&spec, 0)?),
        Rule::modify_column_spec => AlterSpec::ModifyColumn {
            position: position_of(&spec)?,
            column: build_column_def(child(&spec, Rule::column_def)?)?,
        },
        Rule::change_column_spec => AlterSpec::ChangeColumn {
            old_name: ident_at(&spec, 0)?,
            position: position_of(&spec)?,
            column: build_column_def(child(&spec, Rule::column_def)?)?,
        },
        Rule::alter_index_spec => AlterSpec::AlterIndexVisibility {
            name: ident_at(&spec, 0)?,
            visible: has_child(&spec, Rule::k_visible),
        },
        Rule::alter_check_spec => AlterSpec::AlterCheck {
            name: ident_at(&spec, 0)?,
            enforced: build_enforcement(&child(&spec, Rule::enforcement)?),
        },
        Rule::alter_column_spec => {
            let op = first_inner(child(&spec, Rule::alter_column_op)?, "alter column operation")?;
            let op = match op.as_rule() {
                Rule::set_default_op => {
                    AlterColumnOp::SetDefault(child(&op, Rule::expr_value)?.as_str().to_string())
                }
                Rule::drop_default_op => AlterColumnOp::DropDefault,
                _ => AlterColumnOp::SetVisible(has_child(&op, Rule::k_visible)),
            };
            AlterSpec::AlterColumn {
                name: ident_at(&spec, 0)?,
                op,
            }
        }
        Rule::rename_column_spec => AlterSpec::RenameColumn {
            from: ident_at(&spec, 0)?,
            to: ident_at(&spec, 1)?,
        },
        Rule::rename_index_spec => AlterSpec::RenameIndex {
            from: ident_at(&spec, 0)?,
            to: ident_at(&spec, 1)?,
        },
        Rule::rename_table_spec => {
            AlterSpec::RenameTable(build_table_name(child(&spec, Rule::table_name)?)?)
        }
        Rule::convert_spec => {
            let mut values = spec
                .into_inner()
                .filter(|p| p.as_rule() == Rule::name_value)
                .map(name_value)
                .collect::<SqlResult<Vec<_>>>()?
                .into_iter();
            AlterSpec::ConvertCharset {
                charset: values
                    .next()
                    .ok_or_else(|| SqlError::malformed("character set"))?,
                collate: values.next(),
            }
        }
        Rule::lock_spec => AlterSpec::Lock(ident_at(&spec, 0)?),
        Rule::algorithm_spec => AlterSpec::Algorithm(ident_at(&spec, 0)?),
        Rule::force_spec => AlterSpec::Force,
        Rule::keys_spec => AlterSpec::Keys {
            enable: has_child(&spec, Rule::k_enable),
        },
        Rule::order_by_spec => AlterSpec::OrderBy(idents(&spec)),
        Rule::validation_spec => AlterSpec::Validation {
            with: has_child(&spec, Rule::k_with),
        },
        Rule::tablespace_spec => AlterSpec::Tablespace {
            discard: has_child(&spec, Rule::k_discard),
        },
        Rule::table_options => AlterSpec::Options(build_table_options(spec)?),
        rule => return Err(SqlError::malformed(format!("alter spec {rule:?}"))),
    })
}

fn build_partition_op(pair: Pair<'_, Rule>) -> SqlResult<PartitionOp> {
    if has_child(&pair, Rule::k_remove) {
        return Ok(PartitionOp {
            kind: PartitionKind::RemovePartitioning,
            text: String::new(),
        });
    }
    let kind = match find_child(&pair, Rule::partition_verb) {
        None => PartitionKind::Partition,
        Some(verb) => match first_inner(verb, "partition verb")?.as_rule() {
            Rule::k_add => PartitionKind::Add,
            Rule::k_drop => PartitionKind::Drop,
            Rule::k_discard => PartitionKind::Discard,
            Rule::k_import => PartitionKind::Import,
            Rule::k_truncate => PartitionKind::Truncate,
            Rule::k_coalesce => PartitionKind::Coalesce,
            Rule::k_reorganize => PartitionKind::Reorganize,
            Rule::k_exchange => PartitionKind::Exchange,
            Rule::k_analyze => PartitionKind::Analyze,
            Rule::k_check => PartitionKind::Check,
            Rule::k_optimize => PartitionKind::Optimize,
            Rule::k_rebuild => PartitionKind::Rebuild,
            _ => PartitionKind::Repair,
        },
    };
    Ok(PartitionOp {
        kind,
        text: child(&pair, Rule::rest)?.as_str().to_string(),
    })
}

fn build_drop_table(pair: Pair<'_, Rule>) -> SqlResult<Statement> {
    let tables = pair
        .clone()
        .into_inner()
        .filter(|p| p.as_rule() == Rule::table_name)
        .map(build_table_name)
        .collect::<SqlResult<Vec<_>>>()?;
    Ok(Statement::DropTable {
        if_exists: has_child(&pair, Rule::if_exists),
        temporary: has_child(&pair, Rule::k_temporary),
        tables,
    })
}

fn build_drop_database(pair: Pair<'_, Rule>) -> SqlResult<Statement> {
    Ok(Statement::DropDatabase {
        if_exists: has_child(&pair, Rule::if_exists),
        name: ident_at(&pair, 0)?,
    })
}

fn build_rename_table(pair: Pair<'_, Rule>) -> SqlResult<Statement> {
    let pairs = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::rename_pair)
        .map(|rename| {
            let mut names = rename
                .into_inner()
                .filter(|p| p.as_rule() == Rule::table_name)
                .map(build_table_name);
            let from = names.next().ok_or_else(|| SqlError::malformed("rename source"))??;
            let to = names.next().ok_or_else(|| SqlError::malformed("rename target"))??;
            Ok(RenamePair { from, to })
        })
        .collect::<SqlResult<Vec<_>>>()?;
    Ok(Statement::RenameTable(pairs))
}

fn build_create_index(pair: Pair<'_, Rule>) -> SqlResult<Statement> {
    let class = match find_child(&pair, Rule::index_class) {
        None => IndexClass::Plain,
        Some(class) => match first_inner(class, "index class")?.as_rule() {
            Rule::k_unique => IndexClass::Unique,
            Rule::k_fulltext => IndexClass::FullText,
            _ => IndexClass::Spatial,
        },
    };
    let mut index = CreateIndex {
        class,
        name: ident_at(&pair, 0)?,
        table: build_table_name(child(&pair, Rule::table_name)?)?,
        keys: build_key_parts(child(&pair, Rule::key_parts)?)?,
        options: Vec::new(),
    };
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::index_type => index.options.push(IndexOption::Using(build_index_type(&part))),
            Rule::index_option => index.options.push(build_index_option(part)?),
            _ => {}
        }
    }
    Ok(Statement::CreateIndex(index))
}

fn build_drop_index(pair: Pair<'_, Rule>) -> SqlResult<Statement> {
    Ok(Statement::DropIndex {
        name: ident_at(&pair, 0)?,
        table: build_table_name(child(&pair, Rule::table_name)?)?,
    })
}

fn build_truncate(pair: Pair<'_, Rule>) -> SqlResult<Statement> {
    Ok(Statement::Truncate(build_table_name(child(
        &pair,
        Rule::table_name,
    )?)?))
}
