//! Identifier rules and advisory schema diagnostics.
//!
//! Identifier checks are hard errors for model operations (a table or
//! field cannot be created with a broken name). Everything reported by
//! [`validate_schema`] is advisory: the canvas keeps rendering whatever
//! the model holds, and the report is handed to the `on_validate` hook.

use crate::core::schema::{FieldId, Table, TableId};
use derive_more::Display;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Maximum length for identifiers (MySQL standard)
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Keywords that cannot be used as bare table or field names
static RESERVED_KEYWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "ALL", "ALTER", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CHECK", "COLUMN",
        "CONSTRAINT", "CREATE", "CROSS", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP",
        "ELSE", "END", "EXISTS", "FALSE", "FOREIGN", "FROM", "FULL", "GRANT", "GROUP",
        "HAVING", "IN", "INDEX", "INNER", "INSERT", "INTO", "IS", "JOIN", "KEY", "LEFT",
        "LIKE", "LIMIT", "NOT", "NULL", "ON", "OR", "ORDER", "OUTER", "PRIMARY", "REFERENCES",
        "RIGHT", "SELECT", "SET", "TABLE", "THEN", "TO", "TRUE", "UNION", "UNIQUE", "UPDATE",
        "USING", "VALUES", "WHEN", "WHERE", "WITH",
    ]
    .into_iter()
    .collect()
});

/// Reasons an identifier is rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
pub enum ValidationError {
    #[error("Name cannot be empty")]
    Empty,

    #[error("Name is too long ({actual} chars, max {max})")]
    TooLong { max: usize, actual: usize },

    #[error("Name contains invalid characters: '{}'", invalid.iter().collect::<String>())]
    InvalidCharacters { invalid: Vec<char> },

    #[error("Name cannot start with a digit")]
    StartsWithDigit,

    #[error("'{0}' is a reserved SQL keyword")]
    ReservedKeyword(String),
}

/// Checks that `name` is identifier-shaped: ASCII letters, digits and
/// underscores, not starting with a digit, not a reserved keyword.
pub fn validate_identifier(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }

    if trimmed.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::TooLong {
            max: MAX_IDENTIFIER_LENGTH,
            actual: trimmed.len(),
        });
    }

    let invalid: Vec<char> = trimmed
        .chars()
        .filter(|c| !c.is_ascii_alphanumeric() && *c != '_')
        .collect();
    if !invalid.is_empty() {
        return Err(ValidationError::InvalidCharacters { invalid });
    }

    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(ValidationError::StartsWithDigit);
    }

    if is_reserved_keyword(trimmed) {
        return Err(ValidationError::ReservedKeyword(trimmed.to_string()));
    }

    Ok(())
}

pub fn is_reserved_keyword(name: &str) -> bool {
    RESERVED_KEYWORDS.contains(name.to_uppercase().as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum Severity {
    #[display("error")]
    Error,
    #[display("warning")]
    Warning,
}

/// What is wrong with a table or field
#[derive(Debug, Clone, PartialEq, Serialize, Display)]
pub enum IssueKind {
    #[display("invalid name: {_0}")]
    InvalidIdentifier(ValidationError),
    #[display("table name '{_0}' is used more than once")]
    DuplicateTableName(String),
    #[display("table has no primary key")]
    MissingPrimaryKey,
    #[display("table has {_0} primary key fields")]
    MultiplePrimaryKeys(usize),
    #[display("foreign key references unknown table '{_0}'")]
    UnresolvedTable(String),
    #[display("foreign key references unknown field '{table}.{field}'")]
    UnresolvedField { table: String, field: String },
}

/// One diagnostic, anchored to a table and optionally one of its fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaIssue {
    pub table_id: TableId,
    pub field_id: Option<FieldId>,
    pub kind: IssueKind,
}

impl SchemaIssue {
    fn table(table: &Table, kind: IssueKind) -> Self {
        Self {
            table_id: table.id.clone(),
            field_id: None,
            kind,
        }
    }

    fn field(table: &Table, field_id: &str, kind: IssueKind) -> Self {
        Self {
            table_id: table.id.clone(),
            field_id: Some(field_id.to_string()),
            kind,
        }
    }

    /// Broken names and duplicate tables are errors, the rest are warnings.
    /// Multiple primary keys stay advisory: the model accepts them.
    pub fn severity(&self) -> Severity {
        match self.kind {
            IssueKind::InvalidIdentifier(_) | IssueKind::DuplicateTableName(_) => Severity::Error,
            _ => Severity::Warning,
        }
    }
}

/// Aggregated diagnostics for a whole schema
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaReport {
    pub issues: Vec<SchemaIssue>,
}

impl SchemaReport {
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(|i| i.severity() == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| i.severity() == Severity::Warning)
    }

    pub fn for_table<'a>(&'a self, table_id: &'a str) -> impl Iterator<Item = &'a SchemaIssue> {
        self.issues.iter().filter(move |i| i.table_id == table_id)
    }

    pub fn all_messages(&self) -> Vec<String> {
        self.issues
            .iter()
            .map(|i| format!("{}: {}", i.severity(), i.kind))
            .collect()
    }
}

/// Inspect every table and field and collect advisory issues
pub fn validate_schema(tables: &[Table]) -> SchemaReport {
    let mut report = SchemaReport::default();

    let mut name_counts: HashMap<&str, usize> = HashMap::new();
    for table in tables {
        *name_counts.entry(table.name.as_str()).or_default() += 1;
    }
    let by_name: HashMap<&str, &Table> = tables
        .iter()
        .rev()
        .map(|t| (t.name.as_str(), t))
        .collect();

    for table in tables {
        if let Err(e) = validate_identifier(&table.name) {
            report
                .issues
                .push(SchemaIssue::table(table, IssueKind::InvalidIdentifier(e)));
        }
        if name_counts.get(table.name.as_str()).copied().unwrap_or(0) > 1 {
            report.issues.push(SchemaIssue::table(
                table,
                IssueKind::DuplicateTableName(table.name.clone()),
            ));
        }

        match table.primary_keys().count() {
            0 => report
                .issues
                .push(SchemaIssue::table(table, IssueKind::MissingPrimaryKey)),
            1 => {}
            n => report
                .issues
                .push(SchemaIssue::table(table, IssueKind::MultiplePrimaryKeys(n))),
        }

        for field in &table.fields {
            if let Err(e) = validate_identifier(&field.name) {
                report.issues.push(SchemaIssue::field(
                    table,
                    &field.id,
                    IssueKind::InvalidIdentifier(e),
                ));
            }

            let Some(fk) = &field.foreign_key else {
                continue;
            };
            match by_name.get(fk.table.as_str()) {
                None => report.issues.push(SchemaIssue::field(
                    table,
                    &field.id,
                    IssueKind::UnresolvedTable(fk.table.clone()),
                )),
                Some(target) if target.find_field(&fk.field).is_none() => {
                    report.issues.push(SchemaIssue::field(
                        table,
                        &field.id,
                        IssueKind::UnresolvedField {
                            table: fk.table.clone(),
                            field: fk.field.clone(),
                        },
                    ))
                }
                Some(_) => {}
            }
        }
    }

    report
}
