//! DDL and DML generation for PostgreSQL.
//!
//! Statements carry their values as bound parameters; [`Statement::render`]
//! produces an equivalent standalone script line for dry runs.

use std::fmt;

use anyhow::{Context, Result};
use itertools::Itertools;

use crate::schema::{ColumnType, Row, Table};

/// Name of the audit column stamped with the load time.
pub const AUDIT_COLUMN: &str = "my_created_at";

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Integer(i64),
    Float(f64),
    Timestamp(String),
    Text(String),
}

impl SqlValue {
    /// Converts a raw field into a value of the column's type.
    pub fn parse(raw: &str, column_type: ColumnType) -> Result<Self> {
        let value = match column_type {
            ColumnType::Integer => SqlValue::Integer(
                raw.parse()
                    .with_context(|| format!("Failed to parse '{raw}' as integer"))?,
            ),
            ColumnType::Float => SqlValue::Float(
                raw.parse()
                    .with_context(|| format!("Failed to parse '{raw}' as float"))?,
            ),
            ColumnType::Timestamp => SqlValue::Timestamp(raw.to_string()),
            ColumnType::Text => SqlValue::Text(raw.to_string()),
        };
        Ok(value)
    }

    /// Placeholder text for the `n`th parameter. Timestamps travel as text and
    /// are cast on the server.
    fn placeholder(&self, n: usize) -> String {
        match self {
            SqlValue::Timestamp(_) => format!("${n}::timestamp"),
            _ => format!("${n}"),
        }
    }

    /// SQL literal form: numbers bare, everything else single-quoted with
    /// embedded quotes doubled.
    pub fn literal(&self) -> String {
        match self {
            SqlValue::Integer(value) => value.to_string(),
            SqlValue::Float(value) => format_float(*value),
            SqlValue::Timestamp(value) => format!("{}::timestamp", quote_literal(value)),
            SqlValue::Text(value) => quote_literal(value),
        }
    }
}

fn format_float(value: f64) -> String {
    if value.is_finite() {
        let rendered = value.to_string();
        if rendered.contains(['.', 'e', 'E']) {
            rendered
        } else {
            format!("{rendered}.0")
        }
    } else {
        format!("'{value}'::double precision")
    }
}

pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Inlines every parameter as a literal, producing a self-contained
    /// statement terminated by `;`.
    pub fn render(&self) -> String {
        let mut rendered = self.sql.clone();
        // highest index first so `$1` never clobbers the prefix of `$10`
        for (idx, param) in self.params.iter().enumerate().rev() {
            let placeholder = param.placeholder(idx + 1);
            rendered = rendered.replacen(&placeholder, &param.literal(), 1);
        }
        rendered.push(';');
        rendered
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

pub fn drop_table(table: &Table) -> Statement {
    Statement::new(format!(
        "DROP TABLE IF EXISTS {}",
        quote_identifier(&table.name)
    ))
}

pub fn create_table(table: &Table) -> Statement {
    let mut definitions = vec![
        format!(
            "{} serial PRIMARY KEY",
            quote_identifier(&table.surrogate_key())
        ),
        format!(
            "{} TIMESTAMPTZ NOT NULL DEFAULT now()",
            quote_identifier(AUDIT_COLUMN)
        ),
    ];
    definitions.extend(table.columns.iter().map(|column| {
        format!(
            "{} {}",
            quote_identifier(&column.name),
            column.column_type.sql_type()
        )
    }));
    Statement::new(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_identifier(&table.name),
        definitions.join(", ")
    ))
}

/// Builds the parameterized INSERT for one row. Empty fields are left out so
/// the destination applies its own default.
pub fn insert_row(table: &Table, row: &Row) -> Result<Statement> {
    let mut names = Vec::new();
    let mut params = Vec::new();
    for (idx, column) in table.columns.iter().enumerate() {
        let raw = row.value(idx);
        if raw.is_empty() {
            continue;
        }
        names.push(quote_identifier(&column.name));
        params.push(
            SqlValue::parse(raw, column.column_type)
                .with_context(|| format!("Column '{}'", column.name))?,
        );
    }
    if params.is_empty() {
        return Ok(Statement::new(format!(
            "INSERT INTO {} DEFAULT VALUES",
            quote_identifier(&table.name)
        )));
    }
    let placeholders = params
        .iter()
        .enumerate()
        .map(|(idx, param)| param.placeholder(idx + 1))
        .join(", ");
    Ok(Statement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(&table.name),
            names.join(", "),
            placeholders
        ),
        params,
    })
}
