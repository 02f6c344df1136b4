//! Table model shared by every pass of an import.
//!
//! A [`Table`] is built once per source file by [`crate::ingest`], retyped by
//! [`crate::infer`], optionally rewritten by [`crate::dates`] and finally moved
//! into the statement generator in [`crate::stream`].

use std::fmt;

/// Inferred column type.
///
/// Variants are declared from most general to most restrictive so that the
/// derived ordering doubles as the inference lattice: folding two
/// classifications with [`Ord::min`] yields the less restrictive one, and
/// `Text` absorbs everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColumnType {
    Text,
    Timestamp,
    Float,
    Integer,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "Text",
            ColumnType::Timestamp => "Timestamp",
            ColumnType::Float => "Float",
            ColumnType::Integer => "Integer",
        }
    }

    /// PostgreSQL type used in `CREATE TABLE`.
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Float => "double precision",
            ColumnType::Integer => "integer",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    /// The less restrictive of the two types.
    pub fn widen(self, other: ColumnType) -> ColumnType {
        self.min(other)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    /// Zero-based index of the field in the source record.
    pub source_position: usize,
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, source_position: usize) -> Self {
        Self {
            name: name.into(),
            source_position,
            column_type: ColumnType::Integer,
        }
    }
}

/// One loaded record, aligned to [`Table::columns`]. Empty strings are empty
/// fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    pub values: Vec<String>,
}

impl Row {
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    pub fn value(&self, index: usize) -> &str {
        self.values.get(index).map(String::as_str).unwrap_or("")
    }

    /// Picks the retained fields out of a full source record using each
    /// column's recorded source position. Missing trailing fields become
    /// empty values.
    pub fn from_record(columns: &[Column], record: &[String]) -> Self {
        let values = columns
            .iter()
            .map(|column| {
                record
                    .get(column.source_position)
                    .cloned()
                    .unwrap_or_default()
            })
            .collect();
        Self { values }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    /// Set when date-shaped values are day/month ordered.
    pub day_first_dates: bool,
    pub skipped: usize,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
            day_first_dates: false,
            skipped: 0,
        }
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_types(&self) -> Vec<ColumnType> {
        self.columns.iter().map(|c| c.column_type).collect()
    }

    pub fn surrogate_key(&self) -> String {
        format!("{}_uid", self.name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
