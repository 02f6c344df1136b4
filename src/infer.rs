//! Worst-case column type inference.
//!
//! Every value of every column is classified exactly once; classifications
//! fold into the least restrictive type seen for the column. Scanning also
//! looks for proof that date-shaped values are day/month ordered, which is a
//! property of the whole table rather than of a single column.

use std::sync::OnceLock;

use regex::Regex;

use crate::schema::{ColumnType, Row, Table};

/// Pure digit strings of this many digits or more are kept as text so they
/// never overflow a 32-bit integer column.
pub const INTEGER_DIGIT_LIMIT: usize = 9;

/// Largest leading date component that can still be a month.
const MAX_MONTH: u64 = 12;

static FLOAT_PATTERN: OnceLock<Regex> = OnceLock::new();
static DATE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn float_pattern() -> &'static Regex {
    FLOAT_PATTERN.get_or_init(|| {
        Regex::new(r"^[+-]?([0-9]+([.][0-9]*)?|[.][0-9]+)$").expect("valid float regex")
    })
}

fn date_pattern() -> &'static Regex {
    DATE_PATTERN.get_or_init(|| Regex::new(r"[0-9]+/[0-9]+").expect("valid date regex"))
}

/// Classification of a single raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub candidate: ColumnType,
    /// The value is date-shaped and its leading component cannot be a month.
    pub day_first: bool,
}

impl Observation {
    fn of(candidate: ColumnType) -> Self {
        Self {
            candidate,
            day_first: false,
        }
    }
}

/// Classifies one value. The empty string is an integer candidate, so blanks
/// never widen a column.
pub fn classify(value: &str) -> Observation {
    if value.bytes().all(|b| b.is_ascii_digit()) {
        return if value.len() < INTEGER_DIGIT_LIMIT {
            Observation::of(ColumnType::Integer)
        } else {
            Observation::of(ColumnType::Text)
        };
    }
    if float_pattern().is_match(value) {
        return Observation::of(ColumnType::Float);
    }
    if date_pattern().is_match(value) {
        return Observation {
            candidate: ColumnType::Timestamp,
            day_first: leading_date_component(value).is_some_and(|n| n > MAX_MONTH),
        };
    }
    Observation::of(ColumnType::Text)
}

/// The text before the first `/`, read as a whole numeral. Anything that is
/// not a plain numeral (including one too large for `u64`) yields `None`.
fn leading_date_component(value: &str) -> Option<u64> {
    let (prefix, _) = value.split_once('/')?;
    prefix.parse().ok()
}

/// Result of scanning a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceOutcome {
    pub column_types: Vec<ColumnType>,
    pub day_first_dates: bool,
}

/// Running per-column state for a scan.
#[derive(Debug, Clone)]
pub struct TypeInference {
    column_types: Vec<ColumnType>,
    day_first_dates: bool,
}

impl TypeInference {
    pub fn new(column_count: usize) -> Self {
        Self {
            column_types: vec![ColumnType::Integer; column_count],
            day_first_dates: false,
        }
    }

    pub fn observe(&mut self, column: usize, value: &str) {
        let Some(current) = self.column_types.get_mut(column) else {
            return;
        };
        let observation = classify(value);
        if observation.day_first {
            self.day_first_dates = true;
        }
        *current = current.widen(observation.candidate);
    }

    pub fn observe_row(&mut self, row: &Row) {
        for (idx, value) in row.values.iter().enumerate() {
            self.observe(idx, value);
        }
    }

    pub fn finish(self) -> InferenceOutcome {
        InferenceOutcome {
            column_types: self.column_types,
            day_first_dates: self.day_first_dates,
        }
    }
}

/// Scans every row of `table` without modifying it.
pub fn infer(table: &Table) -> InferenceOutcome {
    let mut inference = TypeInference::new(table.columns.len());
    for row in &table.rows {
        inference.observe_row(row);
    }
    inference.finish()
}

/// Returns a copy of `table` carrying the inferred column types and locale
/// flag.
pub fn apply(mut table: Table, outcome: &InferenceOutcome) -> Table {
    for (column, column_type) in table.columns.iter_mut().zip(&outcome.column_types) {
        column.column_type = *column_type;
    }
    table.day_first_dates = outcome.day_first_dates;
    table
}
