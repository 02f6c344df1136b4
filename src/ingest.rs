//! First pass over a CSV file: reads every record into memory, infers column
//! types while doing so, and diverts malformed records to the skip log.

use std::{
    io::Read,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_8};
use log::{debug, info, warn};

use crate::{
    infer::{self, TypeInference},
    io_utils::{self, TailCapture},
    sanitize::{self, IdentifierAllocator},
    schema::{Column, Row, Table},
    skips::{self, SkipLog},
    sql::AUDIT_COLUMN,
};

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    /// Where malformed records are logged. `None` only counts them.
    pub skips_dir: Option<PathBuf>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
            skips_dir: Some(PathBuf::from(skips::DEFAULT_SKIPS_DIR)),
        }
    }
}

/// A fully read and typed table plus what happened while reading it.
#[derive(Debug)]
pub struct LoadedTable {
    pub table: Table,
    pub skip_log: Option<PathBuf>,
    /// Rows where some text had to be replaced with the filler character.
    pub degraded_rows: usize,
}

/// What one read from the source produced.
#[derive(Debug)]
pub enum ReadOutcome {
    Record { fields: Vec<String>, degraded: bool },
    Malformed {
        fields: csv::ByteRecord,
        line: Option<u64>,
        reason: String,
    },
    End,
}

/// Record source that keeps going after a malformed record.
pub struct RowSource<R> {
    reader: csv::Reader<TailCapture<R>>,
    delimiter: u8,
    encoding: &'static Encoding,
    record: csv::ByteRecord,
}

impl<R: Read> RowSource<R> {
    pub fn new(input: R, delimiter: u8, encoding: &'static Encoding) -> Self {
        Self {
            reader: io_utils::open_csv_reader(TailCapture::new(input), delimiter),
            delimiter,
            encoding,
            record: csv::ByteRecord::new(),
        }
    }

    pub fn headers(&mut self) -> Result<Vec<String>> {
        let headers = self.reader.byte_headers().context("Reading header row")?;
        let decoded = io_utils::decode_record(headers, self.encoding).0;
        self.release_consumed();
        Ok(decoded)
    }

    pub fn next_record(&mut self) -> Result<ReadOutcome> {
        let result = self.reader.read_byte_record(&mut self.record);
        let outcome = match result {
            Ok(true) if self.quote_left_open() => ReadOutcome::Malformed {
                fields: self.record.clone(),
                line: self.record.position().map(csv::Position::line),
                reason: "quoted field is never closed".to_string(),
            },
            Ok(true) => {
                let (fields, degraded) = io_utils::decode_record(&self.record, self.encoding);
                ReadOutcome::Record { fields, degraded }
            }
            Ok(false) => ReadOutcome::End,
            Err(err) => match err.kind() {
                csv::ErrorKind::UnequalLengths {
                    expected_len, len, ..
                } => ReadOutcome::Malformed {
                    // the reader fills the record before checking its length
                    fields: self.record.clone(),
                    line: err.position().map(csv::Position::line),
                    reason: format!("expected {expected_len} field(s), found {len}"),
                },
                _ => return Err(err).context("Reading CSV record"),
            },
        };
        self.release_consumed();
        Ok(outcome)
    }

    /// An open quote runs to the end of the input, so only records finished
    /// after the input was exhausted need their raw text checked.
    fn quote_left_open(&self) -> bool {
        let capture = self.reader.get_ref();
        if !capture.exhausted() {
            return false;
        }
        let Some(start) = self.record.position().map(csv::Position::byte) else {
            return false;
        };
        let end = self.reader.position().byte();
        io_utils::ends_inside_quotes(capture.captured(start, end), self.delimiter)
    }

    fn release_consumed(&mut self) {
        let consumed = self.reader.position().byte();
        self.reader.get_mut().release_before(consumed);
    }
}

/// Sanitizes headers into columns. Headers that sanitize to nothing are
/// dropped; every kept column remembers its position in the source record.
pub fn build_columns(table_name: &str, headers: &[String]) -> Vec<Column> {
    let mut allocator =
        IdentifierAllocator::with_reserved([format!("{table_name}_uid"), AUDIT_COLUMN.to_string()]);
    headers
        .iter()
        .enumerate()
        .filter_map(|(position, raw)| {
            let sanitized = sanitize::sanitize_header(raw);
            if sanitized.is_empty() {
                debug!("Dropping column {position} with empty header {raw:?}");
                return None;
            }
            Some(Column::new(allocator.allocate(&sanitized), position))
        })
        .collect()
}

pub fn load_table(path: &Path, options: &IngestOptions) -> Result<LoadedTable> {
    let table_name = sanitize::table_name_for_path(path);
    let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
    info!(
        "Reading '{}' into table '{}' (delimiter '{}')",
        path.display(),
        table_name,
        crate::printable_delimiter(delimiter)
    );
    let input = io_utils::open_input_file(path)?;
    read_table(input, delimiter, &table_name, options)
        .with_context(|| format!("Loading {path:?}"))
}

pub fn read_table<R: Read>(
    input: R,
    delimiter: u8,
    table_name: &str,
    options: &IngestOptions,
) -> Result<LoadedTable> {
    let mut source = RowSource::new(input, delimiter, options.encoding);
    let headers = source.headers()?;
    let columns = build_columns(table_name, &headers);
    let mut table = Table::new(table_name, columns);
    let mut skip_log = match &options.skips_dir {
        Some(dir) => SkipLog::create(dir, table_name, &table.headers())?,
        None => SkipLog::discard(),
    };
    let mut inference = TypeInference::new(table.columns.len());
    let mut degraded_rows = 0usize;

    loop {
        match source.next_record()? {
            ReadOutcome::Record { fields, degraded } => {
                let row = Row::from_record(&table.columns, &fields);
                if degraded {
                    degraded_rows += 1;
                    warn!(
                        "Row {} of '{}' contained text that could not be stored as-is; \
                         replaced with '{}'",
                        table.rows.len() + 1,
                        table_name,
                        io_utils::FILLER
                    );
                }
                inference.observe_row(&row);
                table.rows.push(row);
            }
            ReadOutcome::Malformed {
                fields,
                line,
                reason,
            } => {
                skip_log.record(&fields, line, &reason)?;
            }
            ReadOutcome::End => break,
        }
    }

    table.skipped = skip_log.skipped();
    let skip_log = skip_log.finish()?;
    let outcome = inference.finish();
    let table = infer::apply(table, &outcome);
    debug!(
        "Inferred types for '{}': {:?} (day-first dates: {})",
        table.name,
        table.column_types(),
        table.day_first_dates
    );
    info!(
        "Loaded {} row(s) into '{}', {} skipped",
        table.row_count(),
        table.name,
        table.skipped
    );
    Ok(LoadedTable {
        table,
        skip_log,
        degraded_rows,
    })
}
