//! Per-file import: read and type the table, normalize dates, then stream the
//! generated statements into an executor.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    dates,
    executor::Executor,
    ingest::{self, IngestOptions, LoadedTable},
    schema::Table,
    stream::{self, StreamError, StreamItem},
};

/// Progress is reported after every this many inserted rows.
pub const PROGRESS_INTERVAL: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub source: PathBuf,
    pub table: String,
    pub inserted: usize,
    pub skipped: usize,
    pub degraded_rows: usize,
    pub skip_log: Option<PathBuf>,
}

/// Reads `path` and applies the day/month swap when the data calls for it.
pub fn prepare(path: &Path, options: &IngestOptions) -> Result<LoadedTable> {
    let loaded = ingest::load_table(path, options)?;
    if loaded.table.day_first_dates {
        info!(
            "Dates in '{}' are day/month ordered; reordering timestamp columns",
            loaded.table.name
        );
    }
    Ok(LoadedTable {
        table: dates::normalize(loaded.table),
        ..loaded
    })
}

/// Totals reported by [`stream_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamTotals {
    pub inserted: usize,
    pub skipped: usize,
}

/// Streams every statement for `table` into `executor`. The first statement
/// the executor rejects ends the import with that error.
pub fn stream_table<E>(table: Table, executor: &mut E) -> Result<StreamTotals>
where
    E: Executor + ?Sized,
{
    let name = table.name.clone();
    let stream = stream::spawn(table)?;
    let mut inserted = 0usize;
    let mut skipped = 0usize;

    loop {
        let Some(item) = stream.recv() else {
            stream.finish()?;
            return Err(StreamError::Truncated.into());
        };
        if !item.has_more() {
            if let StreamItem::Trailer { skipped: count } = item {
                skipped = count;
                continue;
            }
            break;
        }
        match item {
            StreamItem::Drop(statement) => {
                executor
                    .execute(&statement)
                    .with_context(|| format!("Dropping table '{name}'"))?;
            }
            StreamItem::Create(statement) => {
                executor
                    .execute(&statement)
                    .with_context(|| format!("Creating table '{name}'"))?;
            }
            StreamItem::Insert {
                row_index,
                statement,
            } => {
                executor
                    .execute(&statement)
                    .with_context(|| format!("Inserting row {} into '{name}'", row_index + 1))?;
                inserted += 1;
                if inserted % PROGRESS_INTERVAL == 0 {
                    info!("{inserted} records added");
                }
            }
            StreamItem::Trailer { .. } | StreamItem::EndOfStream => {}
        }
    }

    stream.finish()?;
    executor.finish()?;
    Ok(StreamTotals { inserted, skipped })
}

pub fn import_file<E>(path: &Path, options: &IngestOptions, executor: &mut E) -> Result<ImportSummary>
where
    E: Executor + ?Sized,
{
    let LoadedTable {
        table,
        skip_log,
        degraded_rows,
    } = prepare(path, options)?;
    let table_name = table.name.clone();
    let totals =
        stream_table(table, executor).with_context(|| format!("Importing {path:?}"))?;

    info!("{} total record(s) added to '{}'", totals.inserted, table_name);
    match &skip_log {
        Some(log) => info!("~{} record(s) skipped, logged to {:?}", totals.skipped, log),
        None => info!("~{} record(s) skipped", totals.skipped),
    }
    if degraded_rows > 0 {
        warn!(
            "{degraded_rows} row(s) in '{table_name}' had undecodable text replaced before loading"
        );
    }
    Ok(ImportSummary {
        source: path.to_path_buf(),
        table: table_name,
        inserted: totals.inserted,
        skipped: totals.skipped,
        degraded_rows,
        skip_log,
    })
}

/// Imports files one after another. The first failure stops the run.
pub fn import_all<E>(
    paths: &[PathBuf],
    options: &IngestOptions,
    executor: &mut E,
) -> Result<Vec<ImportSummary>>
where
    E: Executor + ?Sized,
{
    let mut summaries = Vec::with_capacity(paths.len());
    for path in paths {
        summaries.push(import_file(path, options, executor)?);
    }
    Ok(summaries)
}
