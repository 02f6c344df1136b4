//! Side log for records that could not be read as well-formed rows.

use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Utc;
use csv::QuoteStyle;
use log::warn;

/// Default directory for skip logs, relative to the working directory.
pub const DEFAULT_SKIPS_DIR: &str = "skips";

pub struct SkipLog {
    path: Option<PathBuf>,
    writer: csv::Writer<Box<dyn Write>>,
    skipped: usize,
}

fn skip_writer(out: Box<dyn Write>) -> csv::Writer<Box<dyn Write>> {
    csv::WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .double_quote(true)
        .flexible(true)
        .from_writer(out)
}

impl SkipLog {
    /// Creates `<dir>/<unix-micros>_<table>_skipped.csv` seeded with the
    /// sanitized headers.
    pub fn create(dir: &Path, table_name: &str, headers: &[String]) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("Creating skips directory {dir:?}"))?;
        let stamp = Utc::now().timestamp_micros();
        let path = dir.join(format!("{stamp}_{table_name}_skipped.csv"));
        let file = File::create(&path).with_context(|| format!("Creating skip log {path:?}"))?;
        let mut writer = skip_writer(Box::new(BufWriter::new(file)));
        writer
            .write_record(headers)
            .with_context(|| format!("Writing headers to skip log {path:?}"))?;
        Ok(Self {
            path: Some(path),
            writer,
            skipped: 0,
        })
    }

    /// Counts malformed records without keeping them anywhere.
    pub fn discard() -> Self {
        Self {
            path: None,
            writer: skip_writer(Box::new(io::sink())),
            skipped: 0,
        }
    }

    /// Appends whatever fields were recovered from a malformed record and
    /// bumps the skip counter.
    pub fn record<I, T>(&mut self, fields: I, line: Option<u64>, reason: &str) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.skipped += 1;
        match line {
            Some(line) => warn!("Skipping malformed record at line {line}: {reason}"),
            None => warn!("Skipping malformed record: {reason}"),
        }
        self.writer
            .write_record(fields)
            .context("Writing skipped record")?;
        Ok(())
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Flushes the log and returns its path, if it has one.
    pub fn finish(mut self) -> Result<Option<PathBuf>> {
        self.writer
            .flush()
            .context("Flushing skip log")?;
        Ok(self.path)
    }
}
