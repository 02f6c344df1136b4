//! I/O utilities for CSV reading, decoding, input discovery and script output.
//!
//! - **Delimiter resolution**: extension-based auto-detection (`.tsv` -> tab,
//!   everything else comma) with manual override support.
//! - **Decoding**: input bytes are decoded via `encoding_rs`, defaulting to
//!   UTF-8. Undecodable sequences are replaced with [`FILLER`] instead of
//!   failing the row.
//! - **Quote tracking**: [`TailCapture`] keeps the raw bytes of the record in
//!   flight so a quoted field still open at end of input can be detected.
//! - **Discovery**: directory arguments expand to the CSV files they contain.

use std::{
    borrow::Cow,
    fs::{self, File},
    io::{self, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, bail};
use encoding_rs::{Encoding, UTF_8};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

/// Stands in for text that cannot be stored as-is.
pub const FILLER: char = '~';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

/// Strict reader: every record must have as many fields as the header.
pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false);
    builder.from_reader(reader)
}

pub fn open_input_file(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("Opening input file {path:?}"))
}

/// Pass-through reader that keeps every byte handed to the CSV parser from a
/// movable start offset onwards, so the raw text of a record can be checked
/// after it was parsed.
pub struct TailCapture<R> {
    inner: R,
    buffer: Vec<u8>,
    base: u64,
    exhausted: bool,
}

impl<R> TailCapture<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            base: 0,
            exhausted: false,
        }
    }

    /// Whether the underlying reader has reported end of input.
    pub fn exhausted(&self) -> bool {
        self.exhausted
    }

    /// Forgets everything before byte `offset` of the input.
    pub fn release_before(&mut self, offset: u64) {
        let drop_len = usize::try_from(offset.saturating_sub(self.base))
            .unwrap_or(usize::MAX)
            .min(self.buffer.len());
        self.buffer.drain(..drop_len);
        self.base += drop_len as u64;
    }

    /// Captured bytes in `start..end` of the input, clipped to what is held.
    pub fn captured(&self, start: u64, end: u64) -> &[u8] {
        let clip = |offset: u64| {
            usize::try_from(offset.saturating_sub(self.base))
                .unwrap_or(usize::MAX)
                .min(self.buffer.len())
        };
        let (from, to) = (clip(start), clip(end));
        &self.buffer[from.min(to)..to]
    }
}

impl<R: Read> Read for TailCapture<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(out)?;
        if read == 0 && !out.is_empty() {
            self.exhausted = true;
        }
        self.buffer.extend_from_slice(&out[..read]);
        Ok(read)
    }
}

/// Walks the raw text of one record and reports whether a quoted field was
/// still open when the text ran out. Quotes only open a field at its start;
/// doubled quotes inside a quoted field are literal.
pub fn ends_inside_quotes(raw: &[u8], delimiter: u8) -> bool {
    let mut in_quotes = false;
    let mut field_start = true;
    let mut bytes = raw.iter().copied().peekable();
    while let Some(byte) = bytes.next() {
        if in_quotes {
            if byte == b'"' {
                if bytes.peek() == Some(&b'"') {
                    bytes.next();
                } else {
                    in_quotes = false;
                }
            }
            continue;
        }
        if field_start && byte == b'"' {
            in_quotes = true;
            field_start = false;
            continue;
        }
        field_start = byte == delimiter || byte == b'\n' || byte == b'\r';
    }
    in_quotes
}

/// Output for rendered scripts: a file, or stdout for `None` / `-`.
pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    Ok(writer)
}

/// A decoded field plus whether anything had to be replaced.
pub struct Decoded<'a> {
    pub text: Cow<'a, str>,
    pub degraded: bool,
}

/// Decodes one field, swapping undecodable sequences and NUL characters for
/// [`FILLER`]; PostgreSQL text columns accept neither.
pub fn decode_field<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> Decoded<'a> {
    let (text, _, had_errors) = encoding.decode(bytes);
    let needs_nul_fix = text.contains('\0');
    if !had_errors && !needs_nul_fix {
        return Decoded {
            text,
            degraded: false,
        };
    }
    let mut repaired = text.into_owned();
    if had_errors {
        repaired = repaired.replace(char::REPLACEMENT_CHARACTER, &FILLER.to_string());
    }
    if needs_nul_fix {
        repaired = repaired.replace('\0', &FILLER.to_string());
    }
    Decoded {
        text: Cow::Owned(repaired),
        degraded: true,
    }
}

/// Decodes a whole record; the flag reports whether any field degraded.
pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> (Vec<String>, bool) {
    let mut degraded = false;
    let fields = record
        .iter()
        .map(|field| {
            let decoded = decode_field(field, encoding);
            degraded |= decoded.degraded;
            decoded.text.into_owned()
        })
        .collect();
    (fields, degraded)
}

/// Expands the given paths into the ordered list of files to import.
/// Directories contribute their `.csv` / `.tsv` files (not recursively),
/// sorted by name.
pub fn discover_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        let metadata =
            fs::metadata(path).with_context(|| format!("Reading input location {path:?}"))?;
        if !metadata.is_dir() {
            files.push(path.clone());
            continue;
        }
        let mut found = fs::read_dir(path)
            .with_context(|| format!("Listing directory {path:?}"))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()
            .with_context(|| format!("Listing directory {path:?}"))?
            .into_iter()
            .filter(|candidate| candidate.is_file() && has_table_extension(candidate))
            .collect::<Vec<_>>();
        found.sort();
        files.extend(found);
    }
    if files.is_empty() {
        bail!("No CSV files found in {paths:?}");
    }
    Ok(files)
}

fn has_table_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv") || ext.eq_ignore_ascii_case("tsv"))
}
