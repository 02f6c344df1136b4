//! Identifier sanitation for table and column names.
//!
//! Every name that reaches generated SQL passes through [`sanitize_identifier`]:
//! surrounding whitespace is trimmed, each run of characters outside
//! `[A-Za-z0-9]` collapses to a single underscore and the result is lowercased.

use std::{collections::HashSet, path::Path, sync::OnceLock};

use regex::Regex;

/// PostgreSQL silently truncates identifiers longer than this many bytes.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Used when a file stem sanitizes to nothing.
pub const FALLBACK_TABLE_NAME: &str = "csv_import";

static NON_ALPHANUMERIC: OnceLock<Regex> = OnceLock::new();

fn non_alphanumeric() -> &'static Regex {
    NON_ALPHANUMERIC.get_or_init(|| Regex::new(r"[^a-zA-Z0-9]+").expect("valid identifier regex"))
}

pub fn sanitize_identifier(raw: &str) -> String {
    non_alphanumeric()
        .replace_all(raw.trim(), "_")
        .to_ascii_lowercase()
}

/// Header text may carry NUL bytes from badly exported files; those are
/// dropped before the usual sanitation.
pub fn sanitize_header(raw: &str) -> String {
    if raw.contains('\0') {
        sanitize_identifier(&raw.replace('\0', ""))
    } else {
        sanitize_identifier(raw)
    }
}

/// Derives the table name from a CSV path, using the file name without its
/// `.csv` suffix.
pub fn table_name_for_path(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = strip_csv_suffix(&file_name);
    let mut name = sanitize_identifier(stem);
    // leave room for the `_uid` surrogate key column
    truncate_identifier(&mut name, MAX_IDENTIFIER_LEN - 4);
    if name.is_empty() || name == "_" {
        FALLBACK_TABLE_NAME.to_string()
    } else {
        name
    }
}

fn strip_csv_suffix(file_name: &str) -> &str {
    let lowered = file_name.to_ascii_lowercase();
    for suffix in [".csv", ".tsv", ".txt"] {
        if lowered.ends_with(suffix) {
            return &file_name[..file_name.len() - suffix.len()];
        }
    }
    file_name
}

/// Sanitized names are ASCII, so truncating on a byte index is safe.
pub fn truncate_identifier(name: &mut String, limit: usize) {
    if name.len() > limit {
        name.truncate(limit);
    }
}

/// Hands out unique column names, suffixing repeats with `_2`, `_3`, ...
#[derive(Debug, Default)]
pub struct IdentifierAllocator {
    taken: HashSet<String>,
}

impl IdentifierAllocator {
    pub fn with_reserved<I, S>(reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            taken: reserved.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allocate(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        truncate_identifier(&mut candidate, MAX_IDENTIFIER_LEN);
        let mut counter = 2usize;
        while self.taken.contains(&candidate) {
            let suffix = format!("_{counter}");
            let mut stem = base.to_string();
            truncate_identifier(&mut stem, MAX_IDENTIFIER_LEN - suffix.len());
            candidate = format!("{stem}{suffix}");
            counter += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}
