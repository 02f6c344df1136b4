use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::skips::DEFAULT_SKIPS_DIR;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Load CSV files into PostgreSQL tables with inferred column types",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load CSV files (or directories of them) into PostgreSQL, one table per file
    Load(LoadArgs),
    /// Write the SQL a load would execute without connecting to a database
    Script(ScriptArgs),
    /// Show the table name and column types that would be created for a CSV file
    Probe(ProbeArgs),
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input CSV file or directory (repeatable)
    #[arg(short = 'i', long = "input", required = true, action = ArgAction::Append)]
    pub inputs: Vec<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Directory receiving logs of malformed records
    #[arg(long = "skips-dir", default_value = DEFAULT_SKIPS_DIR)]
    pub skips_dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// PostgreSQL connection URL (overrides DATABASE_URL and POSTGRES_* variables)
    #[arg(long = "database-url")]
    pub database_url: Option<String>,
    /// Environment file to read connection settings from (defaults to ./.env when present)
    #[arg(long = "env-file")]
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ScriptArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Output SQL file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Input CSV file to inspect
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() || first == '"' || first == '\n' || first == '\r' {
                return Err("Delimiter must be an ASCII character other than a quote or newline".to_string());
            }
            Ok(first as u8)
        }
    }
}
