pub mod cli;
pub mod config;
pub mod dates;
pub mod executor;
pub mod import;
pub mod infer;
pub mod ingest;
pub mod io_utils;
pub mod sanitize;
pub mod schema;
pub mod skips;
pub mod sql;
pub mod stream;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands, InputArgs},
    config::DatabaseTarget,
    executor::{PgExecutor, ScriptExecutor},
    ingest::IngestOptions,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_pgload", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Load(args) => handle_load(&args),
        Commands::Script(args) => handle_script(&args),
        Commands::Probe(args) => handle_probe(&args),
    }
}

fn ingest_options(args: &InputArgs) -> Result<IngestOptions> {
    Ok(IngestOptions {
        delimiter: args.delimiter,
        encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
        skips_dir: Some(args.skips_dir.clone()),
    })
}

fn handle_load(args: &cli::LoadArgs) -> Result<()> {
    let options = ingest_options(&args.input)?;
    let files = io_utils::discover_inputs(&args.input.inputs)?;
    let target = DatabaseTarget::resolve(args.database_url.as_deref(), args.env_file.as_deref())?;
    let mut executor = PgExecutor::connect(&target)?;
    let summaries = import::import_all(&files, &options, &mut executor)?;
    let inserted = summaries.iter().map(|s| s.inserted).sum::<usize>();
    let skipped = summaries.iter().map(|s| s.skipped).sum::<usize>();
    info!(
        "Loaded {} file(s): {} record(s) added, {} skipped",
        summaries.len(),
        inserted,
        skipped
    );
    Ok(())
}

fn handle_script(args: &cli::ScriptArgs) -> Result<()> {
    let options = ingest_options(&args.input)?;
    let files = io_utils::discover_inputs(&args.input.inputs)?;
    let out = io_utils::open_output(args.output.as_deref())?;
    let mut executor = ScriptExecutor::new(out);
    let summaries = import::import_all(&files, &options, &mut executor)?;
    match &args.output {
        Some(path) => info!(
            "SQL for {} file(s) written to {:?}",
            summaries.len(),
            path
        ),
        None => info!("SQL for {} file(s) written to stdout", summaries.len()),
    }
    Ok(())
}

fn handle_probe(args: &cli::ProbeArgs) -> Result<()> {
    let options = IngestOptions {
        delimiter: args.delimiter,
        encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
        skips_dir: None,
    };
    let loaded = ingest::load_table(&args.input, &options)
        .with_context(|| format!("Probing {:?}", args.input))?;
    print!("{}", table::describe(&loaded.table));
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
