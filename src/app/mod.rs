use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

use crate::config::{CoordinatePolicy, JsonStyle, RuntimeConfig, Settings};
use crate::pipeline::{RunStats, audit_map, process_map};
use crate::reader::OsmXmlReader;
use crate::sinks::jsonl::default_output_path;
use crate::sinks::{DocumentStoreSink, JsonLinesSink, RecordSink};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input OSM XML file
    #[arg(short, long)]
    pub input: PathBuf,

    /// What to do with the shaped records
    #[arg(long, value_enum, default_value_t = RunMode::Json)]
    pub mode: RunMode,

    /// JSON output file (default: <input>.json, "-" for stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pretty-print JSON records with a two-space indent
    #[arg(long)]
    pub pretty: bool,

    /// Write one compact JSON object per line, overriding the settings file
    #[arg(long, conflicts_with = "pretty")]
    pub compact: bool,

    /// Document store database file
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Document store collection name
    #[arg(long)]
    pub collection: Option<String>,

    /// Handling of elements with unparseable coordinates
    #[arg(long, value_enum)]
    pub on_invalid_coordinate: Option<CoordinatePolicy>,

    /// Settings file (YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum RunMode {
    /// Write newline-terminated JSON records to a file
    Json,
    /// Insert each record into a document store collection
    Store,
    /// Report tag key classes instead of shaping
    Audit,
}

pub fn mode_label(mode: &RunMode) -> &'static str {
    match mode {
        RunMode::Json => "json",
        RunMode::Store => "store",
        RunMode::Audit => "audit",
    }
}

/// Merge the settings file with command-line overrides.
pub fn resolve_runtime(cli: &Cli) -> Result<RuntimeConfig> {
    let settings = Settings::load(cli.config.as_deref())?;
    let mut runtime = RuntimeConfig::from(settings);

    if cli.pretty {
        runtime.style = JsonStyle::Pretty;
    } else if cli.compact {
        runtime.style = JsonStyle::Compact;
    }
    if let Some(database) = &cli.database {
        runtime.database = database.clone();
    }
    if let Some(collection) = &cli.collection {
        runtime.collection = collection.clone();
    }
    if let Some(policy) = cli.on_invalid_coordinate {
        runtime.coordinate_policy = policy;
    }
    Ok(runtime)
}

pub fn init_sink(
    mode: &RunMode,
    cli: &Cli,
    runtime: &RuntimeConfig,
) -> Result<Box<dyn RecordSink>> {
    match mode {
        RunMode::Json => {
            let output = cli
                .output
                .clone()
                .unwrap_or_else(|| default_output_path(&cli.input));
            if output == Path::new("-") {
                tracing::info!("Sink: {} -> stdout", mode_label(mode));
                Ok(Box::new(JsonLinesSink::stdout(runtime.style)?))
            } else {
                tracing::info!("Sink: {} -> {:?}", mode_label(mode), output);
                Ok(Box::new(JsonLinesSink::new(&output, runtime.style)?))
            }
        }
        RunMode::Store => {
            tracing::info!(
                "Sink: {} -> {:?} (collection {:?})",
                mode_label(mode),
                runtime.database,
                runtime.collection
            );
            Ok(Box::new(DocumentStoreSink::open(
                &runtime.database,
                &runtime.collection,
            )?))
        }
        RunMode::Audit => anyhow::bail!("CLI: Audit mode does not write records"),
    }
}

/// Shape the whole input into the sink selected by `cli.mode`.
pub fn run_shaping(cli: &Cli, runtime: &RuntimeConfig) -> Result<RunStats> {
    let reader = OsmXmlReader::from_path(&cli.input)?;
    let mut sink = init_sink(&cli.mode, cli, runtime)?;

    tracing::info!("Processing elements from {:?}...", cli.input);
    let stats = process_map(reader, sink.as_mut(), runtime.coordinate_policy)?;
    sink.finish().context("Pipeline: Failed to finalize sink")?;
    Ok(stats)
}

/// Print the tag key audit of the input as JSON on stdout.
pub fn run_audit(cli: &Cli) -> Result<()> {
    let reader = OsmXmlReader::from_path(&cli.input)?;
    let audit = audit_map(reader)?;
    tracing::info!("Audited {} tag keys", audit.total());
    println!("{}", serde_json::to_string_pretty(&audit)?);
    Ok(())
}
