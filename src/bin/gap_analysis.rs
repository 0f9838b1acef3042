use anyhow::{Context, Result};
use barcode_gap::{
    config::{default_workers, DEFAULT_BATCH_SIZE},
    run, RunConfig,
};
use clap::{Parser, ValueEnum};
use gap_engine::AnalysisConfig;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "gap_analysis")]
#[command(version, about = "Gap analysis for DNA barcode library curation", long_about = None)]
struct Cli {
    /// Species list TSV (taxon_name or species column, optional synonyms)
    #[arg(long)]
    species_list: PathBuf,

    /// Records TSV with species and bin_uri/otu_id columns
    #[arg(long)]
    records: PathBuf,

    /// Output TSV; parent directories are created
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// Also write the run summary as JSON
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Parallel workers (default: available CPUs)
    #[arg(short = 'w', long)]
    workers: Option<usize>,

    /// Taxa per batch
    #[arg(short = 'b', long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Log level, overridden by RUST_LOG when set
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

fn main() {
    if let Err(e) = run_cli() {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let analysis = AnalysisConfig::new(cli.workers.unwrap_or_else(default_workers), cli.batch_size)
        .context("Invalid analysis settings")?;
    let mut config = RunConfig::new(cli.species_list, cli.records, cli.output, analysis);
    if let Some(path) = cli.summary_json {
        config = config.with_summary_json(path);
    }

    info!("Gap analysis for DNA barcode library curation");
    let summary = run(&config).context("Gap analysis failed")?;
    info!(
        "Gap analysis complete: {} taxa, {} unresolved",
        summary.taxa, summary.unresolved
    );
    Ok(())
}
