//! docsieve
//!
//! Batch classifier for document URLs. Reads a list of URLs, classifies
//! each one with a keyword scanner or a language model, and writes the
//! flagged subset to an output file. `harvest` builds such a list from
//! the Wayback Machine index.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docsieve_classifiers::{build_classifier, Classifier, LlmProvider};
use docsieve_pipeline::{ItemWorker, RunReport, Scheduler};
use docsieve_telemetry::{describe_metrics, MetricsCollector};
use std::fs::{File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

mod config;
mod harvest;
mod input;
mod summary;

use config::{RunConfig, RunSettings, WriteMode};
use summary::{render_summary, JsonSummary};

/// Exit code for a run stopped by Ctrl+C
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(name = "docsieve")]
#[command(about = "Flag sensitive documents in a list of URLs", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file path (defaults to docsieve.yaml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download each document and scan its text for sensitive keywords
    Keywords {
        #[command(flatten)]
        run: RunArgs,

        /// YAML list of keywords replacing the built-in set
        #[arg(long)]
        keywords_file: Option<PathBuf>,
    },

    /// Ask a language model whether each URL looks sensitive
    Ai {
        #[command(flatten)]
        run: RunArgs,

        /// Model provider (openai, anthropic, gemini)
        #[arg(long)]
        provider: Option<LlmProvider>,

        /// Model name
        #[arg(long)]
        model: Option<String>,

        /// Override the provider API base URL
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// List archived URLs under a domain from the Wayback Machine
    Harvest(HarvestArgs),
}

/// Options for the harvest command
#[derive(Args, Debug)]
pub struct HarvestArgs {
    /// Domain to harvest, e.g. example.com
    pub domain: String,

    /// Only list URLs ending in these extensions (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub exts: Vec<String>,

    /// List URLs ending in any supported extension (the default)
    #[arg(long, conflicts_with = "exts")]
    pub all_extensions: bool,

    /// File for the harvested URL list
    #[arg(short, long, default_value = "filtered_output.txt")]
    pub output: PathBuf,

    /// Also look up archived copies captured with a 200 status
    #[arg(long)]
    pub check_200: bool,

    /// File for archived copy links
    #[arg(long, default_value = "archived200.txt")]
    pub archived_output: PathBuf,

    /// Override the CDX search endpoint
    #[arg(long)]
    pub endpoint: Option<String>,
}

/// Options shared by every run mode
#[derive(Args, Debug)]
pub struct RunArgs {
    /// File with one URL per line
    pub input: PathBuf,

    /// Maximum items in flight
    #[arg(short = 'j', long, conflicts_with = "sequential")]
    pub concurrency: Option<usize>,

    /// Process items one at a time in input order
    #[arg(long)]
    pub sequential: bool,

    /// Output file for flagged results
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Append to the output file
    #[arg(long, conflicts_with = "overwrite")]
    pub append: bool,

    /// Truncate the output file before writing
    #[arg(long)]
    pub overwrite: bool,

    /// Delay between starting consecutive items, in milliseconds
    #[arg(long)]
    pub pacing_ms: Option<u64>,

    /// Attempts per item before giving up
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Only keep URLs ending in these extensions (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub exts: Vec<String>,

    /// Keep URLs ending in any supported extension
    #[arg(long, conflicts_with_all = ["exts", "no_filter"])]
    pub all_extensions: bool,

    /// Keep every non-blank line
    #[arg(long, conflicts_with = "exts")]
    pub no_filter: bool,

    /// Also write a JSON summary of the run to this path
    #[arg(long)]
    pub summary_json: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::from(EXIT_INTERRUPTED),
        Ok(false) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Run the chosen command; returns whether it was interrupted
async fn run(cli: Cli) -> Result<bool> {
    let config = RunConfig::load(cli.config.as_deref())?;
    match &cli.command {
        Command::Harvest(args) => {
            let cancel = CancellationToken::new();
            tokio::spawn(cancel_on_signal(cancel.clone()));
            harvest::run(args, &config.harvest, cancel).await
        }
        command => classify(config, command).await.map(|report| report.interrupted),
    }
}

async fn classify(config: RunConfig, command: &Command) -> Result<RunReport> {
    let settings = RunSettings::resolve(config, command)?;
    info!(mode = ?settings.mode, input = %settings.input.display(), "Configuration loaded");

    let classifier = build_classifier(settings.choice, &settings.classifier)
        .context("Failed to initialize classifier")?;
    info!(classifier = classifier.name(), kind = ?classifier.kind(), "Classifier ready");

    let items = input::read_items(&settings.input, settings.filter.as_ref())?;
    match &settings.filter {
        Some(filter) => info!(items = items.len(), extensions = ?filter.extensions(), "Input loaded"),
        None => info!(items = items.len(), "Input loaded"),
    }

    // Opened up front so a bad path fails before any work is done
    let output = open_output(&settings.output, settings.write_mode)?;

    describe_metrics();
    let metrics = MetricsCollector::new();
    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let worker = ItemWorker::new(classifier, settings.policy, cancel, metrics.clone());
    let scheduler = Scheduler::new(worker, settings.scheduler);

    let run_id = uuid::Uuid::new_v4().to_string();
    let report = scheduler
        .run(items)
        .instrument(info_span!("run", run_id = %run_id))
        .await?;

    report
        .write_lines(BufWriter::new(output))
        .with_context(|| format!("Failed to write results to {}", settings.output.display()))?;

    let snapshot = metrics.snapshot();
    println!("{}", render_summary(&report, &snapshot, &settings.output));

    if let Some(path) = &settings.summary_json {
        let summary = JsonSummary {
            run_id,
            output: &settings.output,
            report: &report,
            metrics: &snapshot,
        };
        write_json(path, &summary)?;
    }

    Ok(report)
}

fn open_output(path: &Path, mode: WriteMode) -> Result<File> {
    let mut options = OpenOptions::new();
    options.create(true);
    match mode {
        WriteMode::Append => options.append(true),
        WriteMode::Overwrite => options.write(true).truncate(true),
    };
    options
        .open(path)
        .with_context(|| format!("Failed to open output file {}", path.display()))
}

fn write_json(path: &Path, summary: &JsonSummary<'_>) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create summary file {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), summary)
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;
    Ok(())
}

/// Cancel the run on the first shutdown signal
async fn cancel_on_signal(cancel: CancellationToken) {
    shutdown_signal().await;
    warn!("Shutdown signal received, finishing in-flight items...");
    cancel.cancel();
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("docsieve=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docsieve=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
