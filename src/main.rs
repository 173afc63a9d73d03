mod clock;
mod collect;
mod config;
mod fetch;
mod orchestrator;
mod ranking;
mod sink;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use config::Settings;
use orchestrator::{AppendOrchestrator, RemoteSink};
use sink::google::{Credentials, GoogleSheetsClient};
use sink::local::LocalSheetWriter;
use sink::remote::RemoteSheetWriter;
use sink::{AppendRecord, SinkOutcome};

#[derive(Parser)]
#[command(
    name = "ranking_tracker",
    about = "Track best-seller rankings into a workbook and a shared sheet"
)]
struct Cli {
    /// Settings file (default: ./ranking.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every source and append one row to both sinks
    Run {
        /// Build and log the row without writing anywhere
        #[arg(long)]
        dry_run: bool,
    },
    /// Run the extractor on a saved page and print the row
    Extract {
        file: PathBuf,
        /// Number of ranking columns to produce
        #[arg(short = 'n', long, default_value = "4")]
        expected_len: usize,
        #[arg(short, long, default_value = "page")]
        label: String,
    },
}

fn init_tracing(log_file: Option<&Path>) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let file_layer = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
            Err(e) => {
                eprintln!("log file {} unavailable: {}", path.display(), e);
                None
            }
        }
    });

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer())
        .with(file_layer)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    init_tracing(settings.log_file.as_deref());

    let t0 = Instant::now();
    let result = match cli.command {
        Commands::Run { dry_run } => run(&settings, dry_run),
        Commands::Extract {
            file,
            expected_len,
            label,
        } => extract_file(&settings, &file, expected_len, &label),
    };

    info!(elapsed_ms = t0.elapsed().as_millis() as u64, "finished");
    result
}

fn run(settings: &Settings, dry_run: bool) -> Result<()> {
    info!(sources = settings.sources.len(), dry_run, "run started");

    let fetcher = fetch::HttpFetcher::new(&settings.fetch).context("Failed to build HTTP client")?;
    let extractor = ranking::Extractor::from_settings(&settings.extraction);
    let rows = collect::collect_rows(&fetcher, &extractor, &settings.sources);
    let timestamp = clock::now_timestamp(&settings.clock)?;

    if dry_run {
        let record = AppendRecord::new(timestamp, &rows);
        info!(timestamp = record.timestamp(), "dry run, nothing written");
        println!("{}", record.cells().join("\t"));
        return Ok(());
    }

    let orchestrator = AppendOrchestrator::new(
        LocalSheetWriter::from_settings(settings),
        settings.local.path.clone(),
        settings.local.backup_path.clone(),
        remote_sink(settings),
    );
    let report = orchestrator.run(&rows, timestamp);

    println!("Row:    {}", report.record.cells().join(" | "));
    println!("Local:  {}", report.local);
    println!("Remote: {}", report.remote);
    info!(
        local_ok = report.local_ok(),
        remote_ok = report.remote_ok(),
        "run finished"
    );
    if report.local.is_failure() || report.remote.is_failure() {
        warn!("at least one sink failed, see above");
    }
    Ok(())
}

/// Missing id or credentials mean "not configured": skip quietly and keep the
/// local path going.
fn remote_sink(settings: &Settings) -> RemoteSink<GoogleSheetsClient> {
    let Some(spreadsheet_id) = settings.spreadsheet_id() else {
        warn!("remote.spreadsheet_id not set, skipping remote sheet");
        return RemoteSink::Unavailable(SinkOutcome::Skipped("no spreadsheet id".into()));
    };
    let Some(credentials) = Credentials::from_env() else {
        warn!(
            "{} / {} not set, skipping remote sheet",
            sink::google::CREDENTIALS_ENV,
            sink::google::ACCESS_TOKEN_ENV
        );
        return RemoteSink::Unavailable(SinkOutcome::Skipped("no credentials".into()));
    };

    match GoogleSheetsClient::new(credentials, settings.fetch.timeout()) {
        Ok(client) => RemoteSink::Ready(RemoteSheetWriter::new(
            client,
            spreadsheet_id,
            &settings.sheet_name,
            settings.remote.default_rows,
            settings.remote.default_cols,
        )),
        Err(e) => {
            error!(error = %e, "cannot build Sheets client");
            RemoteSink::Unavailable(SinkOutcome::Failed(e.to_string()))
        }
    }
}

fn extract_file(settings: &Settings, file: &Path, expected_len: usize, label: &str) -> Result<()> {
    let raw = std::fs::read_to_string(file).with_context(|| format!("Failed to read {:?}", file))?;
    let extractor = ranking::Extractor::from_settings(&settings.extraction);
    let extraction = extractor.extract_ranking(&raw, label, expected_len);

    println!("{:?}", extraction.outcome);
    for (i, cell) in extraction.row.cells().iter().enumerate() {
        println!("{:>2}  {}", i + 1, cell);
    }
    Ok(())
}
