//! ddf-batch — DDF cadence metrics over OpSim FBS releases.
//!
//! Discovers every run database of each configured release, computes the
//! depth/airmass/visit-count bundle set for the five Deep Drilling Fields,
//! and records per-version failure logs. Outputs land under
//! `<OUTPUT_ROOT>/ResultDBs` and `<OUTPUT_ROOT>/MetricData`.

use anyhow::Result;
use clap::Parser;
use opsim_ddf::{
    BatchConfig, BatchDriver, HttpNotifier, NoopNotifier, Notifier, RunExecutor, SourceMags,
    SqliteConnector, DEFAULT_DB_DIR_TEMPLATE, DEFAULT_WORKERS,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "ddf-batch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compute DDF cadence metrics for OpSim FBS releases", long_about = None)]
struct Cli {
    /// Root folder for outputs (ResultDBs/ and MetricData/ are created here)
    output_root: PathBuf,

    /// FBS versions to process, in order
    #[arg(long, value_delimiter = ',', default_values_t = default_versions())]
    versions: Vec<String>,

    /// Per-version OpSim database directory; {} is replaced by the version
    #[arg(long, default_value = DEFAULT_DB_DIR_TEMPLATE)]
    db_dir_template: String,

    /// Concurrent run workers
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Directory receiving v{version}_DDF.log failure logs
    #[arg(long, default_value = ".")]
    log_dir: PathBuf,

    /// Push-notification channel endpoint; omit to disable notifications
    #[arg(long)]
    notify_url: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,
}

fn default_versions() -> Vec<String> {
    opsim_ddf::DEFAULT_VERSIONS
        .iter()
        .map(|v| v.to_string())
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    opsim_ddf::telemetry::init_tracing(cli.json, level);

    let mut config = BatchConfig::new(&cli.output_root);
    config.versions = cli.versions;
    config.db_dir_template = cli.db_dir_template;
    config.workers = cli.workers;
    config.log_dir = cli.log_dir;

    let notifier: Arc<dyn Notifier> = match &cli.notify_url {
        Some(url) => Arc::new(HttpNotifier::new(url.clone())),
        None => Arc::new(NoopNotifier),
    };

    let connector = Arc::new(SqliteConnector::new(
        config.out_dir.clone(),
        config.metric_data_dir.clone(),
    ));
    let worker = Arc::new(RunExecutor::new(connector, SourceMags::default()));

    let driver = BatchDriver::new(config, worker, notifier);
    let reports = driver.run_all().await?;

    for report in &reports {
        info!(
            version = %report.version,
            runs = report.runs,
            completed = report.completed,
            skipped = report.skipped,
            failed = report.failed.len(),
            "version complete"
        );
    }

    Ok(())
}
