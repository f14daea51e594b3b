//! Batch driving: parallel dispatch, sequential retry, failure log, notify.

use crate::catalog::RunCatalog;
use crate::config::BatchConfig;
use crate::error::{BatchError, Result};
use crate::executor::{FailureStage, RunFailure, RunOutcome, RunWorker};
use crate::notify::Notifier;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Totals for one processed version.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionReport {
    pub version: String,
    pub runs: usize,
    pub completed: usize,
    pub skipped: usize,
    /// Runs that failed both the parallel attempt and the retry.
    pub failed: Vec<RunFailure>,
}

/// Drives the whole batch for each configured version.
///
/// Per version: discover runs, execute them across a bounded worker pool,
/// retry failures once sequentially, append survivors to the version's
/// failure log, and send one best-effort completion notification. Setup
/// errors (directories, catalog) propagate; run failures never do.
pub struct BatchDriver {
    config: BatchConfig,
    worker: Arc<dyn RunWorker>,
    notifier: Arc<dyn Notifier>,
}

impl BatchDriver {
    pub fn new(
        config: BatchConfig,
        worker: Arc<dyn RunWorker>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        BatchDriver {
            config,
            worker,
            notifier,
        }
    }

    /// Process every configured version sequentially. Parallelism exists
    /// only within a version, across its runs.
    pub async fn run_all(&self) -> Result<Vec<VersionReport>> {
        let mut reports = Vec::with_capacity(self.config.versions.len());
        for version in &self.config.versions {
            reports.push(self.run_version(version).await?);
        }
        Ok(reports)
    }

    /// Process one version end to end.
    pub async fn run_version(&self, version: &str) -> Result<VersionReport> {
        fs::create_dir_all(&self.config.out_dir)?;
        fs::create_dir_all(&self.config.metric_data_dir)?;

        let db_dir = self.config.db_dir_for(version);
        let runs = RunCatalog::discover(&db_dir)?;
        info!(
            version = %version,
            runs = runs.len(),
            workers = self.config.workers,
            "starting batch"
        );

        let outcomes = self.dispatch(&runs, &db_dir).await?;

        let mut completed = 0usize;
        let mut skipped = 0usize;
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                RunOutcome::Completed { .. } => completed += 1,
                RunOutcome::Skipped => skipped += 1,
                RunOutcome::Failed(failure) => failures.push(failure),
            }
        }

        // Retry each failure exactly once, sequentially, collecting
        // survivors into a fresh list.
        let mut survivors = Vec::new();
        for failure in failures {
            info!(version = %version, run = %failure.run, "retrying failed run");
            let outcome =
                run_blocking(self.worker.clone(), failure.run.clone(), db_dir.clone()).await;
            match outcome {
                RunOutcome::Completed { .. } => completed += 1,
                RunOutcome::Skipped => skipped += 1,
                RunOutcome::Failed(still_failed) => survivors.push(still_failed),
            }
        }

        if !survivors.is_empty() {
            self.append_failure_log(version, &survivors)?;
        }

        let message = format!("Done with DDF metrics for FBS_v{version}!");
        if let Err(e) = self.notifier.send(&message).await {
            warn!(version = %version, error = %e, "completion notification failed");
        }

        info!(
            version = %version,
            completed,
            skipped,
            failed = survivors.len(),
            "batch finished"
        );

        Ok(VersionReport {
            version: version.to_string(),
            runs: runs.len(),
            completed,
            skipped,
            failed: survivors,
        })
    }

    /// Dispatch all runs across the bounded pool. Outcomes come back in
    /// input order, not completion order.
    async fn dispatch(&self, runs: &[String], db_dir: &Path) -> Result<Vec<RunOutcome>> {
        let semaphore = Arc::new(Semaphore::new(self.config.workers));

        let mut handles = Vec::with_capacity(runs.len());
        for run in runs {
            let semaphore = semaphore.clone();
            let worker = self.worker.clone();
            let run = run.clone();
            let db_dir = db_dir.to_path_buf();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("worker pool semaphore is never closed");
                run_blocking(worker, run, db_dir).await
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            let outcome = handle
                .await
                .map_err(|e| BatchError::WorkerPanic(e.to_string()))?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Append permanently failed run names to `v{version}_DDF.log`, one
    /// per line. Append mode: repeated invocations accumulate.
    fn append_failure_log(&self, version: &str, survivors: &[RunFailure]) -> Result<()> {
        let path = self.config.failure_log_path(version);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        for failure in survivors {
            writeln!(file, "{}", failure.run)?;
        }
        info!(
            version = %version,
            count = survivors.len(),
            log = %path.display(),
            "recorded permanently failed runs"
        );
        Ok(())
    }
}

/// Run one blocking executor call on the blocking pool. A panicking worker
/// is converted into a failure marker instead of tearing down the batch.
async fn run_blocking(worker: Arc<dyn RunWorker>, run: String, db_dir: PathBuf) -> RunOutcome {
    let name = run.clone();
    match tokio::task::spawn_blocking(move || worker.execute(&run, &db_dir)).await {
        Ok(outcome) => outcome,
        Err(join_err) => RunOutcome::Failed(RunFailure {
            run: name,
            stage: FailureStage::Execute,
            message: format!("worker panicked: {join_err}"),
        }),
    }
}
