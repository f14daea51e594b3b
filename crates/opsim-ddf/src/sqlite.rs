//! SQLite-backed run sessions.
//!
//! The visit database is one OpSim run (`Proposal` metadata table plus the
//! `SummaryAllProps` visit table). Results go to a per-run SQLite database
//! of summary rows and one JSON artifact file per bundle. The result
//! database is opened lazily on first write so skipped runs leave no files
//! behind.
//!
//! Spatial slicing is out of scope here: each bundle reduces over its full
//! constraint footprint, i.e. a single partition, and the Median summary
//! of that single partition is the value itself.

use crate::bundle::{BundleRequest, MetricKind, HEALPIX_NSIDE};
use crate::catalog::RunCatalog;
use crate::error::{BatchError, Result};
use crate::proposal::ProposalRecord;
use crate::session::{RunConnector, RunSession};
use crate::stats;
use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Visit table name in FBS-era OpSim databases.
pub const VISIT_TABLE: &str = "SummaryAllProps";

/// One persisted metric-data file: per-partition values plus mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricArtifact {
    pub run: String,
    pub metric_name: String,
    pub kind: MetricKind,
    pub constraint: String,
    pub nside: u32,
    pub values: Vec<Option<f64>>,
    pub mask: Vec<bool>,
    pub summary_median: Option<f64>,
}

/// Opens per-run SQLite session pairs.
pub struct SqliteConnector {
    out_dir: PathBuf,
    metric_data_dir: PathBuf,
}

impl SqliteConnector {
    pub fn new(out_dir: PathBuf, metric_data_dir: PathBuf) -> Self {
        SqliteConnector {
            out_dir,
            metric_data_dir,
        }
    }

    /// Result database path for one run.
    pub fn results_path(&self, run: &str) -> PathBuf {
        self.out_dir.join(format!("{run}_results.db"))
    }
}

impl RunConnector for SqliteConnector {
    fn connect(&self, run: &str, db_dir: &Path) -> Result<Box<dyn RunSession>> {
        let db_path = RunCatalog::db_path(db_dir, run);
        let visits = Connection::open_with_flags(&db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Box::new(SqliteSession {
            run: run.to_string(),
            visits,
            results: None,
            results_path: self.results_path(run),
            metric_data_dir: self.metric_data_dir.clone(),
        }))
    }
}

struct SqliteSession {
    run: String,
    visits: Connection,
    results: Option<Connection>,
    results_path: PathBuf,
    metric_data_dir: PathBuf,
}

impl SqliteSession {
    /// Open the result database on first use, creating the summary table.
    fn results(&mut self) -> Result<&Connection> {
        if self.results.is_none() {
            let conn = Connection::open(&self.results_path)?;
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS summary_stats (
                     id INTEGER PRIMARY KEY AUTOINCREMENT,
                     metric_name TEXT NOT NULL,
                     summary_name TEXT NOT NULL,
                     value REAL,
                     computed_at TEXT NOT NULL
                 );",
            )?;
            self.results = Some(conn);
        }
        Ok(self.results.as_ref().expect("result connection just opened"))
    }

    fn fetch_column(&self, request: &BundleRequest) -> Result<Vec<f64>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {}",
            request.column, VISIT_TABLE, request.constraint
        );
        let mut stmt = self.visits.prepare(&sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, f64>(0))?;
        let mut values = Vec::new();
        for value in rows {
            values.push(value?);
        }
        Ok(values)
    }

    fn write_artifact(&self, request: &BundleRequest, value: Option<f64>) -> Result<()> {
        let artifact = MetricArtifact {
            run: self.run.clone(),
            metric_name: request.name.clone(),
            kind: request.kind,
            constraint: request.constraint.clone(),
            nside: HEALPIX_NSIDE,
            values: vec![value],
            mask: vec![value.is_none()],
            summary_median: value,
        };
        let path = self
            .metric_data_dir
            .join(format!("{}_{}.json", self.run, request.name));
        let file = File::create(path)?;
        serde_json::to_writer(file, &artifact)?;
        Ok(())
    }

    fn write_summary(&mut self, request: &BundleRequest, value: Option<f64>) -> Result<()> {
        let metric_name = request.name.clone();
        self.results()?.execute(
            "INSERT INTO summary_stats (metric_name, summary_name, value, computed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![metric_name, "Median", value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

impl RunSession for SqliteSession {
    fn proposal_info(&mut self) -> Result<Vec<ProposalRecord>> {
        let mut stmt = self
            .visits
            .prepare("SELECT propId, propName FROM Proposal")?;
        let rows = stmt.query_map([], |row| {
            Ok(ProposalRecord {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }

    fn execute(&mut self, bundles: &BTreeMap<String, BundleRequest>) -> Result<usize> {
        for request in bundles.values() {
            let values = self.fetch_column(request)?;
            let value = evaluate(request.kind, &values);
            debug!(
                run = %self.run,
                metric = %request.name,
                visits = values.len(),
                "bundle evaluated"
            );
            self.write_artifact(request, value)?;
            self.write_summary(request, value)?;
        }
        Ok(bundles.len())
    }

    fn close(self: Box<Self>) -> Result<()> {
        let session = *self;
        session
            .visits
            .close()
            .map_err(|(_, e)| BatchError::Sqlite(e))?;
        if let Some(results) = session.results {
            results.close().map_err(|(_, e)| BatchError::Sqlite(e))?;
        }
        Ok(())
    }
}

/// Reduce one bundle's visit values. Empty selections yield `None`
/// (masked artifact) except for visit counts, which are legitimately zero.
fn evaluate(kind: MetricKind, values: &[f64]) -> Option<f64> {
    match kind {
        MetricKind::DepthP25 => stats::percentile(values, 25.0),
        MetricKind::DepthMedian => stats::median(values),
        MetricKind::DepthP75 => stats::percentile(values, 75.0),
        MetricKind::AirmassMax => stats::max(values),
        MetricKind::VisitCount => Some(values.len() as f64),
        MetricKind::CoaddDepth => stats::coadd_m5(values),
    }
}
