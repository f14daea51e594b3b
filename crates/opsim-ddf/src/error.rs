//! Error types for the DDF batch orchestrator.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for batch operations.
pub type Result<T> = std::result::Result<T, BatchError>;

/// Errors raised while driving a DDF metrics batch.
///
/// Run-scoped variants are contained at the executor boundary and turned
/// into failure markers; only batch-scoped setup errors (missing database
/// directory, empty catalog, output directory creation) propagate.
#[derive(Error, Debug)]
pub enum BatchError {
    /// OpSim database directory does not exist
    #[error("opsim database directory not found: {0}")]
    DbDirNotFound(PathBuf),

    /// Directory exists but holds no recognizable run databases
    #[error("no opsim databases found under {0}")]
    EmptyCatalog(PathBuf),

    /// A deep drilling field has no matching proposal in this run
    #[error("field {field} has no matching proposal in run {run}")]
    FieldNotObserved { run: String, field: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite error from the visit or result database
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Metric artifact serialization error
    #[error("artifact serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Push notification delivery failed
    #[error("notification delivery failed: {0}")]
    Notify(String),

    /// A pooled worker task panicked or was aborted
    #[error("worker task panicked: {0}")]
    WorkerPanic(String),
}

impl From<reqwest::Error> for BatchError {
    fn from(err: reqwest::Error) -> Self {
        BatchError::Notify(err.to_string())
    }
}
