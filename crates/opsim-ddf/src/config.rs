//! Batch configuration.
//!
//! Everything that used to be a hidden constant — worker count, database
//! path template, version list, failure-log location — is an explicit
//! configuration field with the historical value as its default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Concurrent run workers in the pool.
pub const DEFAULT_WORKERS: usize = 14;

/// Per-version OpSim database directory; `{}` is replaced by the version.
pub const DEFAULT_DB_DIR_TEMPLATE: &str = "/home/idies/workspace/lsst_cadence/FBS_{}/";

/// FBS releases processed by default, in order.
pub const DEFAULT_VERSIONS: [&str; 3] = ["1.5", "1.6", "1.7"];

/// Configuration for one batch invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Simulation-family versions, processed sequentially.
    pub versions: Vec<String>,
    /// Input directory template; `{}` is replaced by the version label.
    pub db_dir_template: String,
    /// Result database directory (shared across versions).
    pub out_dir: PathBuf,
    /// Metric artifact directory (shared across versions).
    pub metric_data_dir: PathBuf,
    /// Directory receiving `v{version}_DDF.log` failure logs.
    pub log_dir: PathBuf,
    /// Worker pool size for the parallel phase.
    pub workers: usize,
}

impl BatchConfig {
    /// Defaults rooted at `output_root`: `ResultDBs/` and `MetricData/`
    /// below it, failure logs in the working directory.
    pub fn new(output_root: &Path) -> Self {
        BatchConfig {
            versions: DEFAULT_VERSIONS.iter().map(|v| v.to_string()).collect(),
            db_dir_template: DEFAULT_DB_DIR_TEMPLATE.to_string(),
            out_dir: output_root.join("ResultDBs"),
            metric_data_dir: output_root.join("MetricData"),
            log_dir: PathBuf::from("."),
            workers: DEFAULT_WORKERS,
        }
    }

    /// Input database directory for one version.
    pub fn db_dir_for(&self, version: &str) -> PathBuf {
        PathBuf::from(self.db_dir_template.replace("{}", version))
    }

    /// Failure log path for one version.
    pub fn failure_log_path(&self, version: &str) -> PathBuf {
        self.log_dir.join(format!("v{version}_DDF.log"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BatchConfig::new(Path::new("/out"));
        assert_eq!(config.workers, 14);
        assert_eq!(config.versions, vec!["1.5", "1.6", "1.7"]);
        assert_eq!(config.out_dir, Path::new("/out/ResultDBs"));
        assert_eq!(config.metric_data_dir, Path::new("/out/MetricData"));
    }

    #[test]
    fn test_db_dir_template_substitution() {
        let config = BatchConfig::new(Path::new("/out"));
        assert_eq!(
            config.db_dir_for("1.6"),
            Path::new("/home/idies/workspace/lsst_cadence/FBS_1.6/")
        );
    }

    #[test]
    fn test_failure_log_path() {
        let mut config = BatchConfig::new(Path::new("/out"));
        config.log_dir = PathBuf::from("/logs");
        assert_eq!(
            config.failure_log_path("1.5"),
            Path::new("/logs/v1.5_DDF.log")
        );
    }
}
