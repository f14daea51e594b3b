//! Discovery of OpSim run databases.

use crate::error::{BatchError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Enumerates the simulation runs available under a database directory.
///
/// One `.db` file per run; the run name is the file stem. Discovery has no
/// side effects and returns a stable (sorted) ordering so batch output is
/// reproducible across invocations.
pub struct RunCatalog;

impl RunCatalog {
    /// List all run names under `db_dir`.
    ///
    /// Errors with `DbDirNotFound` if the directory is missing and
    /// `EmptyCatalog` if it holds no `.db` files — both are batch-scoped
    /// misconfiguration, not per-run failures.
    pub fn discover(db_dir: &Path) -> Result<Vec<String>> {
        if !db_dir.is_dir() {
            return Err(BatchError::DbDirNotFound(db_dir.to_path_buf()));
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(db_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("db") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                runs.push(stem.to_string());
            }
        }

        if runs.is_empty() {
            return Err(BatchError::EmptyCatalog(db_dir.to_path_buf()));
        }

        runs.sort();
        Ok(runs)
    }

    /// Path of the database file backing `run`.
    pub fn db_path(db_dir: &Path, run: &str) -> PathBuf {
        db_dir.join(format!("{run}.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_discover_sorted_run_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        File::create(dir.path().join("baseline_v1.5_10yrs.db")).unwrap();
        File::create(dir.path().join("agnddf_v1.5_10yrs.db")).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();

        let runs = RunCatalog::discover(dir.path()).expect("discover");
        assert_eq!(runs, vec!["agnddf_v1.5_10yrs", "baseline_v1.5_10yrs"]);
    }

    #[test]
    fn test_discover_missing_dir_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope");
        let err = RunCatalog::discover(&missing).unwrap_err();
        assert!(matches!(err, BatchError::DbDirNotFound(_)));
    }

    #[test]
    fn test_discover_empty_dir_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        File::create(dir.path().join("readme.md")).unwrap();
        let err = RunCatalog::discover(dir.path()).unwrap_err();
        assert!(matches!(err, BatchError::EmptyCatalog(_)));
    }

    #[test]
    fn test_db_path_appends_extension() {
        let path = RunCatalog::db_path(Path::new("/data/FBS_1.5"), "baseline_v1.5_10yrs");
        assert_eq!(
            path,
            Path::new("/data/FBS_1.5/baseline_v1.5_10yrs.db")
        );
    }
}
