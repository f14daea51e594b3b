//! End-to-end batch over real SQLite fixture databases.

use opsim_ddf::fakes::RecordingNotifier;
use opsim_ddf::{
    BatchConfig, BatchDriver, DdfField, MetricArtifact, RunExecutor, SourceMags, SqliteConnector,
};
use rusqlite::{params, Connection};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Create one OpSim fixture database. When `with_ddf` is set, every field
/// gets a proposal and a handful of g-band visits go to COSMOS.
fn make_opsim_db(db_dir: &Path, run: &str, with_ddf: bool) {
    let conn = Connection::open(db_dir.join(format!("{run}.db"))).expect("open");
    conn.execute_batch(
        "CREATE TABLE Proposal (propId INTEGER, propName TEXT);
         CREATE TABLE SummaryAllProps (
             filter TEXT,
             proposalId INTEGER,
             fiveSigmaDepth REAL,
             airmass REAL,
             observationStartMJD REAL
         );",
    )
    .expect("schema");

    conn.execute(
        "INSERT INTO Proposal (propId, propName) VALUES (1, 'WideFastDeep')",
        [],
    )
    .unwrap();

    if with_ddf {
        for (offset, field) in DdfField::ALL.into_iter().enumerate() {
            conn.execute(
                "INSERT INTO Proposal (propId, propName) VALUES (?1, ?2)",
                params![5 + offset as i64, format!("DD:{}", field.label())],
            )
            .unwrap();
        }
        for (depth, airmass, mjd) in [(24.0, 1.2, 59853.0), (24.5, 1.4, 59854.0), (25.0, 1.1, 59855.0)] {
            conn.execute(
                "INSERT INTO SummaryAllProps
                     (filter, proposalId, fiveSigmaDepth, airmass, observationStartMJD)
                 VALUES ('g', 5, ?1, ?2, ?3)",
                params![depth, airmass, mjd],
            )
            .unwrap();
        }
    }

    conn.close().expect("close");
}

#[tokio::test]
async fn test_sqlite_batch_end_to_end() {
    let root = tempfile::tempdir().expect("tempdir");
    let db_dir = root.path().join("FBS_1.5");
    fs::create_dir_all(&db_dir).unwrap();
    make_opsim_db(&db_dir, "agnddf_v1.5_10yrs", true);
    make_opsim_db(&db_dir, "wfd_only_v1.5_10yrs", false);

    let mut config = BatchConfig::new(&root.path().join("out"));
    config.versions = vec!["1.5".to_string()];
    config.db_dir_template = root.path().join("FBS_{}").to_string_lossy().into_owned();
    config.log_dir = root.path().to_path_buf();
    config.workers = 2;

    let connector = Arc::new(SqliteConnector::new(
        config.out_dir.clone(),
        config.metric_data_dir.clone(),
    ));
    let worker = Arc::new(RunExecutor::new(connector.clone(), SourceMags::default()));
    let notifier = Arc::new(RecordingNotifier::new());
    let driver = BatchDriver::new(config.clone(), worker, notifier.clone());

    let report = driver.run_version("1.5").await.expect("run_version");

    // The WFD-only run is a clean skip, not a failure.
    assert_eq!(report.runs, 2);
    assert_eq!(report.completed, 1);
    assert_eq!(report.skipped, 1);
    assert!(report.failed.is_empty());
    assert!(!config.failure_log_path("1.5").exists());
    assert_eq!(notifier.messages().len(), 1);

    // Skipped run wrote nothing.
    assert!(!connector.results_path("wfd_only_v1.5_10yrs").exists());

    // Completed run: 6 metrics x 6 bands x 5 fields summary rows.
    let results = Connection::open(connector.results_path("agnddf_v1.5_10yrs")).unwrap();
    let count: i64 = results
        .query_row("SELECT COUNT(*) FROM summary_stats", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 6 * 6 * 5);

    // Spot-check the populated g-band COSMOS bundle.
    let median: f64 = results
        .query_row(
            "SELECT value FROM summary_stats WHERE metric_name = 'm5Median_g_COSMOS'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert!((median - 24.5).abs() < 1e-9);

    let artifact: MetricArtifact = serde_json::from_reader(
        fs::File::open(
            config
                .metric_data_dir
                .join("agnddf_v1.5_10yrs_nvisit_g_COSMOS.json"),
        )
        .expect("artifact"),
    )
    .expect("parse artifact");
    assert_eq!(artifact.summary_median, Some(3.0));

    // Bands without visits still produce (masked) artifacts.
    let empty: MetricArtifact = serde_json::from_reader(
        fs::File::open(
            config
                .metric_data_dir
                .join("agnddf_v1.5_10yrs_m5p75_u_EDFS.json"),
        )
        .expect("artifact"),
    )
    .expect("parse artifact");
    assert_eq!(empty.mask, vec![true]);
}

/// A corrupt database fails its run on both attempts and lands in the log;
/// healthy runs in the same batch are unaffected.
#[tokio::test]
async fn test_corrupt_database_is_contained_and_logged() {
    let root = tempfile::tempdir().expect("tempdir");
    let db_dir = root.path().join("FBS_1.6");
    fs::create_dir_all(&db_dir).unwrap();
    make_opsim_db(&db_dir, "good_v1.6_10yrs", true);
    // Not a SQLite file at all.
    fs::write(db_dir.join("broken_v1.6_10yrs.db"), b"not a database").unwrap();

    let mut config = BatchConfig::new(&root.path().join("out"));
    config.versions = vec!["1.6".to_string()];
    config.db_dir_template = root.path().join("FBS_{}").to_string_lossy().into_owned();
    config.log_dir = root.path().to_path_buf();
    config.workers = 2;

    let connector = Arc::new(SqliteConnector::new(
        config.out_dir.clone(),
        config.metric_data_dir.clone(),
    ));
    let worker = Arc::new(RunExecutor::new(connector, SourceMags::default()));
    let notifier = Arc::new(RecordingNotifier::new());
    let driver = BatchDriver::new(config.clone(), worker, notifier.clone());

    let report = driver.run_version("1.6").await.expect("run_version");

    assert_eq!(report.completed, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].run, "broken_v1.6_10yrs");

    let log = fs::read_to_string(config.failure_log_path("1.6")).expect("log");
    assert_eq!(log.lines().collect::<Vec<_>>(), vec!["broken_v1.6_10yrs"]);
    // Failures never block the completion notification.
    assert_eq!(notifier.messages().len(), 1);
}
