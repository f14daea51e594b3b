//! OpSim DDF cadence metrics
//!
//! Batch orchestration for coverage statistics over the LSST Deep Drilling
//! Fields, computed for every simulated observing run of an FBS release.
//!
//! ## Pipeline
//!
//! - [`RunCatalog`] discovers the run databases of one release.
//! - [`FieldResolver`] maps each DDF to its proposal ids within a run.
//! - [`BundleBuilder`] expands band × field × metric kind into named
//!   bundle requests.
//! - [`RunExecutor`] executes one run's bundles behind the
//!   [`session::RunConnector`] seam, containing every run-scoped error.
//! - [`BatchDriver`] fans runs out over a bounded worker pool, retries
//!   failures once, writes the per-version failure log, and notifies.
//!
//! The SQLite session in [`sqlite`] is the reference engine; tests swap in
//! the fakes from [`fakes`].

pub mod bundle;
pub mod catalog;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod fakes;
pub mod field;
pub mod notify;
pub mod proposal;
pub mod session;
pub mod sqlite;
pub mod stats;
pub mod telemetry;

pub use bundle::{constraint_for, BundleBuilder, BundleRequest, MetricKind, HEALPIX_NSIDE};
pub use catalog::RunCatalog;
pub use config::{BatchConfig, DEFAULT_DB_DIR_TEMPLATE, DEFAULT_VERSIONS, DEFAULT_WORKERS};
pub use driver::{BatchDriver, VersionReport};
pub use error::{BatchError, Result};
pub use executor::{FailureStage, RunExecutor, RunFailure, RunOutcome, RunWorker};
pub use field::{Band, DdfField, SourceMags};
pub use notify::{HttpNotifier, NoopNotifier, Notifier};
pub use proposal::{FieldResolver, ProposalRecord, ProposalSet};
pub use session::{RunConnector, RunSession};
pub use sqlite::{MetricArtifact, SqliteConnector};
