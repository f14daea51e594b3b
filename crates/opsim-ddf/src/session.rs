//! Trait seams around the per-run database pair.
//!
//! Each run owns one visit database (read-only) and one result sink.
//! Implementations: [`crate::sqlite::SqliteConnector`] for real batches,
//! [`crate::fakes::FakeConnector`] for tests.

use crate::bundle::BundleRequest;
use crate::error::Result;
use crate::proposal::ProposalRecord;
use std::collections::BTreeMap;
use std::path::Path;

/// An open session against one run: proposal metadata lookup, bundle
/// execution, and explicit teardown.
///
/// Guarantees expected of implementations:
/// - `proposal_info` reads metadata only; no writes.
/// - `execute` persists one artifact and one summary row per bundle.
/// - `close` releases both underlying handles; it must be called on the
///   success path, not just dropped.
pub trait RunSession: Send {
    /// The run's full proposal metadata.
    fn proposal_info(&mut self) -> Result<Vec<ProposalRecord>>;

    /// Execute every bundle in one batched pass, persisting results.
    /// Returns the number of bundles executed.
    fn execute(&mut self, bundles: &BTreeMap<String, BundleRequest>) -> Result<usize>;

    /// Close both database handles.
    fn close(self: Box<Self>) -> Result<()>;
}

/// Opens run sessions. Shared across pool workers; each worker opens and
/// closes its own session, so implementations carry no per-run state.
pub trait RunConnector: Send + Sync {
    fn connect(&self, run: &str, db_dir: &Path) -> Result<Box<dyn RunSession>>;
}
