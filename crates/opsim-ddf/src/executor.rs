//! Per-run execution: resolve fields, build bundles, run them, contain errors.

use crate::bundle::BundleBuilder;
use crate::error::BatchError;
use crate::field::{DdfField, SourceMags};
use crate::proposal::FieldResolver;
use crate::session::RunConnector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Execution stage at which a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Connect,
    Resolve,
    Execute,
    Close,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureStage::Connect => "connect",
            FailureStage::Resolve => "resolve",
            FailureStage::Execute => "execute",
            FailureStage::Close => "close",
        };
        write!(f, "{name}")
    }
}

/// Structured record of one failed run attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    pub run: String,
    pub stage: FailureStage,
    pub message: String,
}

/// Outcome of executing all bundles for one run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// All bundles executed and persisted.
    Completed { executed: usize },
    /// The run observes no deep drilling fields; nothing was written.
    Skipped,
    /// Contained failure; the batch keeps going.
    Failed(RunFailure),
}

impl RunOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RunOutcome::Failed(_))
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        match self {
            RunOutcome::Failed(f) => Some(f),
            _ => None,
        }
    }
}

/// Executes one run end to end. The driver dispatches these across a
/// bounded worker pool; fakes substitute the whole trait in tests.
pub trait RunWorker: Send + Sync {
    fn execute(&self, run: &str, db_dir: &Path) -> RunOutcome;
}

/// The production [`RunWorker`]: connects, resolves fields, builds and
/// executes bundles, and closes the session.
///
/// No error escapes `execute`; everything run-scoped becomes a
/// [`RunFailure`] with the stage recorded.
pub struct RunExecutor {
    connector: Arc<dyn RunConnector>,
    src_mags: SourceMags,
}

impl RunExecutor {
    pub fn new(connector: Arc<dyn RunConnector>, src_mags: SourceMags) -> Self {
        RunExecutor {
            connector,
            src_mags,
        }
    }
}

impl RunWorker for RunExecutor {
    fn execute(&self, run: &str, db_dir: &Path) -> RunOutcome {
        let mut session = match self.connector.connect(run, db_dir) {
            Ok(session) => session,
            Err(e) => return fail(run, FailureStage::Connect, &e),
        };

        let records = match session.proposal_info() {
            Ok(records) => records,
            Err(e) => {
                let _ = session.close();
                return fail(run, FailureStage::Resolve, &e);
            }
        };

        let ddf = FieldResolver::ddf_proposals(&records);
        if ddf.is_empty() {
            info!(run = %run, "no DDF proposals, skipping run");
            return match session.close() {
                Ok(()) => RunOutcome::Skipped,
                Err(e) => fail(run, FailureStage::Close, &e),
            };
        }

        let mut resolved = BTreeMap::new();
        for field in DdfField::ALL {
            match FieldResolver::resolve(run, &ddf, field) {
                Ok(set) => {
                    resolved.insert(field, set);
                }
                Err(e) => {
                    let _ = session.close();
                    return fail(run, FailureStage::Resolve, &e);
                }
            }
        }

        let bundles = BundleBuilder::build(run, &self.src_mags, &resolved);
        let executed = match session.execute(&bundles) {
            Ok(executed) => executed,
            Err(e) => {
                let _ = session.close();
                return fail(run, FailureStage::Execute, &e);
            }
        };

        match session.close() {
            Ok(()) => {
                info!(run = %run, executed, "run completed");
                RunOutcome::Completed { executed }
            }
            Err(e) => fail(run, FailureStage::Close, &e),
        }
    }
}

fn fail(run: &str, stage: FailureStage, err: &BatchError) -> RunOutcome {
    warn!(run = %run, stage = %stage, error = %err, "run failed");
    RunOutcome::Failed(RunFailure {
        run: run.to_string(),
        stage,
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeConnector;
    use crate::proposal::ProposalRecord;

    fn ddf_proposals() -> Vec<ProposalRecord> {
        DdfField::ALL
            .into_iter()
            .enumerate()
            .map(|(offset, field)| ProposalRecord {
                id: 5 + offset as i64,
                name: format!("DD:{}", field.label()),
            })
            .collect()
    }

    #[test]
    fn test_run_with_all_fields_completes() {
        let connector = Arc::new(FakeConnector::new(ddf_proposals()));
        let executor = RunExecutor::new(connector.clone(), SourceMags::default());

        let outcome = executor.execute("run_a", Path::new("/tmp"));
        assert_eq!(outcome, RunOutcome::Completed { executed: 6 * 6 * 5 });
        assert_eq!(connector.closed(), 1);
        assert_eq!(connector.executed_bundles().len(), 6 * 6 * 5);
    }

    #[test]
    fn test_run_without_ddf_skips_and_writes_nothing() {
        let proposals = vec![ProposalRecord {
            id: 1,
            name: "WideFastDeep".to_string(),
        }];
        let connector = Arc::new(FakeConnector::new(proposals));
        let executor = RunExecutor::new(connector.clone(), SourceMags::default());

        let outcome = executor.execute("run_a", Path::new("/tmp"));
        assert_eq!(outcome, RunOutcome::Skipped);
        assert!(connector.executed_bundles().is_empty());
        assert_eq!(connector.closed(), 1);
    }

    #[test]
    fn test_missing_field_is_resolve_failure() {
        // DDF proposals exist, but EDFS is absent.
        let proposals = vec![
            ProposalRecord {
                id: 5,
                name: "DD:COSMOS".to_string(),
            },
            ProposalRecord {
                id: 6,
                name: "DD:XMM-LSS".to_string(),
            },
            ProposalRecord {
                id: 7,
                name: "DD:ELAISS1".to_string(),
            },
            ProposalRecord {
                id: 8,
                name: "DD:ECDFS".to_string(),
            },
        ];
        let connector = Arc::new(FakeConnector::new(proposals));
        let executor = RunExecutor::new(connector.clone(), SourceMags::default());

        let outcome = executor.execute("run_a", Path::new("/tmp"));
        let failure = outcome.failure().expect("failure");
        assert_eq!(failure.stage, FailureStage::Resolve);
        assert!(failure.message.contains("EDFS"));
        assert_eq!(connector.closed(), 1);
    }

    #[test]
    fn test_connect_error_is_contained() {
        let connector =
            Arc::new(FakeConnector::new(ddf_proposals()).failing_at(FailureStage::Connect));
        let executor = RunExecutor::new(connector.clone(), SourceMags::default());

        let outcome = executor.execute("run_a", Path::new("/tmp"));
        let failure = outcome.failure().expect("failure");
        assert_eq!(failure.stage, FailureStage::Connect);
        assert_eq!(failure.run, "run_a");
    }

    #[test]
    fn test_execute_error_still_closes_session() {
        let connector =
            Arc::new(FakeConnector::new(ddf_proposals()).failing_at(FailureStage::Execute));
        let executor = RunExecutor::new(connector.clone(), SourceMags::default());

        let outcome = executor.execute("run_a", Path::new("/tmp"));
        assert_eq!(outcome.failure().expect("failure").stage, FailureStage::Execute);
        assert_eq!(connector.closed(), 1);
    }
}
