//! In-memory fakes for the batch trait seams (testing only)
//!
//! Provides `ScriptedWorker`, `RecordingNotifier`, and
//! `FakeConnector`/`FakeSession` that satisfy the trait contracts without
//! touching a real database or the network.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::bundle::BundleRequest;
use crate::error::{BatchError, Result};
use crate::executor::{FailureStage, RunOutcome, RunWorker};
use crate::notify::Notifier;
use crate::proposal::ProposalRecord;
use crate::session::{RunConnector, RunSession};

// ---------------------------------------------------------------------------
// ScriptedWorker
// ---------------------------------------------------------------------------

/// Worker that replays a scripted outcome sequence per run and counts calls.
///
/// Runs without a script (or with an exhausted script) yield the default
/// outcome, `Completed { executed: 1 }` unless overridden.
pub struct ScriptedWorker {
    scripts: Mutex<HashMap<String, VecDeque<RunOutcome>>>,
    calls: Mutex<HashMap<String, usize>>,
    default: RunOutcome,
}

impl ScriptedWorker {
    pub fn new() -> Self {
        ScriptedWorker {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            default: RunOutcome::Completed { executed: 1 },
        }
    }

    /// Queue outcomes for one run, consumed in order across calls.
    pub fn with_script(self, run: &str, outcomes: Vec<RunOutcome>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(run.to_string(), outcomes.into());
        self
    }

    /// Outcome for runs whose script is absent or exhausted.
    pub fn with_default(mut self, outcome: RunOutcome) -> Self {
        self.default = outcome;
        self
    }

    /// Number of times `execute` was invoked for `run`.
    pub fn calls(&self, run: &str) -> usize {
        self.calls.lock().unwrap().get(run).copied().unwrap_or(0)
    }
}

impl Default for ScriptedWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl RunWorker for ScriptedWorker {
    fn execute(&self, run: &str, _db_dir: &Path) -> RunOutcome {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(run.to_string())
            .or_insert(0) += 1;
        self.scripts
            .lock()
            .unwrap()
            .get_mut(run)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.default.clone())
    }
}

// ---------------------------------------------------------------------------
// RecordingNotifier
// ---------------------------------------------------------------------------

/// Notifier that records every message; optionally fails each delivery.
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        RecordingNotifier {
            messages: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A notifier whose every `send` errors after recording the message.
    pub fn failing() -> Self {
        RecordingNotifier {
            messages: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        self.messages.lock().unwrap().push(message.to_string());
        if self.fail {
            return Err(BatchError::Notify("injected delivery failure".to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeConnector / FakeSession
// ---------------------------------------------------------------------------

/// Connector handing out sessions over scripted proposal metadata, with
/// optional error injection at a chosen execution stage. Records every
/// executed bundle name and every session close.
pub struct FakeConnector {
    proposals: Vec<ProposalRecord>,
    fail_stage: Option<FailureStage>,
    executed: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicUsize>,
}

impl FakeConnector {
    pub fn new(proposals: Vec<ProposalRecord>) -> Self {
        FakeConnector {
            proposals,
            fail_stage: None,
            executed: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Inject an error at the given stage of every session.
    pub fn failing_at(mut self, stage: FailureStage) -> Self {
        self.fail_stage = Some(stage);
        self
    }

    /// Bundle names executed across all sessions, in execution order.
    pub fn executed_bundles(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    /// Number of sessions closed so far.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

fn injected() -> BatchError {
    BatchError::Io(std::io::Error::other("injected fault"))
}

impl RunConnector for FakeConnector {
    fn connect(&self, _run: &str, _db_dir: &Path) -> Result<Box<dyn RunSession>> {
        if self.fail_stage == Some(FailureStage::Connect) {
            return Err(injected());
        }
        Ok(Box::new(FakeSession {
            proposals: self.proposals.clone(),
            fail_stage: self.fail_stage,
            executed: self.executed.clone(),
            closed: self.closed.clone(),
        }))
    }
}

struct FakeSession {
    proposals: Vec<ProposalRecord>,
    fail_stage: Option<FailureStage>,
    executed: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicUsize>,
}

impl RunSession for FakeSession {
    fn proposal_info(&mut self) -> Result<Vec<ProposalRecord>> {
        if self.fail_stage == Some(FailureStage::Resolve) {
            return Err(injected());
        }
        Ok(self.proposals.clone())
    }

    fn execute(&mut self, bundles: &std::collections::BTreeMap<String, BundleRequest>) -> Result<usize> {
        if self.fail_stage == Some(FailureStage::Execute) {
            return Err(injected());
        }
        let mut executed = self.executed.lock().unwrap();
        executed.extend(bundles.keys().cloned());
        Ok(bundles.len())
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        if self.fail_stage == Some(FailureStage::Close) {
            return Err(injected());
        }
        Ok(())
    }
}
