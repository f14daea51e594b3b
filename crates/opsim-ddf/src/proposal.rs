//! Proposal metadata and field-to-proposal resolution.

use crate::error::{BatchError, Result};
use crate::field::DdfField;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One row of a run's proposal metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub id: i64,
    pub name: String,
}

impl ProposalRecord {
    /// Whether this proposal belongs to the deep-drilling program class.
    pub fn is_deep_drilling(&self) -> bool {
        self.name.contains("DD")
    }
}

/// Non-empty ordered set of proposal ids matched to one (run, field) pair.
///
/// In practice a field maps to one or two proposals. Only the first two
/// ids participate in downstream constraints; extras are retained in the
/// set but capped out of constraint strings (see [`FieldResolver::resolve`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalSet {
    ids: Vec<i64>,
}

impl ProposalSet {
    /// All matched proposal ids, in metadata order.
    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    /// The ids that enter constraint strings: at most the first two.
    pub fn constraint_ids(&self) -> &[i64] {
        &self.ids[..self.ids.len().min(2)]
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Resolves deep drilling fields to proposal id sets within one run.
pub struct FieldResolver;

impl FieldResolver {
    /// Filter a run's proposal metadata down to deep-drilling proposals.
    ///
    /// An empty result means the run observes no DDFs at all; callers must
    /// skip the entire run rather than resolving individual fields.
    pub fn ddf_proposals(records: &[ProposalRecord]) -> Vec<ProposalRecord> {
        records
            .iter()
            .filter(|p| p.is_deep_drilling())
            .cloned()
            .collect()
    }

    /// Resolve one field against a run's deep-drilling proposals.
    ///
    /// Matching is by field label within the proposal name (proposal names
    /// look like `DD:COSMOS`). A field with no match is a run-level failure,
    /// not a skip: runs that observe some DDFs are expected to observe all
    /// of them. More than two matches keeps everything in the set but warns,
    /// since only the first two ids reach constraint strings.
    pub fn resolve(run: &str, ddf_records: &[ProposalRecord], field: DdfField) -> Result<ProposalSet> {
        let ids: Vec<i64> = ddf_records
            .iter()
            .filter(|p| p.name.contains(field.label()))
            .map(|p| p.id)
            .collect();

        if ids.is_empty() {
            return Err(BatchError::FieldNotObserved {
                run: run.to_string(),
                field: field.label().to_string(),
            });
        }

        if ids.len() > 2 {
            warn!(
                run = %run,
                field = %field,
                matched = ids.len(),
                "more than two proposals matched; only the first two enter constraints"
            );
        }

        Ok(ProposalSet { ids })
    }
}
