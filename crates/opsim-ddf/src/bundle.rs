//! Metric bundle construction: one named request per (metric, band, field).

use crate::field::{Band, DdfField, SourceMags};
use crate::proposal::ProposalSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Spatial partition resolution shared by every bundle.
pub const HEALPIX_NSIDE: u32 = 128;

/// The six statistical reductions computed per (band, field) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// 25th percentile of five-sigma depth
    DepthP25,
    /// Median five-sigma depth
    DepthMedian,
    /// 75th percentile of five-sigma depth
    DepthP75,
    /// Maximum airmass
    AirmassMax,
    /// Number of visits (count of observation timestamps)
    VisitCount,
    /// Coadded five-sigma depth
    CoaddDepth,
}

impl MetricKind {
    pub const ALL: [MetricKind; 6] = [
        MetricKind::DepthP25,
        MetricKind::DepthMedian,
        MetricKind::DepthP75,
        MetricKind::AirmassMax,
        MetricKind::VisitCount,
        MetricKind::CoaddDepth,
    ];

    /// Prefix used in artifact names (`{prefix}_{band}_{field}`).
    pub fn artifact_prefix(&self) -> &'static str {
        match self {
            MetricKind::DepthP25 => "m5p25",
            MetricKind::DepthMedian => "m5Median",
            MetricKind::DepthP75 => "m5p75",
            MetricKind::AirmassMax => "airmassMax",
            MetricKind::VisitCount => "nvisit",
            MetricKind::CoaddDepth => "coadd",
        }
    }

    /// Visit-record column the reduction applies to.
    pub fn column(&self) -> &'static str {
        match self {
            MetricKind::DepthP25 | MetricKind::DepthMedian | MetricKind::DepthP75 => {
                "fiveSigmaDepth"
            }
            MetricKind::AirmassMax => "airmass",
            MetricKind::VisitCount => "observationStartMJD",
            MetricKind::CoaddDepth => "fiveSigmaDepth",
        }
    }
}

/// One named metric computation request.
///
/// `name` is unique within a run by construction (metric prefix + band +
/// field); the bundle map is keyed by it, so a collision would silently
/// overwrite an earlier bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleRequest {
    pub name: String,
    pub kind: MetricKind,
    pub column: String,
    pub constraint: String,
    pub run: String,
}

/// Build the visit-selection constraint for one band and field.
///
/// One proposal: `filter = "g" and proposalId = 5`.
/// Two proposals: `filter = "g" and (proposalId = 5 or proposalId = 7)`.
pub fn constraint_for(band: Band, proposals: &ProposalSet) -> String {
    match proposals.constraint_ids() {
        [only] => format!(r#"filter = "{}" and proposalId = {}"#, band.letter(), only),
        [first, second, ..] => format!(
            r#"filter = "{}" and (proposalId = {} or proposalId = {})"#,
            band.letter(),
            first,
            second
        ),
        [] => unreachable!("ProposalSet is non-empty by construction"),
    }
}

/// Builds the full bundle map for one run.
pub struct BundleBuilder;

impl BundleBuilder {
    /// Produce the name → request map covering every band × resolved field
    /// × six metric kinds.
    ///
    /// Each of the six kinds registers under its own name, including both
    /// depth percentiles, so no request shadows another.
    pub fn build(
        run: &str,
        src_mags: &SourceMags,
        resolved: &BTreeMap<DdfField, ProposalSet>,
    ) -> BTreeMap<String, BundleRequest> {
        let mut bundles = BTreeMap::new();

        for band in src_mags.bands() {
            for (field, proposals) in resolved {
                let constraint = constraint_for(band, proposals);

                for kind in MetricKind::ALL {
                    let name = format!(
                        "{}_{}_{}",
                        kind.artifact_prefix(),
                        band.letter(),
                        field.label()
                    );
                    let request = BundleRequest {
                        name: name.clone(),
                        kind,
                        column: kind.column().to_string(),
                        constraint: constraint.clone(),
                        run: run.to_string(),
                    };
                    let previous = bundles.insert(name, request);
                    debug_assert!(previous.is_none(), "bundle names are unique per run");
                }
            }
        }

        bundles
    }
}
