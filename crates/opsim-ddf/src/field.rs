//! Deep drilling fields, photometric bands, and source magnitudes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The five LSST deep drilling field targets.
///
/// Fixed at process start; proposal names in a run's metadata carry these
/// labels (e.g. `DD:COSMOS`), which is how fields map to proposal ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DdfField {
    Cosmos,
    XmmLss,
    ElaisS1,
    Ecdfs,
    Edfs,
}

impl DdfField {
    /// All fields, in the order they are iterated for bundle construction.
    pub const ALL: [DdfField; 5] = [
        DdfField::Cosmos,
        DdfField::XmmLss,
        DdfField::ElaisS1,
        DdfField::Ecdfs,
        DdfField::Edfs,
    ];

    /// The label used in proposal names and artifact names.
    pub fn label(&self) -> &'static str {
        match self {
            DdfField::Cosmos => "COSMOS",
            DdfField::XmmLss => "XMM-LSS",
            DdfField::ElaisS1 => "ELAISS1",
            DdfField::Ecdfs => "ECDFS",
            DdfField::Edfs => "EDFS",
        }
    }
}

impl fmt::Display for DdfField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// LSST photometric bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    U,
    G,
    R,
    I,
    Z,
    Y,
}

impl Band {
    pub const ALL: [Band; 6] = [Band::U, Band::G, Band::R, Band::I, Band::Z, Band::Y];

    /// Single-letter filter name as stored in visit records.
    pub fn letter(&self) -> &'static str {
        match self {
            Band::U => "u",
            Band::G => "g",
            Band::R => "r",
            Band::I => "i",
            Band::Z => "z",
            Band::Y => "y",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Reference source magnitudes per band.
///
/// The magnitude values are not consumed by the current metric set; they
/// are carried as configuration so magnitude-dependent metrics can be added
/// without changing the batch plumbing. Band iteration order for bundle
/// construction is derived from the keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMags(BTreeMap<Band, Vec<f64>>);

impl SourceMags {
    pub fn new(mags: BTreeMap<Band, Vec<f64>>) -> Self {
        SourceMags(mags)
    }

    /// Bands covered by this configuration, in stable order.
    pub fn bands(&self) -> impl Iterator<Item = Band> + '_ {
        self.0.keys().copied()
    }

    /// Reference magnitudes for one band (empty slice if the band is absent).
    pub fn mags(&self, band: Band) -> &[f64] {
        self.0.get(&band).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for SourceMags {
    fn default() -> Self {
        let mut mags = BTreeMap::new();
        mags.insert(Band::U, vec![22.15]);
        mags.insert(Band::G, vec![22.0]);
        mags.insert(Band::R, vec![21.75]);
        mags.insert(Band::I, vec![21.65]);
        mags.insert(Band::Z, vec![21.55]);
        mags.insert(Band::Y, vec![21.45]);
        SourceMags(mags)
    }
}
