//! Output indices and their provenance.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::raster::Raster;
use crate::scenario::ScenarioId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Benefit,
    Risk,
    Conflict,
    Performance,
}

impl IndexKind {
    pub const ALL: [IndexKind; 4] = [Self::Benefit, Self::Risk, Self::Conflict, Self::Performance];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Benefit => "benefit",
            Self::Risk => "risk",
            Self::Conflict => "conflict",
            Self::Performance => "performance",
        }
    }

    /// Identifier of the formula that produced this index. Bump the suffix
    /// whenever the arithmetic changes.
    #[must_use]
    pub const fn formula_version(self) -> &'static str {
        match self {
            Self::Benefit => "benefit/share-max-v1",
            Self::Risk => "risk/sum-max-v1",
            Self::Conflict => "conflict/pairwise-minmax-v1",
            Self::Performance => "performance/b-over-rc-floor-v1",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub scenario: ScenarioId,
    pub kind: IndexKind,
    pub formula_version: String,
}

impl Provenance {
    #[must_use]
    pub fn new(scenario: &ScenarioId, kind: IndexKind) -> Self {
        Self {
            scenario: scenario.clone(),
            kind,
            formula_version: kind.formula_version().to_owned(),
        }
    }
}

/// Benefit, Risk or Conflict index; values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentIndex {
    pub provenance: Provenance,
    pub raster: Raster,
}

/// `D`, in `[0, B / floor]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceIndex {
    pub provenance: Provenance,
    pub floor: f64,
    pub raster: Raster,
}
