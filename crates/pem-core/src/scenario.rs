//! Scenario identity and per-scenario inputs.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PemError, Result};
use crate::group::{LayerGroup, is_valid_name};

/// Scenario name. Restricted to `[A-Za-z0-9_-]` so that every path or key
/// derived from it stays inside that scenario's namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScenarioId(String);

impl ScenarioId {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if is_valid_name(&name) {
            Ok(Self(name))
        } else {
            Err(PemError::configuration(
                "scenario",
                format!("'{name}' is not a valid scenario name (use letters, digits, '_' or '-')"),
            ))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ScenarioId {
    type Error = PemError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ScenarioId> for String {
    fn from(value: ScenarioId) -> Self {
        value.0
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A benefit sector: a layer group plus its value per spatial unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenefitSector {
    pub group: LayerGroup,
    pub value_per_unit: f64,
}

/// Store names of the external engine's total-risk rasters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskInputs {
    pub benthic: String,
    pub pelagic: String,
}

/// Everything one scenario run consumes besides the store, grid and matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioContext {
    id: ScenarioId,
    users: Vec<LayerGroup>,
    benefit: Vec<BenefitSector>,
    risk: RiskInputs,
}

impl ScenarioContext {
    /// Users and sectors are kept sorted by name; names must be unique
    /// within each list.
    pub fn new(
        id: ScenarioId,
        mut users: Vec<LayerGroup>,
        mut benefit: Vec<BenefitSector>,
        risk: RiskInputs,
    ) -> Result<Self> {
        users.sort_by(|a, b| a.name().cmp(b.name()));
        benefit.sort_by(|a, b| a.group.name().cmp(b.group.name()));
        ensure_unique("ocean user", users.iter().map(LayerGroup::name))?;
        ensure_unique("benefit sector", benefit.iter().map(|s| s.group.name()))?;
        for sector in &benefit {
            let value = sector.value_per_unit;
            if !value.is_finite() || value < 0.0 {
                return Err(PemError::configuration(
                    format!("benefit sector '{}'", sector.group.name()),
                    format!("value_per_unit {value} must be finite and >= 0"),
                ));
            }
        }
        if risk.benthic.trim().is_empty() || risk.pelagic.trim().is_empty() {
            return Err(PemError::configuration(
                format!("scenario '{id}'"),
                "risk inputs must name both the benthic and the pelagic raster",
            ));
        }
        Ok(Self {
            id,
            users,
            benefit,
            risk,
        })
    }

    #[must_use]
    pub fn id(&self) -> &ScenarioId {
        &self.id
    }

    #[must_use]
    pub fn users(&self) -> &[LayerGroup] {
        &self.users
    }

    #[must_use]
    pub fn user_names(&self) -> Vec<&str> {
        self.users.iter().map(LayerGroup::name).collect()
    }

    #[must_use]
    pub fn benefit(&self) -> &[BenefitSector] {
        &self.benefit
    }

    #[must_use]
    pub fn risk(&self) -> &RiskInputs {
        &self.risk
    }
}

fn ensure_unique<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(PemError::configuration(
                format!("{kind} '{name}'"),
                "defined more than once",
            ));
        }
    }
    Ok(())
}
