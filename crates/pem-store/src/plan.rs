//! Scenario plan files (TOML) and engine config files.
//!
//! ```toml
//! scenario = "baseline"
//!
//! [users.fisheries]
//! vectors = [{ name = "trawl_grounds", field = "effort" }]
//! buffer_m = 500
//!
//! [users.wind]
//! rasters = [{ name = "wind_speed", weight = 2 }]
//!
//! [benefit.fish_value]
//! rasters = [{ name = "landings" }]
//! value_per_unit = 2.5
//!
//! [risk]
//! benthic = "benthic_total"
//! pelagic = "pelagic_total"
//!
//! [engine]
//! performance_floor = 0.05
//!
//! [habitats]
//! seagrass = "seagrass_extent"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use pem_core::group::is_valid_name;
use pem_core::{
    BenefitSector, EngineConfig, GroupDefinition, LayerGroup, PemError, RasterLayerRef,
    RiskInputs, ScenarioContext, ScenarioId, VectorLayerRef,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::util::read_string;

fn default_value_per_unit() -> f64 {
    1.0
}

/// An Ocean User group plus the stressor buffer handed to the HRA engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserPlan {
    #[serde(default)]
    pub vectors: Vec<VectorLayerRef>,
    #[serde(default)]
    pub rasters: Vec<RasterLayerRef>,
    #[serde(default)]
    pub buffer_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectorPlan {
    #[serde(default)]
    pub vectors: Vec<VectorLayerRef>,
    #[serde(default)]
    pub rasters: Vec<RasterLayerRef>,
    #[serde(default = "default_value_per_unit")]
    pub value_per_unit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioPlan {
    pub scenario: String,
    /// Vector layers without a `crs` member take the canonical grid's CRS.
    #[serde(default)]
    pub assume_canonical_crs: bool,
    #[serde(default)]
    pub users: BTreeMap<String, UserPlan>,
    #[serde(default)]
    pub benefit: BTreeMap<String, SectorPlan>,
    pub risk: RiskInputs,
    #[serde(default)]
    pub engine: Option<EngineConfig>,
    /// Habitat name to source raster, for HRA input preparation.
    #[serde(default)]
    pub habitats: BTreeMap<String, String>,
}

impl ScenarioPlan {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_toml_str(&read_string(path)?)
    }

    pub fn scenario_id(&self) -> Result<ScenarioId> {
        Ok(ScenarioId::new(self.scenario.as_str())?)
    }

    /// The plan's `[engine]` table, or defaults.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        self.engine.clone().unwrap_or_default()
    }

    /// Plan-level problems not covered by group and context validation.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.users.is_empty() {
            errors.push("plan lists no [users.*] groups".to_owned());
        }
        let names = self
            .users
            .keys()
            .map(|name| ("users", name))
            .chain(self.benefit.keys().map(|name| ("benefit", name)))
            .chain(self.habitats.keys().map(|name| ("habitats", name)));
        for (table, name) in names {
            if !is_valid_name(name) {
                errors.push(format!(
                    "{table}.\"{name}\" is not a valid name (use letters, digits, '_' or '-')"
                ));
            }
        }
        for (name, user) in &self.users {
            if !user.buffer_m.is_finite() || user.buffer_m < 0.0 {
                errors.push(format!(
                    "users.{name}.buffer_m must be finite and >= 0, got {}",
                    user.buffer_m
                ));
            }
        }
        for (habitat, raster) in &self.habitats {
            if raster.trim().is_empty() {
                errors.push(format!("habitats.{habitat} names no raster"));
            }
        }
        if let Some(engine) = &self.engine {
            errors.extend(engine.validate().into_iter().map(|e| format!("engine.{e}")));
        }
        errors
    }

    /// Build the validated engine context.
    pub fn to_context(&self) -> Result<ScenarioContext> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(PemError::configuration(
                format!("plan '{}'", self.scenario),
                errors.join("; "),
            )
            .into());
        }
        let id = self.scenario_id()?;
        let users = self
            .users
            .iter()
            .map(|(name, user)| {
                LayerGroup::from_definition(
                    name.as_str(),
                    GroupDefinition {
                        vectors: user.vectors.clone(),
                        rasters: user.rasters.clone(),
                    },
                )
            })
            .collect::<pem_core::Result<Vec<_>>>()?;
        let benefit = self
            .benefit
            .iter()
            .map(|(name, sector)| {
                let group = LayerGroup::from_definition(
                    name.as_str(),
                    GroupDefinition {
                        vectors: sector.vectors.clone(),
                        rasters: sector.rasters.clone(),
                    },
                )?;
                Ok(BenefitSector {
                    group,
                    value_per_unit: sector.value_per_unit,
                })
            })
            .collect::<pem_core::Result<Vec<_>>>()?;
        Ok(ScenarioContext::new(id, users, benefit, self.risk.clone())?)
    }
}

/// Read an engine config file, dispatching on `.toml` or `.json`.
pub fn load_engine_config(path: &Path) -> Result<EngineConfig> {
    let text = read_string(path)?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let config = match extension.as_deref() {
        Some("toml") => EngineConfig::from_toml_str(&text)?,
        Some("json") => EngineConfig::from_json_str(&text)?,
        _ => {
            return Err(StoreError::parse(
                path,
                0,
                "engine config must be a .toml or .json file",
            ));
        }
    };
    Ok(config)
}
