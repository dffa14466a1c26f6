//! Engine tunables, loadable from TOML or JSON.
//!
//! ```toml
//! resampling = "nearest"
//! performance_floor = 0.005
//! keep_intermediate = true
//! ```
//!
//! Every field has a default, so an empty document yields
//! [`EngineConfig::default()`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::PemError;

/// Default lower bound applied to `R × C` before dividing.
pub const DEFAULT_PERFORMANCE_FLOOR: f64 = 0.01;

/// Interpolation used when a raster source is brought onto the canonical grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResamplingMethod {
    Nearest,
    #[default]
    Bilinear,
}

impl ResamplingMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Bilinear => "bilinear",
        }
    }
}

impl fmt::Display for ResamplingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResamplingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearest" | "near" => Ok(Self::Nearest),
            "bilinear" => Ok(Self::Bilinear),
            other => Err(format!(
                "unknown resampling method '{other}' (expected nearest or bilinear)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub resampling: ResamplingMethod,
    /// Minimum for `R × C` in the performance composition.
    pub performance_floor: f64,
    /// Retain per-pair overlap rasters in the scenario outputs.
    pub keep_intermediate: bool,
    /// Resolve groups and pairs on the rayon pool.
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resampling: ResamplingMethod::default(),
            performance_floor: DEFAULT_PERFORMANCE_FLOOR,
            keep_intermediate: false,
            parallel: true,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, EngineConfigError> {
        toml::from_str(s).map_err(EngineConfigError::Toml)
    }

    pub fn from_json_str(s: &str) -> Result<Self, EngineConfigError> {
        serde_json::from_str(s).map_err(EngineConfigError::Json)
    }

    /// Every violated constraint, empty when valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.performance_floor.is_finite() || self.performance_floor <= 0.0 {
            errors.push(format!(
                "performance_floor must be finite and > 0, got {}",
                self.performance_floor
            ));
        }
        errors
    }

    /// [`validate`](Self::validate) folded into a configuration error.
    pub fn ensure_valid(&self) -> crate::Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(PemError::configuration("engine config", errors.join("; ")))
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineConfigError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}
