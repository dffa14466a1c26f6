//! Fixed directory conventions of a planning project.
//!
//! ```text
//! <root>/inputs/reference.asc              canonical grid (+ .prj)
//! <root>/inputs/vectors/<name>.geojson
//! <root>/inputs/rasters/<name>.asc
//! <root>/inputs/users/<scenario>/conflict.csv
//! <root>/inputs/risk/<scenario>/<name>.asc
//! <root>/outputs/<scenario>/
//! ```
//!
//! Scenario-scoped paths are derived from the scenario name alone.

use std::path::{Path, PathBuf};

use pem_core::ScenarioId;

pub const REFERENCE_GRID_FILE: &str = "reference.asc";
pub const CONFLICT_MATRIX_FILE: &str = "conflict.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn inputs_dir(&self) -> PathBuf {
        self.root.join("inputs")
    }

    #[must_use]
    pub fn reference_grid(&self) -> PathBuf {
        self.inputs_dir().join(REFERENCE_GRID_FILE)
    }

    #[must_use]
    pub fn vectors_dir(&self) -> PathBuf {
        self.inputs_dir().join("vectors")
    }

    #[must_use]
    pub fn rasters_dir(&self) -> PathBuf {
        self.inputs_dir().join("rasters")
    }

    #[must_use]
    pub fn conflict_matrix(&self, scenario: &ScenarioId) -> PathBuf {
        self.inputs_dir()
            .join("users")
            .join(scenario.as_str())
            .join(CONFLICT_MATRIX_FILE)
    }

    /// Total-risk rasters produced by the external HRA engine.
    #[must_use]
    pub fn risk_dir(&self, scenario: &ScenarioId) -> PathBuf {
        self.inputs_dir().join("risk").join(scenario.as_str())
    }

    #[must_use]
    pub fn outputs_root(&self) -> PathBuf {
        self.root.join("outputs")
    }

    #[must_use]
    pub fn scenario_outputs(&self, scenario: &ScenarioId) -> PathBuf {
        self.outputs_root().join(scenario.as_str())
    }
}
