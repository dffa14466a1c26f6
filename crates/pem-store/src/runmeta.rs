use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use pem_core::{CanonicalGrid, Diagnostic, EngineConfig, Normalization, ScenarioOutputs};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::util::{read_string, to_iso, write_string};

pub const RUN_META_FILE: &str = "run_meta.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSummary {
    pub crs: String,
    pub width: usize,
    pub height: usize,
    pub cell_size: f64,
    pub origin_x: f64,
    pub origin_y: f64,
}

impl GridSummary {
    #[must_use]
    pub fn of(grid: &CanonicalGrid) -> Self {
        let transform = grid.grid().transform;
        Self {
            crs: grid.crs().to_string(),
            width: grid.width(),
            height: grid.height(),
            cell_size: grid.resolution(),
            origin_x: transform.origin_x,
            origin_y: transform.origin_y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRecord {
    pub first: String,
    pub second: String,
    pub weight: f64,
    pub normalization: Normalization,
}

/// `run_meta.json` written beside every published scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RunMeta {
    pub status: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub duration_seconds: Option<f64>,
    pub scenario: String,
    pub project_dir: String,
    pub grid: Option<GridSummary>,
    pub engine: Option<EngineConfig>,
    pub formula_versions: BTreeMap<String, String>,
    pub pairs: Vec<PairRecord>,
    pub outputs: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunMeta {
    /// Everything known once the engine has returned. Timestamps and the
    /// output list are filled in by the publisher.
    #[must_use]
    pub fn for_outputs(
        outputs: &ScenarioOutputs,
        grid: &CanonicalGrid,
        config: &EngineConfig,
        started_at: DateTime<Utc>,
    ) -> Self {
        let formula_versions = [
            &outputs.benefit.provenance,
            &outputs.risk.provenance,
            &outputs.conflict.provenance,
            &outputs.performance.provenance,
        ]
        .into_iter()
        .map(|p| (p.kind.as_str().to_owned(), p.formula_version.clone()))
        .collect();
        let pairs = outputs
            .pairs
            .iter()
            .map(|evaluation| PairRecord {
                first: evaluation.pair.first.clone(),
                second: evaluation.pair.second.clone(),
                weight: evaluation.pair.weight,
                normalization: evaluation.normalization,
            })
            .collect();
        Self {
            status: "running".to_owned(),
            started_at: to_iso(started_at),
            scenario: outputs.scenario.to_string(),
            grid: Some(GridSummary::of(grid)),
            engine: Some(config.clone()),
            formula_versions,
            pairs,
            diagnostics: outputs.diagnostics.iter().cloned().collect(),
            ..Self::default()
        }
    }

    pub fn finish(&mut self, status: &str, started_at: DateTime<Utc>, finished_at: DateTime<Utc>) {
        self.status = status.to_owned();
        self.finished_at = Some(to_iso(finished_at));
        let elapsed = finished_at.signed_duration_since(started_at);
        self.duration_seconds = Some(elapsed.num_milliseconds() as f64 / 1000.0);
    }

    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        write_string(path, &content)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = read_string(path)?;
        Ok(serde_json::from_str::<Self>(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use pem_core::Normalization;
    use tempfile::tempdir;

    use super::{PairRecord, RunMeta};

    #[test]
    fn runmeta_round_trip_preserves_fields() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("run_meta.json");
        let started = Utc.with_ymd_and_hms(2026, 2, 17, 0, 0, 0).single().expect("time");

        let mut original = RunMeta {
            scenario: "baseline".to_string(),
            pairs: vec![PairRecord {
                first: "fisheries".to_string(),
                second: "wind".to_string(),
                weight: 1.0,
                normalization: Normalization::ZeroVariance { value: 0.0 },
            }],
            outputs: vec!["baseline_performance.asc".to_string()],
            ..RunMeta::default()
        };
        original.finish("ok", started, started + Duration::milliseconds(1500));

        original.write_to_path(&path).expect("write run_meta");
        let decoded = RunMeta::from_path(&path).expect("read run_meta");

        assert_eq!(decoded, original);
        assert_eq!(decoded.finished_at.as_deref(), Some("2026-02-17T00:00:01Z"));
        assert_eq!(decoded.duration_seconds, Some(1.5));
    }

    #[test]
    fn runmeta_deserialize_sparse_json_uses_defaults_for_missing_fields() {
        let sparse = r#"{"status":"failed","started_at":"2026-02-17T00:00:00Z"}"#;
        let parsed = serde_json::from_str::<RunMeta>(sparse).expect("parse sparse runmeta");

        assert_eq!(parsed.status, "failed");
        assert_eq!(parsed.scenario, "");
        assert!(parsed.grid.is_none());
        assert!(parsed.pairs.is_empty());
        assert!(parsed.finished_at.is_none());
    }
}
