//! Input preparation for the external Habitat Risk Assessment engine.
//!
//! Ocean User groups become binary stressor footprints (any layer with a
//! positive value before normalization), habitat rasters
//! become binary habitat footprints, and `info.csv` lists both:
//!
//! ```text
//! NAME,PATH,TYPE,STRESSOR BUFFER (meters)
//! seagrass,<out>/habitats/seagrass.asc,HABITAT,
//! fisheries,<out>/stressors/fisheries.asc,STRESSOR,500
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use pem_core::group::resolve_groups;
use pem_core::resample::resample;
use pem_core::{CanonicalGrid, EngineConfig, Raster, ResamplingMethod, SourceStore};
use serde::Serialize;
use tracing::{info, info_span};

use crate::ascii_grid::write_ascii_grid;
use crate::error::Result;
use crate::plan::ScenarioPlan;
use crate::util::write_string;

pub const INFO_TABLE_FILE: &str = "info.csv";
const INFO_HEADER: &str = "NAME,PATH,TYPE,STRESSOR BUFFER (meters)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HraLayerKind {
    Habitat,
    Stressor,
}

impl HraLayerKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Habitat => "HABITAT",
            Self::Stressor => "STRESSOR",
        }
    }

    const fn folder(self) -> &'static str {
        match self {
            Self::Habitat => "habitats",
            Self::Stressor => "stressors",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HraLayer {
    pub name: String,
    pub kind: HraLayerKind,
    pub footprint: Raster,
    /// Stressors only.
    pub buffer_m: Option<f64>,
}

/// One `info.csv` row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoRow {
    pub name: String,
    pub path: PathBuf,
    pub kind: HraLayerKind,
    pub buffer_m: Option<f64>,
}

/// 1 where the cell holds a positive value, else 0.
#[must_use]
pub fn binary_footprint(raster: &Raster) -> Raster {
    raster.map(|value| if value.is_finite() && value > 0.0 { 1.0 } else { 0.0 })
}

/// Resolve the plan's users into stressors and load its habitats, all on
/// the canonical grid. Habitats come first, then stressors, each sorted.
pub fn collect_hra_layers(
    plan: &ScenarioPlan,
    store: &dyn SourceStore,
    grid: &CanonicalGrid,
    config: &EngineConfig,
) -> Result<Vec<HraLayer>> {
    let span = info_span!("hra_inputs", scenario = %plan.scenario);
    let _guard = span.enter();

    let context = plan.to_context()?;
    for user in context.users() {
        user.check_manifest(store.manifest())?;
    }
    let mut layers = Vec::new();
    for (habitat, raster_name) in &plan.habitats {
        let source = store.raster(raster_name)?;
        let aligned = resample(raster_name, &source, grid.grid(), ResamplingMethod::Nearest)?;
        layers.push(HraLayer {
            name: habitat.clone(),
            kind: HraLayerKind::Habitat,
            footprint: binary_footprint(&aligned),
            buffer_m: None,
        });
    }
    for resolved in resolve_groups(context.users(), store, grid, config)? {
        let buffer = plan
            .users
            .get(&resolved.name)
            .map_or(0.0, |user| user.buffer_m);
        layers.push(HraLayer {
            footprint: resolved.presence,
            name: resolved.name,
            kind: HraLayerKind::Stressor,
            buffer_m: Some(buffer),
        });
    }
    Ok(layers)
}

/// `info.csv` text for `rows`.
#[must_use]
pub fn format_info_table(rows: &[InfoRow]) -> String {
    let mut out = String::from(INFO_HEADER);
    out.push('\n');
    for row in rows {
        let buffer = row.buffer_m.map(|b| b.to_string()).unwrap_or_default();
        let _ = writeln!(
            out,
            "{},{},{},{buffer}",
            row.name,
            row.path.display(),
            row.kind.as_str()
        );
    }
    out
}

/// Write every footprint under `out_dir` plus the `info.csv` table.
pub fn write_hra_inputs(out_dir: &Path, layers: &[HraLayer]) -> Result<Vec<InfoRow>> {
    let mut rows = Vec::with_capacity(layers.len());
    for layer in layers {
        let path = out_dir
            .join(layer.kind.folder())
            .join(format!("{}.asc", layer.name));
        write_ascii_grid(&path, &layer.footprint)?;
        rows.push(InfoRow {
            name: layer.name.clone(),
            path,
            kind: layer.kind,
            buffer_m: layer.buffer_m,
        });
    }
    write_string(&out_dir.join(INFO_TABLE_FILE), &format_info_table(&rows))?;
    info!(out = %out_dir.display(), layers = rows.len(), "wrote HRA inputs");
    Ok(rows)
}
