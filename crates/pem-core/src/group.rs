//! Layer Group Resolver: declarative vector/raster bundles to one raster.
//!
//! Each referenced layer is brought onto the canonical grid (rasterized or
//! resampled), min–max normalized, weighted and summed; the sum is
//! normalized again. Group definitions are validated when constructed and
//! checked against the store's [`SourceManifest`] before any raster work.

use serde::{Deserialize, Serialize};
use tracing::{debug, info_span};

use crate::config::EngineConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{PemError, Result};
use crate::grid::CanonicalGrid;
use crate::normalize::normalize_min_max;
use crate::raster::Raster;
use crate::resample::resample;
use crate::source::{SourceManifest, SourceStore};
use crate::vector::{Burn, rasterize};

/// Whether `name` may name a scenario, group or habitat: non-empty ASCII
/// letters, digits, `_` or `-`. These names become file names and matrix
/// table cells.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}

fn default_weight() -> f64 {
    1.0
}

fn is_unit_weight(weight: &f64) -> bool {
    *weight == 1.0
}

/// One vector source. `field: None` burns the constant 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VectorLayerRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default = "default_weight", skip_serializing_if = "is_unit_weight")]
    pub weight: f64,
}

impl VectorLayerRef {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: None,
            weight: default_weight(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// One raster source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RasterLayerRef {
    pub name: String,
    #[serde(default = "default_weight", skip_serializing_if = "is_unit_weight")]
    pub weight: f64,
}

impl RasterLayerRef {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: default_weight(),
        }
    }

    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// The serialized shape of a group: `{vectors = [...], rasters = [...]}`.
/// The name comes from the enclosing key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupDefinition {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vectors: Vec<VectorLayerRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rasters: Vec<RasterLayerRef>,
}

/// A validated layer group. At least one layer; every weight finite and
/// non-negative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerGroup {
    name: String,
    vectors: Vec<VectorLayerRef>,
    rasters: Vec<RasterLayerRef>,
}

impl LayerGroup {
    pub fn new(
        name: impl Into<String>,
        vectors: Vec<VectorLayerRef>,
        rasters: Vec<RasterLayerRef>,
    ) -> Result<Self> {
        let name = name.into();
        let context = format!("group '{name}'");
        if !is_valid_name(&name) {
            return Err(PemError::configuration(
                context,
                "group names use letters, digits, '_' or '-' only",
            ));
        }
        if vectors.is_empty() && rasters.is_empty() {
            return Err(PemError::configuration(
                context,
                "group lists no vectors and no rasters",
            ));
        }
        let refs = vectors
            .iter()
            .map(|v| ("vector", v.name.as_str(), v.weight))
            .chain(rasters.iter().map(|r| ("raster", r.name.as_str(), r.weight)));
        for (kind, layer, weight) in refs {
            if layer.trim().is_empty() {
                return Err(PemError::configuration(
                    context,
                    format!("{kind} reference with an empty name"),
                ));
            }
            if !weight.is_finite() || weight < 0.0 {
                return Err(PemError::configuration(
                    context,
                    format!("{kind} '{layer}' has weight {weight}; weights must be finite and >= 0"),
                ));
            }
        }
        if let Some(empty) = vectors
            .iter()
            .find(|v| v.field.as_deref().is_some_and(|f| f.trim().is_empty()))
        {
            return Err(PemError::configuration(
                context,
                format!("vector '{}' names an empty field", empty.name),
            ));
        }
        Ok(Self {
            name,
            vectors,
            rasters,
        })
    }

    pub fn from_definition(name: impl Into<String>, definition: GroupDefinition) -> Result<Self> {
        Self::new(name, definition.vectors, definition.rasters)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn vectors(&self) -> &[VectorLayerRef] {
        &self.vectors
    }

    #[must_use]
    pub fn rasters(&self) -> &[RasterLayerRef] {
        &self.rasters
    }

    #[must_use]
    pub fn definition(&self) -> GroupDefinition {
        GroupDefinition {
            vectors: self.vectors.clone(),
            rasters: self.rasters.clone(),
        }
    }

    /// Every missing layer or field, reported together.
    pub fn check_manifest(&self, manifest: &SourceManifest) -> Result<()> {
        let mut problems = Vec::new();
        for vector in &self.vectors {
            match manifest.vector_fields(&vector.name) {
                None => problems.push(format!("vector '{}' not found", vector.name)),
                Some(fields) => {
                    if let Some(field) = &vector.field
                        && !fields.contains(field)
                    {
                        problems.push(format!(
                            "vector '{}' has no field '{field}'",
                            vector.name
                        ));
                    }
                }
            }
        }
        for raster in &self.rasters {
            if !manifest.has_raster(&raster.name) {
                problems.push(format!("raster '{}' not found", raster.name));
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(PemError::configuration(
                format!("group '{}'", self.name),
                problems.join("; "),
            ))
        }
    }
}

/// A group resolved onto the canonical grid, values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGroup {
    pub name: String,
    pub raster: Raster,
    /// 1 wherever any layer holds a positive value before normalization.
    pub presence: Raster,
    pub diagnostics: Diagnostics,
}

fn mark_presence(presence: &mut Raster, layer: &Raster) {
    for (cell, value) in presence.data_mut().iter_mut().zip(layer.data()) {
        if value.is_finite() && *value > 0.0 {
            *cell = 1.0;
        }
    }
}

/// Resolve one group.
pub fn resolve_group(
    group: &LayerGroup,
    store: &dyn SourceStore,
    grid: &CanonicalGrid,
    config: &EngineConfig,
) -> Result<ResolvedGroup> {
    let span = info_span!("resolve_group", group = %group.name);
    let _guard = span.enter();

    let mut diagnostics = Diagnostics::new();
    let mut accumulated = Raster::zeros(grid.grid().clone());
    let mut presence = Raster::zeros(grid.grid().clone());

    for vector_ref in &group.vectors {
        let layer = store.vector(&vector_ref.name)?;
        let burn = Burn::from_field(vector_ref.field.as_deref());
        let burned = rasterize(&layer, grid.grid(), &burn)?;
        mark_presence(&mut presence, &burned);
        let (normalized, outcome) = normalize_min_max(&burned);
        diagnostics.note(
            format!("group '{}' / vector '{}'", group.name, vector_ref.name),
            outcome,
        );
        accumulated.add_scaled(&normalized, vector_ref.weight)?;
        debug!(layer = %vector_ref.name, weight = vector_ref.weight, "vector layer added");
    }

    for raster_ref in &group.rasters {
        let source = store.raster(&raster_ref.name)?;
        let mut aligned = resample(&raster_ref.name, &source, grid.grid(), config.resampling)?;
        let filled = aligned.fill_nodata(0.0);
        mark_presence(&mut presence, &aligned);
        let (normalized, outcome) = normalize_min_max(&aligned);
        diagnostics.note(
            format!("group '{}' / raster '{}'", group.name, raster_ref.name),
            outcome,
        );
        accumulated.add_scaled(&normalized, raster_ref.weight)?;
        debug!(
            layer = %raster_ref.name,
            weight = raster_ref.weight,
            nodata_filled = filled,
            "raster layer added"
        );
    }

    let (raster, outcome) = normalize_min_max(&accumulated);
    diagnostics.note(format!("group '{}'", group.name), outcome);

    Ok(ResolvedGroup {
        name: group.name.clone(),
        raster,
        presence,
        diagnostics,
    })
}

/// Resolve several groups, on the rayon pool when enabled. Output order
/// matches input order either way.
pub fn resolve_groups(
    groups: &[LayerGroup],
    store: &dyn SourceStore,
    grid: &CanonicalGrid,
    config: &EngineConfig,
) -> Result<Vec<ResolvedGroup>> {
    #[cfg(feature = "parallel")]
    if config.parallel {
        use rayon::prelude::*;
        return groups
            .par_iter()
            .map(|group| resolve_group(group, store, grid, config))
            .collect();
    }
    groups
        .iter()
        .map(|group| resolve_group(group, store, grid, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use crate::config::EngineConfig;
    use crate::grid::{CanonicalGrid, Crs, GeoTransform, RasterGrid};
    use crate::raster::Raster;
    use crate::source::{MemoryStore, SourceStore};
    use crate::vector::{Feature, Geometry, VectorLayer};

    use super::{GroupDefinition, LayerGroup, RasterLayerRef, VectorLayerRef, resolve_group};

    fn canonical() -> CanonicalGrid {
        CanonicalGrid::new(RasterGrid::new(
            Crs::epsg(5641),
            GeoTransform::new(0.0, 20.0, 10.0, 10.0),
            2,
            2,
        ))
        .expect("canonical grid")
    }

    fn store() -> MemoryStore {
        let grid = canonical().grid().clone();
        let effort = VectorLayer::new(
            "effort",
            Crs::epsg(5641),
            vec![
                Feature {
                    geometry: Some(Geometry::Point([5.0, 15.0])),
                    properties: BTreeMap::from([("hours".to_owned(), json!(4.0))]),
                },
                Feature {
                    geometry: Some(Geometry::Point([15.0, 15.0])),
                    properties: BTreeMap::from([("hours".to_owned(), json!(2.0))]),
                },
            ],
        );
        MemoryStore::new()
            .with_vector(effort)
            .with_raster(
                "depth",
                Raster::from_vec(grid.clone(), vec![0.0, 10.0, 20.0, 40.0]).expect("raster"),
            )
            .with_raster("flat", Raster::filled(grid, 3.0))
    }

    #[test]
    fn empty_group_is_rejected_at_construction() {
        let error = LayerGroup::new("trawl", Vec::new(), Vec::new()).expect_err("empty group");
        assert!(error.is_configuration());
        assert!(error.to_string().contains("trawl"));
    }

    #[test]
    fn group_names_that_are_not_plain_identifiers_are_rejected() {
        for name in ["../../../future/hijack", "a;b", " a", "", "wind farm", "wind.farm"] {
            let error = LayerGroup::new(name, Vec::new(), vec![RasterLayerRef::new("depth")])
                .expect_err(name);
            assert!(error.is_configuration(), "{name}");
        }
        assert!(LayerGroup::new("wind_farm-2", Vec::new(), vec![RasterLayerRef::new("depth")]).is_ok());
    }

    #[test]
    fn negative_weight_is_rejected_at_construction() {
        let error = LayerGroup::new(
            "trawl",
            vec![VectorLayerRef::new("effort").with_weight(-1.0)],
            Vec::new(),
        )
        .expect_err("negative weight");
        assert!(error.to_string().contains("effort"));
    }

    #[test]
    fn definition_defaults_from_toml() {
        let definition: GroupDefinition = toml::from_str(
            r#"
            vectors = [{ name = "effort", field = "hours" }]
            rasters = [{ name = "depth", weight = 0.5 }]
            "#,
        )
        .expect("toml");
        let group = LayerGroup::from_definition("trawl", definition).expect("group");
        assert_eq!(group.vectors()[0].weight, 1.0);
        assert_eq!(group.vectors()[0].field.as_deref(), Some("hours"));
        assert_eq!(group.rasters()[0].weight, 0.5);
    }

    #[test]
    fn manifest_check_reports_every_problem() {
        let group = LayerGroup::new(
            "trawl",
            vec![
                VectorLayerRef::new("effort").with_field("days"),
                VectorLayerRef::new("lanes"),
            ],
            vec![RasterLayerRef::new("kelp")],
        )
        .expect("group");
        let error = group
            .check_manifest(store().manifest())
            .expect_err("missing layers");
        let message = error.to_string();
        assert!(message.contains("no field 'days'"));
        assert!(message.contains("vector 'lanes' not found"));
        assert!(message.contains("raster 'kelp' not found"));
    }

    #[test]
    fn resolved_group_is_min_max_normalized() {
        let group = LayerGroup::new(
            "trawl",
            vec![VectorLayerRef::new("effort").with_field("hours")],
            vec![RasterLayerRef::new("depth")],
        )
        .expect("group");
        let resolved =
            resolve_group(&group, &store(), &canonical(), &EngineConfig::default()).expect("resolve");
        // effort -> [1, 0.5, 0, 0]; depth -> [0, 0.25, 0.5, 1]; sum -> [1, 0.75, 0.5, 1]
        assert_eq!(resolved.raster.data(), &[1.0, 0.5, 0.0, 1.0]);
        assert!(resolved.diagnostics.is_empty());
    }

    #[test]
    fn constant_layer_contributes_zero_and_is_diagnosed() {
        let group = LayerGroup::new(
            "flat",
            Vec::new(),
            vec![RasterLayerRef::new("flat"), RasterLayerRef::new("depth")],
        )
        .expect("group");
        let resolved =
            resolve_group(&group, &store(), &canonical(), &EngineConfig::default()).expect("resolve");
        assert_eq!(resolved.raster.data(), &[0.0, 0.25, 0.5, 1.0]);
        assert_eq!(resolved.diagnostics.len(), 1);
        // The constant layer still counts as present everywhere.
        assert_eq!(resolved.presence.data(), &[1.0, 1.0, 1.0, 1.0]);
    }
}
