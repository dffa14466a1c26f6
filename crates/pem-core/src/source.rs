//! Read-only access to named vector and raster sources.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PemError, Result};
use crate::raster::Raster;
use crate::vector::VectorLayer;

/// Names (and vector fields) a store can serve, built once when the store
/// opens so groups can be checked before any raster work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceManifest {
    pub vectors: BTreeMap<String, BTreeSet<String>>,
    pub rasters: BTreeSet<String>,
}

impl SourceManifest {
    #[must_use]
    pub fn has_vector(&self, name: &str) -> bool {
        self.vectors.contains_key(name)
    }

    #[must_use]
    pub fn has_raster(&self, name: &str) -> bool {
        self.rasters.contains(name)
    }

    #[must_use]
    pub fn vector_fields(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.vectors.get(name)
    }
}

/// Keyed collection of georeferenced layers consumed by the resolver.
///
/// Implementations must be shareable across the rayon pool.
pub trait SourceStore: Send + Sync {
    fn manifest(&self) -> &SourceManifest;

    fn vector(&self, name: &str) -> Result<Arc<VectorLayer>>;

    fn raster(&self, name: &str) -> Result<Arc<Raster>>;
}

pub(crate) fn missing_source(kind: &str, name: &str) -> PemError {
    PemError::configuration(
        format!("{kind} '{name}'"),
        "no such source in the store",
    )
}

/// In-memory store for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    manifest: SourceManifest,
    vectors: BTreeMap<String, Arc<VectorLayer>>,
    rasters: BTreeMap<String, Arc<Raster>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a vector layer under its own name.
    #[must_use]
    pub fn with_vector(mut self, layer: VectorLayer) -> Self {
        self.insert_vector(layer);
        self
    }

    #[must_use]
    pub fn with_raster(mut self, name: impl Into<String>, raster: Raster) -> Self {
        self.insert_raster(name, raster);
        self
    }

    pub fn insert_vector(&mut self, layer: VectorLayer) {
        self.manifest
            .vectors
            .insert(layer.name.clone(), layer.fields.clone());
        self.vectors.insert(layer.name.clone(), Arc::new(layer));
    }

    pub fn insert_raster(&mut self, name: impl Into<String>, raster: Raster) {
        let name = name.into();
        self.manifest.rasters.insert(name.clone());
        self.rasters.insert(name, Arc::new(raster));
    }
}

impl SourceStore for MemoryStore {
    fn manifest(&self) -> &SourceManifest {
        &self.manifest
    }

    fn vector(&self, name: &str) -> Result<Arc<VectorLayer>> {
        self.vectors
            .get(name)
            .cloned()
            .ok_or_else(|| missing_source("vector", name))
    }

    fn raster(&self, name: &str) -> Result<Arc<Raster>> {
        self.rasters
            .get(name)
            .cloned()
            .ok_or_else(|| missing_source("raster", name))
    }
}
