//! [`SourceStore`] over a project directory.
//!
//! Opening a store scans `inputs/vectors/*.geojson`, `inputs/rasters/*.asc`
//! and the scenario's own `inputs/risk/<scenario>/*.asc` once. Vector layers
//! are parsed at open time (their fields feed the manifest); rasters are read
//! on first use and cached.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use pem_core::{
    CanonicalGrid, Crs, PemError, Raster, ScenarioId, SourceManifest, SourceStore, VectorLayer,
};
use tracing::{debug, info};

use crate::ascii_grid::read_ascii_grid;
use crate::error::Result;
use crate::geojson::read_geojson;
use crate::layout::ProjectLayout;
use crate::util::{file_stem, list_files_with_extension};

/// Read `inputs/reference.asc` as the canonical grid.
pub fn read_canonical_grid(layout: &ProjectLayout) -> Result<CanonicalGrid> {
    let reference = read_ascii_grid(&layout.reference_grid())?;
    Ok(CanonicalGrid::new(reference.grid().clone())?)
}

#[derive(Debug)]
pub struct DirectoryStore {
    manifest: SourceManifest,
    vectors: BTreeMap<String, Arc<VectorLayer>>,
    raster_paths: BTreeMap<String, PathBuf>,
    cache: Mutex<BTreeMap<String, Arc<Raster>>>,
}

impl DirectoryStore {
    /// `vector_fallback_crs` is applied to collections without a `crs` member.
    pub fn open(
        layout: &ProjectLayout,
        scenario: &ScenarioId,
        vector_fallback_crs: Option<&Crs>,
    ) -> Result<Self> {
        let mut manifest = SourceManifest::default();

        let mut vectors = BTreeMap::new();
        for path in list_files_with_extension(&layout.vectors_dir(), "geojson")? {
            let layer = read_geojson(&path, vector_fallback_crs)?;
            manifest
                .vectors
                .insert(layer.name.clone(), layer.fields.clone());
            vectors.insert(layer.name.clone(), Arc::new(layer));
        }

        let mut raster_paths = BTreeMap::new();
        let shared = list_files_with_extension(&layout.rasters_dir(), "asc")?;
        let scoped = list_files_with_extension(&layout.risk_dir(scenario), "asc")?;
        for path in shared.into_iter().chain(scoped) {
            register_raster(&mut raster_paths, path)?;
        }
        manifest.rasters = raster_paths.keys().cloned().collect();

        info!(
            root = %layout.root().display(),
            scenario = %scenario,
            vectors = manifest.vectors.len(),
            rasters = manifest.rasters.len(),
            "opened directory store"
        );
        Ok(Self {
            manifest,
            vectors,
            raster_paths,
            cache: Mutex::new(BTreeMap::new()),
        })
    }

    /// File backing a raster source.
    #[must_use]
    pub fn raster_path(&self, name: &str) -> Option<&Path> {
        self.raster_paths.get(name).map(PathBuf::as_path)
    }
}

fn register_raster(paths: &mut BTreeMap<String, PathBuf>, path: PathBuf) -> Result<()> {
    let Some(name) = file_stem(&path) else {
        return Ok(());
    };
    if let Some(existing) = paths.get(&name) {
        return Err(PemError::configuration(
            format!("raster '{name}'"),
            format!(
                "defined twice: {} and {}",
                existing.display(),
                path.display()
            ),
        )
        .into());
    }
    paths.insert(name, path);
    Ok(())
}

impl SourceStore for DirectoryStore {
    fn manifest(&self) -> &SourceManifest {
        &self.manifest
    }

    fn vector(&self, name: &str) -> pem_core::Result<Arc<VectorLayer>> {
        self.vectors.get(name).cloned().ok_or_else(|| {
            PemError::configuration(format!("vector '{name}'"), "no such source in the store")
        })
    }

    fn raster(&self, name: &str) -> pem_core::Result<Arc<Raster>> {
        if let Ok(cache) = self.cache.lock()
            && let Some(raster) = cache.get(name)
        {
            return Ok(Arc::clone(raster));
        }
        let path = self.raster_paths.get(name).ok_or_else(|| {
            PemError::configuration(format!("raster '{name}'"), "no such source in the store")
        })?;
        let raster = read_ascii_grid(path).map_err(|error| match error {
            crate::error::StoreError::Engine(inner) => inner,
            other => PemError::configuration(format!("raster '{name}'"), other.to_string()),
        })?;
        debug!(raster = name, path = %path.display(), "loaded raster");
        let raster = Arc::new(raster);
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(name.to_owned(), Arc::clone(&raster));
        }
        Ok(raster)
    }
}
