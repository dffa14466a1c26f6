//! Atomic per-scenario publication.
//!
//! Everything is written into a hidden staging directory beside
//! `outputs/<scenario>` and swapped into place by rename. A staging
//! directory that is dropped without [`StagingDir::commit`] is removed, so
//! readers only ever see a complete previous or a complete new output set.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use pem_core::{CanonicalGrid, EngineConfig, ScenarioOutputs};
use tracing::{debug, info, warn};

use crate::ascii_grid::write_ascii_grid;
use crate::error::{Result, StoreError};
use crate::layout::ProjectLayout;
use crate::runmeta::{RUN_META_FILE, RunMeta};
use crate::util::{ensure_dir, now_utc};

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

fn sibling(target: &Path, tag: &str) -> Result<PathBuf> {
    let parent = target.parent().ok_or_else(|| StoreError::MissingPath {
        path: target.to_path_buf(),
    })?;
    let name = target
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("scenario");
    let n = STAGING_COUNTER.fetch_add(1, Ordering::Relaxed);
    Ok(parent.join(format!(".{name}.{tag}-{}-{n}", std::process::id())))
}

/// Staging directory guard for one publication.
#[derive(Debug)]
pub struct StagingDir {
    staging: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagingDir {
    pub fn create(target: &Path) -> Result<Self> {
        let staging = sibling(target, "staging")?;
        if let Some(parent) = staging.parent() {
            ensure_dir(parent)?;
        }
        fs::create_dir(&staging)?;
        debug!(staging = %staging.display(), "created staging dir");
        Ok(Self {
            staging,
            target: target.to_path_buf(),
            committed: false,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.staging
    }

    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Swap the staged tree into the target path.
    pub fn commit(mut self) -> Result<PathBuf> {
        let previous = if self.target.exists() {
            let backup = sibling(&self.target, "previous")?;
            fs::rename(&self.target, &backup)?;
            Some(backup)
        } else {
            None
        };
        if let Err(error) = fs::rename(&self.staging, &self.target) {
            if let Some(backup) = &previous
                && let Err(restore) = fs::rename(backup, &self.target)
            {
                warn!(
                    backup = %backup.display(),
                    error = %restore,
                    "could not restore previous outputs"
                );
            }
            return Err(error.into());
        }
        self.committed = true;
        if let Some(backup) = previous
            && let Err(error) = fs::remove_dir_all(&backup)
        {
            warn!(backup = %backup.display(), %error, "could not remove previous outputs");
        }
        Ok(self.target.clone())
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if !self.committed && self.staging.exists() {
            if let Err(error) = fs::remove_dir_all(&self.staging) {
                warn!(staging = %self.staging.display(), %error, "could not remove staging dir");
            } else {
                debug!(staging = %self.staging.display(), "discarded staging dir");
            }
        }
    }
}

/// Write a scenario's outputs and swap them into `outputs/<scenario>`.
///
/// Returns the metadata written as `run_meta.json`.
pub fn publish_scenario(
    layout: &ProjectLayout,
    outputs: &ScenarioOutputs,
    grid: &CanonicalGrid,
    config: &EngineConfig,
    started_at: DateTime<Utc>,
) -> Result<RunMeta> {
    let scenario = outputs.scenario.as_str();
    let target = layout.scenario_outputs(&outputs.scenario);
    let staging = StagingDir::create(&target)?;
    let mut written = Vec::new();

    let mut write = |relative: String, raster: &pem_core::Raster| -> Result<()> {
        write_ascii_grid(&staging.path().join(&relative), raster)?;
        written.push(relative);
        Ok(())
    };
    for (kind, raster) in outputs.indices() {
        write(format!("{scenario}_{kind}.asc"), raster)?;
    }
    for (user, raster) in &outputs.users {
        write(format!("intermediate/users/{user}.asc"), raster)?;
    }
    for (label, raster) in &outputs.overlaps {
        write(format!("intermediate/conflict/conflict_{label}.asc"), raster)?;
    }

    let mut meta = RunMeta::for_outputs(outputs, grid, config, started_at);
    meta.project_dir = layout.root().display().to_string();
    meta.outputs = written;
    meta.finish("ok", started_at, now_utc());
    meta.write_to_path(&staging.path().join(RUN_META_FILE))?;

    let published = staging.commit()?;
    info!(
        scenario,
        dir = %published.display(),
        files = meta.outputs.len(),
        "published scenario outputs"
    );
    Ok(meta)
}
