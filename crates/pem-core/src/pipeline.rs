//! The per-scenario pipeline: resolve groups, compute B, R and C, compose D.
//!
//! Every configuration check (engine config, groups against the manifest,
//! risk inputs, matrix actors) runs before the first raster is touched.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{info, info_span};

use crate::benefit::{SectorContribution, aggregate_benefit};
use crate::config::EngineConfig;
use crate::conflict::{PairEvaluation, compute_conflict};
use crate::diagnostics::Diagnostics;
use crate::error::{PemError, Result};
use crate::grid::CanonicalGrid;
use crate::group::{LayerGroup, resolve_groups};
use crate::index::{ComponentIndex, IndexKind, PerformanceIndex, Provenance};
use crate::matrix::ConflictMatrix;
use crate::performance::compose_performance;
use crate::raster::Raster;
use crate::risk::{SubRisk, combine_risk};
use crate::scenario::{ScenarioContext, ScenarioId};
use crate::source::SourceStore;

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioOutputs {
    pub scenario: ScenarioId,
    pub benefit: ComponentIndex,
    pub risk: ComponentIndex,
    pub conflict: ComponentIndex,
    pub performance: PerformanceIndex,
    /// Resolved Ocean User rasters by name.
    pub users: BTreeMap<String, Raster>,
    pub benefit_share: Raster,
    /// Raw pairwise overlaps, populated when intermediates are kept.
    pub overlaps: BTreeMap<String, Raster>,
    pub pairs: Vec<PairEvaluation>,
    pub diagnostics: Diagnostics,
}

impl ScenarioOutputs {
    /// The four published indices in a fixed order.
    #[must_use]
    pub fn indices(&self) -> [(IndexKind, &Raster); 4] {
        [
            (IndexKind::Benefit, &self.benefit.raster),
            (IndexKind::Risk, &self.risk.raster),
            (IndexKind::Conflict, &self.conflict.raster),
            (IndexKind::Performance, &self.performance.raster),
        ]
    }
}

/// Configuration checks shared by [`run_scenario`] and dry validation.
pub fn check_scenario(
    context: &ScenarioContext,
    store: &dyn SourceStore,
    matrix: &ConflictMatrix,
    config: &EngineConfig,
) -> Result<()> {
    config.ensure_valid()?;
    let manifest = store.manifest();
    let groups = context
        .users()
        .iter()
        .chain(context.benefit().iter().map(|sector| &sector.group));
    for group in groups {
        group.check_manifest(manifest)?;
    }
    let risk = context.risk();
    for name in [&risk.benthic, &risk.pelagic] {
        if !manifest.has_raster(name) {
            return Err(PemError::configuration(
                format!("risk raster '{name}'"),
                format!("not available for scenario '{}'", context.id()),
            ));
        }
    }
    let users = context.user_names();
    if matrix.actors() != users.as_slice() {
        return Err(PemError::matrix(format!(
            "matrix actors [{}] do not match scenario users [{}]",
            matrix.actors().join(", "),
            users.join(", ")
        )));
    }
    Ok(())
}

/// Run one scenario end to end. Pure: nothing is written anywhere.
pub fn run_scenario(
    context: &ScenarioContext,
    store: &dyn SourceStore,
    grid: &CanonicalGrid,
    matrix: &ConflictMatrix,
    config: &EngineConfig,
) -> Result<ScenarioOutputs> {
    let span = info_span!("scenario", scenario = %context.id());
    let _guard = span.enter();
    let started = Instant::now();

    check_scenario(context, store, matrix, config)?;
    let mut diagnostics = Diagnostics::new();

    // RESOLVE GROUPS
    let resolved_users = resolve_groups(context.users(), store, grid, config)?;
    let sector_groups: Vec<LayerGroup> = context
        .benefit()
        .iter()
        .map(|sector| sector.group.clone())
        .collect();
    let resolved_sectors = resolve_groups(&sector_groups, store, grid, config)?;

    let mut users = BTreeMap::new();
    for resolved in resolved_users {
        diagnostics.extend(resolved.diagnostics);
        users.insert(resolved.name, resolved.raster);
    }
    info!(users = users.len(), sectors = resolved_sectors.len(), "groups resolved");

    // COMPUTE COMPONENTS
    let conflict = compute_conflict(&users, matrix, grid, config)?;
    diagnostics.extend(conflict.diagnostics);

    let benthic = store.raster(&context.risk().benthic)?;
    let pelagic = store.raster(&context.risk().pelagic)?;
    let risk = combine_risk(
        SubRisk {
            benthic: &benthic,
            pelagic: &pelagic,
        },
        grid,
        config,
    )?;
    diagnostics.extend(risk.diagnostics);

    let contributions: Vec<SectorContribution<'_>> = context
        .benefit()
        .iter()
        .zip(&resolved_sectors)
        .map(|(sector, resolved)| SectorContribution {
            sector: sector.group.name(),
            raster: &resolved.raster,
            value_per_unit: sector.value_per_unit,
        })
        .collect();
    let benefit = aggregate_benefit(&contributions, grid)?;
    for resolved in &resolved_sectors {
        diagnostics.extend(resolved.diagnostics.clone());
    }
    diagnostics.extend(benefit.diagnostics);

    // COMPOSE D
    let performance = compose_performance(
        &benefit.index,
        &risk.index,
        &conflict.index,
        config.performance_floor,
    )?;

    let id = context.id();
    info!(
        pairs = conflict.pairs.len(),
        diagnostics = diagnostics.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "scenario computed"
    );
    Ok(ScenarioOutputs {
        scenario: id.clone(),
        benefit: ComponentIndex {
            provenance: Provenance::new(id, IndexKind::Benefit),
            raster: benefit.index,
        },
        risk: ComponentIndex {
            provenance: Provenance::new(id, IndexKind::Risk),
            raster: risk.index,
        },
        conflict: ComponentIndex {
            provenance: Provenance::new(id, IndexKind::Conflict),
            raster: conflict.index,
        },
        performance: PerformanceIndex {
            provenance: Provenance::new(id, IndexKind::Performance),
            floor: config.performance_floor,
            raster: performance,
        },
        users,
        benefit_share: benefit.share,
        overlaps: conflict.overlaps,
        pairs: conflict.pairs,
        diagnostics,
    })
}
