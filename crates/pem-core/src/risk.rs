//! Risk Combiner: benthic plus pelagic sub-risk, scaled by the maximum.

use tracing::info_span;

use crate::config::EngineConfig;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::grid::CanonicalGrid;
use crate::normalize::normalize_by_max;
use crate::raster::Raster;
use crate::resample::resample;

/// The two total-risk rasters produced by the external assessment engine.
#[derive(Debug, Clone, Copy)]
pub struct SubRisk<'a> {
    pub benthic: &'a Raster,
    pub pelagic: &'a Raster,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskOutcome {
    pub index: Raster,
    pub diagnostics: Diagnostics,
}

/// `R = (Rb + Rp) / max(Rb + Rp)`; all zero when the maximum is not positive.
pub fn combine_risk(
    inputs: SubRisk<'_>,
    grid: &CanonicalGrid,
    config: &EngineConfig,
) -> Result<RiskOutcome> {
    let span = info_span!("risk");
    let _guard = span.enter();

    let mut benthic = resample("risk/benthic", inputs.benthic, grid.grid(), config.resampling)?;
    let mut pelagic = resample("risk/pelagic", inputs.pelagic, grid.grid(), config.resampling)?;
    benthic.fill_nodata(0.0);
    pelagic.fill_nodata(0.0);

    let total = benthic.add(&pelagic)?;
    let (index, outcome) = normalize_by_max(&total);
    let mut diagnostics = Diagnostics::new();
    diagnostics.note("risk index", outcome);
    Ok(RiskOutcome { index, diagnostics })
}
