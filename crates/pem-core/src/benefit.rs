//! Benefit Aggregator.
//!
//! Sector rasters (already resolved and normalized) are scaled by their
//! value per unit and summed. The sum is first turned into a share of the
//! total, so cells sum to 1, then rescaled by its maximum into `[0, 1]`.

use tracing::{debug, info_span};

use crate::diagnostics::Diagnostics;
use crate::error::{PemError, Result};
use crate::grid::CanonicalGrid;
use crate::normalize::{normalize_by_max, normalize_by_total};
use crate::raster::Raster;

#[derive(Debug, Clone, Copy)]
pub struct SectorContribution<'a> {
    pub sector: &'a str,
    pub raster: &'a Raster,
    pub value_per_unit: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BenefitOutcome {
    pub index: Raster,
    /// Per-cell share of the total benefit; sums to 1 unless degenerate.
    pub share: Raster,
    pub diagnostics: Diagnostics,
}

pub fn aggregate_benefit(
    contributions: &[SectorContribution<'_>],
    grid: &CanonicalGrid,
) -> Result<BenefitOutcome> {
    let span = info_span!("benefit", sectors = contributions.len());
    let _guard = span.enter();

    let mut total = Raster::zeros(grid.grid().clone());
    for contribution in contributions {
        let value = contribution.value_per_unit;
        if !value.is_finite() || value < 0.0 {
            return Err(PemError::configuration(
                format!("benefit sector '{}'", contribution.sector),
                format!("value_per_unit {value} must be finite and >= 0"),
            ));
        }
        if !contribution.raster.grid().is_aligned_with(grid.grid()) {
            return Err(PemError::alignment(
                contribution.sector,
                "sector raster is not on the canonical grid",
            ));
        }
        total.add_scaled(contribution.raster, value)?;
        debug!(sector = contribution.sector, value_per_unit = value, "sector added");
    }

    let mut diagnostics = Diagnostics::new();
    let (share, share_outcome) = normalize_by_total(&total);
    diagnostics.note("benefit share", share_outcome);
    let (index, _) = normalize_by_max(&share);
    Ok(BenefitOutcome {
        index,
        share,
        diagnostics,
    })
}
