//! Performance Composer: `D = B / max(R × C, floor)`.
//!
//! `D` is unbounded in principle. The floor only keeps the division finite;
//! with the default 0.01 the practical maximum is `100 · B`.

use tracing::info_span;

use crate::error::{PemError, Result};
use crate::raster::Raster;

/// One cell of the composition. Non-finite inputs count as 0.
#[inline]
#[must_use]
pub fn performance_value(benefit: f64, risk: f64, conflict: f64, floor: f64) -> f64 {
    let finite = |v: f64| if v.is_finite() { v } else { 0.0 };
    let product = finite(risk) * finite(conflict);
    finite(benefit) / product.max(floor)
}

/// Compose `D` over aligned B, R and C rasters.
pub fn compose_performance(
    benefit: &Raster,
    risk: &Raster,
    conflict: &Raster,
    floor: f64,
) -> Result<Raster> {
    let span = info_span!("performance", floor);
    let _guard = span.enter();

    if !floor.is_finite() || floor <= 0.0 {
        return Err(PemError::configuration(
            "performance composer",
            format!("floor must be finite and > 0, got {floor}"),
        ));
    }
    let rc = risk.mul(conflict)?;
    rc.zip_with(benefit, |product, b| {
        performance_value(b, product, 1.0, floor)
    })
}
