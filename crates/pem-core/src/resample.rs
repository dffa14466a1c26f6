//! Bringing raster sources onto the canonical grid.
//!
//! Only same-CRS resampling is supported; reprojection belongs to the data
//! access layer. Target cells whose centre falls outside the source extent
//! become nodata.

use tracing::debug;

use crate::config::ResamplingMethod;
use crate::error::{PemError, Result};
use crate::grid::RasterGrid;
use crate::raster::Raster;

/// Resample `source` onto `target`. Aligned inputs are returned unchanged.
pub fn resample(
    layer: &str,
    source: &Raster,
    target: &RasterGrid,
    method: ResamplingMethod,
) -> Result<Raster> {
    source.grid().validate(layer)?;
    if source.grid().crs != target.crs {
        return Err(PemError::alignment(
            layer,
            format!(
                "CRS {} cannot be resampled onto {} without reprojection",
                source.grid().crs,
                target.crs
            ),
        ));
    }
    if source.grid().is_aligned_with(target) {
        return Ok(source.clone());
    }

    debug!(
        layer,
        %method,
        from = %format!("{}x{}", source.grid().width, source.grid().height),
        to = %format!("{}x{}", target.width, target.height),
        "resampling onto canonical grid"
    );

    let mut data = Vec::with_capacity(target.len());
    for row in 0..target.height {
        for col in 0..target.width {
            let (x, y) = target.transform.cell_center(col, row);
            let (px, py) = source.grid().transform.to_pixel(x, y);
            let value = match method {
                ResamplingMethod::Nearest => sample_nearest(source, px, py),
                ResamplingMethod::Bilinear => sample_bilinear(source, px, py),
            };
            data.push(value);
        }
    }
    Raster::from_vec(target.clone(), data)
}

fn inside(source: &Raster, px: f64, py: f64) -> bool {
    let grid = source.grid();
    px >= 0.0 && py >= 0.0 && px < grid.width as f64 && py < grid.height as f64
}

fn sample_nearest(source: &Raster, px: f64, py: f64) -> f64 {
    if !inside(source, px, py) {
        return f64::NAN;
    }
    source
        .get(px.floor() as usize, py.floor() as usize)
        .unwrap_or(f64::NAN)
}

/// Interpolates between the four surrounding cell centres, clamped at the
/// edges. Nodata neighbours drop out and the remaining weights renormalize.
fn sample_bilinear(source: &Raster, px: f64, py: f64) -> f64 {
    if !inside(source, px, py) {
        return f64::NAN;
    }
    let grid = source.grid();
    let max_col = (grid.width - 1) as f64;
    let max_row = (grid.height - 1) as f64;
    let fx = (px - 0.5).clamp(0.0, max_col);
    let fy = (py - 0.5).clamp(0.0, max_row);
    let (c0, r0) = (fx.floor(), fy.floor());
    let (c1, r1) = ((c0 + 1.0).min(max_col), (r0 + 1.0).min(max_row));
    let (tx, ty) = (fx - c0, fy - r0);

    let taps = [
        (c0, r0, (1.0 - tx) * (1.0 - ty)),
        (c1, r0, tx * (1.0 - ty)),
        (c0, r1, (1.0 - tx) * ty),
        (c1, r1, tx * ty),
    ];
    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    for (col, row, weight) in taps {
        if weight == 0.0 {
            continue;
        }
        if let Some(value) = source.get(col as usize, row as usize)
            && value.is_finite()
        {
            weighted += value * weight;
            total_weight += weight;
        }
    }
    if total_weight > 0.0 {
        weighted / total_weight
    } else {
        f64::NAN
    }
}
