//! Normalization into `[0, 1]` with total fallbacks.
//!
//! Every function here returns a raster and a [`Normalization`] marker.
//! Degenerate inputs never produce `NaN`/`Inf`: they resolve to the
//! all-zero raster and the marker says why. Non-finite input cells are
//! ignored for statistics and map to 0 in the output.

use serde::{Deserialize, Serialize};

use crate::raster::Raster;

/// How a normalization resolved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Normalization {
    /// Values were rescaled by `(v - offset) / scale`.
    Scaled { offset: f64, scale: f64 },
    /// All finite cells share one value; output is all zero.
    ZeroVariance { value: f64 },
    /// No finite cells, or a non-positive or overflowing denominator;
    /// output is all zero.
    Degenerate,
}

impl Normalization {
    /// True when the all-zero fallback was used.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        !matches!(self, Self::Scaled { .. })
    }
}

/// Min–max scaling: minimum maps to exactly 0, maximum to exactly 1.
#[must_use]
pub fn normalize_min_max(raster: &Raster) -> (Raster, Normalization) {
    let Some(stats) = raster.stats() else {
        return (raster.zeros_like(), Normalization::Degenerate);
    };
    let range = stats.range();
    if range == 0.0 {
        return (
            raster.zeros_like(),
            Normalization::ZeroVariance { value: stats.min },
        );
    }
    if !range.is_finite() {
        return (raster.zeros_like(), Normalization::Degenerate);
    }
    let min = stats.min;
    let scaled = raster.map(|value| {
        if value.is_finite() {
            ((value - min) / range).clamp(0.0, 1.0)
        } else {
            0.0
        }
    });
    (
        scaled,
        Normalization::Scaled {
            offset: min,
            scale: range,
        },
    )
}

/// Division by the maximum. The minimum is not subtracted.
#[must_use]
pub fn normalize_by_max(raster: &Raster) -> (Raster, Normalization) {
    match raster.max() {
        Some(max) if max > 0.0 && max.is_finite() => (
            divide(raster, max),
            Normalization::Scaled {
                offset: 0.0,
                scale: max,
            },
        ),
        _ => (raster.zeros_like(), Normalization::Degenerate),
    }
}

/// Division by the total so that finite cells sum to 1.
#[must_use]
pub fn normalize_by_total(raster: &Raster) -> (Raster, Normalization) {
    let total = raster.sum();
    if total > 0.0 && total.is_finite() {
        (
            divide(raster, total),
            Normalization::Scaled {
                offset: 0.0,
                scale: total,
            },
        )
    } else {
        (raster.zeros_like(), Normalization::Degenerate)
    }
}

fn divide(raster: &Raster, denominator: f64) -> Raster {
    raster.map(|value| {
        if value.is_finite() {
            value / denominator
        } else {
            0.0
        }
    })
}
