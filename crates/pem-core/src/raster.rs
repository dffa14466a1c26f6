//! Dense single-band rasters and elementwise algebra.

use serde::{Deserialize, Serialize};

use crate::error::{PemError, Result};
use crate::grid::RasterGrid;

/// Row-major `f64` raster. `NaN` marks nodata.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    grid: RasterGrid,
    data: Vec<f64>,
}

/// Summary statistics over the finite cells of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub sum: f64,
    pub count: usize,
}

impl RasterStats {
    #[must_use]
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

impl Raster {
    /// Wrap `data` on `grid`; the length must match the cell count.
    pub fn from_vec(grid: RasterGrid, data: Vec<f64>) -> Result<Self> {
        if data.len() != grid.len() {
            return Err(PemError::alignment(
                "raster",
                format!(
                    "{} values do not fill a {}x{} grid",
                    data.len(),
                    grid.width,
                    grid.height
                ),
            ));
        }
        Ok(Self { grid, data })
    }

    #[must_use]
    pub fn filled(grid: RasterGrid, value: f64) -> Self {
        let data = vec![value; grid.len()];
        Self { grid, data }
    }

    #[must_use]
    pub fn zeros(grid: RasterGrid) -> Self {
        Self::filled(grid, 0.0)
    }

    /// Zero raster sharing this raster's grid.
    #[must_use]
    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.grid.clone())
    }

    #[inline]
    #[must_use]
    pub fn grid(&self) -> &RasterGrid {
        &self.grid
    }

    #[inline]
    #[must_use]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    #[must_use]
    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, col: usize, row: usize) -> Option<f64> {
        if col >= self.grid.width || row >= self.grid.height {
            return None;
        }
        self.data.get(row * self.grid.width + col).copied()
    }

    /// Replace every non-finite cell with `value`; returns how many changed.
    pub fn fill_nodata(&mut self, value: f64) -> usize {
        let mut replaced = 0_usize;
        for cell in &mut self.data {
            if !cell.is_finite() {
                *cell = value;
                replaced += 1;
            }
        }
        replaced
    }

    /// Statistics over finite cells; `None` when no cell is finite.
    #[must_use]
    pub fn stats(&self) -> Option<RasterStats> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count = 0_usize;
        for &value in self.data.iter().filter(|value| value.is_finite()) {
            min = min.min(value);
            max = max.max(value);
            sum += value;
            count += 1;
        }
        (count > 0).then(|| RasterStats {
            min,
            max,
            mean: sum / count as f64,
            sum,
            count,
        })
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.data.iter().filter(|value| value.is_finite()).sum()
    }

    #[must_use]
    pub fn max(&self) -> Option<f64> {
        self.stats().map(|stats| stats.max)
    }

    #[must_use]
    pub fn min(&self) -> Option<f64> {
        self.stats().map(|stats| stats.min)
    }

    #[must_use]
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            grid: self.grid.clone(),
            data: self.data.iter().map(|&value| f(value)).collect(),
        }
    }

    /// Combine two aligned rasters cell by cell.
    pub fn zip_with(&self, other: &Raster, f: impl Fn(f64, f64) -> f64) -> Result<Self> {
        self.ensure_aligned(other)?;
        Ok(Self {
            grid: self.grid.clone(),
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    /// Elementwise product.
    pub fn mul(&self, other: &Raster) -> Result<Self> {
        self.zip_with(other, |a, b| a * b)
    }

    /// Elementwise sum.
    pub fn add(&self, other: &Raster) -> Result<Self> {
        self.zip_with(other, |a, b| a + b)
    }

    /// `self += other * weight`, in place.
    pub fn add_scaled(&mut self, other: &Raster, weight: f64) -> Result<()> {
        self.ensure_aligned(other)?;
        for (acc, &value) in self.data.iter_mut().zip(&other.data) {
            *acc += value * weight;
        }
        Ok(())
    }

    fn ensure_aligned(&self, other: &Raster) -> Result<()> {
        if self.grid.is_aligned_with(&other.grid) {
            Ok(())
        } else {
            Err(PemError::alignment(
                "raster algebra",
                format!(
                    "operands differ: {} {}x{} vs {} {}x{}",
                    self.grid.crs,
                    self.grid.width,
                    self.grid.height,
                    other.grid.crs,
                    other.grid.width,
                    other.grid.height
                ),
            ))
        }
    }
}
