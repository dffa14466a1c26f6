//! Coordinate reference systems, affine transforms and the canonical grid.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PemError, Result};

/// Relative tolerance used when comparing transform parameters.
const GRID_EPSILON: f64 = 1e-9;

/// Geographic (degree based) systems that cannot serve as a canonical grid.
const GEOGRAPHIC_CODES: [&str; 4] = ["EPSG:4326", "EPSG:4674", "EPSG:4258", "EPSG:4269"];

/// Coordinate reference system identifier in `AUTHORITY:CODE` form.
///
/// Comparison is on the normalized (trimmed, upper-case) identifier. A bare
/// numeric code is read as an EPSG code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Crs(String);

impl Crs {
    #[must_use]
    pub fn new(identifier: impl AsRef<str>) -> Self {
        let trimmed = identifier.as_ref().trim();
        let normalized = if !trimmed.is_empty() && trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            format!("EPSG:{trimmed}")
        } else {
            trimmed.to_ascii_uppercase()
        };
        Self(normalized)
    }

    #[must_use]
    pub fn epsg(code: u32) -> Self {
        Self(format!("EPSG:{code}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_geographic(&self) -> bool {
        GEOGRAPHIC_CODES.contains(&self.0.as_str()) || self.0.starts_with("GEOGCS")
    }
}

impl From<String> for Crs {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<Crs> for String {
    fn from(value: Crs) -> Self {
        value.0
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// North-up affine transform.
///
/// `origin_x`/`origin_y` locate the outer top-left corner of the top-left
/// cell. `pixel_height` is a positive distance measured downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    #[must_use]
    pub const fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Map coordinates of the centre of cell (`col`, `row`).
    #[inline]
    #[must_use]
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y - (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Fractional pixel coordinates of a map position. The integer part of
    /// each component is the containing cell index when in range.
    #[inline]
    #[must_use]
    pub fn to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (self.origin_y - y) / self.pixel_height,
        )
    }

    fn approx_eq(&self, other: &Self) -> bool {
        approx(self.origin_x, other.origin_x, self.pixel_width)
            && approx(self.origin_y, other.origin_y, self.pixel_height)
            && approx(self.pixel_width, other.pixel_width, self.pixel_width)
            && approx(self.pixel_height, other.pixel_height, self.pixel_height)
    }
}

fn approx(a: f64, b: f64, scale: f64) -> bool {
    (a - b).abs() <= GRID_EPSILON * scale.abs().max(1.0)
}

/// Axis-aligned bounding box in map units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }
}

/// Georeferenced raster lattice: CRS, transform and dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterGrid {
    pub crs: Crs,
    pub transform: GeoTransform,
    pub width: usize,
    pub height: usize,
}

impl RasterGrid {
    #[must_use]
    pub fn new(crs: Crs, transform: GeoTransform, width: usize, height: usize) -> Self {
        Self {
            crs,
            transform,
            width,
            height,
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn extent(&self) -> Extent {
        let t = &self.transform;
        Extent {
            xmin: t.origin_x,
            xmax: t.origin_x + self.width as f64 * t.pixel_width,
            ymin: t.origin_y - self.height as f64 * t.pixel_height,
            ymax: t.origin_y,
        }
    }

    /// Cell index of a map position, if it falls inside the grid.
    #[must_use]
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (px, py) = self.transform.to_pixel(x, y);
        if px < 0.0 || py < 0.0 {
            return None;
        }
        let (col, row) = (px.floor() as usize, py.floor() as usize);
        (col < self.width && row < self.height).then_some((col, row))
    }

    /// Same CRS, dimensions and (within tolerance) transform.
    #[must_use]
    pub fn is_aligned_with(&self, other: &RasterGrid) -> bool {
        self.crs == other.crs
            && self.width == other.width
            && self.height == other.height
            && self.transform.approx_eq(&other.transform)
    }

    /// Structural checks shared by every grid entering the engine.
    pub fn validate(&self, layer: &str) -> Result<()> {
        let t = &self.transform;
        let finite = [t.origin_x, t.origin_y, t.pixel_width, t.pixel_height]
            .iter()
            .all(|value| value.is_finite());
        if !finite || t.pixel_width <= 0.0 || t.pixel_height <= 0.0 {
            return Err(PemError::alignment(
                layer,
                format!(
                    "ungridded input: pixel size {}x{} is not a positive north-up resolution",
                    t.pixel_width, t.pixel_height
                ),
            ));
        }
        if self.is_empty() {
            return Err(PemError::alignment(layer, "grid has zero width or height"));
        }
        Ok(())
    }
}

/// The project-wide reference lattice every output raster must share.
///
/// Constructed once and never mutated; components receive it by reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalGrid(RasterGrid);

impl CanonicalGrid {
    pub fn new(grid: RasterGrid) -> Result<Self> {
        grid.validate("canonical grid")?;
        if grid.crs.is_geographic() {
            return Err(PemError::alignment(
                "canonical grid",
                format!(
                    "{} is geodetic; the canonical grid needs a projected CRS",
                    grid.crs
                ),
            ));
        }
        Ok(Self(grid))
    }

    #[inline]
    #[must_use]
    pub fn grid(&self) -> &RasterGrid {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn crs(&self) -> &Crs {
        &self.0.crs
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.0.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> usize {
        self.0.height
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn resolution(&self) -> f64 {
        self.0.transform.pixel_width
    }
}

#[cfg(test)]
mod tests {
    use super::{CanonicalGrid, Crs, GeoTransform, RasterGrid};

    fn grid(width: usize, height: usize) -> RasterGrid {
        RasterGrid::new(
            Crs::epsg(5641),
            GeoTransform::new(1000.0, 2000.0, 10.0, 10.0),
            width,
            height,
        )
    }

    #[test]
    fn crs_normalizes_case_and_bare_codes() {
        assert_eq!(Crs::new("epsg:5641"), Crs::epsg(5641));
        assert_eq!(Crs::new(" 5641 "), Crs::epsg(5641));
        assert!(Crs::new("EPSG:4326").is_geographic());
        assert!(!Crs::epsg(5880).is_geographic());
    }

    #[test]
    fn cell_center_and_lookup_are_consistent() {
        let grid = grid(4, 3);
        let (x, y) = grid.transform.cell_center(2, 1);
        assert_eq!((x, y), (1025.0, 1985.0));
        assert_eq!(grid.cell_at(x, y), Some((2, 1)));
        assert_eq!(grid.cell_at(999.0, 1995.0), None);
        assert_eq!(grid.cell_at(1041.0, 1995.0), None);
    }

    #[test]
    fn extent_spans_all_cells() {
        let extent = grid(4, 3).extent();
        assert_eq!(extent.xmin, 1000.0);
        assert_eq!(extent.xmax, 1040.0);
        assert_eq!(extent.ymin, 1970.0);
        assert_eq!(extent.ymax, 2000.0);
    }

    #[test]
    fn alignment_tolerates_float_noise_only() {
        let a = grid(4, 3);
        let mut b = grid(4, 3);
        b.transform.origin_x += 1e-12;
        assert!(a.is_aligned_with(&b));
        b.transform.origin_x += 5.0;
        assert!(!a.is_aligned_with(&b));
        assert!(!a.is_aligned_with(&grid(5, 3)));
    }

    #[test]
    fn canonical_grid_rejects_geographic_and_degenerate_grids() {
        let mut geographic = grid(4, 3);
        geographic.crs = Crs::epsg(4326);
        let error = CanonicalGrid::new(geographic).expect_err("geodetic grid");
        assert!(error.is_alignment());

        let mut degenerate = grid(4, 3);
        degenerate.transform.pixel_height = -10.0;
        assert!(CanonicalGrid::new(degenerate).is_err());

        assert!(CanonicalGrid::new(grid(0, 3)).is_err());
        assert!(CanonicalGrid::new(grid(4, 3)).is_ok());
    }
}
