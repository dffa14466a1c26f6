//! Vector layers and their rasterization onto a grid.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::debug;

use crate::error::{PemError, Result};
use crate::grid::{Crs, Extent, RasterGrid};
use crate::raster::Raster;

/// `[x, y]` in map units.
pub type Position = [f64; 2];

/// A closed ring; the closing vertex may or may not repeat the first.
pub type Ring = Vec<Position>;

/// Outer ring followed by holes.
pub type PolygonRings = Vec<Ring>;

/// Sampling steps per cell when walking line segments.
const LINE_STEPS_PER_CELL: f64 = 4.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(PolygonRings),
    MultiPolygon(Vec<PolygonRings>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// `None` for features with a null geometry; they burn nothing.
    pub geometry: Option<Geometry>,
    pub properties: BTreeMap<String, Value>,
}

/// A named, georeferenced feature collection.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorLayer {
    pub name: String,
    pub crs: Crs,
    /// Attribute names present on at least one feature.
    pub fields: BTreeSet<String>,
    pub features: Vec<Feature>,
}

impl VectorLayer {
    /// Build a layer, deriving the field set from the features.
    #[must_use]
    pub fn new(name: impl Into<String>, crs: Crs, features: Vec<Feature>) -> Self {
        let fields = features
            .iter()
            .flat_map(|feature| feature.properties.keys().cloned())
            .collect();
        Self {
            name: name.into(),
            crs,
            fields,
            features,
        }
    }

    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains(field)
    }
}

/// Value written into every cell a feature touches.
#[derive(Debug, Clone, PartialEq)]
pub enum Burn {
    Constant(f64),
    Field(String),
}

impl Burn {
    /// `None` burns the constant 1.
    #[must_use]
    pub fn from_field(field: Option<&str>) -> Self {
        field.map_or(Self::Constant(1.0), |name| Self::Field(name.to_owned()))
    }

    fn value_for(&self, layer: &str, feature: &Feature) -> Result<f64> {
        let field = match self {
            Self::Constant(value) => return Ok(*value),
            Self::Field(field) => field,
        };
        match feature.properties.get(field) {
            None | Some(Value::Null) => Ok(0.0),
            Some(Value::Number(number)) => number.as_f64().ok_or_else(|| {
                PemError::configuration(
                    format!("layer '{layer}'"),
                    format!("field '{field}' holds {number}, which is not representable as f64"),
                )
            }),
            Some(other) => Err(PemError::configuration(
                format!("layer '{layer}'"),
                format!("field '{field}' must be numeric, found {other}"),
            )),
        }
    }
}

/// Burn every feature of `layer` onto `grid`. Overlapping features add up;
/// a single feature touches each cell at most once.
pub fn rasterize(layer: &VectorLayer, grid: &RasterGrid, burn: &Burn) -> Result<Raster> {
    if layer.crs != grid.crs {
        return Err(PemError::alignment(
            &layer.name,
            format!(
                "vector CRS {} differs from grid CRS {}; vectors are not reprojected",
                layer.crs, grid.crs
            ),
        ));
    }
    if let Burn::Field(field) = burn
        && !layer.has_field(field)
    {
        return Err(PemError::configuration(
            format!("layer '{}'", layer.name),
            format!("missing field '{field}'"),
        ));
    }

    let mut raster = Raster::zeros(grid.clone());
    let mut touched = BTreeSet::new();
    for feature in &layer.features {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        let value = burn.value_for(&layer.name, feature)?;
        touched.clear();
        collect_cells(geometry, grid, &mut touched);
        let data = raster.data_mut();
        for &index in &touched {
            data[index] += value;
        }
    }
    debug!(
        layer = %layer.name,
        features = layer.features.len(),
        "rasterized vector layer"
    );
    Ok(raster)
}

fn collect_cells(geometry: &Geometry, grid: &RasterGrid, cells: &mut BTreeSet<usize>) {
    match geometry {
        Geometry::Point(point) => burn_point(*point, grid, cells),
        Geometry::MultiPoint(points) => {
            for point in points {
                burn_point(*point, grid, cells);
            }
        }
        Geometry::LineString(line) => burn_line(line, grid, cells),
        Geometry::MultiLineString(lines) => {
            for line in lines {
                burn_line(line, grid, cells);
            }
        }
        Geometry::Polygon(rings) => burn_polygon(rings, grid, cells),
        Geometry::MultiPolygon(polygons) => {
            for rings in polygons {
                burn_polygon(rings, grid, cells);
            }
        }
    }
}

fn burn_point(point: Position, grid: &RasterGrid, cells: &mut BTreeSet<usize>) {
    if let Some((col, row)) = grid.cell_at(point[0], point[1]) {
        cells.insert(row * grid.width + col);
    }
}

fn burn_line(line: &[Position], grid: &RasterGrid, cells: &mut BTreeSet<usize>) {
    if let [only] = line {
        burn_point(*only, grid, cells);
        return;
    }
    let step = grid
        .transform
        .pixel_width
        .min(grid.transform.pixel_height)
        / LINE_STEPS_PER_CELL;
    let extent = grid.extent();
    for segment in line.windows(2) {
        let Some(([x0, y0], [x1, y1])) = clip_segment(segment[0], segment[1], &extent) else {
            continue;
        };
        let length = (x1 - x0).hypot(y1 - y0);
        if !length.is_finite() {
            continue;
        }
        let steps = (length / step).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            burn_point([x0 + (x1 - x0) * t, y0 + (y1 - y0) * t], grid, cells);
        }
    }
}

/// Liang–Barsky clip of the segment `a`-`b` to `extent`; `None` when it
/// misses the extent entirely.
fn clip_segment(a: Position, b: Position, extent: &Extent) -> Option<(Position, Position)> {
    if !a.iter().chain(&b).all(|v| v.is_finite()) {
        return None;
    }
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    let boundaries = [
        (-dx, a[0] - extent.xmin),
        (dx, extent.xmax - a[0]),
        (-dy, a[1] - extent.ymin),
        (dy, extent.ymax - a[1]),
    ];
    for (p, q) in boundaries {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    Some((
        [a[0] + t0 * dx, a[1] + t0 * dy],
        [a[0] + t1 * dx, a[1] + t1 * dy],
    ))
}

/// Cells whose centre lies inside the polygon under the even-odd rule over
/// all rings, so holes are excluded.
fn burn_polygon(rings: &[Ring], grid: &RasterGrid, cells: &mut BTreeSet<usize>) {
    let Some(outer) = rings.first() else {
        return;
    };
    if outer.len() < 3 {
        return;
    }
    let (mut xmin, mut ymin) = (f64::INFINITY, f64::INFINITY);
    let (mut xmax, mut ymax) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &[x, y] in outer {
        xmin = xmin.min(x);
        xmax = xmax.max(x);
        ymin = ymin.min(y);
        ymax = ymax.max(y);
    }
    let t = &grid.transform;
    let (col_lo, row_lo) = t.to_pixel(xmin, ymax);
    let (col_hi, row_hi) = t.to_pixel(xmax, ymin);
    let col_start = col_lo.floor().max(0.0) as usize;
    let row_start = row_lo.floor().max(0.0) as usize;
    let col_end = (col_hi.ceil().max(0.0) as usize).min(grid.width);
    let row_end = (row_hi.ceil().max(0.0) as usize).min(grid.height);

    for row in row_start..row_end {
        for col in col_start..col_end {
            let (x, y) = t.cell_center(col, row);
            if contains_even_odd(rings, x, y) {
                cells.insert(row * grid.width + col);
            }
        }
    }
}

fn contains_even_odd(rings: &[Ring], x: f64, y: f64) -> bool {
    let mut inside = false;
    for ring in rings {
        let n = ring.len();
        if n < 3 {
            continue;
        }
        let mut j = n - 1;
        for i in 0..n {
            let [xi, yi] = ring[i];
            let [xj, yj] = ring[j];
            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
    }
    inside
}
