//! GeoJSON `FeatureCollection` reader.
//!
//! The CRS comes from the legacy named `crs` member
//! (`{"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::5641"}}`).
//! Collections without one are only accepted when the caller supplies a
//! fallback CRS.

use std::collections::BTreeMap;
use std::path::Path;

use pem_core::{Crs, Feature, Geometry, PemError, VectorLayer};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::util::{file_stem, read_string};

#[derive(Debug, Deserialize)]
struct CollectionDoc {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    crs: Option<CrsDoc>,
    #[serde(default)]
    features: Vec<FeatureDoc>,
}

#[derive(Debug, Deserialize)]
struct CrsDoc {
    properties: CrsProperties,
}

#[derive(Debug, Deserialize)]
struct CrsProperties {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FeatureDoc {
    #[serde(default)]
    geometry: Option<GeometryDoc>,
    #[serde(default)]
    properties: Option<BTreeMap<String, Value>>,
}

type Coords = Vec<f64>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
enum GeometryDoc {
    Point(Coords),
    MultiPoint(Vec<Coords>),
    LineString(Vec<Coords>),
    MultiLineString(Vec<Vec<Coords>>),
    Polygon(Vec<Vec<Coords>>),
    MultiPolygon(Vec<Vec<Vec<Coords>>>),
}

fn position(coords: &[f64]) -> std::result::Result<[f64; 2], String> {
    match coords {
        [x, y, ..] => Ok([*x, *y]),
        _ => Err(format!("position needs at least 2 coordinates, got {}", coords.len())),
    }
}

fn positions(list: &[Coords]) -> std::result::Result<Vec<[f64; 2]>, String> {
    list.iter().map(|c| position(c)).collect()
}

fn rings(list: &[Vec<Coords>]) -> std::result::Result<Vec<Vec<[f64; 2]>>, String> {
    list.iter().map(|ring| positions(ring)).collect()
}

impl GeometryDoc {
    fn into_geometry(self) -> std::result::Result<Geometry, String> {
        Ok(match self {
            Self::Point(c) => Geometry::Point(position(&c)?),
            Self::MultiPoint(cs) => Geometry::MultiPoint(positions(&cs)?),
            Self::LineString(cs) => Geometry::LineString(positions(&cs)?),
            Self::MultiLineString(lines) => Geometry::MultiLineString(rings(&lines)?),
            Self::Polygon(polygon) => Geometry::Polygon(rings(&polygon)?),
            Self::MultiPolygon(polygons) => Geometry::MultiPolygon(
                polygons
                    .iter()
                    .map(|polygon| rings(polygon))
                    .collect::<std::result::Result<_, _>>()?,
            ),
        })
    }
}

/// Map a legacy CRS name to `AUTHORITY:CODE`.
///
/// Accepts `EPSG:5641`, `urn:ogc:def:crs:EPSG::5641` and the OGC `CRS84`
/// alias (read as EPSG:4326).
#[must_use]
pub fn crs_from_name(name: &str) -> Crs {
    let trimmed = name.trim();
    let upper = trimmed.to_ascii_uppercase();
    if upper.ends_with("CRS84") {
        return Crs::epsg(4326);
    }
    if let Some(rest) = upper.strip_prefix("URN:OGC:DEF:CRS:") {
        let mut parts = rest.split(':').filter(|part| !part.is_empty());
        if let (Some(authority), Some(code)) = (parts.next(), parts.last()) {
            return Crs::new(format!("{authority}:{code}"));
        }
    }
    Crs::new(trimmed)
}

/// Read `path` as a vector layer named after its file stem.
pub fn read_geojson(path: &Path, fallback_crs: Option<&Crs>) -> Result<VectorLayer> {
    let name = file_stem(path).unwrap_or_else(|| path.display().to_string());
    let text = read_string(path)?;
    let layer = parse_geojson(&text, &name, fallback_crs)?;
    debug!(
        layer = %layer.name,
        crs = %layer.crs,
        features = layer.features.len(),
        "read geojson"
    );
    Ok(layer)
}

pub fn parse_geojson(text: &str, name: &str, fallback_crs: Option<&Crs>) -> Result<VectorLayer> {
    let doc: CollectionDoc = serde_json::from_str(text)?;
    if doc.kind != "FeatureCollection" {
        return Err(PemError::configuration(
            format!("vector '{name}'"),
            format!("expected a FeatureCollection, found '{}'", doc.kind),
        )
        .into());
    }
    let crs = match (doc.crs, fallback_crs) {
        (Some(member), _) => crs_from_name(&member.properties.name),
        (None, Some(fallback)) => fallback.clone(),
        (None, None) => {
            return Err(PemError::alignment(
                name,
                "collection has no 'crs' member; set assume_canonical_crs to use the grid CRS",
            )
            .into());
        }
    };

    let mut features = Vec::with_capacity(doc.features.len());
    for (index, feature) in doc.features.into_iter().enumerate() {
        let geometry = feature
            .geometry
            .map(GeometryDoc::into_geometry)
            .transpose()
            .map_err(|message| {
                StoreError::from(PemError::configuration(
                    format!("vector '{name}' feature {index}"),
                    message,
                ))
            })?;
        features.push(Feature {
            geometry,
            properties: feature.properties.unwrap_or_default(),
        });
    }
    Ok(VectorLayer::new(name, crs, features))
}
