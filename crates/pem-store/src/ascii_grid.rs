//! ESRI ASCII grid rasters with a `.prj` sidecar holding the CRS identifier.
//!
//! ```text
//! ncols        4
//! nrows        2
//! xllcorner    500000
//! yllcorner    7400000
//! cellsize     100
//! NODATA_value -99999
//! 0 0 1 2
//! 3 4 5 -99999
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use pem_core::{Crs, GeoTransform, PemError, Raster, RasterGrid};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::util::{file_stem, read_string, write_string};

/// Nodata marker written for non-finite cells.
pub const NODATA_VALUE: f64 = -99999.0;

#[must_use]
pub fn prj_path(path: &Path) -> PathBuf {
    path.with_extension("prj")
}

/// Read a raster and its `.prj` sidecar. Nodata cells become `NaN`.
pub fn read_ascii_grid(path: &Path) -> Result<Raster> {
    let text = read_string(path)?;
    let prj = prj_path(path);
    if !prj.exists() {
        let layer = file_stem(path).unwrap_or_else(|| path.display().to_string());
        return Err(PemError::alignment(
            layer,
            format!("ungeoreferenced raster: missing {}", prj.display()),
        )
        .into());
    }
    let crs_text = read_string(&prj)?;
    let crs = crs_text.trim();
    if crs.is_empty() {
        return Err(StoreError::parse(&prj, 1, "empty CRS identifier"));
    }
    let raster = parse_ascii_grid(&text, path, Crs::new(crs))?;
    debug!(
        path = %path.display(),
        width = raster.grid().width,
        height = raster.grid().height,
        "read ascii grid"
    );
    Ok(raster)
}

#[derive(Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<(f64, bool)>,
    yll: Option<(f64, bool)>,
    cellsize: Option<f64>,
    nodata: Option<f64>,
}

/// Parse grid text; `path` is only used in error messages.
pub fn parse_ascii_grid(text: &str, path: &Path, crs: Crs) -> Result<Raster> {
    let mut header = Header::default();
    let mut values: Vec<f64> = Vec::new();
    let mut in_body = false;

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut tokens = trimmed.split_whitespace();
        let first = tokens.next().unwrap_or_default();
        let is_keyword = first.starts_with(|ch: char| ch.is_ascii_alphabetic());

        if !in_body && is_keyword {
            let raw = tokens
                .next()
                .ok_or_else(|| StoreError::parse(path, line_no, format!("'{first}' has no value")))?;
            let number: f64 = raw.parse().map_err(|_| {
                StoreError::parse(path, line_no, format!("'{first}' value '{raw}' is not a number"))
            })?;
            let count = || -> Result<usize> {
                if number >= 0.0 && number.fract() == 0.0 {
                    Ok(number as usize)
                } else {
                    Err(StoreError::parse(path, line_no, format!("'{first}' must be a whole number")))
                }
            };
            match first.to_ascii_lowercase().as_str() {
                "ncols" => header.ncols = Some(count()?),
                "nrows" => header.nrows = Some(count()?),
                "xllcorner" => header.xll = Some((number, false)),
                "xllcenter" => header.xll = Some((number, true)),
                "yllcorner" => header.yll = Some((number, false)),
                "yllcenter" => header.yll = Some((number, true)),
                "cellsize" => header.cellsize = Some(number),
                "nodata_value" => header.nodata = Some(number),
                other => {
                    return Err(StoreError::parse(
                        path,
                        line_no,
                        format!("unknown header key '{other}'"),
                    ));
                }
            }
            continue;
        }

        in_body = true;
        for token in trimmed.split_whitespace() {
            let value: f64 = token.parse().map_err(|_| {
                StoreError::parse(path, line_no, format!("cell value '{token}' is not a number"))
            })?;
            values.push(value);
        }
    }

    let missing = |key: &str| StoreError::parse(path, 1, format!("header is missing '{key}'"));
    let ncols = header.ncols.ok_or_else(|| missing("ncols"))?;
    let nrows = header.nrows.ok_or_else(|| missing("nrows"))?;
    let (xll, x_center) = header.xll.ok_or_else(|| missing("xllcorner"))?;
    let (yll, y_center) = header.yll.ok_or_else(|| missing("yllcorner"))?;
    let cellsize = header.cellsize.ok_or_else(|| missing("cellsize"))?;

    let expected = ncols
        .checked_mul(nrows)
        .ok_or_else(|| StoreError::parse(path, 1, format!("{ncols}x{nrows} grid is too large")))?;
    if values.len() != expected {
        return Err(StoreError::parse(
            path,
            text.lines().count(),
            format!("expected {expected} cell values, found {}", values.len()),
        ));
    }
    if let Some(nodata) = header.nodata {
        for value in &mut values {
            if *value == nodata {
                *value = f64::NAN;
            }
        }
    }

    let half = cellsize / 2.0;
    let origin_x = if x_center { xll - half } else { xll };
    let lower_y = if y_center { yll - half } else { yll };
    let origin_y = lower_y + nrows as f64 * cellsize;
    let grid = RasterGrid::new(
        crs,
        GeoTransform::new(origin_x, origin_y, cellsize, cellsize),
        ncols,
        nrows,
    );
    let layer = file_stem(path).unwrap_or_default();
    grid.validate(&layer)?;
    Ok(Raster::from_vec(grid, values)?)
}

/// Grid text for `raster`. Cells must be square.
pub fn format_ascii_grid(raster: &Raster) -> Result<String> {
    let grid = raster.grid();
    let t = &grid.transform;
    if t.pixel_width != t.pixel_height {
        return Err(PemError::alignment(
            "ascii grid",
            format!(
                "cells of {}x{} are not square and cannot be written as ESRI ASCII",
                t.pixel_width, t.pixel_height
            ),
        )
        .into());
    }
    let mut out = String::with_capacity(grid.len() * 8 + 128);
    let yll = t.origin_y - grid.height as f64 * t.pixel_height;
    let _ = writeln!(out, "ncols        {}", grid.width);
    let _ = writeln!(out, "nrows        {}", grid.height);
    let _ = writeln!(out, "xllcorner    {}", t.origin_x);
    let _ = writeln!(out, "yllcorner    {yll}");
    let _ = writeln!(out, "cellsize     {}", t.pixel_width);
    let _ = writeln!(out, "NODATA_value {NODATA_VALUE}");
    for row in raster.data().chunks(grid.width.max(1)) {
        let mut first = true;
        for &value in row {
            if !first {
                out.push(' ');
            }
            first = false;
            let value = if value.is_finite() { value } else { NODATA_VALUE };
            let _ = write!(out, "{value}");
        }
        out.push('\n');
    }
    Ok(out)
}

/// Write the grid and its `.prj` sidecar, creating parent directories.
pub fn write_ascii_grid(path: &Path, raster: &Raster) -> Result<()> {
    let text = format_ascii_grid(raster)?;
    write_string(path, &text)?;
    write_string(&prj_path(path), &format!("{}\n", raster.grid().crs))?;
    Ok(())
}
