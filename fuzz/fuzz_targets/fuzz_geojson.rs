#![no_main]

use libfuzzer_sys::fuzz_target;
use pem_core::{Burn, CanonicalGrid, Crs, GeoTransform, RasterGrid};
use pem_store::geojson::parse_geojson;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let crs = Crs::epsg(5641);
    let Ok(layer) = parse_geojson(text, "fuzz", Some(&crs)) else {
        return;
    };
    let Ok(grid) = CanonicalGrid::new(RasterGrid::new(
        crs,
        GeoTransform::new(-50.0, 50.0, 10.0, 10.0),
        10,
        10,
    )) else {
        return;
    };

    // Rasterizing arbitrary geometry must not panic and must stay finite.
    if let Ok(raster) = pem_core::vector::rasterize(&layer, grid.grid(), &Burn::Constant(1.0)) {
        assert!(raster.data().iter().all(|v| v.is_finite() && *v >= 0.0));
    }
});
