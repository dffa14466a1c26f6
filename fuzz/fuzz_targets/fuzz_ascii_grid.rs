#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use pem_core::Crs;
use pem_store::ascii_grid::{format_ascii_grid, parse_ascii_grid};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(raster) = parse_ascii_grid(text, Path::new("fuzz.asc"), Crs::epsg(5641)) else {
        return;
    };

    assert_eq!(raster.data().len(), raster.grid().len());
    let formatted = format_ascii_grid(&raster).expect("square cells always format");
    let again = parse_ascii_grid(&formatted, Path::new("fuzz.asc"), Crs::epsg(5641))
        .expect("formatted grid must parse");
    assert!(again.grid().is_aligned_with(raster.grid()));
});
