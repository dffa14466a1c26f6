#![no_main]

use libfuzzer_sys::fuzz_target;
use pem_core::load_and_validate_matrix;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // Expected actors come from the header itself so the body parser is reached.
    let header = text.lines().next().unwrap_or_default();
    let actors: Vec<&str> = header.split(';').skip(1).map(str::trim).collect();
    let Ok(matrix) = load_and_validate_matrix(text, &actors) else {
        return;
    };

    let n = matrix.len();
    assert_eq!(matrix.pairs().len(), n * n.saturating_sub(1) / 2);
    for i in 0..n {
        assert_eq!(matrix.weight_at(i, i), 0.0, "diagonal must be zero");
        for j in 0..n {
            let w = matrix.weight_at(i, j);
            assert!(w.is_finite() && w >= 0.0);
            assert_eq!(w.to_bits(), matrix.weight_at(j, i).to_bits(), "not symmetric");
        }
    }

    // The canonical table reloads to the same matrix.
    let again = load_and_validate_matrix(&matrix.to_table_string(), matrix.actors())
        .expect("canonical table must reload");
    assert_eq!(again, matrix);
});
