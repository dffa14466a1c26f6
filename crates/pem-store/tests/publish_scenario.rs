//! A project directory driven through open → run → publish.

use std::path::Path;

use chrono::Utc;
use pem_core::{
    Crs, EngineConfig, GeoTransform, Raster, RasterGrid, ScenarioId, build_default_matrix,
    run_scenario,
};
use pem_store::util::write_string;
use pem_store::{
    DirectoryStore, ProjectLayout, RunMeta, ScenarioPlan, collect_hra_layers, publish_scenario, read_ascii_grid,
    read_canonical_grid, read_matrix, write_ascii_grid, write_matrix,
};
use tempfile::tempdir;

const PLAN: &str = r#"
scenario = "{scenario}"
assume_canonical_crs = true

[users.fisheries]
vectors = [{ name = "trawl_grounds", field = "effort" }]

[users.wind]
rasters = [{ name = "wind_speed" }]

[benefit.fish_value]
rasters = [{ name = "landings" }]

[risk]
benthic = "{scenario}_benthic"
pelagic = "{scenario}_pelagic"

[engine]
keep_intermediate = true
"#;

fn id(name: &str) -> ScenarioId {
    ScenarioId::new(name).expect("id")
}

fn grid() -> RasterGrid {
    RasterGrid::new(
        Crs::epsg(5641),
        GeoTransform::new(0.0, 200.0, 100.0, 100.0),
        2,
        2,
    )
}

fn raster(values: &[f64]) -> Raster {
    Raster::from_vec(grid(), values.to_vec()).expect("raster")
}

fn seed(root: &Path) -> ProjectLayout {
    let layout = ProjectLayout::new(root);
    write_ascii_grid(&layout.reference_grid(), &Raster::zeros(grid())).expect("reference");
    write_ascii_grid(
        &layout.rasters_dir().join("wind_speed.asc"),
        &raster(&[1.0, 2.0, 3.0, 4.0]),
    )
    .expect("wind");
    write_ascii_grid(
        &layout.rasters_dir().join("landings.asc"),
        &raster(&[4.0, 0.0, 0.0, 0.0]),
    )
    .expect("landings");
    write_string(
        &layout.vectors_dir().join("trawl_grounds.geojson"),
        r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature",
             "geometry": {"type": "Polygon",
                          "coordinates": [[[0, 100], [200, 100], [200, 200], [0, 200], [0, 100]]]},
             "properties": {"effort": 3}}]}"#,
    )
    .expect("trawl");
    for scenario in ["baseline", "future"] {
        let plan = ScenarioPlan::from_toml_str(&PLAN.replace("{scenario}", scenario)).expect("plan");
        let risk = layout.risk_dir(&plan.scenario_id().expect("id"));
        write_ascii_grid(
            &risk.join(format!("{scenario}_benthic.asc")),
            &raster(&[0.5, 0.1, 0.0, 0.2]),
        )
        .expect("benthic");
        write_ascii_grid(
            &risk.join(format!("{scenario}_pelagic.asc")),
            &raster(&[0.5, 0.1, 0.0, f64::NAN]),
        )
        .expect("pelagic");
    }
    layout
}

fn run(layout: &ProjectLayout, scenario: &str) -> RunMeta {
    let plan = ScenarioPlan::from_toml_str(&PLAN.replace("{scenario}", scenario)).expect("plan");
    let context = plan.to_context().expect("context");
    let grid = read_canonical_grid(layout).expect("grid");
    let fallback = plan.assume_canonical_crs.then(|| grid.crs().clone());
    let store = DirectoryStore::open(layout, context.id(), fallback.as_ref()).expect("store");

    let matrix_path = layout.conflict_matrix(context.id());
    let default = build_default_matrix(&context.user_names()).expect("default");
    write_matrix(&matrix_path, &default, true).expect("matrix");
    let matrix = read_matrix(&matrix_path, &context.user_names()).expect("read matrix");

    let config = plan.engine_config();
    let started = Utc::now();
    let outputs = run_scenario(&context, &store, &grid, &matrix, &config).expect("run");
    publish_scenario(layout, &outputs, &grid, &config, started).expect("publish")
}

#[test]
fn published_set_is_complete_and_aligned() {
    let temp = tempdir().expect("tempdir");
    let layout = seed(temp.path());
    let meta = run(&layout, "baseline");

    assert_eq!(meta.status, "ok");
    assert_eq!(meta.scenario, "baseline");
    assert_eq!(meta.pairs.len(), 1);
    assert_eq!(
        meta.formula_versions.get("performance").map(String::as_str),
        Some("performance/b-over-rc-floor-v1")
    );
    assert_eq!(
        meta.outputs,
        [
            "baseline_benefit.asc",
            "baseline_risk.asc",
            "baseline_conflict.asc",
            "baseline_performance.asc",
            "intermediate/users/fisheries.asc",
            "intermediate/users/wind.asc",
            "intermediate/conflict/conflict_fisheries+wind.asc",
        ]
    );

    let out = layout.scenario_outputs(&id("baseline"));
    let reference = read_canonical_grid(&layout).expect("grid");
    for file in &meta.outputs {
        let raster = read_ascii_grid(&out.join(file)).expect("output raster");
        assert!(raster.grid().is_aligned_with(reference.grid()), "{file}");
        assert!(raster.data().iter().all(|v| v.is_finite()), "{file}");
    }
    let on_disk = RunMeta::from_path(&out.join("run_meta.json")).expect("run meta");
    assert_eq!(on_disk.status, meta.status);
    assert_eq!(on_disk.outputs, meta.outputs);
    assert_eq!(on_disk.grid.map(|g| (g.width, g.height)), Some((2, 2)));

    let risk = read_ascii_grid(&out.join("baseline_risk.asc")).expect("risk");
    assert_eq!(risk.data(), [1.0, 0.2, 0.0, 0.2]);
}

#[test]
fn scenarios_publish_independently() {
    let temp = tempdir().expect("tempdir");
    let layout = seed(temp.path());
    run(&layout, "baseline");
    let baseline_dir = layout.scenario_outputs(&id("baseline"));
    let before = std::fs::read_to_string(baseline_dir.join("baseline_performance.asc"))
        .expect("baseline");

    run(&layout, "future");
    run(&layout, "baseline");
    let after = std::fs::read_to_string(baseline_dir.join("baseline_performance.asc"))
        .expect("baseline again");
    assert_eq!(before, after);

    let mut published: Vec<String> = std::fs::read_dir(layout.outputs_root())
        .expect("outputs")
        .filter_map(|e| e.ok()?.file_name().into_string().ok())
        .collect();
    published.sort();
    assert_eq!(published, ["baseline", "future"], "no staging leftovers");
}

#[test]
fn engine_table_overrides_only_named_fields() {
    let plan = ScenarioPlan::from_toml_str(&PLAN.replace("{scenario}", "baseline")).expect("plan");
    let config = plan.engine_config();
    assert!(config.keep_intermediate);
    assert_eq!(config.performance_floor, EngineConfig::default().performance_floor);
}

#[test]
fn group_names_cannot_reach_outside_the_scenario() {
    let temp = tempdir().expect("tempdir");
    let layout = seed(temp.path());
    let escaping = PLAN
        .replace("{scenario}", "baseline")
        .replace("[users.wind]", "[users.\"../../../future/hijack\"]");
    let plan = ScenarioPlan::from_toml_str(&escaping).expect("parses");
    let error = plan.to_context().expect_err("escaping user name");
    assert!(error.engine().is_some_and(|e| e.is_configuration()));

    let grid = read_canonical_grid(&layout).expect("grid");
    let store =
        DirectoryStore::open(&layout, &id("baseline"), Some(grid.crs())).expect("store");
    let hra = collect_hra_layers(&plan, &store, &grid, &plan.engine_config());
    assert!(hra.is_err());

    let habitat = PLAN.replace("{scenario}", "baseline") + "\n[habitats]\n\"../kelp\" = \"landings\"\n";
    let plan = ScenarioPlan::from_toml_str(&habitat).expect("parses");
    assert!(collect_hra_layers(&plan, &store, &grid, &plan.engine_config()).is_err());

    assert!(!layout.outputs_root().exists(), "nothing was written");
}
