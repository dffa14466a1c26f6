//! End-to-end runs of the scenario pipeline over an in-memory store.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use pem_core::{
    BenefitSector, CanonicalGrid, Crs, EngineConfig, Feature, GeoTransform, Geometry,
    LayerGroup, MemoryStore, PemError, Raster, RasterGrid, RasterLayerRef, RiskInputs,
    ScenarioContext, ScenarioId, SourceManifest, SourceStore, VectorLayer, VectorLayerRef,
    build_default_matrix, check_scenario, load_and_validate_matrix, run_scenario,
};
use serde_json::json;

/// 4x2 grid of 100 m cells; origin at (0, 200).
fn canonical() -> CanonicalGrid {
    CanonicalGrid::new(RasterGrid::new(
        Crs::epsg(5641),
        GeoTransform::new(0.0, 200.0, 100.0, 100.0),
        4,
        2,
    ))
    .expect("grid")
}

fn raster(values: &[f64]) -> Raster {
    Raster::from_vec(canonical().grid().clone(), values.to_vec()).expect("raster")
}

fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Geometry {
    Geometry::Polygon(vec![vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]])
}

fn store() -> MemoryStore {
    let trawl = VectorLayer::new(
        "trawl_grounds",
        Crs::epsg(5641),
        vec![
            Feature {
                geometry: Some(square(0.0, 100.0, 200.0, 200.0)),
                properties: BTreeMap::from([("effort".to_owned(), json!(2.0))]),
            },
            Feature {
                geometry: Some(square(100.0, 0.0, 200.0, 100.0)),
                properties: BTreeMap::from([("effort".to_owned(), json!(1.0))]),
            },
        ],
    );
    let lanes = VectorLayer::new(
        "shipping_lanes",
        Crs::epsg(5641),
        vec![Feature {
            geometry: Some(Geometry::LineString(vec![[10.0, 150.0], [390.0, 150.0]])),
            properties: BTreeMap::new(),
        }],
    );
    MemoryStore::new()
        .with_vector(trawl)
        .with_vector(lanes)
        .with_raster("wind_speed", raster(&[4.0, 6.0, 8.0, 10.0, 4.0, 6.0, 8.0, 10.0]))
        .with_raster("landings", raster(&[3.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0]))
        .with_raster("baseline_benthic", raster(&[0.2, 0.4, 0.0, 0.0, 0.1, 0.1, 0.0, 0.0]))
        .with_raster("baseline_pelagic", raster(&[0.2, 0.4, 0.6, 0.0, 0.1, 0.1, 0.0, 0.0]))
        .with_raster("future_benthic", raster(&[9.0; 8]))
        .with_raster("future_pelagic", raster(&[9.0; 8]))
}

fn users() -> Vec<LayerGroup> {
    vec![
        LayerGroup::new(
            "fisheries",
            vec![VectorLayerRef::new("trawl_grounds").with_field("effort")],
            Vec::new(),
        )
        .expect("fisheries"),
        LayerGroup::new("shipping", vec![VectorLayerRef::new("shipping_lanes")], Vec::new())
            .expect("shipping"),
        LayerGroup::new("wind", Vec::new(), vec![RasterLayerRef::new("wind_speed")])
            .expect("wind"),
    ]
}

fn context(scenario: &str) -> ScenarioContext {
    let sector = LayerGroup::new("fish_value", Vec::new(), vec![RasterLayerRef::new("landings")])
        .expect("sector");
    ScenarioContext::new(
        ScenarioId::new(scenario).expect("id"),
        users(),
        vec![BenefitSector {
            group: sector,
            value_per_unit: 1.0,
        }],
        RiskInputs {
            benthic: format!("{scenario}_benthic"),
            pelagic: format!("{scenario}_pelagic"),
        },
    )
    .expect("context")
}

#[test]
fn baseline_produces_bounded_aligned_indices() {
    let grid = canonical();
    let context = context("baseline");
    let matrix = build_default_matrix(&context.user_names()).expect("matrix");
    let outputs = run_scenario(&context, &store(), &grid, &matrix, &EngineConfig::default())
        .expect("pipeline");

    assert_eq!(outputs.scenario.as_str(), "baseline");
    assert_eq!(outputs.pairs.len(), 3);
    assert_eq!(
        outputs.users.keys().map(String::as_str).collect::<Vec<_>>(),
        ["fisheries", "shipping", "wind"]
    );
    for (kind, raster) in outputs.indices() {
        assert!(raster.grid().is_aligned_with(grid.grid()), "{kind} misaligned");
        assert!(raster.data().iter().all(|v| v.is_finite()), "{kind} has NaN/Inf");
    }
    for component in [&outputs.benefit, &outputs.risk, &outputs.conflict] {
        assert!(component.raster.data().iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(component.provenance.scenario.as_str(), "baseline");
    }
    assert_eq!(outputs.risk.raster.max(), Some(1.0));
    assert_eq!(outputs.benefit.raster.max(), Some(1.0));
    assert_eq!(outputs.performance.floor, 0.01);
    assert_eq!(
        outputs.performance.provenance.formula_version,
        "performance/b-over-rc-floor-v1"
    );

    let b = outputs.benefit.raster.data();
    let r = outputs.risk.raster.data();
    let c = outputs.conflict.raster.data();
    for (i, d) in outputs.performance.raster.data().iter().enumerate() {
        let expected = b[i] / (r[i] * c[i]).max(0.01);
        assert!((d - expected).abs() < 1e-12);
    }
    assert!(outputs.overlaps.is_empty());
}

#[test]
fn keep_intermediate_retains_pair_overlaps() {
    let context = context("baseline");
    let matrix = build_default_matrix(&context.user_names()).expect("matrix");
    let config = EngineConfig {
        keep_intermediate: true,
        ..EngineConfig::default()
    };
    let outputs =
        run_scenario(&context, &store(), &canonical(), &matrix, &config).expect("pipeline");
    assert_eq!(
        outputs.overlaps.keys().map(String::as_str).collect::<Vec<_>>(),
        ["fisheries+shipping", "fisheries+wind", "shipping+wind"]
    );
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let context = context("baseline");
    let matrix = build_default_matrix(&context.user_names()).expect("matrix");
    let sequential = EngineConfig {
        parallel: false,
        ..EngineConfig::default()
    };
    let a = run_scenario(&context, &store(), &canonical(), &matrix, &EngineConfig::default())
        .expect("parallel");
    let b = run_scenario(&context, &store(), &canonical(), &matrix, &sequential)
        .expect("sequential");
    assert_eq!(a.performance.raster, b.performance.raster);
    assert_eq!(a.conflict.raster, b.conflict.raster);
}

#[test]
fn configuration_errors_stop_before_raster_work() {
    let grid = canonical();
    let context = context("baseline");

    let wrong_matrix = build_default_matrix(&["fisheries", "wind"]).expect("matrix");
    let error = run_scenario(&context, &store(), &grid, &wrong_matrix, &EngineConfig::default())
        .expect_err("matrix mismatch");
    assert!(matches!(error, PemError::Matrix { .. }));

    let matrix = build_default_matrix(&context.user_names()).expect("matrix");
    let empty_store = RecordingStore::new(MemoryStore::new());
    let error = run_scenario(&context, &empty_store, &grid, &matrix, &EngineConfig::default())
        .expect_err("missing layers");
    assert!(error.is_configuration());
    assert!(empty_store.requested().is_empty(), "no layer should be read");

    let bad_floor = EngineConfig {
        performance_floor: 0.0,
        ..EngineConfig::default()
    };
    assert!(check_scenario(&context, &store(), &matrix, &bad_floor).is_err());
}

#[test]
fn edited_matrix_changes_conflict_weighting() {
    let context = context("baseline");
    let zero_shipping = "users;fisheries;shipping;wind\n\
                         fisheries;0;0;0\n\
                         shipping;0;0;0\n\
                         wind;1;0;0\n";
    let matrix = load_and_validate_matrix(zero_shipping, &context.user_names()).expect("matrix");
    let outputs = run_scenario(&context, &store(), &canonical(), &matrix, &EngineConfig::default())
        .expect("pipeline");
    let weights: Vec<f64> = outputs.pairs.iter().map(|p| p.pair.weight).collect();
    assert_eq!(weights, [0.0, 1.0, 0.0]);
}

/// Store wrapper that records every layer name requested.
struct RecordingStore {
    inner: MemoryStore,
    requested: Mutex<Vec<String>>,
}

impl RecordingStore {
    fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            requested: Mutex::new(Vec::new()),
        }
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().expect("lock").clone()
    }
}

impl SourceStore for RecordingStore {
    fn manifest(&self) -> &SourceManifest {
        self.inner.manifest()
    }

    fn vector(&self, name: &str) -> pem_core::Result<Arc<VectorLayer>> {
        self.requested.lock().expect("lock").push(name.to_owned());
        self.inner.vector(name)
    }

    fn raster(&self, name: &str) -> pem_core::Result<Arc<Raster>> {
        self.requested.lock().expect("lock").push(name.to_owned());
        self.inner.raster(name)
    }
}

#[test]
fn scenario_runs_never_touch_other_scenarios() {
    let grid = canonical();
    let recording = RecordingStore::new(store());
    let baseline = context("baseline");
    let matrix = build_default_matrix(&baseline.user_names()).expect("matrix");
    let first = run_scenario(&baseline, &recording, &grid, &matrix, &EngineConfig::default())
        .expect("baseline");
    assert!(
        recording.requested().iter().all(|name| !name.starts_with("future")),
        "baseline read {:?}",
        recording.requested()
    );

    // Running "future" in between leaves a later baseline run unchanged.
    let future = context("future");
    run_scenario(&future, &recording, &grid, &matrix, &EngineConfig::default()).expect("future");
    let again = run_scenario(&baseline, &recording, &grid, &matrix, &EngineConfig::default())
        .expect("baseline again");
    assert_eq!(first, again);
}
