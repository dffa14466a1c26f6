#![forbid(unsafe_code)]

//! Span hierarchy and warning events emitted by a scenario run.
//!
//! Run:
//!   cargo test -p pem-core --test tracing_spans

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use pem_core::{
    CanonicalGrid, Crs, EngineConfig, GeoTransform, LayerGroup, MemoryStore, Raster,
    RasterGrid, RasterLayerRef, RiskInputs, ScenarioContext, ScenarioId, build_default_matrix,
    run_scenario,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

#[derive(Debug, Clone)]
struct CapturedSpan {
    name: String,
    parent: Option<String>,
}

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    parent: Option<String>,
}

#[derive(Default, Clone)]
struct Capture {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S> tracing_subscriber::Layer<S> for Capture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let parent = ctx
            .current_span()
            .id()
            .and_then(|id| ctx.span(id))
            .map(|span| span.name().to_string());
        self.spans.lock().unwrap().push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            parent,
        });
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let parent = ctx
            .current_span()
            .id()
            .and_then(|id| ctx.span(id))
            .map(|span| span.name().to_string());
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            parent,
        });
    }
}

fn with_capture(f: impl FnOnce()) -> Capture {
    let capture = Capture::default();
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::TRACE)
        .with(capture.clone());
    tracing::subscriber::with_default(subscriber, f);
    capture
}

fn run_single_user_scenario() {
    let grid = CanonicalGrid::new(RasterGrid::new(
        Crs::epsg(5641),
        GeoTransform::new(0.0, 10.0, 10.0, 10.0),
        3,
        1,
    ))
    .expect("grid");
    let depth = Raster::from_vec(grid.grid().clone(), vec![1.0, 2.0, 3.0]).expect("raster");
    let store = MemoryStore::new()
        .with_raster("depth", depth)
        .with_raster("benthic", Raster::zeros(grid.grid().clone()))
        .with_raster("pelagic", Raster::zeros(grid.grid().clone()));
    let user = LayerGroup::new("fisheries", Vec::new(), vec![RasterLayerRef::new("depth")])
        .expect("group");
    let context = ScenarioContext::new(
        ScenarioId::new("baseline").expect("id"),
        vec![user],
        Vec::new(),
        RiskInputs {
            benthic: "benthic".to_owned(),
            pelagic: "pelagic".to_owned(),
        },
    )
    .expect("context");
    let matrix = build_default_matrix(&context.user_names()).expect("matrix");
    // Sequential so that every span is entered on this thread.
    let config = EngineConfig {
        parallel: false,
        ..EngineConfig::default()
    };
    run_scenario(&context, &store, &grid, &matrix, &config).expect("pipeline");
}

#[test]
fn component_spans_nest_under_scenario() {
    let capture = with_capture(run_single_user_scenario);
    let spans = capture.spans.lock().unwrap().clone();
    let parents: BTreeMap<String, Option<String>> = spans
        .into_iter()
        .map(|span| (span.name, span.parent))
        .collect();

    assert_eq!(parents.get("scenario"), Some(&None));
    for child in ["resolve_group", "conflict", "risk", "benefit", "performance"] {
        assert_eq!(
            parents.get(child),
            Some(&Some("scenario".to_string())),
            "{child} should be a child of scenario"
        );
    }
}

#[test]
fn fallbacks_emit_warnings_inside_component_spans() {
    let capture = with_capture(run_single_user_scenario);
    let events = capture.events.lock().unwrap().clone();
    let warnings: Vec<Option<String>> = events
        .iter()
        .filter(|event| event.level == tracing::Level::WARN)
        .map(|event| event.parent.clone())
        .collect();

    // One actor, zero risk, no benefit sectors.
    assert!(warnings.contains(&Some("conflict".to_string())));
    assert!(warnings.contains(&Some("risk".to_string())));
    assert!(warnings.contains(&Some("benefit".to_string())));
}
