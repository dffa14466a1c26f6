#![forbid(unsafe_code)]

//! Spatial index computation engine for marine spatial planning.
//!
//! Computes, per scenario and on one canonical grid, a Benefit Index (B), a
//! Risk Index (R), a Conflict Index (C) and the Performance Index
//! `D = B / max(R × C, floor)`.
//!
//! The crate is pure: data arrives through a [`SourceStore`] and results are
//! returned as values. File formats and publication live in `pem-store`.
//!
//! ```rust,ignore
//! let matrix = load_and_validate_matrix(&table, &context.user_names())?;
//! let outputs = run_scenario(&context, &store, &grid, &matrix, &EngineConfig::default())?;
//! ```

pub mod benefit;
pub mod config;
pub mod conflict;
pub mod diagnostics;
pub mod error;
pub mod grid;
pub mod group;
pub mod index;
pub mod matrix;
pub mod normalize;
pub mod performance;
pub mod pipeline;
pub mod raster;
pub mod resample;
pub mod risk;
pub mod scenario;
pub mod source;
pub mod vector;

pub use config::{DEFAULT_PERFORMANCE_FLOOR, EngineConfig, ResamplingMethod};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{PemError, Result};
pub use grid::{CanonicalGrid, Crs, Extent, GeoTransform, RasterGrid};
pub use group::{GroupDefinition, LayerGroup, RasterLayerRef, VectorLayerRef};
pub use index::{ComponentIndex, IndexKind, PerformanceIndex, Provenance};
pub use matrix::{ActorPair, ConflictMatrix, build_default_matrix, load_and_validate_matrix};
pub use normalize::Normalization;
pub use pipeline::{ScenarioOutputs, check_scenario, run_scenario};
pub use raster::{Raster, RasterStats};
pub use scenario::{BenefitSector, RiskInputs, ScenarioContext, ScenarioId};
pub use source::{MemoryStore, SourceManifest, SourceStore};
pub use vector::{Burn, Feature, Geometry, VectorLayer};
