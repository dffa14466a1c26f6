#![forbid(unsafe_code)]

//! File-backed sources and publication for `pem-core`.
//!
//! - [`ascii_grid`]: ESRI ASCII rasters with `.prj` CRS sidecars.
//! - [`geojson`]: vector layers.
//! - [`matrix_table`]: conflict matrix tables.
//! - [`plan`]: scenario plans and engine config files.
//! - [`directory_store`]: a [`pem_core::SourceStore`] over a project tree.
//! - [`publish`]: staged, atomic output publication with `run_meta.json`.
//! - [`hra`]: inputs for the external Habitat Risk Assessment engine.

pub mod ascii_grid;
pub mod directory_store;
pub mod error;
pub mod geojson;
pub mod hra;
pub mod layout;
pub mod matrix_table;
pub mod plan;
pub mod publish;
pub mod runmeta;
pub mod util;

pub use ascii_grid::{read_ascii_grid, write_ascii_grid};
pub use directory_store::{DirectoryStore, read_canonical_grid};
pub use error::{Result, StoreError};
pub use geojson::read_geojson;
pub use hra::{collect_hra_layers, write_hra_inputs};
pub use layout::ProjectLayout;
pub use matrix_table::{read_matrix, write_matrix};
pub use plan::{ScenarioPlan, load_engine_config};
pub use publish::{StagingDir, publish_scenario};
pub use runmeta::RunMeta;
