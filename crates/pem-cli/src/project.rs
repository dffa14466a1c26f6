//! Arguments and loading shared by the project-level commands.

use std::path::PathBuf;

use clap::Args;
use pem_core::{CanonicalGrid, EngineConfig, ResamplingMethod, ScenarioContext};
use pem_store::{
    DirectoryStore, ProjectLayout, ScenarioPlan, load_engine_config, read_canonical_grid,
};
use tracing::debug;

use crate::error::{CliError, Result};

#[derive(Debug, Clone, Args)]
pub struct ProjectArgs {
    /// Project root holding `inputs/` and `outputs/`.
    #[arg(long, default_value = ".")]
    pub project: PathBuf,

    /// Scenario plan (TOML).
    #[arg(long)]
    pub plan: PathBuf,
}

/// Command-line overrides applied on top of the plan's `[engine]` table.
#[derive(Debug, Clone, Default, Args)]
pub struct EngineArgs {
    /// Engine config file (.toml or .json) replacing the plan's `[engine]` table.
    #[arg(long = "engine-config")]
    pub engine_config: Option<PathBuf>,

    /// Minimum for R × C when composing D.
    #[arg(long)]
    pub floor: Option<f64>,

    /// Resampling for raster sources: nearest or bilinear.
    #[arg(long)]
    pub resampling: Option<ResamplingMethod>,

    /// Also publish per-pair overlap rasters.
    #[arg(long = "keep-intermediate")]
    pub keep_intermediate: bool,

    /// Disable the worker pool.
    #[arg(long)]
    pub sequential: bool,
}

impl EngineArgs {
    pub fn resolve(&self, plan: &ScenarioPlan) -> Result<EngineConfig> {
        let mut config = match &self.engine_config {
            Some(path) => load_engine_config(path)?,
            None => plan.engine_config(),
        };
        if let Some(floor) = self.floor {
            config.performance_floor = floor;
        }
        if let Some(method) = self.resampling {
            config.resampling = method;
        }
        if self.keep_intermediate {
            config.keep_intermediate = true;
        }
        if self.sequential {
            config.parallel = false;
        }
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(CliError::invalid(errors.join("; ")));
        }
        debug!(?config, "resolved engine config");
        Ok(config)
    }
}

/// A plan loaded against its project directory.
pub struct Project {
    pub layout: ProjectLayout,
    pub plan: ScenarioPlan,
    pub context: ScenarioContext,
    pub grid: CanonicalGrid,
    pub store: DirectoryStore,
}

impl Project {
    pub fn open(args: &ProjectArgs) -> Result<Self> {
        let plan = ScenarioPlan::from_path(&args.plan)?;
        let context = plan.to_context()?;
        let layout = ProjectLayout::new(&args.project);
        let grid = read_canonical_grid(&layout)?;
        let fallback = plan.assume_canonical_crs.then(|| grid.crs().clone());
        let store = DirectoryStore::open(&layout, context.id(), fallback.as_ref())?;
        Ok(Self {
            layout,
            plan,
            context,
            grid,
            store,
        })
    }

    #[must_use]
    pub fn matrix_path(&self) -> PathBuf {
        self.layout.conflict_matrix(self.context.id())
    }
}
