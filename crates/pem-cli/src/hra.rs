use std::path::PathBuf;

use clap::Args;
use pem_store::hra::InfoRow;
use pem_store::{collect_hra_layers, write_hra_inputs};

use crate::error::Result;
use crate::output::emit;
use crate::project::{EngineArgs, Project, ProjectArgs};

#[derive(Debug, Clone, Args)]
pub struct HraArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Directory receiving stressor and habitat rasters plus `info.csv`.
    #[arg(long)]
    pub out: PathBuf,
}

/// Prepare the external Habitat Risk Assessment inputs for a scenario.
pub fn run_hra_inputs(args: HraArgs, json: bool) -> Result<Vec<InfoRow>> {
    let project = Project::open(&args.project)?;
    let config = args.engine.resolve(&project.plan)?;
    let layers = collect_hra_layers(&project.plan, &project.store, &project.grid, &config)?;
    let rows = write_hra_inputs(&args.out, &layers)?;
    emit(json, &rows, || {
        let mut lines = vec![format!("wrote {} HRA layers to {}", rows.len(), args.out.display())];
        for row in &rows {
            lines.push(format!("  {} {} {}", row.kind.as_str(), row.name, row.path.display()));
        }
        lines.join("\n")
    })?;
    Ok(rows)
}
