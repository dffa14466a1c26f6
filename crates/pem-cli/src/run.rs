use clap::Args;
use pem_core::run_scenario;
use pem_store::util::now_utc;
use pem_store::{RunMeta, publish_scenario, read_matrix};
use tracing::info;

use crate::error::Result;
use crate::output::emit;
use crate::project::{EngineArgs, Project, ProjectArgs};

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Full pipeline for one scenario, published atomically.
pub fn run_scenario_command(args: RunArgs, json: bool) -> Result<RunMeta> {
    let project = Project::open(&args.project)?;
    let config = args.engine.resolve(&project.plan)?;
    let matrix = read_matrix(&project.matrix_path(), &project.context.user_names())?;

    let started = now_utc();
    let outputs = run_scenario(&project.context, &project.store, &project.grid, &matrix, &config)?;
    let meta = publish_scenario(&project.layout, &outputs, &project.grid, &config, started)?;
    info!(scenario = %meta.scenario, diagnostics = meta.diagnostics.len(), "run finished");

    let dir = project.layout.scenario_outputs(project.context.id());
    emit(json, &meta, || {
        let mut lines = vec![format!(
            "published scenario '{}' to {} ({} files, {} pairs)",
            meta.scenario,
            dir.display(),
            meta.outputs.len(),
            meta.pairs.len()
        )];
        for diagnostic in &meta.diagnostics {
            lines.push(format!("  warning: {}: {}", diagnostic.subject, diagnostic.message));
        }
        lines.join("\n")
    })?;
    Ok(meta)
}
