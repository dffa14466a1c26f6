use std::path::PathBuf;

use clap::{Args, Subcommand};
use pem_core::{ActorPair, build_default_matrix};
use pem_store::{ProjectLayout, ScenarioPlan, read_matrix, write_matrix};
use serde::Serialize;

use crate::error::Result;
use crate::output::emit;
use crate::project::ProjectArgs;

#[derive(Debug, Clone, Subcommand)]
pub enum MatrixCommand {
    /// Write the default matrix (1 below the diagonal) for the plan's users.
    Init(MatrixInitArgs),

    /// Load the scenario's matrix and check it against the plan's users.
    Check(ProjectArgs),
}

#[derive(Debug, Clone, Args)]
pub struct MatrixInitArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Replace an existing table.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct MatrixSummary {
    pub path: PathBuf,
    pub actors: Vec<String>,
    pub pairs: Vec<ActorPair>,
}

impl MatrixSummary {
    fn human(&self, verb: &str) -> String {
        let mut lines = vec![format!(
            "{verb} {} ({} actors, {} pairs)",
            self.path.display(),
            self.actors.len(),
            self.pairs.len()
        )];
        for pair in &self.pairs {
            lines.push(format!("  {} x {}: {}", pair.first, pair.second, pair.weight));
        }
        lines.join("\n")
    }
}

pub fn run_matrix(command: MatrixCommand, json: bool) -> Result<MatrixSummary> {
    match command {
        MatrixCommand::Init(args) => {
            let (path, users) = scenario_matrix(&args.project)?;
            let matrix = build_default_matrix(&users)?;
            write_matrix(&path, &matrix, args.force)?;
            let summary = MatrixSummary {
                path,
                actors: matrix.actors().to_vec(),
                pairs: matrix.pairs(),
            };
            emit(json, &summary, || summary.human("wrote"))?;
            Ok(summary)
        }
        MatrixCommand::Check(args) => {
            let (path, users) = scenario_matrix(&args)?;
            let matrix = read_matrix(&path, &users)?;
            let summary = MatrixSummary {
                path,
                actors: matrix.actors().to_vec(),
                pairs: matrix.pairs(),
            };
            emit(json, &summary, || summary.human("valid"))?;
            Ok(summary)
        }
    }
}

/// Matrix path and user names, from the plan alone.
fn scenario_matrix(args: &ProjectArgs) -> Result<(PathBuf, Vec<String>)> {
    let plan = ScenarioPlan::from_path(&args.plan)?;
    let context = plan.to_context()?;
    let layout = ProjectLayout::new(&args.project);
    let users = context.user_names().into_iter().map(str::to_owned).collect();
    Ok((layout.conflict_matrix(context.id()), users))
}
