use std::path::PathBuf;

use clap::Args;
use pem_core::check_scenario;
use pem_store::{ScenarioPlan, read_matrix};
use serde::Serialize;

use crate::error::Result;
use crate::output::emit;
use crate::project::{EngineArgs, Project, ProjectArgs};

#[derive(Debug, Clone, Args)]
pub struct ValidateArgs {
    /// Scenario plan (TOML).
    #[arg(long)]
    pub plan: PathBuf,

    /// Also check sources and the conflict matrix in this project.
    #[arg(long)]
    pub project: Option<PathBuf>,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub scenario: String,
    pub users: Vec<String>,
    pub sectors: Vec<String>,
    /// False when only the plan itself was checked.
    pub project_checked: bool,
}

/// Configuration checks only; no raster is read.
pub fn run_validate(args: ValidateArgs, json: bool) -> Result<ValidationReport> {
    let plan = ScenarioPlan::from_path(&args.plan)?;
    let context = plan.to_context()?;
    let config = args.engine.resolve(&plan)?;

    if let Some(project) = &args.project {
        let project = Project::open(&ProjectArgs {
            project: project.clone(),
            plan: args.plan.clone(),
        })?;
        let matrix = read_matrix(&project.matrix_path(), &context.user_names())?;
        check_scenario(&context, &project.store, &matrix, &config)?;
    }

    let report = ValidationReport {
        scenario: context.id().to_string(),
        users: context.user_names().into_iter().map(str::to_owned).collect(),
        sectors: context
            .benefit()
            .iter()
            .map(|sector| sector.group.name().to_owned())
            .collect(),
        project_checked: args.project.is_some(),
    };
    emit(json, &report, || {
        format!(
            "scenario '{}' is valid: {} users, {} benefit sectors{}",
            report.scenario,
            report.users.len(),
            report.sectors.len(),
            if report.project_checked { ", sources and matrix checked" } else { "" }
        )
    })?;
    Ok(report)
}
