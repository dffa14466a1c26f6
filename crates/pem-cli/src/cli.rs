use clap::{Parser, Subcommand};

use crate::compose::{ComposeArgs, run_compose};
use crate::error::Result;
use crate::hra::{HraArgs, run_hra_inputs};
use crate::matrix::{MatrixCommand, run_matrix};
use crate::run::{RunArgs, run_scenario_command};
use crate::validate::{ValidateArgs, run_validate};

#[derive(Debug, Parser)]
#[command(
    name = "pem",
    about = "Benefit, risk, conflict and performance indices for marine spatial planning scenarios",
    version
)]
pub struct Cli {
    /// Print results and errors as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Emit log lines as JSON on stderr.
    #[arg(long = "log-json", global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compute and publish all indices for one scenario.
    Run(RunArgs),

    /// Compose a Performance Index from existing B, R and C rasters.
    Compose(ComposeArgs),

    /// Create or check a scenario's conflict matrix.
    #[command(subcommand)]
    Matrix(MatrixCommand),

    /// Prepare inputs for the external Habitat Risk Assessment engine.
    #[command(name = "hra-inputs")]
    HraInputs(HraArgs),

    /// Check a plan (and optionally its project) without computing.
    Validate(ValidateArgs),
}

pub fn run(cli: Cli) -> Result<()> {
    let json = cli.json;
    match cli.command {
        Commands::Run(args) => run_scenario_command(args, json).map(drop),
        Commands::Compose(args) => run_compose(args, json).map(drop),
        Commands::Matrix(command) => run_matrix(command, json).map(drop),
        Commands::HraInputs(args) => run_hra_inputs(args, json).map(drop),
        Commands::Validate(args) => run_validate(args, json).map(drop),
    }
}
