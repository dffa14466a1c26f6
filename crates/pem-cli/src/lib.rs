#![forbid(unsafe_code)]

//! The `pem` command-line driver.

pub mod cli;
pub mod compose;
pub mod error;
pub mod hra;
pub mod logging;
pub mod matrix;
pub mod output;
pub mod project;
pub mod run;
pub mod validate;

pub use cli::{Cli, run};
pub use error::{CliError, Result};

/// Parse the process arguments, install logging and run.
///
/// Returns whether JSON output was requested alongside the outcome so the
/// caller can format a failure the same way.
pub fn run_from_env() -> (bool, Result<()>) {
    use clap::Parser;

    let cli = Cli::parse();
    let json = cli.json;
    let outcome = logging::init(cli.log_json).and_then(|()| run(cli));
    (json, outcome)
}
