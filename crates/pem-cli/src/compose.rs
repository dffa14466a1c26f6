use std::path::PathBuf;

use clap::Args;
use pem_core::DEFAULT_PERFORMANCE_FLOOR;
use pem_core::performance::compose_performance;
use pem_store::{read_ascii_grid, write_ascii_grid};
use serde::Serialize;

use crate::error::{CliError, Result};
use crate::output::emit;

#[derive(Debug, Clone, Args)]
pub struct ComposeArgs {
    /// Benefit Index raster.
    #[arg(long)]
    pub benefit: PathBuf,

    /// Risk Index raster.
    #[arg(long)]
    pub risk: PathBuf,

    /// Conflict Index raster.
    #[arg(long)]
    pub conflict: PathBuf,

    /// Output Performance Index raster.
    #[arg(long)]
    pub out: PathBuf,

    #[arg(long, default_value_t = DEFAULT_PERFORMANCE_FLOOR)]
    pub floor: f64,
}

#[derive(Debug, Serialize)]
pub struct ComposeSummary {
    pub out: PathBuf,
    pub floor: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// `D = B / max(R × C, floor)` over existing, aligned rasters.
pub fn run_compose(args: ComposeArgs, json: bool) -> Result<ComposeSummary> {
    if !args.floor.is_finite() || args.floor <= 0.0 {
        return Err(CliError::invalid(format!(
            "--floor must be finite and > 0, got {}",
            args.floor
        )));
    }
    let benefit = read_ascii_grid(&args.benefit)?;
    let risk = read_ascii_grid(&args.risk)?;
    let conflict = read_ascii_grid(&args.conflict)?;
    let performance = compose_performance(&benefit, &risk, &conflict, args.floor)?;
    write_ascii_grid(&args.out, &performance)?;

    let summary = ComposeSummary {
        out: args.out,
        floor: args.floor,
        min: performance.min(),
        max: performance.max(),
    };
    emit(json, &summary, || {
        format!(
            "wrote {} (floor {}, range {:?}..{:?})",
            summary.out.display(),
            summary.floor,
            summary.min.unwrap_or(0.0),
            summary.max.unwrap_or(0.0)
        )
    })?;
    Ok(summary)
}
