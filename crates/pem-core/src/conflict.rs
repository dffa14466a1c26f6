//! Conflict Matrix Engine: weighted pairwise overlap across actors.
//!
//! For every unordered actor pair the two actor rasters are multiplied, the
//! overlap is min–max normalized and scaled by the pair's matrix weight.
//! The weighted overlaps are summed in canonical pair order and the sum is
//! min–max normalized into the Conflict Index.
//!
//! Two actors with identical constant footprints produce a constant overlap,
//! which normalizes to zero: the Conflict Index is then all zero. This is
//! the zero-variance fallback, not a defect.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info_span};

use crate::config::EngineConfig;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{PemError, Result};
use crate::grid::CanonicalGrid;
use crate::matrix::{ActorPair, ConflictMatrix};
use crate::normalize::{Normalization, normalize_min_max};
use crate::raster::Raster;

/// Per-pair bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairEvaluation {
    pub pair: ActorPair,
    pub normalization: Normalization,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConflictOutcome {
    pub index: Raster,
    /// Canonical pair order.
    pub pairs: Vec<PairEvaluation>,
    /// Raw overlaps keyed by pair label, only when intermediates are kept.
    pub overlaps: BTreeMap<String, Raster>,
    pub diagnostics: Diagnostics,
}

struct PairResult {
    evaluation: PairEvaluation,
    normalized: Raster,
    raw: Option<Raster>,
}

fn evaluate_pair(
    pair: ActorPair,
    first: &Raster,
    second: &Raster,
    keep_raw: bool,
) -> Result<PairResult> {
    let overlap = first.mul(second)?;
    let (normalized, normalization) = normalize_min_max(&overlap);
    debug!(pair = %pair.label(), weight = pair.weight, ?normalization, "pair overlap");
    Ok(PairResult {
        evaluation: PairEvaluation {
            pair,
            normalization,
        },
        normalized,
        raw: keep_raw.then_some(overlap),
    })
}

/// Compute the Conflict Index from resolved actor rasters.
///
/// The actor names must be exactly the matrix's actors. Fewer than two
/// actors yields the all-zero raster and a diagnostic.
pub fn compute_conflict(
    actors: &BTreeMap<String, Raster>,
    matrix: &ConflictMatrix,
    grid: &CanonicalGrid,
    config: &EngineConfig,
) -> Result<ConflictOutcome> {
    let span = info_span!("conflict", actors = actors.len());
    let _guard = span.enter();

    if !actors.keys().eq(matrix.actors().iter()) {
        let names: Vec<&str> = actors.keys().map(String::as_str).collect();
        return Err(PemError::matrix(format!(
            "matrix actors [{}] do not match scenario actors [{}]",
            matrix.actors().join(", "),
            names.join(", ")
        )));
    }
    for (name, raster) in actors {
        if !raster.grid().is_aligned_with(grid.grid()) {
            return Err(PemError::alignment(
                name,
                "actor raster is not on the canonical grid",
            ));
        }
    }

    let mut diagnostics = Diagnostics::new();
    if actors.len() < 2 {
        diagnostics.push(
            DiagnosticKind::TooFewActors,
            "conflict",
            format!(
                "{} actor(s): no pairs to evaluate, conflict index is all zero",
                actors.len()
            ),
        );
        return Ok(ConflictOutcome {
            index: Raster::zeros(grid.grid().clone()),
            pairs: Vec::new(),
            overlaps: BTreeMap::new(),
            diagnostics,
        });
    }

    let pairs = matrix.pairs();
    let keep_raw = config.keep_intermediate;
    let lookup = |name: &str| {
        actors
            .get(name)
            .ok_or_else(|| PemError::matrix(format!("actor '{name}' has no raster")))
    };
    let run = |pair: ActorPair| -> Result<PairResult> {
        let first = lookup(&pair.first)?;
        let second = lookup(&pair.second)?;
        evaluate_pair(pair, first, second, keep_raw)
    };

    #[cfg(feature = "parallel")]
    let results: Result<Vec<PairResult>> = if config.parallel {
        use rayon::prelude::*;
        pairs.into_par_iter().map(run).collect()
    } else {
        pairs.into_iter().map(run).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let results: Result<Vec<PairResult>> = pairs.into_iter().map(run).collect();
    let results = results?;

    // Reduce sequentially in canonical order so the sum does not depend on
    // scheduling.
    let mut raw_sum = Raster::zeros(grid.grid().clone());
    let mut evaluations = Vec::with_capacity(results.len());
    let mut overlaps = BTreeMap::new();
    for result in results {
        let label = result.evaluation.pair.label();
        raw_sum.add_scaled(&result.normalized, result.evaluation.pair.weight)?;
        diagnostics.note(
            format!("conflict pair {label}"),
            result.evaluation.normalization,
        );
        if let Some(raw) = result.raw {
            overlaps.insert(label, raw);
        }
        evaluations.push(result.evaluation);
    }

    let (index, outcome) = normalize_min_max(&raw_sum);
    diagnostics.note("conflict index", outcome);

    Ok(ConflictOutcome {
        index,
        pairs: evaluations,
        overlaps,
        diagnostics,
    })
}
