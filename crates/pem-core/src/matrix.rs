//! Conflict weight matrix over named actors.
//!
//! Only the lower triangle is authoritative. Reading a weight always goes
//! through the lower triangle, so the effective matrix is symmetric no
//! matter what the upper triangle holds, and the diagonal is zero.
//!
//! The table form is `;`-separated with a `users` header cell:
//!
//! ```text
//! users;fisheries;shipping;wind
//! fisheries;0;0;0
//! shipping;1;0;0
//! wind;1;1;0
//! ```

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::Serialize;

use crate::error::{PemError, Result};
use crate::group::is_valid_name;

/// Header cell naming the actor axis.
pub const MATRIX_INDEX_HEADER: &str = "users";

const SEPARATOR: char = ';';

/// Validated square matrix with actors in canonical (sorted) order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConflictMatrix {
    actors: Vec<String>,
    /// Row-major `n × n`, as authored (after reordering to canonical order).
    cells: Vec<f64>,
}

/// One unordered actor pair, `first < second` by name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActorPair {
    pub first: String,
    pub second: String,
    pub weight: f64,
}

impl ActorPair {
    /// `first+second`, used to key and name intermediate rasters. Actor
    /// names cannot contain `+`, so distinct pairs never share a label.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}+{}", self.first, self.second)
    }
}

/// Index pairs `(i, j)` with `i < j`, each unordered pair exactly once.
#[must_use]
pub fn actor_pairs(n: usize) -> Vec<(usize, usize)> {
    let mut pairs = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            pairs.push((i, j));
        }
    }
    pairs
}

fn canonical_actors<S: AsRef<str>>(actors: &[S]) -> Result<Vec<String>> {
    let mut sorted: Vec<String> = actors.iter().map(|a| a.as_ref().trim().to_owned()).collect();
    if let Some(blank) = sorted.iter().position(String::is_empty) {
        return Err(PemError::matrix(format!("actor #{} has an empty name", blank + 1)));
    }
    if let Some(bad) = sorted.iter().find(|name| !is_valid_name(name)) {
        return Err(PemError::matrix(format!(
            "actor '{bad}' is not a valid name (use letters, digits, '_' or '-')"
        )));
    }
    sorted.sort();
    if let Some(dup) = sorted.windows(2).find(|w| w[0] == w[1]) {
        return Err(PemError::matrix(format!("actor '{}' is listed twice", dup[0])));
    }
    Ok(sorted)
}

/// Default matrix: 1 below the diagonal, 0 on and above it.
pub fn build_default_matrix<S: AsRef<str>>(actors: &[S]) -> Result<ConflictMatrix> {
    let actors = canonical_actors(actors)?;
    let n = actors.len();
    let mut cells = vec![0.0; n * n];
    for (i, j) in actor_pairs(n) {
        cells[j * n + i] = 1.0;
    }
    Ok(ConflictMatrix { actors, cells })
}

/// Parse a matrix table and check it against the expected actor set.
///
/// Rows may come in any order consistent with the header; the result is
/// reordered canonically, keeping each pair's lower-triangle weight as
/// authored in the table.
pub fn load_and_validate_matrix<S: AsRef<str>>(source: &str, expected: &[S]) -> Result<ConflictMatrix> {
    let expected = canonical_actors(expected)?;
    let mut lines = source
        .lines()
        .enumerate()
        .map(|(number, line)| (number + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((_, header)) = lines.next() else {
        return Err(PemError::matrix("table is empty"));
    };
    let mut header_cells = header.split(SEPARATOR).map(str::trim);
    let index = header_cells.next().unwrap_or_default();
    if index != MATRIX_INDEX_HEADER {
        return Err(PemError::matrix(format!(
            "first header cell must be '{MATRIX_INDEX_HEADER}', found '{index}'"
        )));
    }
    let table_actors: Vec<String> = header_cells.map(str::to_owned).collect();
    let n = table_actors.len();
    let ordered = canonical_actors(&table_actors)?;

    if ordered != expected {
        let have: BTreeSet<_> = ordered.iter().collect();
        let want: BTreeSet<_> = expected.iter().collect();
        let missing: Vec<_> = want.difference(&have).map(|s| s.as_str()).collect();
        let extra: Vec<_> = have.difference(&want).map(|s| s.as_str()).collect();
        return Err(PemError::matrix(format!(
            "actor set mismatch: missing [{}], unexpected [{}]",
            missing.join(", "),
            extra.join(", ")
        )));
    }

    let mut authored = vec![0.0; n * n];
    let mut rows = 0_usize;
    for (line_no, line) in lines {
        if rows == n {
            return Err(PemError::matrix(format!(
                "line {line_no}: more rows than the {n} header actors"
            )));
        }
        let cells: Vec<&str> = line.split(SEPARATOR).map(str::trim).collect();
        if cells.len() != n + 1 {
            return Err(PemError::matrix(format!(
                "line {line_no}: expected {} cells, found {}",
                n + 1,
                cells.len()
            )));
        }
        let row_actor = cells[0];
        if row_actor != table_actors[rows] {
            return Err(PemError::matrix(format!(
                "line {line_no}: row '{row_actor}' does not match header column '{}'",
                table_actors[rows]
            )));
        }
        for (col, raw) in cells[1..].iter().enumerate().take(rows) {
            let weight: f64 = raw.parse().map_err(|_| {
                PemError::matrix(format!(
                    "line {line_no}: weight '{raw}' for ({row_actor}, {}) is not a number",
                    table_actors[col]
                ))
            })?;
            if !weight.is_finite() || weight < 0.0 {
                return Err(PemError::matrix(format!(
                    "line {line_no}: weight {weight} for ({row_actor}, {}) must be finite and >= 0",
                    table_actors[col]
                )));
            }
            authored[rows * n + col] = weight;
        }
        rows += 1;
    }
    if rows != n {
        return Err(PemError::matrix(format!(
            "table is not square: {n} header actors but {rows} rows"
        )));
    }

    let position = |name: &str| table_actors.iter().position(|a| a == name).unwrap_or(0);
    let mut cells = vec![0.0; n * n];
    for (i, j) in actor_pairs(n) {
        let (a, b) = (position(&expected[i]), position(&expected[j]));
        let (row, col) = if a > b { (a, b) } else { (b, a) };
        cells[j * n + i] = authored[row * n + col];
    }
    Ok(ConflictMatrix {
        actors: expected,
        cells,
    })
}

impl ConflictMatrix {
    #[must_use]
    pub fn actors(&self) -> &[String] {
        &self.actors
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    #[must_use]
    pub fn index_of(&self, actor: &str) -> Option<usize> {
        self.actors.binary_search_by(|a| a.as_str().cmp(actor)).ok()
    }

    /// Effective weight between two actor indices: lower triangle, mirrored.
    #[must_use]
    pub fn weight_at(&self, i: usize, j: usize) -> f64 {
        let n = self.len();
        if i == j || i >= n || j >= n {
            return 0.0;
        }
        let (row, col) = if i > j { (i, j) } else { (j, i) };
        self.cells[row * n + col]
    }

    #[must_use]
    pub fn weight(&self, a: &str, b: &str) -> Option<f64> {
        Some(self.weight_at(self.index_of(a)?, self.index_of(b)?))
    }

    /// Symmetric `n × n` matrix with a zero diagonal.
    #[must_use]
    pub fn mirrored(&self) -> Vec<Vec<f64>> {
        let n = self.len();
        (0..n)
            .map(|i| (0..n).map(|j| self.weight_at(i, j)).collect())
            .collect()
    }

    /// All unordered pairs in canonical order with their weights.
    #[must_use]
    pub fn pairs(&self) -> Vec<ActorPair> {
        actor_pairs(self.len())
            .into_iter()
            .map(|(i, j)| ActorPair {
                first: self.actors[i].clone(),
                second: self.actors[j].clone(),
                weight: self.weight_at(i, j),
            })
            .collect()
    }

    /// Table text with the lower triangle filled and zeros elsewhere.
    #[must_use]
    pub fn to_table_string(&self) -> String {
        let n = self.len();
        let mut out = String::from(MATRIX_INDEX_HEADER);
        for actor in &self.actors {
            out.push(SEPARATOR);
            out.push_str(actor);
        }
        out.push('\n');
        for (i, actor) in self.actors.iter().enumerate() {
            out.push_str(actor);
            for j in 0..n {
                let value = if j < i { self.cells[i * n + j] } else { 0.0 };
                let _ = write!(out, "{SEPARATOR}{value}");
            }
            out.push('\n');
        }
        out
    }
}
