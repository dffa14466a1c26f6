//! Recoverable numeric edge cases collected during a run.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::normalize::Normalization;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A min–max normalization saw a constant raster.
    ZeroVariance,
    /// A normalization had no usable denominator (zero max, zero total, or
    /// no finite cells).
    Degenerate,
    /// Fewer than two actors; the conflict index is all zero.
    TooFewActors,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// What was being computed, e.g. `user 'fisheries' / vector 'trawl'`.
    pub subject: String,
    pub message: String,
}

/// Ordered diagnostic sink. Every push is also logged at `warn`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            kind,
            subject: subject.into(),
            message: message.into(),
        };
        warn!(
            kind = ?diagnostic.kind,
            subject = %diagnostic.subject,
            "{}",
            diagnostic.message
        );
        self.0.push(diagnostic);
    }

    /// Record a normalization outcome if it fell back to zeros.
    pub fn note(&mut self, subject: impl Into<String>, outcome: Normalization) {
        match outcome {
            Normalization::Scaled { .. } => {}
            Normalization::ZeroVariance { value } => self.push(
                DiagnosticKind::ZeroVariance,
                subject,
                format!("constant raster (value {value}) normalized to all zero"),
            ),
            Normalization::Degenerate => self.push(
                DiagnosticKind::Degenerate,
                subject,
                "no usable denominator; normalized to all zero",
            ),
        }
    }

    /// Append without logging again.
    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}
