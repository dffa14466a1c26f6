use thiserror::Error;

pub type Result<T> = std::result::Result<T, PemError>;

/// Fatal engine errors.
///
/// Numeric edge cases (zero variance, zero maximum) are not errors: they
/// resolve to documented fallback rasters and surface as
/// [`Diagnostic`](crate::diagnostics::Diagnostic)s instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PemError {
    /// Invalid group, layer reference, weight or field, detected before any
    /// raster work starts.
    #[error("configuration error in {context}: {message}")]
    Configuration { context: String, message: String },

    /// A layer cannot be brought onto the canonical grid.
    #[error("alignment error for layer {layer}: {message}")]
    Alignment { layer: String, message: String },

    /// Conflict matrix shape, actor set or value violations.
    #[error("conflict matrix error: {message}")]
    Matrix { message: String },
}

impl PemError {
    #[must_use]
    pub fn configuration(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            context: context.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn alignment(layer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Alignment {
            layer: layer.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn matrix(message: impl Into<String>) -> Self {
        Self::Matrix {
            message: message.into(),
        }
    }

    /// True for errors that are raised before any computation and fail the
    /// whole scenario run.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Matrix { .. })
    }

    #[must_use]
    pub fn is_alignment(&self) -> bool {
        matches!(self, Self::Alignment { .. })
    }
}
