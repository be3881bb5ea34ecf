//! Error types for enose-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type for enose-core operations
pub type EnoseResult<T> = std::result::Result<T, EnoseError>;

/// Coarse classification of an [`EnoseError`], used by the outer layers to pick
/// a response status without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input; the caller can fix it and retry.
    Validation,
    /// A model failed while scoring.
    Inference,
    /// An index or label outside the trained label set (mismatched artifacts).
    UnknownLabel,
    /// Startup or lazy-load failure.
    ArtifactLoad,
    /// Malformed configuration.
    Config,
}

impl ErrorKind {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Inference => "INFERENCE_ERROR",
            ErrorKind::UnknownLabel => "UNKNOWN_LABEL",
            ErrorKind::ArtifactLoad => "ARTIFACT_LOAD_ERROR",
            ErrorKind::Config => "CONFIG_ERROR",
        }
    }

    /// Whether the fault lies with the caller rather than the deployment
    pub fn is_client_error(&self) -> bool {
        matches!(self, ErrorKind::Validation)
    }
}

/// Failure raised by a single classifier while scoring one input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScoreError {
    #[error("expected {expected} features, got {received}")]
    DimensionMismatch { expected: usize, received: usize },

    #[error("non-finite score at position {0}")]
    NonFinite(usize),

    #[error("corrupt model state: {0}")]
    Corrupt(String),
}

/// enose-core error types
#[derive(Debug, Error)]
pub enum EnoseError {
    #[error("Invalid reading: expected {expected} values, received {received}")]
    Validation { expected: usize, received: usize },

    #[error("Invalid reading: value at position {position} is not finite")]
    NonFiniteInput { position: usize },

    #[error("Shape mismatch: expected {expected}, got {received}")]
    Shape { expected: usize, received: usize },

    #[error("Inference failed in model '{model}': {source}")]
    Inference {
        model: String,
        #[source]
        source: ScoreError,
    },

    #[error("Unknown label index {index} (codec has {classes} classes)")]
    UnknownLabel { index: usize, classes: usize },

    #[error("Unknown category '{0}'")]
    UnknownCategory(String),

    #[error("Failed to load artifact {}: {reason}", path.display())]
    ArtifactLoad { path: PathBuf, reason: String },

    #[error("Inconsistent artifacts: {0}")]
    Inconsistent(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EnoseError {
    /// Classification used at the response boundary
    pub fn kind(&self) -> ErrorKind {
        match self {
            EnoseError::Validation { .. }
            | EnoseError::NonFiniteInput { .. }
            | EnoseError::Shape { .. } => ErrorKind::Validation,
            EnoseError::Inference { .. } => ErrorKind::Inference,
            EnoseError::UnknownLabel { .. } | EnoseError::UnknownCategory(_) => {
                ErrorKind::UnknownLabel
            }
            EnoseError::ArtifactLoad { .. } | EnoseError::Inconsistent(_) => {
                ErrorKind::ArtifactLoad
            }
            EnoseError::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn inference(model: impl Into<String>, source: ScoreError) -> Self {
        EnoseError::Inference {
            model: model.into(),
            source,
        }
    }

    pub(crate) fn artifact(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        EnoseError::ArtifactLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Name of the failing model, for inference errors
    pub fn model(&self) -> Option<&str> {
        match self {
            EnoseError::Inference { model, .. } => Some(model),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for EnoseError {
    fn from(err: toml::de::Error) -> Self {
        EnoseError::Config(err.to_string())
    }
}
