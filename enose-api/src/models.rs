//! Data models for API requests and responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use enose_core::{EnsembleResult, ModelSummary};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request Models
// ============================================================================

/// Request body for `POST /predict`
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    /// One raw value per configured channel, in channel order
    pub input_data: Vec<f64>,
}

// ============================================================================
// Response Models
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the operation succeeded
    pub success: bool,

    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    /// Error information (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(error: ApiError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

/// Error information in API responses
#[derive(Debug, Serialize)]
pub struct ApiError {
    /// Error code (e.g., "VALIDATION_ERROR", "UNKNOWN_LABEL")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Helpful suggestion for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

/// An error response: status plus structured body
#[derive(Debug)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub error: ApiError,
}

impl ApiFailure {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            error: ApiError {
                code: code.to_string(),
                message: message.into(),
                help: None,
            },
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.error.help = Some(help.into());
        self
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::error(self.error))).into_response()
    }
}

/// Prediction with request metadata
#[derive(Debug, Serialize)]
pub struct PredictResult {
    /// `input_data` and `predictions`, keyed by masked model name
    #[serde(flatten)]
    pub result: EnsembleResult,

    pub metadata: PredictMetadata,
}

#[derive(Debug, Serialize)]
pub struct PredictMetadata {
    /// RFC 3339 time the prediction was made
    pub timestamp: String,

    /// Masked channel names, in `input_data` order
    pub sensor_names: Vec<String>,

    pub n_features: usize,
}

/// Loaded models, masked
#[derive(Debug, Serialize)]
pub struct ModelsResult {
    pub models: Vec<ModelSummary>,

    /// Category names in class-index order
    pub labels: Vec<String>,
}

/// Masked channel layout
#[derive(Debug, Serialize)]
pub struct SensorsResult {
    pub sensors: Vec<String>,
    pub count: usize,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub version: &'static str,

    /// Whether the artifacts have been loaded yet
    pub pipeline_loaded: bool,

    pub uptime_secs: u64,
}
