//! Request handlers for API endpoints

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use enose_core::{EnoseError, ErrorKind, PredictionOrchestrator, SensorReading};
use tokio::task::JoinError;

use crate::models::*;
use crate::routes::AppState;

/// HTTP status for each error class
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Inference | ErrorKind::UnknownLabel => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::ArtifactLoad | ErrorKind::Config => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Convert a pipeline error to an API error
impl From<EnoseError> for ApiFailure {
    fn from(err: EnoseError) -> Self {
        let kind = err.kind();
        let help = match &err {
            EnoseError::Validation { expected, .. } => {
                Some(format!("Send exactly {} values in input_data", expected))
            }
            EnoseError::NonFiniteInput { .. } => {
                Some("Every value must be a finite number".to_string())
            }
            EnoseError::UnknownLabel { .. } | EnoseError::UnknownCategory(_) => {
                Some("The label artifact does not match the deployed models".to_string())
            }
            EnoseError::ArtifactLoad { .. } | EnoseError::Inconsistent(_) => {
                Some("Model artifacts are unavailable; retry once they are fixed".to_string())
            }
            _ => None,
        };

        let failure = ApiFailure::new(status_for(kind), kind.code(), err.to_string());
        match help {
            Some(help) => failure.with_help(help),
            None => failure,
        }
    }
}

fn join_failure(err: JoinError) -> ApiFailure {
    ApiFailure::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        format!("Worker task failed: {}", err),
    )
}

fn log_failure(route: &str, failure: &ApiFailure) {
    if failure.status.is_server_error() {
        tracing::error!(route, code = %failure.error.code, "{}", failure.error.message);
    } else {
        tracing::debug!(route, code = %failure.error.code, "{}", failure.error.message);
    }
}

/// The loaded pipeline, loading it on the blocking pool if needed
async fn pipeline(state: &AppState) -> Result<Arc<PredictionOrchestrator>, ApiFailure> {
    if let Some(pipeline) = state.cell.loaded() {
        return Ok(pipeline);
    }

    let cell = state.cell.clone();
    let pipeline = tokio::task::spawn_blocking(move || cell.get())
        .await
        .map_err(join_failure)??;
    Ok(pipeline)
}

// ============================================================================
// Handler Functions
// ============================================================================

/// Classify one sensor reading
pub async fn predict_handler(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<PredictResult>>, ApiFailure> {
    let Json(req) = payload.map_err(|rejection| {
        ApiFailure::new(
            StatusCode::BAD_REQUEST,
            ErrorKind::Validation.code(),
            rejection.body_text(),
        )
        .with_help(r#"Expected a JSON body like {"input_data": [1.0, 2.0, ...]}"#)
    })?;

    let cell = state.cell.clone();
    let reading = SensorReading::new(req.input_data);
    let outcome = tokio::task::spawn_blocking(move || {
        let pipeline = cell.get()?;
        let result = pipeline.run(&reading)?;
        Ok::<_, EnoseError>((result, pipeline.masked_channels()))
    })
    .await
    .map_err(join_failure)
    .and_then(|r| r.map_err(ApiFailure::from));

    let (result, sensor_names) = outcome.inspect_err(|f| log_failure("/predict", f))?;

    tracing::debug!(
        meta = result.meta().map(|m| m.class_label.as_str()).unwrap_or_default(),
        "prediction served"
    );

    let n_features = sensor_names.len();
    Ok(Json(ApiResponse::success(PredictResult {
        result,
        metadata: PredictMetadata {
            timestamp: chrono::Utc::now().to_rfc3339(),
            sensor_names,
            n_features,
        },
    })))
}

/// List the loaded models under their public names
pub async fn models_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ModelsResult>>, ApiFailure> {
    let pipeline = pipeline(&state)
        .await
        .inspect_err(|f| log_failure("/models", f))?;

    Ok(Json(ApiResponse::success(ModelsResult {
        models: pipeline.models(),
        labels: pipeline.codec().labels().to_vec(),
    })))
}

/// List the channel layout under public names
pub async fn sensors_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SensorsResult>>, ApiFailure> {
    let pipeline = pipeline(&state)
        .await
        .inspect_err(|f| log_failure("/sensors", f))?;

    let sensors = pipeline.masked_channels();
    Ok(Json(ApiResponse::success(SensorsResult {
        count: sensors.len(),
        sensors,
    })))
}

/// Health check; never triggers an artifact load
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthCheck> {
    Json(HealthCheck {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        pipeline_loaded: state.cell.is_loaded(),
        uptime_secs: state.started.elapsed().as_secs(),
    })
}
