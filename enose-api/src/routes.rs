//! Route configuration for the E-Nose API

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use enose_core::PipelineCell;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::{
    auth_middleware, handle_timeout_error, rate_limit_middleware, ApiKeyConfig, RateLimitConfig,
};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub cell: Arc<PipelineCell>,
    pub started: Instant,
}

impl AppState {
    pub fn new(cell: PipelineCell) -> Self {
        Self {
            cell: Arc::new(cell),
            started: Instant::now(),
        }
    }
}

/// Cross-cutting layers applied around the router
#[derive(Clone)]
pub struct AppOptions {
    pub auth: Arc<ApiKeyConfig>,
    pub rate_limit: RateLimitConfig,
    pub cors: bool,
    pub timeout: Duration,
    pub body_limit: usize,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            auth: Arc::new(ApiKeyConfig::default()),
            rate_limit: RateLimitConfig::disabled(),
            cors: false,
            timeout: Duration::from_secs(10),
            body_limit: 64 * 1024,
        }
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Inference
        .route("/predict", post(handlers::predict_handler))

        // Introspection
        .route("/models", get(handlers::models_handler))
        .route("/sensors", get(handlers::sensors_handler))

        // Health check
        .route("/health", get(handlers::health_handler))
        .with_state(state)
}

/// Router with every middleware layer applied
pub fn build_app(state: AppState, options: AppOptions) -> Router {
    let limiter = options.rate_limit.create_limiter();

    let mut app = create_router(state)
        .layer(DefaultBodyLimit::max(options.body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .timeout(options.timeout),
        )
        .layer(axum_middleware::from_fn_with_state(
            (limiter, options.rate_limit.clone()),
            rate_limit_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            options.auth.clone(),
            auth_middleware,
        ));

    if options.cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app.layer(TraceLayer::new_for_http())
}
