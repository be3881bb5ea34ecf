//! Middleware for authentication, rate limiting and request timeouts

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    BoxError,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{num::NonZeroU32, sync::Arc};

use crate::models::ApiFailure;

// ============================================================================
// API Key Authentication
// ============================================================================

/// API key configuration
#[derive(Clone, Default)]
pub struct ApiKeyConfig {
    /// Valid API keys (empty = no authentication required)
    pub keys: Vec<String>,
    /// Whether authentication is enabled
    pub enabled: bool,
}

impl ApiKeyConfig {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            enabled: !keys.is_empty(),
            keys,
        }
    }

    /// Create config from `ENOSE_API_KEYS` (comma-separated)
    pub fn from_env() -> Self {
        let keys = std::env::var("ENOSE_API_KEYS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self::new(keys)
    }

    /// Check if a key is valid
    pub fn is_valid(&self, key: &str) -> bool {
        if !self.enabled {
            return true;
        }
        self.keys.iter().any(|k| k == key)
    }
}

/// Authentication middleware
pub async fn auth_middleware(
    State(config): State<Arc<ApiKeyConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // health stays open for load balancers
    if request.uri().path() == "/health" || !config.enabled {
        return next.run(request).await;
    }

    let api_key = request
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok());

    match api_key {
        Some(key) if config.is_valid(key) => next.run(request).await,
        Some(_) => ApiFailure::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Invalid API key")
            .with_help("Provide a valid API key in the X-API-Key header")
            .into_response(),
        None => ApiFailure::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "API key required")
            .with_help("Provide an API key in the X-API-Key header")
            .into_response(),
    }
}

// ============================================================================
// Rate Limiting
// ============================================================================

/// Rate limiter type alias
pub type AppRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiter configuration
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Requests per second
    pub requests_per_second: u32,
    /// Burst size
    pub burst_size: u32,
    /// Whether rate limiting is enabled
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 50,
            burst_size: 100,
            enabled: true,
        }
    }
}

impl RateLimitConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let rps = std::env::var("ENOSE_API_RATE_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.requests_per_second);

        let burst = std::env::var("ENOSE_API_RATE_BURST")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.burst_size);

        let enabled = std::env::var("ENOSE_API_RATE_ENABLED")
            .map(|s| s != "false" && s != "0")
            .unwrap_or(true);

        Self {
            requests_per_second: rps,
            burst_size: burst,
            enabled,
        }
    }

    /// Create a rate limiter from this config; zero values count as one
    pub fn create_limiter(&self) -> Arc<AppRateLimiter> {
        let rps = NonZeroU32::new(self.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(self.burst_size).unwrap_or(NonZeroU32::MIN);

        Arc::new(RateLimiter::direct(Quota::per_second(rps).allow_burst(burst)))
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State((limiter, config)): State<(Arc<AppRateLimiter>, RateLimitConfig)>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" || !config.enabled {
        return next.run(request).await;
    }

    match limiter.check() {
        Ok(_) => next.run(request).await,
        Err(_) => ApiFailure::new(
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMITED",
            "Too many requests",
        )
        .with_help(format!(
            "Rate limit: {} requests/second, burst: {}",
            config.requests_per_second, config.burst_size
        ))
        .into_response(),
    }
}

// ============================================================================
// Timeouts
// ============================================================================

/// Maps errors from the timeout layer to structured responses
pub async fn handle_timeout_error(err: BoxError) -> Response {
    if err.is::<tower::timeout::error::Elapsed>() {
        tracing::warn!("request timed out");
        ApiFailure::new(
            StatusCode::GATEWAY_TIMEOUT,
            "TIMEOUT",
            "Request exceeded the configured time limit",
        )
        .into_response()
    } else {
        ApiFailure::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            format!("Unhandled middleware error: {}", err),
        )
        .into_response()
    }
}
