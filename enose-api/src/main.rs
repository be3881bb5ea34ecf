//! E-Nose REST API Server
//!
//! Serves stacked-ensemble predictions over HTTP.
//!
//! ## Features
//! - Lazy, single-flight artifact loading (503 until a load succeeds)
//! - API Key Authentication (optional, via X-API-Key header)
//! - Rate Limiting (configurable requests per second)
//! - Per-request timeout
//!
//! ## Environment Variables
//! - `ENOSE_API_HOST`: Host to bind to (default: 127.0.0.1)
//! - `ENOSE_API_PORT`: Port to listen on (default: 5000)
//! - `ENOSE_CONFIG`: Path to enose.toml (default: artifacts/enose.toml)
//! - `ENOSE_API_KEYS`: Comma-separated list of valid API keys (empty = no auth)
//! - `ENOSE_API_RATE_LIMIT`: Requests per second (default: 50)
//! - `ENOSE_API_RATE_BURST`: Burst size (default: 100)
//! - `ENOSE_API_RATE_ENABLED`: Enable rate limiting (default: true)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use enose_api::middleware::{ApiKeyConfig, RateLimitConfig};
use enose_api::{build_app, AppOptions, AppState};
use enose_core::{ArtifactStore, EnsembleConfig, PipelineCell};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "enose-api")]
#[command(author = "E-Nose Contributors")]
#[command(version)]
#[command(about = "REST API server for E-Nose odor classification", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "ENOSE_API_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 5000, env = "ENOSE_API_PORT")]
    port: u16,

    /// Ensemble configuration file
    #[arg(short, long, default_value = "artifacts/enose.toml", env = "ENOSE_CONFIG")]
    config: PathBuf,

    /// Load artifacts before accepting requests
    #[arg(long, default_value_t = false)]
    eager: bool,

    /// Per-request time limit in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Enable CORS for all origins
    #[arg(long, default_value_t = false)]
    cors: bool,

    /// Disable rate limiting
    #[arg(long, default_value_t = false)]
    no_rate_limit: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "enose_api=info,enose_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = EnsembleConfig::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let state = AppState::new(PipelineCell::new(ArtifactStore::new(config)));

    if args.eager {
        let cell = state.cell.clone();
        match tokio::task::spawn_blocking(move || cell.get()).await? {
            Ok(_) => {}
            // keep serving; requests answer 503 and retry the load
            Err(err) => tracing::error!(error = %err, "initial artifact load failed"),
        }
    }

    let mut rate_limit = RateLimitConfig::from_env();
    if args.no_rate_limit {
        rate_limit.enabled = false;
    }
    let auth = Arc::new(ApiKeyConfig::from_env());

    let options = AppOptions {
        auth: auth.clone(),
        rate_limit: rate_limit.clone(),
        cors: args.cors,
        timeout: Duration::from_secs(args.timeout_secs),
        ..AppOptions::default()
    };
    let app = build_app(state, options);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("invalid bind address")?;

    tracing::info!("E-Nose API server starting on http://{}", addr);
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  POST /predict - Classify one sensor reading");
    tracing::info!("  GET  /models  - Loaded models (masked)");
    tracing::info!("  GET  /sensors - Channel layout (masked)");
    tracing::info!("  GET  /health  - Health check");
    tracing::info!("");
    tracing::info!("Configuration:");
    tracing::info!("  Config file: {}", args.config.display());
    tracing::info!(
        "  Authentication: {}",
        if auth.enabled {
            format!("{} API keys configured", auth.keys.len())
        } else {
            "disabled".to_string()
        }
    );
    tracing::info!(
        "  Rate limiting: {}",
        if rate_limit.enabled {
            format!(
                "{} req/s (burst: {})",
                rate_limit.requests_per_second, rate_limit.burst_size
            )
        } else {
            "disabled".to_string()
        }
    );
    tracing::info!("  Request timeout: {}s", args.timeout_secs);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
