//! E-Nose REST API
//!
//! Thin HTTP surface over the inference pipeline. Handlers own transport
//! concerns only; every decision is made by `enose-core`.

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

pub use routes::{build_app, create_router, AppOptions, AppState};
