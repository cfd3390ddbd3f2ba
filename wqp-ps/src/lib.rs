//! wqp-ps library - Prediction Service
//!
//! Thin HTTP shell over the `wqp-common` prediction pipeline. Holds no
//! pipeline logic of its own: it decodes requests, calls the shared
//! [`PredictionContext`], and encodes results.

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use wqp_common::PredictionContext;

pub mod api;
pub mod error;
pub mod logging;

pub use crate::error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Artifacts loaded once at startup, read-only afterwards
    pub context: Arc<PredictionContext>,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(context: Arc<PredictionContext>) -> Self {
        Self {
            context,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/api/predict", post(api::predict))
        .route("/api/features", get(api::list_features))
        .route("/api/artifacts", get(api::list_artifacts))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
