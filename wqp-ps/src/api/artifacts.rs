//! Loaded artifact provenance

use axum::{extract::State, Json};
use wqp_common::artifacts::ArtifactInfo;

use crate::AppState;

/// GET /api/artifacts
///
/// Path, format, version, digest and summary of the scaler and the model.
pub async fn list_artifacts(State(state): State<AppState>) -> Json<Vec<ArtifactInfo>> {
    Json(state.context.artifacts().to_vec())
}
