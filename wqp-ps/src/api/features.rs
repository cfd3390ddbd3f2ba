//! Input schema endpoint
//!
//! Lets a form or client render the eleven inputs in model order with their
//! labels, accepted ranges and defaults.

use axum::Json;
use wqp_common::features::{FieldSpec, SCHEMA};

/// GET /api/features
pub async fn list_features() -> Json<Vec<FieldSpec>> {
    Json(SCHEMA.to_vec())
}
