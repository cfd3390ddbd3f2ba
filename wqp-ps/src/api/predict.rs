//! Prediction endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, warn};
use wqp_common::{Prediction, QualityTier};

use crate::{ApiError, ApiResult, AppState};

/// Prediction as presented to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionReport {
    pub quality: i64,
    pub tier: QualityTier,
    pub headline: &'static str,
    pub stars: u8,
    pub summary: &'static str,
}

impl From<Prediction> for PredictionReport {
    fn from(prediction: Prediction) -> Self {
        let tier = prediction.tier;
        Self {
            quality: prediction.score.value(),
            tier,
            headline: tier.headline(),
            stars: tier.stars(),
            summary: tier.summary(),
        }
    }
}

/// POST /api/predict
///
/// Body is a JSON object keyed by feature name (or dataset column label).
/// A body that is not a JSON object is a 400 in the usual error envelope.
pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<Json<PredictionReport>> {
    let Json(body) = payload.map_err(|rejection| {
        warn!("Rejected prediction request body: {}", rejection.body_text());
        ApiError::from(rejection)
    })?;

    match state.context.predict(&body) {
        Ok(prediction) => Ok(Json(prediction.into())),
        Err(e) if e.is_request_error() => {
            warn!("Rejected prediction request: {}", e);
            Err(ApiError::from(e))
        }
        Err(e) => {
            error!("Prediction failed: {}", e);
            Err(ApiError::from(e))
        }
    }
}
