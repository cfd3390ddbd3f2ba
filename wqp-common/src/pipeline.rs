//! Prediction pipeline
//!
//! `raw inputs → FeatureRecord → ScaledVector → QualityScore → QualityTier`
//!
//! [`PredictionContext`] is built once at startup from the two artifacts and
//! is immutable afterwards. Share it behind an `Arc`; every call is a pure,
//! synchronous function of its input and the frozen artifacts.

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::artifacts::{self, ArtifactInfo, ArtifactPaths};
use crate::features::{self, FeatureRecord, FEATURE_COUNT};
use crate::forest::QualityPredictor;
use crate::scaling::StandardScaler;
use crate::tier::{QualityScore, QualityTier};
use crate::{Error, Result};

/// Pipeline output handed to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Prediction {
    pub score: QualityScore,
    pub tier: QualityTier,
}

/// Immutable startup-time context holding both artifacts
pub struct PredictionContext {
    scaler: StandardScaler,
    predictor: Arc<dyn QualityPredictor>,
    artifacts: Vec<ArtifactInfo>,
}

impl std::fmt::Debug for PredictionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionContext")
            .field("n_features", &self.scaler.n_features())
            .field("artifacts", &self.artifacts)
            .finish()
    }
}

impl PredictionContext {
    /// Assemble a context from already-constructed components
    ///
    /// # Errors
    /// `Error::SchemaMismatch` if the scaler and predictor widths disagree
    /// with each other or with the schema
    pub fn new(scaler: StandardScaler, predictor: Arc<dyn QualityPredictor>) -> Result<Self> {
        if scaler.n_features() != FEATURE_COUNT {
            return Err(Error::width_mismatch("scaling transform", FEATURE_COUNT, scaler.n_features()));
        }
        if predictor.n_features() != scaler.n_features() {
            return Err(Error::width_mismatch(
                "quality predictor",
                scaler.n_features(),
                predictor.n_features(),
            ));
        }

        Ok(Self {
            scaler,
            predictor,
            artifacts: Vec::new(),
        })
    }

    /// Load both artifacts from disk
    ///
    /// Any error here is fatal: the caller must not serve requests.
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let (scaler, scaler_info) = artifacts::load_scaler(&paths.scaler, paths.scaler_sha256.as_deref())?;
        let (model, model_info) = artifacts::load_forest(&paths.model, paths.model_sha256.as_deref())?;

        let mut context = Self::new(scaler, Arc::new(model))?;
        context.artifacts = vec![scaler_info, model_info];

        info!("Prediction context ready ({} features)", FEATURE_COUNT);
        Ok(context)
    }

    /// Provenance of the loaded artifacts (empty when built in memory)
    pub fn artifacts(&self) -> &[ArtifactInfo] {
        &self.artifacts
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Run scale → predict → classify on a built record
    pub fn predict_record(&self, record: &FeatureRecord) -> Result<Prediction> {
        let scaled = self.scaler.apply(record)?;
        let score = self.predictor.predict(&scaled)?;
        let tier = QualityTier::classify(score);

        debug!("Predicted quality {} ({})", score, tier);
        Ok(Prediction { score, tier })
    }

    /// Run the full pipeline on raw named inputs
    ///
    /// # Errors
    /// - `Error::MissingField` / `Error::InvalidFieldType` reject this request only
    /// - `Error::SchemaMismatch` if the artifacts disagree with the record
    pub fn predict(&self, raw: &Map<String, Value>) -> Result<Prediction> {
        let record = features::build(raw)?;
        self.predict_record(&record)
    }
}
