//! Scaling Transform
//!
//! Per-feature standardization fitted offline: `(x - mean) / scale`.
//! Parameters are frozen once constructed; `apply` is a pure function of the
//! record and those parameters.

use serde::Serialize;

use crate::features::{FeatureRecord, FEATURE_COUNT};
use crate::{Error, Result};

/// Output of the scaling transform, consumed by the predictor
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScaledVector(Vec<f64>);

impl ScaledVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<f64>> for ScaledVector {
    fn from(values: Vec<f64>) -> Self {
        ScaledVector(values)
    }
}

/// Fitted standardization parameters
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Create a scaler from fitted parameters
    ///
    /// # Errors
    /// - `Error::SchemaMismatch` if either vector is not exactly 11 wide
    /// - `Error::InvalidParameters` for non-finite values or a zero scale
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        if mean.len() != FEATURE_COUNT {
            return Err(Error::width_mismatch("scaler mean", FEATURE_COUNT, mean.len()));
        }
        if scale.len() != FEATURE_COUNT {
            return Err(Error::width_mismatch("scaler scale", FEATURE_COUNT, scale.len()));
        }

        if let Some(i) = mean.iter().position(|m| !m.is_finite()) {
            return Err(Error::InvalidParameters(format!(
                "scaler mean[{}] is not finite: {}",
                i, mean[i]
            )));
        }
        if let Some(i) = scale.iter().position(|s| !s.is_finite() || *s == 0.0) {
            return Err(Error::InvalidParameters(format!(
                "scaler scale[{}] must be finite and non-zero, got {}",
                i, scale[i]
            )));
        }

        Ok(Self { mean, scale })
    }

    /// Number of features the scaler was fitted on
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// Standardize a record
    ///
    /// # Errors
    /// `Error::SchemaMismatch` if the record width differs from the fitted width
    pub fn apply(&self, record: &FeatureRecord) -> Result<ScaledVector> {
        let values = record.values();
        if values.len() != self.n_features() {
            return Err(Error::width_mismatch("scaling transform", self.n_features(), values.len()));
        }

        let scaled = values
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect();

        Ok(ScaledVector(scaled))
    }
}
