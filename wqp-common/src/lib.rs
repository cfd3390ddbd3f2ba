//! # WQP Common Library
//!
//! The wine quality prediction pipeline, independent of any presentation layer:
//! - Feature schema and record builder
//! - Scaling transform and tree-ensemble predictor (loaded artifacts)
//! - Tier classification
//! - Prediction context (startup-time, immutable)
//! - Bootstrap configuration loading

pub mod artifacts;
pub mod config;
pub mod error;
pub mod features;
pub mod forest;
pub mod pipeline;
pub mod scaling;
pub mod tier;

pub use error::{Error, Result};
pub use features::{FeatureName, FeatureRecord, FEATURE_COUNT};
pub use pipeline::{Prediction, PredictionContext};
pub use tier::{QualityScore, QualityTier};
