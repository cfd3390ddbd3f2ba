//! Quality score and the Tier Classifier
//!
//! Thresholds:
//! - score ≥ 7 → Excellent
//! - 5 ≤ score ≤ 6 → Good
//! - score < 5 → Low
//!
//! Classification is total over `i64`: whatever the predictor emits maps to
//! exactly one tier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest score classified as Excellent
pub const EXCELLENT_THRESHOLD: i64 = 7;

/// Lowest score classified as Good
pub const GOOD_THRESHOLD: i64 = 5;

/// Integer quality score emitted by the predictor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualityScore(pub i64);

impl QualityScore {
    /// Convert a raw model output to a score
    ///
    /// Truncates toward zero, never rounds: 6.9 → 6, -0.5 → 0. Values beyond
    /// the `i64` range saturate and NaN maps to 0.
    pub fn from_raw(raw: f64) -> Self {
        QualityScore(raw as i64)
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for QualityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered display tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    Good,
    Excellent,
}

impl QualityTier {
    /// Classify a score. Never fails.
    pub fn classify(score: QualityScore) -> Self {
        match score.0 {
            s if s >= EXCELLENT_THRESHOLD => QualityTier::Excellent,
            s if s >= GOOD_THRESHOLD => QualityTier::Good,
            _ => QualityTier::Low,
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Good => "good",
            QualityTier::Excellent => "excellent",
        }
    }

    /// Result card headline
    pub fn headline(&self) -> &'static str {
        match self {
            QualityTier::Low => "Low Quality Wine",
            QualityTier::Good => "Good Quality Wine",
            QualityTier::Excellent => "Premium Wine",
        }
    }

    /// Star rating shown with the result
    pub fn stars(&self) -> u8 {
        match self {
            QualityTier::Low => 2,
            QualityTier::Good => 4,
            QualityTier::Excellent => 5,
        }
    }

    /// One-sentence description shown with the result
    pub fn summary(&self) -> &'static str {
        match self {
            QualityTier::Low => "Wine quality is below average. Improvement is recommended.",
            QualityTier::Good => "This wine is well balanced and suitable for regular use.",
            QualityTier::Excellent => "This wine has rich aroma, taste and excellent quality.",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tier Classifier entry point
pub fn classify(score: QualityScore) -> QualityTier {
    QualityTier::classify(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundaries() {
        assert_eq!(classify(QualityScore(4)), QualityTier::Low);
        assert_eq!(classify(QualityScore(5)), QualityTier::Good);
        assert_eq!(classify(QualityScore(6)), QualityTier::Good);
        assert_eq!(classify(QualityScore(7)), QualityTier::Excellent);
    }

    #[test]
    fn test_total_over_extremes() {
        assert_eq!(classify(QualityScore(i64::MIN)), QualityTier::Low);
        assert_eq!(classify(QualityScore(-1)), QualityTier::Low);
        assert_eq!(classify(QualityScore(0)), QualityTier::Low);
        assert_eq!(classify(QualityScore(10)), QualityTier::Excellent);
        assert_eq!(classify(QualityScore(i64::MAX)), QualityTier::Excellent);
    }

    #[test]
    fn test_monotonic_non_decreasing() {
        let mut previous = classify(QualityScore(-1_000));
        for s in -999..=1_000 {
            let tier = classify(QualityScore(s));
            assert!(tier >= previous, "tier dropped from {:?} to {:?} at {}", previous, tier, s);
            previous = tier;
        }
    }

    #[test]
    fn test_from_raw_truncates_toward_zero() {
        assert_eq!(QualityScore::from_raw(6.9), QualityScore(6));
        assert_eq!(QualityScore::from_raw(7.0), QualityScore(7));
        assert_eq!(QualityScore::from_raw(-0.5), QualityScore(0));
        assert_eq!(QualityScore::from_raw(-4.99), QualityScore(-4));
    }

    #[test]
    fn test_from_raw_saturates() {
        assert_eq!(QualityScore::from_raw(f64::INFINITY), QualityScore(i64::MAX));
        assert_eq!(QualityScore::from_raw(f64::NEG_INFINITY), QualityScore(i64::MIN));
        assert_eq!(QualityScore::from_raw(f64::NAN), QualityScore(0));
    }

    #[test]
    fn test_display_metadata() {
        assert_eq!(QualityTier::Excellent.stars(), 5);
        assert_eq!(QualityTier::Good.stars(), 4);
        assert_eq!(QualityTier::Low.stars(), 2);
        assert_eq!(QualityTier::Excellent.headline(), "Premium Wine");
        assert_eq!(serde_json::to_string(&QualityTier::Good).unwrap(), "\"good\"");
    }
}
