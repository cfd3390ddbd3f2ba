//! Artifact loading
//!
//! The scaling transform and the predictor arrive as two versioned JSON
//! documents produced by the external training pipeline:
//!
//! ```json
//! { "format": "wqp.standard_scaler", "format_version": 1,
//!   "feature_names": ["fixed acidity", ...], "mean": [...], "scale": [...] }
//!
//! { "format": "wqp.random_forest", "format_version": 1,
//!   "task": "classifier", "n_features": 11, "classes": [3, 4, ...],
//!   "trees": [ { "children_left": [...], "children_right": [...],
//!                "feature": [...], "threshold": [...], "value": [[...], ...] } ] }
//! ```
//!
//! Nothing is trusted blindly: the header is checked before the body is
//! parsed, widths and feature names are checked against the 11-field schema,
//! and the fitted parameters are validated before anything can be served.
//! Each file's SHA-256 digest is computed and, when configured, pinned.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::features::{column_labels, FEATURE_COUNT};
use crate::forest::{DecisionTree, ForestModel, ForestTask};
use crate::scaling::StandardScaler;
use crate::{Error, Result};

/// Format tag of the scaler document
pub const SCALER_FORMAT: &str = "wqp.standard_scaler";

/// Format tag of the forest document
pub const FOREST_FORMAT: &str = "wqp.random_forest";

/// Only document version this build understands
pub const FORMAT_VERSION: u32 = 1;

/// Default scaler file name inside the artifacts directory
pub const DEFAULT_SCALER_FILE: &str = "scaler.json";

/// Default model file name inside the artifacts directory
pub const DEFAULT_MODEL_FILE: &str = "model.json";

#[derive(Debug, Deserialize)]
struct ArtifactHeader {
    format: String,
    format_version: u32,
}

/// Scaler document body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerDocument {
    pub format: String,
    pub format_version: u32,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Forest document body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestDocument {
    pub format: String,
    pub format_version: u32,
    pub task: ForestTask,
    pub n_features: usize,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    #[serde(default)]
    pub classes: Vec<f64>,
    pub trees: Vec<DecisionTree>,
}

/// Provenance of a loaded artifact, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactInfo {
    pub path: PathBuf,
    pub format: String,
    pub format_version: u32,
    pub sha256: String,
    pub summary: String,
}

/// Where to find both artifacts, and optionally which digests to expect
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    pub scaler: PathBuf,
    pub model: PathBuf,
    pub scaler_sha256: Option<String>,
    pub model_sha256: Option<String>,
}

impl ArtifactPaths {
    /// Default file names inside `dir`, no pinned digests
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            scaler: dir.join(DEFAULT_SCALER_FILE),
            model: dir.join(DEFAULT_MODEL_FILE),
            scaler_sha256: None,
            model_sha256: None,
        }
    }
}

/// Hex-encoded SHA-256 digest
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Load and validate the scaling transform
///
/// # Errors
/// - `Error::ArtifactLoad` if the file is unreadable, corrupt, of the wrong
///   format or version, fails its pinned digest, or holds unusable parameters
/// - `Error::SchemaMismatch` if its width or feature names disagree with the schema
pub fn load_scaler(path: &Path, expected_sha256: Option<&str>) -> Result<(StandardScaler, ArtifactInfo)> {
    let (bytes, sha256) = read_verified(path, expected_sha256)?;
    check_header(path, &bytes, SCALER_FORMAT)?;

    let doc: ScalerDocument = serde_json::from_slice(&bytes)
        .map_err(|e| Error::artifact(path, format!("malformed scaler document: {}", e)))?;

    if let Some(names) = &doc.feature_names {
        check_feature_names("scaler", names)?;
    }
    let scaler = StandardScaler::new(doc.mean, doc.scale).map_err(|e| attach_path(path, e))?;

    let info = ArtifactInfo {
        path: path.to_path_buf(),
        format: doc.format,
        format_version: doc.format_version,
        sha256,
        summary: format!("standard scaler over {} features", scaler.n_features()),
    };
    info!("Loaded scaler artifact {} (sha256 {})", path.display(), info.sha256);

    Ok((scaler, info))
}

/// Load and validate the tree-ensemble predictor
///
/// # Errors
/// Same taxonomy as [`load_scaler`]; structural tree defects surface as
/// `Error::ArtifactLoad`.
pub fn load_forest(path: &Path, expected_sha256: Option<&str>) -> Result<(ForestModel, ArtifactInfo)> {
    let (bytes, sha256) = read_verified(path, expected_sha256)?;
    check_header(path, &bytes, FOREST_FORMAT)?;

    let doc: ForestDocument = serde_json::from_slice(&bytes)
        .map_err(|e| Error::artifact(path, format!("malformed forest document: {}", e)))?;

    if doc.n_features != FEATURE_COUNT {
        return Err(Error::width_mismatch("quality predictor", FEATURE_COUNT, doc.n_features));
    }
    if let Some(names) = &doc.feature_names {
        check_feature_names("quality predictor", names)?;
    }

    let model = ForestModel::new(doc.task, doc.n_features, doc.classes, &doc.trees)
        .map_err(|e| attach_path(path, e))?;

    let info = ArtifactInfo {
        path: path.to_path_buf(),
        format: doc.format,
        format_version: doc.format_version,
        sha256,
        summary: format!(
            "random forest {:?} with {} trees over {} features",
            model.task(),
            model.n_trees(),
            doc.n_features
        )
        .to_lowercase(),
    };
    info!("Loaded model artifact {} (sha256 {})", path.display(), info.sha256);

    Ok((model, info))
}

fn read_verified(path: &Path, expected_sha256: Option<&str>) -> Result<(Vec<u8>, String)> {
    let bytes = std::fs::read(path).map_err(|e| Error::artifact(path, format!("cannot read file: {}", e)))?;
    let sha256 = sha256_hex(&bytes);
    debug!("Read {} bytes from {} (sha256 {})", bytes.len(), path.display(), sha256);

    if let Some(expected) = expected_sha256 {
        if !expected.trim().eq_ignore_ascii_case(&sha256) {
            return Err(Error::artifact(
                path,
                format!("sha256 mismatch: expected {}, found {}", expected.trim(), sha256),
            ));
        }
    }

    Ok((bytes, sha256))
}

fn check_header(path: &Path, bytes: &[u8], expected_format: &str) -> Result<()> {
    let header: ArtifactHeader = serde_json::from_slice(bytes)
        .map_err(|e| Error::artifact(path, format!("not an artifact document: {}", e)))?;

    if header.format != expected_format {
        return Err(Error::artifact(
            path,
            format!("expected format '{}', found '{}'", expected_format, header.format),
        ));
    }
    if header.format_version != FORMAT_VERSION {
        return Err(Error::artifact(
            path,
            format!(
                "unsupported format_version {} (supported: {})",
                header.format_version, FORMAT_VERSION
            ),
        ));
    }
    Ok(())
}

fn check_feature_names(context: &str, names: &[String]) -> Result<()> {
    let expected = column_labels();
    if names.len() != expected.len() {
        return Err(Error::width_mismatch(
            format!("{} feature names", context),
            expected.len(),
            names.len(),
        ));
    }
    if names.iter().zip(expected.iter()).any(|(found, want)| found != want) {
        return Err(Error::SchemaMismatch {
            context: format!("{} feature names", context),
            expected: expected.join(", "),
            found: names.join(", "),
        });
    }
    Ok(())
}

/// Width problems keep their own variant; anything else becomes a load error
fn attach_path(path: &Path, err: Error) -> Error {
    match err {
        Error::InvalidParameters(reason) => Error::artifact(path, reason),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_in_dir_uses_default_names() {
        let paths = ArtifactPaths::in_dir("/srv/wqp");
        assert_eq!(paths.scaler, PathBuf::from("/srv/wqp/scaler.json"));
        assert_eq!(paths.model, PathBuf::from("/srv/wqp/model.json"));
        assert!(paths.scaler_sha256.is_none());
    }

    #[test]
    fn test_feature_name_check() {
        let good: Vec<String> = column_labels().into_iter().map(String::from).collect();
        assert!(check_feature_names("scaler", &good).is_ok());

        let mut swapped = good.clone();
        swapped.swap(0, 1);
        assert!(matches!(
            check_feature_names("scaler", &swapped),
            Err(Error::SchemaMismatch { .. })
        ));

        assert!(matches!(
            check_feature_names("scaler", &good[..10]),
            Err(Error::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_attach_path_keeps_schema_mismatch() {
        let err = attach_path(Path::new("m.json"), Error::width_mismatch("x", 11, 3));
        assert!(matches!(err, Error::SchemaMismatch { .. }));

        let err = attach_path(Path::new("m.json"), Error::InvalidParameters("bad".to_string()));
        assert!(matches!(err, Error::ArtifactLoad { .. }));
    }
}
