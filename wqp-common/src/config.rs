//! Bootstrap configuration and artifact location resolution
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments
//! 2. Environment variables (`WQP_ARTIFACTS_DIR`, `WQP_PORT`, `WQP_CONFIG`)
//! 3. TOML configuration file
//! 4. Compiled defaults
//!
//! A missing TOML file never stops startup: compiled defaults apply and the
//! returned [`ConfigSource`] says so, for the caller to log as a warning. A
//! TOML file that exists but does not parse is an error.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::artifacts::{ArtifactPaths, DEFAULT_MODEL_FILE, DEFAULT_SCALER_FILE};
use crate::{Error, Result};

/// Environment variable naming the TOML config file
pub const ENV_CONFIG: &str = "WQP_CONFIG";

/// Environment variable naming the artifacts directory
pub const ENV_ARTIFACTS_DIR: &str = "WQP_ARTIFACTS_DIR";

/// Environment variable naming the HTTP port
pub const ENV_PORT: &str = "WQP_PORT";

/// Bootstrap configuration loaded from TOML
///
/// Read once at startup. Changes require a restart.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// Address the HTTP shell binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the scaler and model artifacts
    #[serde(default)]
    pub artifacts_dir: Option<PathBuf>,

    /// Scaler file, relative to the artifacts directory unless absolute
    #[serde(default = "default_scaler_file")]
    pub scaler_file: String,

    /// Model file, relative to the artifacts directory unless absolute
    #[serde(default = "default_model_file")]
    pub model_file: String,

    /// Pinned SHA-256 of the scaler file
    #[serde(default)]
    pub scaler_sha256: Option<String>,

    /// Pinned SHA-256 of the model file
    #[serde(default)]
    pub model_sha256: Option<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides it
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            artifacts_dir: None,
            scaler_file: default_scaler_file(),
            model_file: default_model_file(),
            scaler_sha256: None,
            model_sha256: None,
            logging: LoggingConfig::default(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5780
}

fn default_scaler_file() -> String {
    DEFAULT_SCALER_FILE.to_string()
}

fn default_model_file() -> String {
    DEFAULT_MODEL_FILE.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Where the bootstrap configuration was read from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// `--config` argument
    CommandLine(PathBuf),
    /// `WQP_CONFIG` environment variable
    Environment(PathBuf),
    /// Per-user config file
    UserFile(PathBuf),
    /// No file found; the searched location, if one could be determined
    Defaults(Option<PathBuf>),
}

impl ConfigSource {
    /// True when no config file was found and compiled defaults apply
    pub fn is_defaults(&self) -> bool {
        matches!(self, ConfigSource::Defaults(_))
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::CommandLine(path) => write!(f, "{} (--config)", path.display()),
            ConfigSource::Environment(path) => write!(f, "{} ({})", path.display(), ENV_CONFIG),
            ConfigSource::UserFile(path) => write!(f, "{}", path.display()),
            ConfigSource::Defaults(Some(path)) => {
                write!(f, "compiled defaults ({} not found)", path.display())
            }
            ConfigSource::Defaults(None) => write!(f, "compiled defaults (no config directory)"),
        }
    }
}

/// Compiled-in defaults for the current platform
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDefaults {
    pub artifacts_dir: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        // ~/.local/share/wqp/artifacts, ~/Library/Application Support/wqp/artifacts,
        // %LOCALAPPDATA%\wqp\artifacts
        let artifacts_dir = dirs::data_local_dir()
            .map(|d| d.join("wqp").join("artifacts"))
            .unwrap_or_else(|| PathBuf::from("./wqp_artifacts"));

        Self {
            artifacts_dir,
            bind_address: default_bind_address(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

/// Per-user config file location (`<config_dir>/wqp/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wqp").join("config.toml"))
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Read and parse a TOML file that must exist
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{} ({})", e, path.display())))
    }

    /// Locate and load the config file
    ///
    /// An explicit path, or one named by `WQP_CONFIG`, must exist. The
    /// per-user default location is optional: when absent, defaults apply.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        Self::locate_and_load(explicit).map(|(config, _)| config)
    }

    /// Same as [`TomlConfig::load_or_default`], also reporting where the
    /// settings came from so the caller can log it once tracing is up
    pub fn locate_and_load(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, ConfigSource::CommandLine(path.to_path_buf())));
        }

        if let Ok(path) = std::env::var(ENV_CONFIG) {
            let path = PathBuf::from(path);
            return Ok((Self::load(&path)?, ConfigSource::Environment(path)));
        }

        match default_config_path() {
            Some(path) if path.exists() => Ok((Self::load(&path)?, ConfigSource::UserFile(path))),
            searched => Ok((Self::default(), ConfigSource::Defaults(searched))),
        }
    }

    /// Artifact locations inside `dir`, carrying any pinned digests
    pub fn artifact_paths(&self, dir: &Path) -> ArtifactPaths {
        ArtifactPaths {
            scaler: dir.join(&self.scaler_file),
            model: dir.join(&self.model_file),
            scaler_sha256: self.scaler_sha256.clone(),
            model_sha256: self.model_sha256.clone(),
        }
    }
}

/// Resolve the artifacts directory by priority order
///
/// 1. Command-line argument
/// 2. `WQP_ARTIFACTS_DIR`
/// 3. `artifacts_dir` in the TOML config
/// 4. Compiled default
pub fn resolve_artifacts_dir(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ENV_ARTIFACTS_DIR) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.artifacts_dir {
        return path.clone();
    }

    CompiledDefaults::for_current_platform().artifacts_dir
}
