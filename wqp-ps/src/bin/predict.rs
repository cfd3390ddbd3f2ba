//! wqp-predict - one-shot command-line prediction
//!
//! Assembles the inputs from (in increasing precedence) the form defaults,
//! a JSON object file or stdin, and `--set key=value` pairs, then runs the
//! same pipeline the service runs and prints the result as JSON on stdout.

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use wqp_common::config::{resolve_artifacts_dir, TomlConfig};
use wqp_common::features::{self, FeatureName, FeatureRecord};
use wqp_common::PredictionContext;
use wqp_ps::api::PredictionReport;
use wqp_ps::logging::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "wqp-predict")]
#[command(about = "Predict wine quality from physicochemical measurements")]
#[command(version)]
struct Args {
    /// JSON object with the inputs; `-` reads stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Set one input, e.g. `--set alcohol=12.5` (repeatable)
    #[arg(short, long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    set: Vec<(FeatureName, Value)>,

    /// Start from the entry-form defaults for any field not supplied
    #[arg(long)]
    use_defaults: bool,

    /// Directory holding scaler.json and model.json
    #[arg(short, long)]
    artifacts_dir: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Output {
    features: FeatureRecord,
    #[serde(flatten)]
    report: PredictionReport,
}

/// Parse `key=value`; the key may be a request key or a column label
///
/// The value is taken as JSON when it parses, otherwise as a string, so a
/// non-numeric value is reported by the pipeline as an invalid field type.
fn parse_assignment(s: &str) -> Result<(FeatureName, Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;

    let name = FeatureName::from_key(key.trim()).ok_or_else(|| {
        let known: Vec<&str> = FeatureName::ALL.iter().map(|n| n.key()).collect();
        format!("unknown field '{}' (expected one of: {})", key.trim(), known.join(", "))
    })?;

    let value = value.trim();
    let value = serde_json::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((name, value))
}

fn read_input(path: &Path) -> Result<Map<String, Value>> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?
    };

    match serde_json::from_str(&text).context("Input is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("Input must be a JSON object, got {}", json_kind(&other)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Merge defaults, file input and assignments into one raw input map
fn assemble_inputs(
    use_defaults: bool,
    file: Option<Map<String, Value>>,
    assignments: Vec<(FeatureName, Value)>,
) -> Map<String, Value> {
    let mut raw = Map::new();

    if use_defaults {
        for (name, value) in FeatureRecord::form_defaults().iter() {
            raw.insert(name.key().to_string(), Value::from(value));
        }
    }

    if let Some(file) = file {
        for (key, value) in &file {
            // Aliases are stored under the canonical key so they override the
            // default; the canonical key in the file wins over its alias
            let key = match FeatureName::from_key(key) {
                Some(name) if name.key() != key.as_str() && file.contains_key(name.key()) => continue,
                Some(name) => name.key().to_string(),
                None => key.clone(),
            };
            raw.insert(key, value.clone());
        }
    }

    for (name, value) in assignments {
        raw.insert(name.key().to_string(), value);
    }

    raw
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (config, source) = TomlConfig::locate_and_load(args.config.as_deref())
        .context("Failed to load configuration")?;
    init_tracing(&config.logging.level);
    debug!("Configuration: {}", source);

    let file = args.input.as_deref().map(read_input).transpose()?;
    if file.is_none() && args.set.is_empty() && !args.use_defaults {
        bail!("No inputs given: use --input, --set or --use-defaults");
    }
    let raw = assemble_inputs(args.use_defaults, file, args.set);

    let artifacts_dir = resolve_artifacts_dir(args.artifacts_dir.as_deref(), &config);
    info!("Artifacts directory: {}", artifacts_dir.display());
    let context = PredictionContext::load(&config.artifact_paths(&artifacts_dir))
        .context("Failed to load artifacts")?;

    let output = run_prediction(&context, &raw)?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

/// Build the record and run the pipeline on it
fn run_prediction(context: &PredictionContext, raw: &Map<String, Value>) -> Result<Output> {
    let record = features::build(raw).context("Input rejected")?;
    let prediction = context.predict_record(&record).context("Prediction failed")?;

    Ok(Output {
        features: record,
        report: prediction.into(),
    })
}
