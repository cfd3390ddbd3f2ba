//! Feature schema and the Feature Vector Builder
//!
//! The eleven chemical measurements, in the exact order the scaling transform
//! and the predictor were fitted on. Order is part of the artifact contract:
//! [`FeatureName::ALL`] is the single source of truth for it.
//!
//! The builder checks presence and numeric type only. Input ranges listed in
//! the schema come from the entry form and are advisory; the builder
//! never clamps or rejects out-of-range values.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

use crate::{Error, Result};

/// Number of features the pipeline consumes
pub const FEATURE_COUNT: usize = 11;

/// One of the eleven chemical measurements, in schema order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatureName {
    #[serde(rename = "fixed_acidity")]
    FixedAcidity,
    #[serde(rename = "volatile_acidity")]
    VolatileAcidity,
    #[serde(rename = "citric_acid")]
    CitricAcid,
    #[serde(rename = "residual_sugar")]
    ResidualSugar,
    #[serde(rename = "chlorides")]
    Chlorides,
    #[serde(rename = "free_sulfur_dioxide")]
    FreeSulfurDioxide,
    #[serde(rename = "total_sulfur_dioxide")]
    TotalSulfurDioxide,
    #[serde(rename = "density")]
    Density,
    #[serde(rename = "pH")]
    Ph,
    #[serde(rename = "sulphates")]
    Sulphates,
    #[serde(rename = "alcohol")]
    Alcohol,
}

/// Static description of one input field
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldSpec {
    /// Request key (`fixed_acidity`)
    pub name: FeatureName,
    /// Column label used in the training data and recorded in artifacts
    pub column: &'static str,
    /// Human-readable label for entry forms
    pub label: &'static str,
    /// Lower bound offered by the entry form
    pub min: f64,
    /// Upper bound offered by the entry form
    pub max: f64,
    /// Initial value offered by the entry form
    pub default: f64,
}

const fn field(
    name: FeatureName,
    column: &'static str,
    label: &'static str,
    min: f64,
    max: f64,
    default: f64,
) -> FieldSpec {
    FieldSpec {
        name,
        column,
        label,
        min,
        max,
        default,
    }
}

/// Schema table, indexed by `FeatureName as usize`
pub const SCHEMA: [FieldSpec; FEATURE_COUNT] = [
    field(FeatureName::FixedAcidity, "fixed acidity", "Fixed Acidity", 0.0, 20.0, 7.4),
    field(FeatureName::VolatileAcidity, "volatile acidity", "Volatile Acidity", 0.0, 2.0, 0.7),
    field(FeatureName::CitricAcid, "citric acid", "Citric Acid", 0.0, 1.0, 0.0),
    field(FeatureName::ResidualSugar, "residual sugar", "Residual Sugar", 0.0, 20.0, 0.64),
    field(FeatureName::Chlorides, "chlorides", "Chlorides", 0.0, 1.0, 0.09),
    field(FeatureName::FreeSulfurDioxide, "free sulfur dioxide", "Free Sulfur Dioxide", 0.0, 300.0, 15.0),
    field(FeatureName::TotalSulfurDioxide, "total sulfur dioxide", "Total Sulfur Dioxide", 0.0, 500.0, 98.0),
    field(FeatureName::Density, "density", "Density", 0.9, 1.5, 1.0),
    field(FeatureName::Ph, "pH", "pH", 0.0, 14.0, 3.0),
    field(FeatureName::Sulphates, "sulphates", "Sulphates", 0.0, 5.0, 0.68),
    field(FeatureName::Alcohol, "alcohol", "Alcohol", 0.0, 20.0, 5.3),
];

impl FeatureName {
    /// All features in schema order
    pub const ALL: [FeatureName; FEATURE_COUNT] = [
        FeatureName::FixedAcidity,
        FeatureName::VolatileAcidity,
        FeatureName::CitricAcid,
        FeatureName::ResidualSugar,
        FeatureName::Chlorides,
        FeatureName::FreeSulfurDioxide,
        FeatureName::TotalSulfurDioxide,
        FeatureName::Density,
        FeatureName::Ph,
        FeatureName::Sulphates,
        FeatureName::Alcohol,
    ];

    /// Position in the fitted feature order
    pub fn index(self) -> usize {
        self as usize
    }

    /// Schema entry for this feature
    pub fn spec(self) -> &'static FieldSpec {
        &SCHEMA[self.index()]
    }

    /// Canonical request key
    pub fn key(self) -> &'static str {
        match self {
            FeatureName::FixedAcidity => "fixed_acidity",
            FeatureName::VolatileAcidity => "volatile_acidity",
            FeatureName::CitricAcid => "citric_acid",
            FeatureName::ResidualSugar => "residual_sugar",
            FeatureName::Chlorides => "chlorides",
            FeatureName::FreeSulfurDioxide => "free_sulfur_dioxide",
            FeatureName::TotalSulfurDioxide => "total_sulfur_dioxide",
            FeatureName::Density => "density",
            FeatureName::Ph => "pH",
            FeatureName::Sulphates => "sulphates",
            FeatureName::Alcohol => "alcohol",
        }
    }

    /// Training-data column label
    pub fn column(self) -> &'static str {
        self.spec().column
    }

    /// Resolve a request key or column label
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|name| name.key() == key || name.column() == key)
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Column labels in schema order, as recorded by artifacts
pub fn column_labels() -> Vec<&'static str> {
    SCHEMA.iter().map(|spec| spec.column).collect()
}

/// Fixed-order record of the eleven measurements
///
/// Immutable once built. Serializes as a `key -> value` map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRecord {
    values: [f64; FEATURE_COUNT],
}

impl FeatureRecord {
    /// Wrap values that are already in schema order
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    /// Record populated with the entry form's initial values
    pub fn form_defaults() -> Self {
        let mut values = [0.0; FEATURE_COUNT];
        for spec in &SCHEMA {
            values[spec.name.index()] = spec.default;
        }
        Self { values }
    }

    /// Build from typed pairs supplied in any order
    ///
    /// A feature supplied twice keeps the later value.
    ///
    /// # Errors
    /// `Error::MissingField` for the first feature (in schema order) not supplied
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (FeatureName, f64)>,
    {
        let mut slots: [Option<f64>; FEATURE_COUNT] = [None; FEATURE_COUNT];
        for (name, value) in pairs {
            slots[name.index()] = Some(value);
        }

        let mut values = [0.0; FEATURE_COUNT];
        for name in FeatureName::ALL {
            values[name.index()] = slots[name.index()].ok_or(Error::MissingField(name))?;
        }
        Ok(Self { values })
    }

    /// Value of one feature
    pub fn get(&self, name: FeatureName) -> f64 {
        self.values[name.index()]
    }

    /// Values in schema order
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    /// `(name, value)` pairs in schema order
    pub fn iter(&self) -> impl Iterator<Item = (FeatureName, f64)> + '_ {
        FeatureName::ALL.into_iter().zip(self.values.iter().copied())
    }
}

impl Serialize for FeatureRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name.key(), &value)?;
        }
        map.end()
    }
}

/// Feature Vector Builder
///
/// Assembles a [`FeatureRecord`] from a JSON object keyed by request key
/// (`fixed_acidity`) or training column label (`fixed acidity`). When both
/// spellings are present the request key wins. Unrecognized keys are ignored.
///
/// # Errors
/// - `Error::MissingField` if a feature is absent under both spellings
/// - `Error::InvalidFieldType` if a present value is not a JSON number
pub fn build(raw: &Map<String, Value>) -> Result<FeatureRecord> {
    for key in raw.keys() {
        if FeatureName::from_key(key).is_none() {
            debug!("Ignoring unrecognized input field '{}'", key);
        }
    }

    let mut values = [0.0; FEATURE_COUNT];
    for name in FeatureName::ALL {
        let value = raw
            .get(name.key())
            .or_else(|| raw.get(name.column()))
            .ok_or(Error::MissingField(name))?;

        values[name.index()] = numeric_value(name, value)?;
    }

    Ok(FeatureRecord { values })
}

fn numeric_value(name: FeatureName, value: &Value) -> Result<f64> {
    match value {
        Value::Number(number) => number.as_f64().ok_or_else(|| Error::InvalidFieldType {
            field: name,
            found: format!("unrepresentable number {}", number),
        }),
        other => Err(Error::InvalidFieldType {
            field: name,
            found: json_type_name(other).to_string(),
        }),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
