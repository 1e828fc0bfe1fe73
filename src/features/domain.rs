//! Domain types for the feature layout the classifier was trained on.
//!
//! A `FeatureSpec` is fixed once at startup. Records coming off the wire are
//! resolved against it into a `FeatureVector` whose positions line up with
//! the training columns.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::common::error::{CropError, CropResult};

/// One canonical column: its trained name, accepted aliases and optional default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureDef {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub default: Option<f64>,
}

impl FeatureDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            default: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_default(mut self, value: f64) -> Self {
        self.default = Some(value);
        self
    }

    /// Every key that may carry this feature, canonical name first.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Ordered, validated feature layout.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureSpec {
    features: Vec<FeatureDef>,
}

impl FeatureSpec {
    /// Validate and freeze a feature layout.
    ///
    /// Every key (canonical or alias) must be unique across the whole spec so
    /// resolution can never be ambiguous, and defaults must be finite.
    pub fn new(features: Vec<FeatureDef>) -> Result<Self, String> {
        if features.is_empty() {
            return Err("feature spec declares no features".to_string());
        }

        let mut seen = HashSet::new();
        for def in &features {
            if def.name.trim().is_empty() {
                return Err("feature name must not be empty".to_string());
            }
            for key in def.keys() {
                if !seen.insert(key) {
                    return Err(format!("key `{key}` is declared more than once"));
                }
            }
            if let Some(default) = def.default {
                if !default.is_finite() {
                    return Err(format!("default for `{}` is not finite", def.name));
                }
            }
        }

        Ok(Self { features })
    }

    /// Built-in layout matching the crop recommendation training columns.
    pub fn crop_default() -> Self {
        Self {
            features: vec![
                FeatureDef::new("N").alias("nitrogen"),
                FeatureDef::new("P").alias("phosphorus"),
                FeatureDef::new("K").alias("potassium"),
                FeatureDef::new("temperature"),
                FeatureDef::new("humidity"),
                FeatureDef::new("ph").alias("pH"),
                FeatureDef::new("rainfall"),
            ],
        }
    }

    pub fn features(&self) -> &[FeatureDef] {
        &self.features
    }

    /// Canonical names in training order.
    pub fn names(&self) -> Vec<String> {
        self.features.iter().map(|def| def.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Source of the feature layout served alongside the model.
pub trait FeatureRepo {
    fn get_spec(&self) -> CropResult<FeatureSpec>;
}

impl Default for FeatureSpec {
    fn default() -> Self {
        Self::crop_default()
    }
}

/// One entity to classify: an API payload or a GeoJSON property bag.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputRecord(Map<String, Value>);

impl InputRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Accept only JSON objects; anything else is a malformed request.
    pub fn from_value(value: Value) -> CropResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(CropError::malformed(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Value stored under `key`; an explicit `null` counts as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }
}

impl From<Map<String, Value>> for InputRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Where a canonical feature's value came from.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution<'a> {
    Canonical(&'a Value),
    Alias(&'a str, &'a Value),
    Default(f64),
    Missing,
}

/// Values in training order, plus the names that were filled from defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector {
    pub values: Vec<Value>,
    pub defaulted: Vec<String>,
}

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn used_defaults(&self) -> bool {
        !self.defaulted.is_empty()
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
