//! GeoJSON FeatureCollection annotation.
//!
//! Each feature is classified on its own. A failing feature gets an error
//! property and the rest of the collection is still processed.

use std::time::Instant;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::common::error::{CropError, CropResult};
use crate::features::domain::json_kind;
use crate::features::InputRecord;

use super::domain::{AppContext, PredictionResult};
use super::service::predict_one;

pub const PROP_CROP: &str = "recommended_crop";
pub const PROP_ERROR: &str = "recommended_crop_error";
pub const PROP_DEFAULTED: &str = "defaulted_features";

/// Check the collection shape before any feature is touched.
fn validate(collection: &Value) -> CropResult<()> {
    let obj = collection
        .as_object()
        .filter(|obj| obj.get("type").and_then(Value::as_str) == Some("FeatureCollection"))
        .ok_or_else(|| CropError::malformed("Expecting FeatureCollection"))?;

    let features = match obj.get("features") {
        None | Some(Value::Null) => return Ok(()),
        Some(Value::Array(features)) => features,
        Some(other) => {
            return Err(CropError::malformed(format!(
                "features must be an array, got {}",
                json_kind(other)
            )))
        }
    };

    for (index, feature) in features.iter().enumerate() {
        let feature = feature.as_object().ok_or_else(|| {
            let kind = json_kind(feature);
            CropError::malformed(format!("feature {index} is {kind}, not an object"))
        })?;
        match feature.get("properties") {
            None | Some(Value::Null) | Some(Value::Object(_)) => {}
            Some(other) => {
                return Err(CropError::malformed(format!(
                    "feature {index} properties must be an object, got {}",
                    json_kind(other)
                )))
            }
        }
    }
    Ok(())
}

/// Write a prediction outcome into a property bag.
fn annotate(properties: &mut Map<String, Value>, result: PredictionResult) {
    match result {
        Ok(rec) => {
            properties.insert(PROP_CROP.to_string(), Value::String(rec.crop));
            if !rec.defaulted.is_empty() {
                properties.insert(PROP_DEFAULTED.to_string(), rec.defaulted.into());
            }
        }
        Err(err) => {
            properties.insert(PROP_ERROR.to_string(), Value::String(err.to_string()));
        }
    }
}

/// Annotate every feature of a collection in place and hand it back.
///
/// Geometry, ids and foreign members are left exactly as received.
pub fn predict_collection(ctx: &AppContext, mut collection: Value) -> CropResult<Value> {
    validate(&collection)?;
    let start = Instant::now();

    let Some(features) = collection.get_mut("features").and_then(Value::as_array_mut) else {
        return Ok(collection);
    };

    let total = features.len();
    let mut failed = 0usize;
    for (index, feature) in features.iter_mut().filter_map(Value::as_object_mut).enumerate() {
        let slot = feature
            .entry("properties")
            .or_insert_with(|| Value::Object(Map::new()));
        if slot.is_null() {
            *slot = Value::Object(Map::new());
        }
        let Some(properties) = slot.as_object_mut() else {
            continue;
        };

        let result = predict_one(ctx, &InputRecord::new(properties.clone()));
        if let Err(err) = &result {
            failed += 1;
            let code = err.code() as u32;
            warn!(feature = index, code, error = %err, "feature not classified");
        }
        annotate(properties, result);
    }

    info!(
        features = total,
        failed,
        dur_ms = start.elapsed().as_millis() as u64,
        "feature collection classified"
    );
    Ok(collection)
}
