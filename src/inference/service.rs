//! Prediction dispatch: normalise, classify, decode.

use std::time::Instant;

use tracing::{debug, info};

use crate::common::error::{CropError, CropResult};
use crate::features::service::{normalize, normalize_all};
use crate::features::{FeatureVector, InputRecord};
use crate::model::ClassId;

use super::domain::{AppContext, PredictionResult, Recommendation};

/// Run the classifier over normalised vectors and decode every prediction.
///
/// The raw classifier output is converted to a native [`ClassId`] before it
/// touches the label encoding.
pub fn classify(
    ctx: &AppContext,
    vectors: Vec<FeatureVector>,
) -> CropResult<Vec<Recommendation>> {
    let raw = ctx.classifier.predict(&vectors)?;
    if raw.len() != vectors.len() {
        return Err(CropError::Internal(format!(
            "classifier returned {} predictions for {} rows",
            raw.len(),
            vectors.len()
        )));
    }

    raw.into_iter()
        .zip(vectors)
        .map(|(raw, vector)| {
            let id = ClassId::from_raw(raw)?;
            let crop = ctx.labels.decode(id)?.to_string();
            Ok(Recommendation {
                crop,
                defaulted: vector.defaulted,
            })
        })
        .collect()
}

/// Classify a single record.
pub fn predict_one(ctx: &AppContext, record: &InputRecord) -> PredictionResult {
    let vector = normalize(&ctx.spec, record)?;
    if vector.used_defaults() {
        debug!(defaulted = ?vector.defaulted, "prediction uses default feature values");
    }
    let mut out = classify(ctx, vec![vector])?;
    out.pop()
        .ok_or_else(|| CropError::Internal("classifier returned no rows".into()))
}

/// Classify a batch; any record that fails normalisation fails the batch.
pub fn predict_batch(
    ctx: &AppContext,
    records: &[InputRecord],
) -> CropResult<Vec<Recommendation>> {
    let start = Instant::now();
    let vectors = normalize_all(&ctx.spec, records)?;
    let out = classify(ctx, vectors)?;
    info!(
        records = records.len(),
        dur_ms = start.elapsed().as_millis() as u64,
        "batch classified"
    );
    Ok(out)
}
