//! Normalisation of heterogeneous records into training-ordered feature vectors.

use crate::common::error::{CropError, CropResult};

use super::domain::{FeatureDef, FeatureSpec, FeatureVector, InputRecord, Resolution};

/// Resolve a single feature: canonical key, then aliases in order, then the default.
pub fn resolve<'a>(def: &'a FeatureDef, record: &'a InputRecord) -> Resolution<'a> {
    if let Some(value) = record.get(&def.name) {
        return Resolution::Canonical(value);
    }
    for alias in &def.aliases {
        if let Some(value) = record.get(alias) {
            return Resolution::Alias(alias, value);
        }
    }
    match def.default {
        Some(value) => Resolution::Default(value),
        None => Resolution::Missing,
    }
}

/// Map a record onto the feature layout, reporting every unresolved feature at once.
///
/// Values are copied through untouched: a non-numeric value is left for the
/// classifier to reject.
pub fn normalize(spec: &FeatureSpec, record: &InputRecord) -> CropResult<FeatureVector> {
    let mut values = Vec::with_capacity(spec.len());
    let mut defaulted = Vec::new();
    let mut missing = Vec::new();

    for def in spec.features() {
        match resolve(def, record) {
            Resolution::Canonical(value) | Resolution::Alias(_, value) => {
                values.push(value.clone())
            }
            Resolution::Default(value) => {
                values.push(value.into());
                defaulted.push(def.name.clone());
            }
            Resolution::Missing => missing.push(def.name.clone()),
        }
    }

    if !missing.is_empty() {
        return Err(CropError::MissingFeatures { missing });
    }

    Ok(FeatureVector { values, defaulted })
}

/// Normalise a batch in order; the first failing record fails the batch.
pub fn normalize_all(
    spec: &FeatureSpec,
    records: &[InputRecord],
) -> CropResult<Vec<FeatureVector>> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| normalize(spec, record).map_err(|err| err.in_batch(index)))
        .collect()
}
