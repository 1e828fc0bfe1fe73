//! Contracts for the trained classifier and its label encoding.
//!
//! Both are loaded once at startup and only ever read afterwards, so they
//! must be shareable across request handlers without locking.

use std::collections::HashSet;
use std::fmt;

use crate::common::error::{CropError, CropResult, InferenceError};
use crate::features::FeatureVector;

use super::forest::RandomForest;

/// Interface for components that map feature vectors to encoded classes.
///
/// Predictions come back in the classifier's own numeric representation and
/// must go through [`ClassId::from_raw`] before any label lookup.
pub trait Classifier: Send + Sync {
    /// Number of columns every input vector must carry.
    fn n_features(&self) -> usize;

    /// Largest class id any prediction can produce.
    fn max_class_id(&self) -> Option<usize>;

    /// Predict one encoded class per row, in row order.
    fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<f32>, InferenceError>;
}

/// Storage for the fitted forest and the label encoding written beside it.
pub trait ModelRepo {
    fn put_model(&self, forest: &RandomForest) -> CropResult<()>;
    fn get_model(&self) -> CropResult<RandomForest>;
    fn get_labels(&self) -> CropResult<LabelEncoding>;
}

/// Native class identifier used as the label lookup key.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ClassId(usize);

impl ClassId {
    pub fn new(raw: usize) -> Self {
        Self(raw)
    }

    /// Convert a classifier output into a lookup key.
    ///
    /// Rejects anything that is not an exact non-negative integer instead of
    /// truncating it.
    pub fn from_raw(raw: f32) -> CropResult<Self> {
        if !raw.is_finite() || raw < 0.0 || raw.fract() != 0.0 || raw > u32::MAX as f32 {
            return Err(CropError::Decode(format!("{raw} is not a class index")));
        }
        Ok(Self(raw as usize))
    }

    pub fn raw(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Ordered class names; position equals the encoded class id.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelEncoding {
    classes: Vec<String>,
}

impl LabelEncoding {
    pub fn new(classes: Vec<String>) -> Result<Self, String> {
        if classes.is_empty() {
            return Err("label encoding declares no classes".to_string());
        }
        let mut seen = HashSet::new();
        for class in &classes {
            if !seen.insert(class.as_str()) {
                return Err(format!("class `{class}` is declared more than once"));
            }
        }
        Ok(Self { classes })
    }

    /// Crop name for an encoded class.
    pub fn decode(&self, id: ClassId) -> CropResult<&str> {
        self.classes
            .get(id.raw())
            .map(String::as_str)
            .ok_or_else(|| {
                CropError::Decode(format!(
                    "class id {id} is outside the {} known classes",
                    self.classes.len()
                ))
            })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::CropCode;

    fn encoding() -> LabelEncoding {
        LabelEncoding::new(vec!["apple".into(), "maize".into(), "rice".into()]).unwrap()
    }

    #[test]
    fn integral_outputs_convert_exactly() {
        assert_eq!(ClassId::from_raw(0.0).unwrap(), ClassId::new(0));
        assert_eq!(ClassId::from_raw(21.0).unwrap().raw(), 21);
    }

    #[test]
    fn non_integral_outputs_are_rejected() {
        for raw in [1.5, -1.0, f32::NAN, f32::INFINITY] {
            let err = ClassId::from_raw(raw).unwrap_err();
            assert_eq!(err.code(), CropCode::Decode);
        }
    }

    #[test]
    fn decode_maps_ids_to_names() {
        let labels = encoding();
        assert_eq!(labels.decode(ClassId::from_raw(2.0).unwrap()).unwrap(), "rice");
        assert_eq!(labels.len(), 3);
    }

    #[test]
    fn unknown_ids_fail_to_decode() {
        let err = encoding().decode(ClassId::new(3)).unwrap_err();
        assert_eq!(err.code(), CropCode::Decode);
        assert!(err.to_string().contains("outside the 3 known classes"));
    }

    #[test]
    fn duplicate_or_empty_classes_are_rejected() {
        assert!(LabelEncoding::new(vec!["rice".into(), "rice".into()]).is_err());
        assert!(LabelEncoding::new(Vec::new()).is_err());
    }
}
