//! Domain definitions for prediction requests and their results.

use serde::Serialize;
use tracing::info;

use crate::common::config::AppCfg;
use crate::common::error::CropResult;
use crate::features::{FeatureRepo, FeatureSpec, FsFeatureRepo};
use crate::model::repo_fs::check_compatible;
use crate::model::{Classifier, FsModelRepo, LabelEncoding, ModelRepo};

/// Immutable state shared by every request: feature layout, model and labels.
pub struct AppContext {
    pub spec: FeatureSpec,
    pub classifier: Box<dyn Classifier>,
    pub labels: LabelEncoding,
}

impl AppContext {
    pub fn new(spec: FeatureSpec, classifier: Box<dyn Classifier>, labels: LabelEncoding) -> Self {
        Self {
            spec,
            classifier,
            labels,
        }
    }

    /// Load every artefact named by the configuration; any failure is fatal.
    pub fn load(cfg: &AppCfg) -> CropResult<Self> {
        let models = FsModelRepo::new(cfg);
        let spec = FsFeatureRepo::new(cfg).get_spec()?;
        let forest = models.get_model()?;
        let labels = models.get_labels()?;
        check_compatible(models.model_path(), &forest, &labels, spec.len())?;

        info!(
            model = %models.model_path().display(),
            labels = %models.labels_path().display(),
            classes = labels.len(),
            features = ?spec.names(),
            "model loaded"
        );
        Ok(Self::new(spec, Box::new(forest), labels))
    }
}

/// A decoded prediction for one record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendation {
    #[serde(rename = "recommended_crop")]
    pub crop: String,
    /// Canonical features that were filled from configured defaults.
    #[serde(rename = "defaulted_features", skip_serializing_if = "Vec::is_empty")]
    pub defaulted: Vec<String>,
}

/// Outcome of classifying one record.
pub type PredictionResult = CropResult<Recommendation>;
