//! Filesystem repository for the persisted model and label encoding.
//!
//! The forest lives in an `.apr` container written by `aprender`, which
//! checksums the payload; the label encoding is plain JSON.

use std::fs;
use std::path::{Path, PathBuf};

use aprender::format::{self, ModelType, SaveOptions};
use serde::Deserialize;

use crate::common::config::AppCfg;
use crate::common::error::{CropError, CropResult};

use super::domain::{Classifier, LabelEncoding, ModelRepo};
use super::forest::{RandomForest, TrainingSet};

#[derive(Deserialize)]
struct LabelEncodingFile {
    classes: Vec<String>,
}

/// Read the artefacts named by the configuration from local disk.
pub struct FsModelRepo {
    model_path: PathBuf,
    labels_path: PathBuf,
}

impl FsModelRepo {
    pub fn new(cfg: &AppCfg) -> Self {
        Self::at(&cfg.model_path, &cfg.label_encoder_path)
    }

    pub fn at(model_path: impl Into<PathBuf>, labels_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            labels_path: labels_path.into(),
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn labels_path(&self) -> &Path {
        &self.labels_path
    }
}

impl ModelRepo for FsModelRepo {
    fn put_model(&self, forest: &RandomForest) -> CropResult<()> {
        format::save(
            forest,
            ModelType::RandomForest,
            &self.model_path,
            SaveOptions::default(),
        )
        .map_err(|err| CropError::artifact(self.model_path.as_path(), err))
    }

    fn get_model(&self) -> CropResult<RandomForest> {
        format::load(&self.model_path, ModelType::RandomForest)
            .map_err(|err| CropError::artifact(self.model_path.as_path(), err))
    }

    fn get_labels(&self) -> CropResult<LabelEncoding> {
        let path = self.labels_path.as_path();
        let raw = fs::read(path).map_err(|err| CropError::artifact(path, err))?;
        let file: LabelEncodingFile =
            serde_json::from_slice(&raw).map_err(|err| CropError::artifact(path, err))?;
        LabelEncoding::new(file.classes).map_err(|reason| CropError::artifact(path, reason))
    }
}

/// Read labelled rows used to fit a forest.
pub fn load_training_set(path: &Path) -> CropResult<TrainingSet> {
    let raw = fs::read(path).map_err(|err| CropError::artifact(path, err))?;
    serde_json::from_slice(&raw).map_err(|err| CropError::artifact(path, err))
}

/// Cross-check a classifier against its encoding and the configured feature count.
pub fn check_compatible(
    model_path: &Path,
    classifier: &dyn Classifier,
    labels: &LabelEncoding,
    n_features: usize,
) -> CropResult<()> {
    if classifier.n_features() != n_features {
        return Err(CropError::artifact(
            model_path,
            format!(
                "model expects {} features but the feature spec lists {n_features}",
                classifier.n_features()
            ),
        ));
    }
    if let Some(max) = classifier.max_class_id() {
        if max >= labels.len() {
            return Err(CropError::artifact(
                model_path,
                format!(
                    "model predicts class id {max} but the encoding has {} classes",
                    labels.len()
                ),
            ));
        }
    }
    Ok(())
}
