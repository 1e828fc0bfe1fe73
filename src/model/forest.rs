//! Random forest classifier backed by `aprender`.
//!
//! The persisted artefact wraps a fitted [`RandomForestClassifier`] together
//! with the column count it was trained on and an optional per-column scale
//! divisor applied before the trees see a row.

use aprender::primitives::Matrix;
use aprender::tree::RandomForestClassifier;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::error::InferenceError;
use crate::features::FeatureVector;

use super::domain::Classifier;

/// Hyper-parameters for [`RandomForest::fit`].
#[derive(Clone, Debug)]
pub struct ForestParams {
    pub trees: usize,
    pub max_depth: Option<usize>,
    pub seed: u64,
    /// Divisors applied column-wise before fitting and predicting.
    pub scale: Option<Vec<f64>>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            trees: 10,
            max_depth: None,
            seed: 42,
            scale: None,
        }
    }
}

/// Labelled rows and fitting options as stored in a training file.
#[derive(Clone, Debug, Deserialize)]
pub struct TrainingSet {
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<usize>,
    #[serde(default)]
    pub scale: Option<Vec<f64>>,
    #[serde(default)]
    pub trees: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl TrainingSet {
    pub fn fit(self) -> Result<RandomForest, String> {
        let defaults = ForestParams::default();
        let params = ForestParams {
            trees: self.trees.unwrap_or(defaults.trees),
            seed: self.seed.unwrap_or(defaults.seed),
            scale: self.scale,
            ..defaults
        };
        RandomForest::fit(&self.rows, &self.labels, params)
    }
}

/// Majority-vote ensemble; only obtainable fitted and validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ForestParts")]
pub struct RandomForest {
    n_features: usize,
    n_classes: usize,
    scale: Option<Vec<f64>>,
    model: RandomForestClassifier,
}

/// Wire layout of [`RandomForest`], checked before it becomes one.
#[derive(Deserialize)]
struct ForestParts {
    n_features: usize,
    n_classes: usize,
    scale: Option<Vec<f64>>,
    model: RandomForestClassifier,
}

impl TryFrom<ForestParts> for RandomForest {
    type Error = String;

    fn try_from(parts: ForestParts) -> Result<Self, String> {
        let forest = Self {
            n_features: parts.n_features,
            n_classes: parts.n_classes,
            scale: parts.scale,
            model: parts.model,
        };
        forest.validate()?;
        Ok(forest)
    }
}

impl RandomForest {
    /// Fit an ensemble on numeric rows and their class ids.
    pub fn fit(rows: &[Vec<f64>], labels: &[usize], params: ForestParams) -> Result<Self, String> {
        let n_features = rows
            .first()
            .map(Vec::len)
            .ok_or("cannot fit a forest on zero rows")?;
        if rows.len() != labels.len() {
            return Err(format!("{} rows but {} labels", rows.len(), labels.len()));
        }
        if let Some(row) = rows.iter().position(|row| row.len() != n_features) {
            return Err(format!("row {row} does not have {n_features} columns"));
        }

        let mut model = RandomForestClassifier::new(params.trees).with_random_state(params.seed);
        if let Some(depth) = params.max_depth {
            model = model.with_max_depth(depth);
        }
        let mut forest = Self {
            n_features,
            n_classes: labels.iter().max().map_or(0, |max| max + 1),
            scale: params.scale,
            model,
        };
        forest.check_scale()?;

        let mut data = Vec::with_capacity(rows.len() * n_features);
        for row in rows {
            forest.push_scaled(row, &mut data);
        }
        let x = Matrix::from_vec(rows.len(), n_features, data).map_err(str::to_string)?;
        forest.model.fit(&x, labels).map_err(|err| err.to_string())?;

        forest.validate()?;
        Ok(forest)
    }

    pub fn scale(&self) -> Option<&[f64]> {
        self.scale.as_deref()
    }

    /// Structural checks; every forest handed out has passed them.
    fn validate(&self) -> Result<(), String> {
        if self.n_features == 0 {
            return Err("forest declares no features".to_string());
        }
        if self.n_classes == 0 {
            return Err("forest declares no classes".to_string());
        }
        self.check_scale()?;
        match self.model.feature_importances() {
            None => Err("forest has not been fitted".to_string()),
            Some(columns) if columns.len() != self.n_features => Err(format!(
                "trees were fitted on {} features but the forest declares {}",
                columns.len(),
                self.n_features
            )),
            Some(_) => Ok(()),
        }
    }

    fn check_scale(&self) -> Result<(), String> {
        let Some(scale) = &self.scale else {
            return Ok(());
        };
        if scale.len() != self.n_features {
            return Err(format!(
                "scale has {} entries for {} features",
                scale.len(),
                self.n_features
            ));
        }
        if scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err("scale entries must be finite and non-zero".to_string());
        }
        Ok(())
    }

    fn push_scaled(&self, row: &[f64], out: &mut Vec<f32>) {
        match &self.scale {
            Some(scale) => out.extend(row.iter().zip(scale).map(|(x, s)| (x / s) as f32)),
            None => out.extend(row.iter().map(|x| *x as f32)),
        }
    }

    /// Turn a vector of raw JSON scalars into a numeric row.
    fn to_row(&self, vector: &FeatureVector) -> Result<Vec<f64>, InferenceError> {
        if vector.len() != self.n_features {
            return Err(InferenceError::Shape {
                expected: self.n_features,
                actual: vector.len(),
            });
        }

        vector
            .values
            .iter()
            .enumerate()
            .map(|(position, value)| {
                match value {
                    Value::Number(n) => n.as_f64(),
                    _ => None,
                }
                .ok_or_else(|| InferenceError::NonNumeric {
                    position,
                    value: value.to_string(),
                })
            })
            .collect()
    }
}

/// Index of the highest vote share in `row`; ties go to the lowest class id.
fn argmax(proba: &Matrix<f32>, row: usize) -> usize {
    let mut best = 0;
    for class in 1..proba.n_cols() {
        if proba.get(row, class) > proba.get(row, best) {
            best = class;
        }
    }
    best
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn max_class_id(&self) -> Option<usize> {
        self.n_classes.checked_sub(1)
    }

    fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<f32>, InferenceError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut data = Vec::with_capacity(rows.len() * self.n_features);
        for vector in rows {
            let row = self.to_row(vector)?;
            self.push_scaled(&row, &mut data);
        }
        let x = Matrix::from_vec(rows.len(), self.n_features, data)
            .map_err(|reason| InferenceError::Backend(reason.to_string()))?;

        let proba = self.model.predict_proba(&x);
        Ok((0..rows.len())
            .map(|row| argmax(&proba, row) as f32)
            .collect())
    }
}
