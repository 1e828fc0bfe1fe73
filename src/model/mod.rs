//! Model domain: the persisted classifier and its label encoding.

pub mod domain;
pub mod forest;
pub mod repo_fs;

pub use domain::{ClassId, Classifier, LabelEncoding, ModelRepo};
pub use forest::{ForestParams, RandomForest, TrainingSet};
pub use repo_fs::FsModelRepo;
