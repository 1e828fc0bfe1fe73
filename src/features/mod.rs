//! Feature domain: the trained column layout and record normalisation.

pub mod domain;
pub mod repo_fs;
pub mod service;

pub use domain::{FeatureDef, FeatureRepo, FeatureSpec, FeatureVector, InputRecord};
pub use repo_fs::FsFeatureRepo;
pub use service::normalize;
