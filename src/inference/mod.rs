//! Inference domain providing single, batch and GeoJSON prediction.

pub mod domain;
pub mod geojson;
pub mod service;

pub use domain::{AppContext, PredictionResult, Recommendation};
