//! Error handling primitives shared across the service.
//!
//! Every failure the service can surface maps to one `CropError` variant and
//! a stable `CropCode`, so callers can branch on the kind rather than on the
//! message text.

use std::path::PathBuf;

use thiserror::Error;

/// Stable error codes reported alongside error payloads and log events.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CropCode {
    /// One or more canonical features could not be resolved.
    MissingFeatures = 1,
    /// The request body was not the JSON shape the endpoint expects.
    MalformedRequest = 2,
    /// The classifier rejected the feature vector.
    Inference = 3,
    /// A predicted class id could not be mapped back to a crop name.
    Decode = 4,
    /// A persisted artefact was missing or invalid at startup.
    Artifact = 5,
    /// Catch-all for bugs and runtime plumbing failures.
    Internal = 6,
}

/// Failures raised by the classifier itself.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum InferenceError {
    #[error("expected {expected} features, got {actual}")]
    Shape { expected: usize, actual: usize },
    #[error("feature at position {position} is not numeric: {value}")]
    NonNumeric { position: usize, value: String },
    #[error("classifier failed: {0}")]
    Backend(String),
}

/// Canonical error type for the service.
#[derive(Debug, Error)]
pub enum CropError {
    #[error("missing features: {}", .missing.join(", "))]
    MissingFeatures { missing: Vec<String> },

    #[error("{0}")]
    MalformedRequest(String),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("cannot decode class id: {0}")]
    Decode(String),

    #[error("artefact {}: {reason}", .path.display())]
    Artifact { path: PathBuf, reason: String },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("record {index}: {source}")]
    Batch {
        index: usize,
        #[source]
        source: Box<CropError>,
    },
}

/// Result alias used throughout the crate.
pub type CropResult<T> = Result<T, CropError>;

impl CropError {
    /// Validation helper for request bodies.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRequest(msg.into())
    }

    /// Artefact helper used by the filesystem loaders.
    pub fn artifact(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Artifact {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Tag a per-record failure with its position in a batch.
    pub fn in_batch(self, index: usize) -> Self {
        Self::Batch {
            index,
            source: Box::new(self),
        }
    }

    /// Machine readable code; batch failures report the wrapped code.
    pub fn code(&self) -> CropCode {
        match self {
            CropError::MissingFeatures { .. } => CropCode::MissingFeatures,
            CropError::MalformedRequest(_) => CropCode::MalformedRequest,
            CropError::Inference(_) => CropCode::Inference,
            CropError::Decode(_) => CropCode::Decode,
            CropError::Artifact { .. } => CropCode::Artifact,
            CropError::Internal(_) => CropCode::Internal,
            CropError::Batch { source, .. } => source.code(),
        }
    }

    /// Whether the caller can fix the failure by changing the request.
    pub fn is_client_error(&self) -> bool {
        match self {
            CropError::Inference(InferenceError::Backend(_)) => false,
            CropError::Batch { source, .. } => source.is_client_error(),
            _ => matches!(
                self.code(),
                CropCode::MissingFeatures | CropCode::MalformedRequest | CropCode::Inference
            ),
        }
    }

    /// Canonical feature names behind a missing-feature failure, if any.
    pub fn missing(&self) -> Option<&[String]> {
        match self {
            CropError::MissingFeatures { missing } => Some(missing),
            CropError::Batch { source, .. } => source.missing(),
            _ => None,
        }
    }
}
