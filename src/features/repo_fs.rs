//! Filesystem repository for feature layouts.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::common::config::AppCfg;
use crate::common::error::{CropError, CropResult};

use super::domain::{FeatureDef, FeatureRepo, FeatureSpec};

#[derive(Deserialize)]
struct FeatureSpecFile {
    features: Vec<FeatureDef>,
}

/// Reads a JSON layout when one is configured, the built-in layout otherwise.
pub struct FsFeatureRepo {
    path: Option<PathBuf>,
}

impl FsFeatureRepo {
    pub fn new(cfg: &AppCfg) -> Self {
        Self {
            path: cfg.feature_spec_path.clone(),
        }
    }

    pub fn at(path: Option<&Path>) -> Self {
        Self {
            path: path.map(Path::to_path_buf),
        }
    }

    fn load(path: &Path) -> CropResult<FeatureSpec> {
        let raw = fs::read_to_string(path).map_err(|err| CropError::artifact(path, err))?;
        let file: FeatureSpecFile =
            serde_json::from_str(&raw).map_err(|err| CropError::artifact(path, err))?;
        FeatureSpec::new(file.features).map_err(|reason| CropError::artifact(path, reason))
    }
}

impl FeatureRepo for FsFeatureRepo {
    fn get_spec(&self) -> CropResult<FeatureSpec> {
        match &self.path {
            Some(path) => Self::load(path),
            None => Ok(FeatureSpec::crop_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::common::error::CropCode;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_aliases_and_defaults() {
        let file = write_temp(
            r#"{"features":[
                {"name":"N","aliases":["nitrogen"]},
                {"name":"ph","aliases":["pH"],"default":6.5},
                {"name":"rainfall","default":100}
            ]}"#,
        );
        let spec = FsFeatureRepo::at(Some(file.path())).get_spec().unwrap();
        assert_eq!(spec.names(), vec!["N", "ph", "rainfall"]);
        assert_eq!(spec.features()[1].default, Some(6.5));
        assert_eq!(spec.features()[2].default, Some(100.0));
        assert!(spec.features()[2].aliases.is_empty());
    }

    #[test]
    fn invalid_layout_is_an_artifact_error() {
        let file = write_temp(r#"{"features":[{"name":"N"},{"name":"N"}]}"#);
        let err = FsFeatureRepo::at(Some(file.path())).get_spec().unwrap_err();
        assert_eq!(err.code(), CropCode::Artifact);
    }

    #[test]
    fn unreadable_file_is_an_artifact_error() {
        let repo = FsFeatureRepo::at(Some(Path::new("/nonexistent/features.json")));
        assert_eq!(repo.get_spec().unwrap_err().code(), CropCode::Artifact);
    }

    #[test]
    fn no_path_means_builtin_layout() {
        assert_eq!(FsFeatureRepo::at(None).get_spec().unwrap(), FeatureSpec::crop_default());
    }
}
