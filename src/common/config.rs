//! Runtime configuration loaded from the environment and an optional `.env` file.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Output format of the log subscriber.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LogFormat {
    Json,
    Text,
}

/// Snapshot of configuration values consumed by the service.
#[derive(Clone, Debug)]
pub struct AppCfg {
    pub model_path: PathBuf,
    pub label_encoder_path: PathBuf,
    pub feature_spec_path: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
}

impl AppCfg {
    /// Create a configuration snapshot from the process environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a snapshot from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let port = match ["CROP_PORT", "PORT"]
            .into_iter()
            .find_map(|key| lookup(key).map(|value| (key, value)))
        {
            Some((key, value)) => value
                .parse::<u16>()
                .with_context(|| format!("{key} is not a valid port: {value}"))?,
            None => 5000,
        };

        let log_format = match env_or("CROP_LOG_FORMAT", "json").to_ascii_lowercase().as_str() {
            "text" | "pretty" => LogFormat::Text,
            _ => LogFormat::Json,
        };

        Ok(Self {
            model_path: PathBuf::from(env_or("MODEL_PATH", "model.apr")),
            label_encoder_path: PathBuf::from(env_or("LE_PATH", "label_encoder.json")),
            feature_spec_path: lookup("CROP_FEATURE_SPEC")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            host: env_or("CROP_HOST", "0.0.0.0"),
            port,
            log_format,
        })
    }

    /// Socket address the HTTP listener binds to.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
