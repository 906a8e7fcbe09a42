//! Service configuration: JSON file with per-field defaults, then environment overrides.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listen address for the HTTP boundary
    pub bind_addr: SocketAddr,
    /// Directory holding feature_schema.json, classifier.json, label_encoder.json
    pub artifact_dir: PathBuf,
    /// Refuse to start when the artifact fails to load; otherwise serve 503s
    pub require_model: bool,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            artifact_dir: PathBuf::from("artifacts"),
            require_model: true,
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl ServiceConfig {
    /// Load from JSON file if present; otherwise return default. A file that
    /// exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `GEOFENCE_RISK_BIND`, `PORT` and `GEOFENCE_RISK_ARTIFACT_DIR`.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|var| std::env::var(var).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(value) = lookup("GEOFENCE_RISK_BIND") {
            self.bind_addr = value.parse().map_err(|_| ConfigError::Env {
                var: "GEOFENCE_RISK_BIND",
                value,
            })?;
        }
        if let Some(value) = lookup("PORT") {
            let port = value.parse().map_err(|_| ConfigError::Env { var: "PORT", value })?;
            self.bind_addr.set_port(port);
        }
        if let Some(value) = lookup("GEOFENCE_RISK_ARTIFACT_DIR") {
            self.artifact_dir = PathBuf::from(value);
        }
        Ok(self)
    }
}
