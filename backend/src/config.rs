use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::diagnosis::DiagnosisError;
use crate::model::ModelError;

pub const CONFIG_PATH_ENV: &str = "DIAGNOSIS_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/diagnosis.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid JSON table: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid class index '{0}'")]
    InvalidIndex(String),
    #[error("Label table is empty")]
    EmptyLabelTable,
    #[error("Invalid PORT value '{0}'")]
    InvalidPort(String),
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
    #[error("Startup self-check failed: {0}")]
    SelfCheck(#[from] DiagnosisError),
}

impl ConfigError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiagnosisConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub tables: TablesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Memory layout the exported model expects for its single input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputLayout {
    #[default]
    Nhwc,
    Nchw,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    pub input_layout: InputLayout,
    /// Apply softmax to raw logits when the exported model has no output activation.
    pub apply_softmax: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("model/plant_disease_model.pt"),
            input_layout: InputLayout::Nhwc,
            apply_softmax: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TablesConfig {
    pub class_indices: PathBuf,
    pub disease_info: PathBuf,
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            class_indices: PathBuf::from("config/class_indices.json"),
            disease_info: PathBuf::from("config/disease_info.json"),
        }
    }
}

impl DiagnosisConfig {
    /// Loads the config file named by `DIAGNOSIS_CONFIG` (or the default path),
    /// then applies the `PORT` override.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            log::warn!(
                "Config file {} not found, using built-in defaults",
                config_path.display()
            );
            Self::default()
        };

        config.apply_port_override(std::env::var("PORT").ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config_str =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let config = Self::from_yaml_str(&config_str)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml_str(config_str: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(config_str)?)
    }

    pub fn apply_port_override(&mut self, port: Option<String>) -> Result<(), ConfigError> {
        if let Some(port) = port {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
