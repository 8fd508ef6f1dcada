use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPaths {
    pub authenticity: PathBuf,
    pub style_effnet: PathBuf,
    pub style_convnext: PathBuf,
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self {
            authenticity: PathBuf::from("trained_models/authenticity_model.pt"),
            style_effnet: PathBuf::from("trained_models/style_model_effnet.pt"),
            style_convnext: PathBuf::from("trained_models/style_model_convnext.pt"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub models: ModelPaths,
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub allowed_extensions: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            models: ModelPaths::default(),
            host: "0.0.0.0".to_string(),
            port: 8081,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_extensions: ["png", "jpg", "jpeg", "gif", "bmp", "tiff"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the YAML file named by `ANALYZER_CONFIG`, then env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var("ANALYZER_CONFIG") {
            Ok(path) => Self::from_yaml_file(PathBuf::from(path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_yaml_file(path: PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_yaml_str(&contents).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_allowed_extension(&self, extension: &str) -> bool {
        let extension = extension.to_ascii_lowercase();
        self.allowed_extensions.iter().any(|allowed| *allowed == extension)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("AUTHENTICITY_MODEL_PATH") {
            self.models.authenticity = PathBuf::from(path);
        }
        if let Some(path) = lookup("STYLE_EFFNET_MODEL_PATH") {
            self.models.style_effnet = PathBuf::from(path);
        }
        if let Some(path) = lookup("STYLE_CONVNEXT_MODEL_PATH") {
            self.models.style_convnext = PathBuf::from(path);
        }
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { key: "PORT", value: port })?;
        }
        if let Some(limit) = lookup("MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = limit.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "MAX_UPLOAD_BYTES",
                value: limit,
            })?;
        }
        Ok(())
    }
}
