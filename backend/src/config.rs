use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::inference::Polarity;
use crate::preprocess::InputSize;

pub const DEFAULT_CONFIG_PATH: &str = "config/detector.yaml";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidOverride { key: &'static str, value: String },
    #[error(
        "model.polarity is not set; pin it to the label encoding the model was trained with \
         (high_score_fake or high_score_real)"
    )]
    MissingPolarity,
    #[error("model.candidates is empty; at least one model path is required")]
    NoCandidates,
    #[error("model.input_size must be non-zero, got {0}")]
    EmptyInputSize(InputSize),
    #[error("limits.max_upload_bytes must be non-zero")]
    EmptyUploadLimit,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Ordered list of artifact locations, first loadable one wins.
    pub candidates: Vec<PathBuf>,
    pub input_size: InputSize,
    pub polarity: Option<Polarity>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_upload_bytes: usize,
}

/// Model configuration after startup validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub candidates: Vec<PathBuf>,
    pub input_size: InputSize,
    pub polarity: Polarity,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            candidates: vec![
                PathBuf::from("models/fake_image_detector.pt"),
                PathBuf::from("fake_image_detector.pt"),
            ],
            input_size: InputSize::square(224),
            polarity: None,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl DetectorConfig {
    /// Reads the YAML config (path from `DETECTOR_CONFIG`, falling back to
    /// [`DEFAULT_CONFIG_PATH`]) and applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut config = match std::env::var("DETECTOR_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    log::warn!(
                        "No config file at {}, using built-in defaults",
                        path.display()
                    );
                    Self::default()
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded config from {}", path.display());
        Self::from_yaml_str(&config_str)
    }

    pub fn from_yaml_str(config_str: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(config_str)?)
    }

    /// Applies `HOST`, `PORT`, `MODEL_PATHS`, `MODEL_INPUT_SIZE`,
    /// `MODEL_POLARITY` and `MAX_UPLOAD_BYTES` from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidOverride { key: "PORT", value: port })?;
        }
        if let Some(paths) = lookup("MODEL_PATHS") {
            self.model.candidates = paths
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .collect();
        }
        if let Some(size) = lookup("MODEL_INPUT_SIZE") {
            self.model.input_size = size.parse().map_err(|_| ConfigError::InvalidOverride {
                key: "MODEL_INPUT_SIZE",
                value: size,
            })?;
        }
        if let Some(polarity) = lookup("MODEL_POLARITY") {
            self.model.polarity =
                Some(polarity.parse().map_err(|_| ConfigError::InvalidOverride {
                    key: "MODEL_POLARITY",
                    value: polarity,
                })?);
        }
        if let Some(limit) = lookup("MAX_UPLOAD_BYTES") {
            self.limits.max_upload_bytes =
                limit.trim().parse().map_err(|_| ConfigError::InvalidOverride {
                    key: "MAX_UPLOAD_BYTES",
                    value: limit,
                })?;
        }
        Ok(())
    }

    pub fn model_settings(&self) -> Result<ModelSettings, ConfigError> {
        let polarity = self.model.polarity.ok_or(ConfigError::MissingPolarity)?;
        if self.model.candidates.is_empty() {
            return Err(ConfigError::NoCandidates);
        }
        if self.model.input_size.is_empty() {
            return Err(ConfigError::EmptyInputSize(self.model.input_size));
        }
        if self.limits.max_upload_bytes == 0 {
            return Err(ConfigError::EmptyUploadLimit);
        }
        Ok(ModelSettings {
            candidates: self.model.candidates.clone(),
            input_size: self.model.input_size,
            polarity,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
