//! Service configuration
//!
//! Defaults, then `config/obesity.{toml,yaml,json}` if present, then
//! `OBESITY__<SECTION>__<KEY>` environment variables. `DATABASE_URL`
//! overrides the store connection string last.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use inference_engine::{InferenceError, LabelDecoder};
use serde::Deserialize;
use std::path::PathBuf;
use storage::StoreConfig;
use tracing::Level;

const CONFIG_FILE: &str = "config/obesity";

/// Complete service configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StoreConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Maximum records `GET /predictions` returns
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

fn default_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_recent_limit() -> usize {
    100
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            recent_limit: default_recent_limit(),
        }
    }
}

/// Which classifier implementation scores requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    /// Frozen ONNX artifact
    #[default]
    Onnx,
    /// BMI thresholds, no artifact needed
    Bmi,
}

/// Classifier artifact settings
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub backend: ModelBackend,
    #[serde(default = "default_model_path")]
    pub path: PathBuf,
    /// Class names in the order of the model's output indices
    #[serde(default)]
    pub classes: Option<Vec<String>>,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/obesity_rf_model.onnx")
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: ModelBackend::default(),
            path: default_model_path(),
            classes: None,
        }
    }
}

impl ModelConfig {
    pub fn decoder(&self) -> Result<LabelDecoder, InferenceError> {
        match &self.classes {
            Some(names) => LabelDecoder::from_names(names),
            None => Ok(LabelDecoder::default()),
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    /// Parsed `level`, one of trace/debug/info/warn/error
    pub fn max_level(&self) -> Result<Level, ConfigError> {
        self.level.parse::<Level>().map_err(|_| {
            ConfigError::Message(format!(
                "logging.level {:?} is not one of trace, debug, info, warn, error",
                self.level
            ))
        })
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load from the config file, environment and `DATABASE_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix("OBESITY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("model.classes"),
            )
            .set_override_option("storage.database_url", std::env::var("DATABASE_URL").ok())?;
        Self::from_builder(builder)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.recent_limit == 0 {
            return Err(ConfigError::Message("server.recent_limit must be positive".into()));
        }
        self.model
            .decoder()
            .map_err(|e| ConfigError::Message(format!("model.classes: {}", e)))?;
        self.logging.max_level()?;
        Ok(())
    }
}
