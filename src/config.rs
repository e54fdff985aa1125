use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::FeatureDefaults;
use crate::ml::ConfidencePolicy;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    /// Feature store; the random-record and listing endpoints need it
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    /// Fallbacks for sentinel values in stored records
    #[serde(default)]
    pub defaults: FeatureDefaults,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Load in the background at startup; requests before completion get 503
    Eager,
    /// Load on the first prediction request
    Lazy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Path to the model manifest (JSON)
    pub manifest_path: PathBuf,
    #[serde(default = "default_load_mode")]
    pub load_mode: LoadMode,
    /// Upper bound on reading the artifact from storage
    #[serde(default = "default_load_timeout_secs")]
    pub load_timeout_secs: u64,
    /// Reject categorical values outside the training vocabulary instead of
    /// zero-filling their indicator columns
    #[serde(default)]
    pub strict_categories: bool,
    #[serde(default = "default_confidence_high")]
    pub confidence_high: f64,
    #[serde(default = "default_confidence_medium")]
    pub confidence_medium: f64,
}

fn default_load_mode() -> LoadMode {
    LoadMode::Eager
}

fn default_load_timeout_secs() -> u64 {
    30
}

fn default_confidence_high() -> f64 {
    0.80
}

fn default_confidence_medium() -> f64 {
    0.60
}

impl ModelConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    pub fn confidence_policy(&self) -> ConfidencePolicy {
        ConfidencePolicy {
            high: self.confidence_high,
            medium: self.confidence_medium,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from("models/dam_risk/manifest.json"),
            load_mode: default_load_mode(),
            load_timeout_secs: default_load_timeout_secs(),
            strict_categories: false,
            confidence_high: default_confidence_high(),
            confidence_medium: default_confidence_medium(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Apply pending migrations at startup
    #[serde(default)]
    pub migrate: bool,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("model.manifest_path", "models/dam_risk/manifest.json")?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("HYDRORISK_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (HYDRORISK_MODEL__MANIFEST_PATH, etc.)
            .add_source(
                Environment::with_prefix("HYDRORISK")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Configuration for local runs without a config directory
    pub fn default_config(manifest_path: &Path) -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            model: ModelConfig {
                manifest_path: manifest_path.to_path_buf(),
                ..ModelConfig::default()
            },
            database: None,
            defaults: FeatureDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("server.port must be non-zero".to_string());
        }

        if self.model.manifest_path.as_os_str().is_empty() {
            errors.push("model.manifest_path must be set".to_string());
        }

        if self.model.load_timeout_secs == 0 {
            errors.push("model.load_timeout_secs must be positive".to_string());
        }

        if let Err(e) = self.model.confidence_policy().validate() {
            errors.push(format!("model: {e}"));
        }

        if let Some(db) = &self.database {
            if db.url.trim().is_empty() {
                errors.push("database.url must not be empty".to_string());
            }
            if db.max_connections == 0 {
                errors.push("database.max_connections must be positive".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
