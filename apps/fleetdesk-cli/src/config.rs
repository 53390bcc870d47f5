//! Layered configuration.
//!
//! Order of precedence (lowest first): struct defaults, the YAML file given
//! with `--config`, `FLEETDESK__*` environment variables (`__` separates
//! nesting levels), command line flags.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use fleetdesk_backend::BackendConfig;
use inventory::InventoryConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_PREFIX: &str = "FLEETDESK__";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file does not exist: {}", .0.display())]
    Missing(PathBuf),

    #[error("failed to parse configuration: {0}")]
    Parse(Box<figment::Error>),

    #[error("failed to render configuration as yaml: {0}")]
    Render(String),

    #[error("invalid logging configuration: {0}")]
    Logging(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive for stderr output, e.g. `info` or `inventory=debug,warn`.
    /// `RUST_LOG` takes precedence when set.
    pub console_level: String,
    pub format: LogFormat,
    /// Optional log file, rotated daily next to the given path.
    pub file: Option<PathBuf>,
    pub file_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            console_level: "warn".to_owned(),
            format: LogFormat::Text,
            file: None,
            file_level: "info".to_owned(),
        }
    }
}

/// Effective configuration of the console.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub inventory: InventoryConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load defaults, then the optional YAML file, then the environment.
    ///
    /// Defaults come from `#[serde(default)]` rather than a serialized
    /// provider: the serialized form redacts secrets.
    ///
    /// # Errors
    /// [`ConfigError::Missing`] for a path that is not a file,
    /// [`ConfigError::Parse`] for malformed YAML or values of the wrong type.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigError::Missing(path.to_path_buf()));
            }
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigError::Parse(Box::new(e)))
    }

    /// `-v` info, `-vv` debug, `-vvv` trace; no flag keeps the configured level.
    pub fn apply_cli_overrides(&mut self, verbose: u8) {
        let level = match verbose {
            0 => return,
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        level.clone_into(&mut self.logging.console_level);
    }

    /// # Errors
    /// [`ConfigError::Render`] when serialization fails.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_saphyr::to_string(self).map_err(|e| ConfigError::Render(e.to_string()))
    }
}
