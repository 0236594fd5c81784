//! # cfghook Backend Configuration
//!
//! [`BackendConfig`] holds the options that drive plugin discovery and the
//! snapshot identities used by commits. It is read from a JSON, TOML or YAML
//! file (chosen by extension, see [`ConfigFormat`]) and may be overridden from
//! the command line by the host.
pub mod error;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::kernel::constants;
pub use error::ConfigError;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

/// Options of the plugin backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Directory holding application plugins
    pub backend_dir: PathBuf,
    /// System plugin directory, loaded before `backend_dir`
    pub system_dir: Option<PathBuf>,
    /// Plugin (file stem) loaded first with globally visible symbols
    pub master_plugin: Option<String>,
    /// File extension of plugin artifacts, without the dot
    pub plugin_extension: String,
    /// Snapshot identity of the committed configuration
    pub running_db: String,
    /// Snapshot identity of the configuration being committed
    pub candidate_db: String,
    /// Call the reset hooks after init and before start
    pub reset_on_start: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            backend_dir: PathBuf::from(constants::DEFAULT_BACKEND_DIR),
            system_dir: None,
            master_plugin: None,
            plugin_extension: std::env::consts::DLL_EXTENSION.to_string(),
            running_db: constants::RUNNING_DB.to_string(),
            candidate_db: constants::CANDIDATE_DB.to_string(),
            reset_on_start: false,
        }
    }
}

impl BackendConfig {
    /// Config with defaults and the given plugin directory
    pub fn with_backend_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            backend_dir: dir.into(),
            ..Self::default()
        }
    }

    /// Plugin directories in load order: system directory first.
    pub fn plugin_dirs(&self) -> Vec<PathBuf> {
        self.system_dir
            .iter()
            .cloned()
            .chain(std::iter::once(self.backend_dir.clone()))
            .collect()
    }

    /// Load configuration from a file, picking the format from its extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::deserialize(&content, format)
    }

    /// Deserialize from string based on format
    pub fn deserialize(data: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        match format {
            ConfigFormat::Json => serde_json::from_str(data).map_err(|e| ConfigError::DeserializationError {
                format: "JSON".to_string(),
                source: Box::new(e),
            }),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data).map_err(|e| ConfigError::DeserializationError {
                format: "YAML".to_string(),
                source: Box::new(e),
            }),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data).map_err(|e| ConfigError::DeserializationError {
                format: "TOML".to_string(),
                source: Box::new(e),
            }),
        }
    }

    /// Serialize to string based on format
    pub fn serialize(&self, format: ConfigFormat) -> Result<String, ConfigError> {
        match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializationError {
                format: "JSON".to_string(),
                source: Box::new(e),
            }),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::to_string(self).map_err(|e| ConfigError::SerializationError {
                format: "YAML".to_string(),
                source: Box::new(e),
            }),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(|e| ConfigError::SerializationError {
                format: "TOML".to_string(),
                source: Box::new(e),
            }),
        }
    }
}
