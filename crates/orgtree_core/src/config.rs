//! Configuration system for orgtree
//!
//! Settings for reaching the directory service, batch sizes for id lookups,
//! and department classification, persisted as TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::error::{ConfigError, DirectoryError};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgtreeConfig {
    /// Directory service connection
    #[serde(default)]
    pub service: ServiceConfig,

    /// Request batching limits
    #[serde(default)]
    pub batching: BatchConfig,

    /// Department classification
    #[serde(default)]
    pub classification: ClassificationConfig,
}

/// Directory service connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the directory service
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default)]
    pub internal_api_login: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub internal_api_password: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: f64,

    #[serde(default = "default_timeout")]
    pub timeout_secs: f64,

    /// Only meant for local development against self-signed certificates
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_url() -> String {
    "http://sso".to_string()
}

fn default_connect_timeout() -> f64 {
    2.0
}

fn default_timeout() -> f64 {
    5.0
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            internal_api_login: String::new(),
            internal_api_password: String::new(),
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_timeout(),
            accept_invalid_certs: false,
        }
    }
}

/// Per-request id limits of the directory service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_position_chunk_size")]
    pub position_chunk_size: usize,

    #[serde(default = "default_personnel_chunk_size")]
    pub personnel_chunk_size: usize,

    #[serde(default = "default_department_chunk_size")]
    pub department_chunk_size: usize,

    /// Chunks of one lookup in flight at once; 1 issues them one by one
    #[serde(default = "default_max_concurrent_chunks")]
    pub max_concurrent_chunks: usize,
}

fn default_position_chunk_size() -> usize {
    500
}

fn default_personnel_chunk_size() -> usize {
    1000
}

fn default_department_chunk_size() -> usize {
    500
}

fn default_max_concurrent_chunks() -> usize {
    1
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            position_chunk_size: default_position_chunk_size(),
            personnel_chunk_size: default_personnel_chunk_size(),
            department_chunk_size: default_department_chunk_size(),
            max_concurrent_chunks: default_max_concurrent_chunks(),
        }
    }
}

/// Department classification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// Case-insensitive name fragments marking a brigade
    #[serde(default = "default_brigade_keywords")]
    pub brigade_keywords: Vec<String>,
}

fn default_brigade_keywords() -> Vec<String> {
    vec!["БРИГАДА".to_string(), "УЧАСТОК".to_string()]
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            brigade_keywords: default_brigade_keywords(),
        }
    }
}

impl OrgtreeConfig {
    /// Reject values the engine cannot work with
    pub fn validate(&self, config_path: &str) -> Result<()> {
        let invalid = |field: &str, expected: &str, message: String| {
            DirectoryError::ConfigurationError {
                config_path: config_path.to_string(),
                field: field.to_string(),
                expected: expected.to_string(),
                cause: ConfigError::Invalid(message),
            }
        };

        for (field, size) in [
            ("batching.position_chunk_size", self.batching.position_chunk_size),
            ("batching.personnel_chunk_size", self.batching.personnel_chunk_size),
            ("batching.department_chunk_size", self.batching.department_chunk_size),
            ("batching.max_concurrent_chunks", self.batching.max_concurrent_chunks),
        ] {
            if size == 0 {
                return Err(invalid(field, "a positive integer", format!("{} is 0", field)));
            }
        }

        for (field, secs) in [
            ("service.connect_timeout_secs", self.service.connect_timeout_secs),
            ("service.timeout_secs", self.service.timeout_secs),
        ] {
            if !(secs.is_finite() && secs > 0.0) {
                return Err(invalid(
                    field,
                    "a positive number of seconds",
                    format!("{} is {}", field, secs),
                ));
            }
        }

        Ok(())
    }
}

// Utility functions

/// Load configuration from a TOML file
pub async fn load_config(path: &Path) -> Result<OrgtreeConfig> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        DirectoryError::ConfigurationError {
            config_path: path.display().to_string(),
            field: "file".to_string(),
            expected: "readable TOML file".to_string(),
            cause: ConfigError::Io(e.to_string()),
        }
    })?;

    let config: OrgtreeConfig =
        toml::from_str(&content).map_err(|e| DirectoryError::ConfigurationError {
            config_path: path.display().to_string(),
            field: "content".to_string(),
            expected: "valid TOML configuration".to_string(),
            cause: ConfigError::TomlParse(e.to_string()),
        })?;

    config.validate(&path.display().to_string())?;

    Ok(config)
}

/// Save configuration to a TOML file
pub async fn save_config(config: &OrgtreeConfig, path: &Path) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            DirectoryError::ConfigurationError {
                config_path: parent.display().to_string(),
                field: "directory".to_string(),
                expected: "writable directory".to_string(),
                cause: ConfigError::Io(e.to_string()),
            }
        })?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| DirectoryError::ConfigurationError {
            config_path: path.display().to_string(),
            field: "serialization".to_string(),
            expected: "serializable config structure".to_string(),
            cause: ConfigError::TomlSerialize(e.to_string()),
        })?;

    tokio::fs::write(path, content)
        .await
        .map_err(|e| DirectoryError::ConfigurationError {
            config_path: path.display().to_string(),
            field: "file".to_string(),
            expected: "writable file location".to_string(),
            cause: ConfigError::Io(e.to_string()),
        })?;

    Ok(())
}

/// Standard config file locations
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // Project-specific config
    paths.push(PathBuf::from("orgtree.toml"));

    // User config directory
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("orgtree").join("config.toml"));
    }

    // Home directory fallback
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".orgtree").join("config.toml"));
    }

    paths
}

/// Load configuration from standard locations
pub async fn load_config_from_standard_locations() -> Result<OrgtreeConfig> {
    for path in config_paths() {
        if path.exists() {
            return load_config(&path).await;
        }
    }

    // No config found, return default
    Ok(OrgtreeConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OrgtreeConfig::default();
        assert_eq!(config.service.url, "http://sso");
        assert_eq!(config.batching.position_chunk_size, 500);
        assert_eq!(config.batching.personnel_chunk_size, 1000);
        assert_eq!(config.batching.department_chunk_size, 500);
        assert_eq!(config.batching.max_concurrent_chunks, 1);
        assert!(config.validate("defaults").is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: OrgtreeConfig = toml::from_str(
            r#"
            [service]
            url = "https://directory.example"
            internal_api_login = "svc"

            [batching]
            max_concurrent_chunks = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.service.url, "https://directory.example");
        assert_eq!(config.service.timeout_secs, 5.0);
        assert_eq!(config.batching.personnel_chunk_size, 1000);
        assert_eq!(config.batching.max_concurrent_chunks, 4);
        assert_eq!(config.classification.brigade_keywords.len(), 2);
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        let mut config = OrgtreeConfig::default();
        config.batching.personnel_chunk_size = 0;

        let error = config.validate("orgtree.toml").unwrap_err();
        assert!(matches!(
            error,
            DirectoryError::ConfigurationError { ref field, .. } if field == "batching.personnel_chunk_size"
        ));
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("orgtree.toml");

        let mut config = OrgtreeConfig::default();
        config.service.internal_api_login = "svc".to_string();
        config.batching.max_concurrent_chunks = 3;

        save_config(&config, &path).await.unwrap();
        let loaded = load_config(&path).await.unwrap();

        assert_eq!(loaded.service.internal_api_login, "svc");
        assert_eq!(loaded.batching.max_concurrent_chunks, 3);
    }

    #[tokio::test]
    async fn test_missing_file_is_configuration_error() {
        let error = load_config(Path::new("/definitely/not/here.toml"))
            .await
            .unwrap_err();
        assert!(matches!(error, DirectoryError::ConfigurationError { .. }));
    }
}
