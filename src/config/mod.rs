//! Configuration management for vidfetch
//!
//! Settings are layered:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use vidfetch::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Downloads go to: {}", config.downloads.root.display());
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `VIDFETCH__<section>__<key>`:
//! - `VIDFETCH__SERVER__BIND_ADDR=127.0.0.1:8000`
//! - `VIDFETCH__DOWNLOADS__MAX_CONCURRENT_JOBS=2`
//! - `VIDFETCH__EXTRACTOR__YTDLP_PATH=/opt/bin/yt-dlp`
//!
//! # Configuration File
//!
//! Loaded from `config/vidfetch.toml` unless `VIDFETCH_CONFIG` points elsewhere.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{
    ApiLimits, Config, DownloadConfig, ExtractorConfig, ServerConfig, TelemetryConfig,
};
pub use sources::ConfigSource;
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_source().map(|(config, _)| config)
    }

    /// Like [`Config::load`], also reporting which file was used so the
    /// caller can log it after installing a subscriber.
    pub fn load_with_source() -> Result<(Self, ConfigSource), ConfigError> {
        let (config, source) = sources::load()?;
        validation::validate(&config)?;
        Ok((config, source))
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let (config, _) = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[downloads]\nmax_concurrent_jobs = 1\n").unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.downloads.max_concurrent_jobs, 1);
        assert_eq!(config.server.api.max_url_length, 2048);
    }

    #[test]
    fn test_validation_runs_after_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[downloads]\nmax_concurrent_jobs = 0\n").unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result,
            Err(ConfigError::ValidationError(ValidationError::ZeroConcurrency))
        ));
    }

    #[test]
    fn test_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[downloads]\nmax_concurrent_jobs = \"many\"\n").unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}
