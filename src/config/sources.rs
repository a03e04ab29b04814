use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "VIDFETCH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/vidfetch.toml";
const ENV_PREFIX: &str = "VIDFETCH";
const ENV_SEPARATOR: &str = "__";

/// Where the file layer came from; logged once tracing is up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Missing(PathBuf),
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
            }
            ConfigSource::Missing(path) => tracing::warn!(
                "Configuration file not found at {}, using defaults and environment overrides",
                path.display()
            ),
        }
    }
}

/// Load configuration with priority (lowest first):
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. `.env` file (via dotenvy)
/// 4. System environment variables
pub fn load() -> Result<(Config, ConfigSource), ConfigError> {
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    load_from_sources(config_path)
}

/// Load configuration from a specific path plus environment overrides
pub fn load_from_sources(config_path: PathBuf) -> Result<(Config, ConfigSource), ConfigError> {
    let mut builder = config::Config::builder();

    let source = if config_path.exists() {
        builder = builder.add_source(File::from(config_path.as_path()).required(false));
        ConfigSource::File(config_path)
    } else {
        ConfigSource::Missing(config_path)
    };

    // VIDFETCH__DOWNLOADS__ROOT -> downloads.root
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?.try_deserialize()?;
    Ok((config, source))
}
