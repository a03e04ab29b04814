use super::models::Config;
use thiserror::Error;

const MIN_PAYLOAD_BYTES: u64 = 1024;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("downloads.max_concurrent_jobs must be at least 1")]
    ZeroConcurrency,

    #[error("downloads.root must not be empty")]
    EmptyDownloadRoot,

    #[error("extractor.ytdlp_path must not be empty")]
    EmptyExtractorPath,

    #[error("server.api.max_url_length must be positive")]
    ZeroUrlLength,

    #[error("server.api.max_payload_bytes ({actual}) is below the minimum of {min}")]
    PayloadLimitTooSmall { actual: u64, min: u64 },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_downloads(config)?;
    validate_extractor(config)?;
    validate_api_limits(config)?;
    Ok(())
}

fn validate_downloads(config: &Config) -> Result<(), ValidationError> {
    if config.downloads.max_concurrent_jobs == 0 {
        return Err(ValidationError::ZeroConcurrency);
    }
    if config.downloads.root.as_os_str().is_empty() {
        return Err(ValidationError::EmptyDownloadRoot);
    }
    Ok(())
}

fn validate_extractor(config: &Config) -> Result<(), ValidationError> {
    if config.extractor.ytdlp_path.as_os_str().is_empty() {
        return Err(ValidationError::EmptyExtractorPath);
    }
    Ok(())
}

fn validate_api_limits(config: &Config) -> Result<(), ValidationError> {
    let api = &config.server.api;
    if api.max_url_length == 0 {
        return Err(ValidationError::ZeroUrlLength);
    }
    if api.max_payload_bytes.as_u64() < MIN_PAYLOAD_BYTES {
        return Err(ValidationError::PayloadLimitTooSmall {
            actual: api.max_payload_bytes.as_u64(),
            min: MIN_PAYLOAD_BYTES,
        });
    }
    Ok(())
}
