use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to launch {binary}: {source}")]
    Launch {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// Failure reported by the extractor itself (unsupported URL, private video, ...)
    #[error("{0}")]
    Failed(String),

    #[error("extractor returned malformed metadata: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("extractor finished without reporting an output file")]
    MissingOutput,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExtractError>;
