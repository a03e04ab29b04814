use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub downloads: DownloadConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default)]
    pub api: ApiLimits,
}

/// Request limits for the JSON endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiLimits {
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: ByteSize,
    #[serde(default = "default_max_url_length")]
    pub max_url_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            api: ApiLimits::default(),
        }
    }
}

impl Default for ApiLimits {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
            max_url_length: default_max_url_length(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn default_max_payload_bytes() -> ByteSize {
    ByteSize::kib(64)
}

fn default_max_url_length() -> usize {
    2048
}

/// Where files land and how many downloads run at once
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadConfig {
    #[serde(default = "default_download_root")]
    pub root: PathBuf,
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
    /// How long shutdown waits for in-flight downloads
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl DownloadConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            root: default_download_root(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

fn default_download_root() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_max_concurrent_jobs() -> usize {
    4
}

fn default_drain_timeout_secs() -> u64 {
    30
}

/// External extractor invocation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractorConfig {
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: PathBuf,
    /// Directory or binary path of the muxer, if not on PATH
    #[serde(default)]
    pub ffmpeg_location: Option<PathBuf>,
    #[serde(default)]
    pub socket_timeout_secs: Option<u64>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: default_ytdlp_path(),
            ffmpeg_location: None,
            socket_timeout_secs: None,
        }
    }
}

fn default_ytdlp_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// `tracing` env-filter directive, e.g. `vidfetch=debug,tower_http=info`
    #[serde(default)]
    pub log_filter: Option<String>,
}
