//! Video extraction backend
//!
//! The extractor owns everything network- and codec-related: metadata queries,
//! stream negotiation, transfer and muxing. This crate only sequences calls to
//! it through the [`Extractor`] trait, so tests can substitute a fake.

mod error;
mod models;
mod ytdlp;

pub use error::{ExtractError, Result};
pub use models::{DownloadedFile, FormatEntry, ProgressEvent, TransferProgress, VideoMetadata};
pub use ytdlp::YtDlp;

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;

use crate::policy::FormatPolicy;

pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

#[async_trait]
pub trait Extractor: Send + Sync {
    /// Metadata-only query; transfers no media
    async fn probe(&self, url: &str, policy: &FormatPolicy) -> Result<VideoMetadata>;

    /// Download and merge into `output_dir`, reporting progress in order.
    /// The sender is dropped when the call returns.
    async fn download(
        &self,
        url: &str,
        output_dir: &Path,
        policy: &FormatPolicy,
        progress: ProgressSender,
    ) -> Result<DownloadedFile>;
}
