use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Metadata returned by a probe. Missing or null fields deserialize as `None`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VideoMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub view_count: Option<u64>,
    /// Label of the format the selector resolved to
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub formats: Vec<FormatEntry>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FormatEntry {
    #[serde(default)]
    pub format_id: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    /// Total bitrate in kbit/s
    #[serde(default)]
    pub tbr: Option<f64>,
}

impl FormatEntry {
    /// The extractor marks absent tracks with the codec name `none`
    pub fn has_video(&self) -> bool {
        self.vcodec.as_deref() != Some("none")
    }

    pub fn has_audio(&self) -> bool {
        self.acodec.as_deref() != Some("none")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferProgress {
    pub percent: String,
    pub speed: String,
    pub eta: String,
}

impl Default for TransferProgress {
    fn default() -> Self {
        Self {
            percent: "0%".to_string(),
            speed: "N/A".to_string(),
            eta: "N/A".to_string(),
        }
    }
}

/// Progress reported while a download runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Transfer(TransferProgress),
    /// One stream finished transferring; more may follow
    TransferFinished,
    /// Muxing or another post-processing step started
    PostProcessing { step: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
}

impl DownloadedFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
