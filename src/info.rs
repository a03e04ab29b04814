//! Info resolver: one-shot metadata preview for a URL

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::extractor::{Extractor, FormatEntry, VideoMetadata};
use crate::humanize::round2;
use crate::policy::FormatPolicy;

const QHD_HEIGHT: u32 = 1440;
const FHD_HEIGHT: u32 = 1080;
const UNKNOWN: &str = "Unknown";

/// Capability summary derived from a probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoSummary {
    pub title: String,
    /// Seconds
    pub duration: u64,
    pub thumbnail: String,
    pub uploader: String,
    pub view_count: u64,
    pub has_2k_vp9: bool,
    pub has_2k: bool,
    pub has_1080p_vp9: bool,
    pub has_1080p: bool,
    pub selected_format: String,
    pub resolution: String,
    pub best_height: u32,
    pub best_fps: f64,
    pub best_vcodec: String,
    /// kbit/s, two decimals, zero when unknown
    pub best_bitrate: f64,
    pub best_acodec: String,
}

/// Preview result; failures carry the extractor's message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: Option<InfoSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InfoResponse {
    pub fn success(summary: InfoSummary) -> Self {
        Self {
            success: true,
            summary: Some(summary),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            summary: None,
            error: Some(error.into()),
        }
    }
}

/// Probe `url` and summarize. Never fails: extractor errors become a failure response.
///
/// The caller rejects empty URLs before getting here.
pub async fn resolve(extractor: &dyn Extractor, policy: &FormatPolicy, url: &str) -> InfoResponse {
    match extractor.probe(url, policy).await {
        Ok(metadata) => {
            let summary = summarize(&metadata, policy);
            debug!(url, best_height = summary.best_height, "Resolved video info");
            InfoResponse::success(summary)
        }
        Err(e) => {
            warn!(url, error = %e, "Metadata probe failed");
            InfoResponse::failure(e.to_string())
        }
    }
}

pub fn summarize(metadata: &VideoMetadata, policy: &FormatPolicy) -> InfoSummary {
    let formats = &metadata.formats;
    let best = best_video(formats);

    InfoSummary {
        title: text_or_unknown(&metadata.title),
        duration: metadata.duration.map(|d| d.max(0.0) as u64).unwrap_or(0),
        thumbnail: metadata.thumbnail.clone().unwrap_or_default(),
        uploader: text_or_unknown(&metadata.uploader),
        view_count: metadata.view_count.unwrap_or(0),
        has_2k_vp9: has_tier(formats, QHD_HEIGHT, Some(policy)),
        has_2k: has_tier(formats, QHD_HEIGHT, None),
        has_1080p_vp9: has_tier(formats, FHD_HEIGHT, Some(policy)),
        has_1080p: has_tier(formats, FHD_HEIGHT, None),
        selected_format: text_or_unknown(&metadata.format),
        resolution: text_or_unknown(&metadata.resolution),
        best_height: best.height,
        best_fps: best.fps,
        best_vcodec: best.vcodec,
        best_bitrate: best.bitrate_kbps,
        best_acodec: best_audio_codec(formats),
    }
}

fn text_or_unknown(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| UNKNOWN.to_string())
}

/// A tier is present when some video format has exactly `height` and, when a
/// policy is given, a codec from its preferred family.
fn has_tier(formats: &[FormatEntry], height: u32, preferred: Option<&FormatPolicy>) -> bool {
    formats.iter().any(|f| {
        f.height == Some(height)
            && f.has_video()
            && preferred.is_none_or(|policy| {
                f.vcodec
                    .as_deref()
                    .is_some_and(|codec| policy.is_preferred_video_codec(codec))
            })
    })
}

struct BestVideo {
    height: u32,
    fps: f64,
    vcodec: String,
    bitrate_kbps: f64,
}

/// Tallest video track; on equal heights the later entry wins
fn best_video(formats: &[FormatEntry]) -> BestVideo {
    let mut best = BestVideo {
        height: 0,
        fps: 0.0,
        vcodec: UNKNOWN.to_string(),
        bitrate_kbps: 0.0,
    };

    for f in formats.iter().filter(|f| f.has_video()) {
        let height = f.height.unwrap_or(0);
        if height >= best.height {
            best = BestVideo {
                height,
                fps: f.fps.unwrap_or(0.0),
                vcodec: f.vcodec.clone().unwrap_or_else(|| UNKNOWN.to_string()),
                bitrate_kbps: f.tbr.map(round2).unwrap_or(0.0),
            };
        }
    }

    best
}

/// First opus track if any, otherwise the first real audio codec
fn best_audio_codec(formats: &[FormatEntry]) -> String {
    let mut audio = formats
        .iter()
        .filter(|f| f.has_audio())
        .filter_map(|f| f.acodec.as_deref());

    let first = audio.clone().next();
    audio
        .find(|codec| codec.to_ascii_lowercase().contains("opus"))
        .or(first)
        .unwrap_or(UNKNOWN)
        .to_string()
}
