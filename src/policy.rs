//! Format policy: which video/audio streams to request and how to merge them
//!
//! The policy is a static value shared by the info resolver and the download
//! worker. It renders to the selector, sort and post-processor arguments the
//! extractor understands:
//!
//! - video: vp9 (both codec tags) then any codec at each height floor, highest
//!   floor first, then the best video track of any size
//! - audio: opus, then the mp4a family, then the best audio track
//! - whole selection falls back to the best pre-muxed stream
//! - merge: mkv container, stream copy only, first video + first audio stream,
//!   fast-start index placement

/// Audio codec preference rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioRule {
    /// Codec name equals the tag
    Exact(&'static str),
    /// Codec name starts with the tag
    Prefix(&'static str),
}

impl AudioRule {
    fn filter(&self) -> String {
        match self {
            AudioRule::Exact(tag) => format!("[acodec={tag}]"),
            AudioRule::Prefix(tag) => format!("[acodec^={tag}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatPolicy {
    /// Height floors, highest priority first
    pub height_floors: &'static [u32],
    /// Codec tags of the preferred video family, tried in order at each floor
    pub video_codec_tags: &'static [&'static str],
    pub audio_rules: &'static [AudioRule],
    /// Tie-break sort keys for the download path
    pub sort_keys: &'static [&'static str],
    pub merge_container: &'static str,
    /// Output arguments for the muxer
    pub mux_args: &'static [&'static str],
}

pub static HIGHEST_QUALITY: FormatPolicy = FormatPolicy {
    height_floors: &[1440, 1080],
    video_codec_tags: &["vp9", "vp09"],
    audio_rules: &[AudioRule::Exact("opus"), AudioRule::Prefix("mp4a")],
    sort_keys: &["quality", "res:1440", "fps", "vcodec:vp9.2", "acodec:opus", "br"],
    merge_container: "mkv",
    mux_args: &[
        "-c:v",
        "copy",
        "-c:a",
        "copy",
        "-map",
        "0:v:0",
        "-map",
        "0:a:0",
        "-movflags",
        "+faststart",
        "-strict",
        "experimental",
    ],
};

impl FormatPolicy {
    pub fn highest_quality() -> &'static FormatPolicy {
        &HIGHEST_QUALITY
    }

    /// Format selection expression
    pub fn selector(&self) -> String {
        let mut video = Vec::new();
        for floor in self.height_floors {
            for tag in self.video_codec_tags {
                video.push(format!("bestvideo[vcodec^={tag}][height>={floor}]"));
            }
            video.push(format!("bestvideo[height>={floor}]"));
        }
        video.push("bestvideo".to_string());

        let mut audio: Vec<String> = self
            .audio_rules
            .iter()
            .map(|rule| format!("bestaudio{}", rule.filter()))
            .collect();
        audio.push("bestaudio".to_string());

        format!("({})+({})/best", video.join("/"), audio.join("/"))
    }

    /// Comma-joined sort keys
    pub fn sort_spec(&self) -> String {
        self.sort_keys.join(",")
    }

    /// Post-processor argument string scoped to the merge step
    pub fn merger_args(&self) -> String {
        format!("Merger+ffmpeg_o:{}", self.mux_args.join(" "))
    }

    /// Whether a codec name belongs to the preferred video family
    pub fn is_preferred_video_codec(&self, codec: &str) -> bool {
        let codec = codec.to_ascii_lowercase();
        self.video_codec_tags.iter().any(|tag| codec.starts_with(tag))
    }
}
