//! `yt-dlp` subprocess backend

use async_trait::async_trait;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::error::{ExtractError, Result};
use super::models::{DownloadedFile, ProgressEvent, TransferProgress, VideoMetadata};
use super::{Extractor, ProgressSender};
use crate::config::ExtractorConfig;
use crate::policy::FormatPolicy;

/// Tag prepended to every progress line we ask the extractor to print
const MARKER: &str = "[vidfetch]";
const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

#[derive(Debug, Clone, bon::Builder)]
pub struct YtDlp {
    #[builder(into, default = PathBuf::from("yt-dlp"))]
    binary: PathBuf,
    #[builder(into)]
    ffmpeg_location: Option<PathBuf>,
    socket_timeout_secs: Option<u64>,
}

impl YtDlp {
    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::builder()
            .binary(config.ytdlp_path.clone())
            .maybe_ffmpeg_location(config.ffmpeg_location.clone())
            .maybe_socket_timeout_secs(config.socket_timeout_secs)
            .build()
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn common_args(&self, args: &mut Vec<String>) {
        if let Some(location) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".into());
            args.push(location.to_string_lossy().into_owned());
        }
        if let Some(secs) = self.socket_timeout_secs {
            args.push("--socket-timeout".into());
            args.push(secs.to_string());
        }
    }

    pub(crate) fn probe_args(&self, url: &str, policy: &FormatPolicy) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-J".into(),
            "--no-warnings".into(),
            "--no-playlist".into(),
            "-f".into(),
            policy.selector(),
        ];
        self.common_args(&mut args);
        args.push("--".into());
        args.push(url.into());
        args
    }

    pub(crate) fn download_args(
        &self,
        url: &str,
        output_dir: &Path,
        policy: &FormatPolicy,
    ) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-f".into(),
            policy.selector(),
            "-S".into(),
            policy.sort_spec(),
            "--format-sort-force".into(),
            "--merge-output-format".into(),
            policy.merge_container.into(),
            "--postprocessor-args".into(),
            policy.merger_args(),
            "--no-keep-video".into(),
            "--no-write-thumbnail".into(),
            "--no-write-subs".into(),
            "--no-write-auto-subs".into(),
            "--no-playlist".into(),
            "--newline".into(),
            "--progress".into(),
            "--no-colors".into(),
            "--progress-template".into(),
            format!(
                "download:{MARKER} download|%(progress.status)s|%(progress._percent_str)s|%(progress._speed_str)s|%(progress._eta_str)s"
            ),
            "--progress-template".into(),
            format!("postprocess:{MARKER} postprocess|%(progress.status)s|%(progress.postprocessor)s"),
            "--print".into(),
            "after_move:filepath".into(),
            "-o".into(),
            output_dir.join(OUTPUT_TEMPLATE).to_string_lossy().into_owned(),
        ];
        self.common_args(&mut args);
        args.push("--".into());
        args.push(url.into());
        args
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }

    fn launch_error(&self, source: std::io::Error) -> ExtractError {
        ExtractError::Launch {
            binary: self.binary.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl Extractor for YtDlp {
    async fn probe(&self, url: &str, policy: &FormatPolicy) -> Result<VideoMetadata> {
        let args = self.probe_args(url, policy);
        debug!(url, "Probing metadata");

        let mut cmd = self.command(&args);
        let output = cmd.output().await.map_err(|e| self.launch_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Failed(failure_message(&stderr, output.status)));
        }

        let metadata: VideoMetadata = serde_json::from_slice(&output.stdout)?;
        debug!(url, formats = metadata.formats.len(), "Probe completed");
        Ok(metadata)
    }

    async fn download(
        &self,
        url: &str,
        output_dir: &Path,
        policy: &FormatPolicy,
        progress: ProgressSender,
    ) -> Result<DownloadedFile> {
        tokio::fs::create_dir_all(output_dir).await?;
        let args = self.download_args(url, output_dir, policy);
        debug!(url, output_dir = %output_dir.display(), "Starting extractor download");

        let mut child = self
            .command(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.launch_error(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("extractor stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("extractor stderr not captured"))?;

        // Progress may land on stderr when the extractor runs quiet.
        let stderr_progress = progress.clone();
        let stderr_reader = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            let mut diagnostics = Vec::new();
            // Drained to EOF so the extractor never writes into a closed pipe
            loop {
                match read_lossy_line(&mut reader, &mut buf).await {
                    Ok(Some(line)) => match parse_progress_line(&line) {
                        Some(event) => {
                            let _ = stderr_progress.send(event);
                        }
                        None => diagnostics.push(line),
                    },
                    Ok(None) => break,
                    Err(e) => {
                        debug!(error = %e, "Extractor stderr read failed");
                        break;
                    }
                }
            }
            diagnostics.join("\n")
        });

        let mut output_path = None;
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        while let Some(line) = read_lossy_line(&mut reader, &mut buf).await? {
            match parse_progress_line(&line) {
                Some(event) => {
                    let _ = progress.send(event);
                }
                None => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        output_path = Some(PathBuf::from(trimmed));
                    }
                }
            }
        }

        let status = child.wait().await?;
        let diagnostics = stderr_reader.await.unwrap_or_default();

        if !status.success() {
            let message = failure_message(&diagnostics, status);
            warn!(url, error = %message, "Extractor download failed");
            return Err(ExtractError::Failed(message));
        }

        let path = output_path.ok_or(ExtractError::MissingOutput)?;
        info!(url, path = %path.display(), "Extractor download finished");
        Ok(DownloadedFile { path })
    }
}

/// Next newline-terminated line, invalid UTF-8 replaced; `None` at EOF
async fn read_lossy_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf);
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
}

/// Parse one line of our progress template, `None` for anything else
pub(crate) fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let rest = line.trim().strip_prefix(MARKER)?;
    let fields: Vec<&str> = rest.trim().split('|').collect();

    match (fields.first().copied(), fields.get(1).map(|s| s.trim())) {
        (Some("download"), Some("downloading")) => {
            let defaults = TransferProgress::default();
            Some(ProgressEvent::Transfer(TransferProgress {
                percent: field_or(fields.get(2), defaults.percent),
                speed: field_or(fields.get(3), defaults.speed),
                eta: field_or(fields.get(4), defaults.eta),
            }))
        }
        (Some("download"), Some("finished")) => Some(ProgressEvent::TransferFinished),
        (Some("postprocess"), Some("started")) => Some(ProgressEvent::PostProcessing {
            step: field_or(fields.get(2), "post-processing".to_string()),
        }),
        _ => None,
    }
}

fn field_or(field: Option<&&str>, default: String) -> String {
    let value = field.map(|f| strip_ansi(f)).unwrap_or_default();
    let value = value.trim();
    if value.is_empty() || value == "NA" || value == "N/A" {
        default
    } else {
        value.to_string()
    }
}

fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            // skip CSI sequence up to its final letter
            for next in chars.by_ref() {
                if next.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Most specific failure text the extractor left on stderr
pub(crate) fn failure_message(stderr: &str, status: impl Display) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    lines
        .iter()
        .rev()
        .find(|line| line.starts_with("ERROR:"))
        .or_else(|| lines.last())
        .map(|line| line.to_string())
        .unwrap_or_else(|| format!("yt-dlp exited unsuccessfully ({status})"))
}
