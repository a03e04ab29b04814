//! Terminal surface: prompt, live progress line, result banners

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use crate::api::{UrlValidationError, validate_url};
use crate::config::Config;
use crate::extractor::{DownloadedFile, ExtractError, Extractor, ProgressEvent, YtDlp};
use crate::humanize::{clock, grouped, whole_minutes};
use crate::policy::FormatPolicy;

const RULE_WIDTH: usize = 60;
const TITLE: &str = "vidfetch - Highest Quality Video Downloader";

/// Run the `get` command and map the outcome to a process exit code
pub async fn run(config: &Config, url: Option<String>, output: Option<PathBuf>) -> ExitCode {
    let mut out = io::stdout();
    banner(&mut out);

    let raw = match url {
        Some(url) => url,
        None => match prompt("\nEnter video URL: ").await {
            Ok(line) => line,
            Err(e) => {
                let _ = writeln!(out, "Could not read URL: {e}");
                return ExitCode::FAILURE;
            }
        },
    };

    let url = match validate_url(&raw, config.server.api.max_url_length) {
        Ok(url) => url,
        Err(UrlValidationError::Empty) => {
            let _ = writeln!(out, "No URL provided!");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            let _ = writeln!(out, "Invalid URL: {e}");
            return ExitCode::FAILURE;
        }
    };

    let output_dir = output.unwrap_or_else(|| config.downloads.root.clone());
    let extractor = YtDlp::from_config(&config.extractor);

    match fetch(&extractor, FormatPolicy::highest_quality(), url, &output_dir, &mut out).await {
        Ok(file) => {
            let _ = writeln!(out, "\nDownload completed successfully!");
            let _ = writeln!(out, "Saved to: {}", file.path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            let _ = writeln!(out, "\nError downloading video: {e}");
            ExitCode::FAILURE
        }
    }
}

fn banner(out: &mut impl Write) {
    let rule = "=".repeat(RULE_WIDTH);
    let _ = writeln!(out, "{rule}\n{TITLE}\n{rule}");
}

async fn prompt(label: &str) -> io::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{label}")?;
    stdout.flush()?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(line.trim().to_string())
}

/// Probe, print the summary, then download while redrawing the progress line
pub async fn fetch(
    extractor: &dyn Extractor,
    policy: &FormatPolicy,
    url: &str,
    output_dir: &Path,
    out: &mut impl Write,
) -> Result<DownloadedFile, ExtractError> {
    tokio::fs::create_dir_all(output_dir).await?;

    let _ = writeln!(out, "\nDownloading video from: {url}");
    let metadata = extractor.probe(url, policy).await?;
    let _ = writeln!(out, "Title: {}", metadata.title.as_deref().unwrap_or("Unknown"));
    let seconds = metadata.duration.map(|d| d.max(0.0) as u64).unwrap_or(0);
    let _ = writeln!(out, "Duration: {} minutes ({})", whole_minutes(seconds), clock(seconds));
    let _ = writeln!(out, "Channel: {}", metadata.uploader.as_deref().unwrap_or("Unknown"));
    if let Some(views) = metadata.view_count {
        let _ = writeln!(out, "Views: {}", grouped(views));
    }
    let _ = writeln!(out);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let download = extractor.download(url, output_dir, policy, tx);

    let mut printer = ProgressPrinter::default();
    let render = async {
        while let Some(event) = rx.recv().await {
            printer.handle(&event, &mut *out);
        }
    };

    let (result, ()) = tokio::join!(download, render);
    result
}

/// Turns progress events into terminal output
#[derive(Debug, Default)]
struct ProgressPrinter {
    processing_announced: bool,
}

impl ProgressPrinter {
    fn handle(&mut self, event: &ProgressEvent, out: &mut impl Write) {
        match event {
            ProgressEvent::Transfer(p) if !self.processing_announced => {
                let _ = write!(out, "\rProgress: {} | Speed: {} | ETA: {}", p.percent, p.speed, p.eta);
                let _ = out.flush();
            }
            ProgressEvent::PostProcessing { step } if !self.processing_announced => {
                debug!(step, "Post-processing started");
                self.processing_announced = true;
                let _ = writeln!(out, "\nProcessing video...");
            }
            _ => {}
        }
    }
}
