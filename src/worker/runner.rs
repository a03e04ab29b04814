//! Job runner - drives one download from `starting` to a terminal phase

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::extractor::{Extractor, ProgressEvent};
use crate::jobs::{JobError, JobState, JobTable};
use crate::observability::Metrics;
use crate::policy::FormatPolicy;

/// Everything a runner needs, shared by all jobs of a pool
pub struct WorkerContext {
    pub jobs: Arc<JobTable>,
    pub extractor: Arc<dyn Extractor>,
    pub policy: &'static FormatPolicy,
    pub download_root: PathBuf,
    pub metrics: Arc<Metrics>,
}

/// A registered job waiting for a worker
#[derive(Debug, Clone)]
pub struct JobTicket {
    pub id: String,
    pub url: String,
}

/// Run a job to completion and return its terminal state.
///
/// Output goes to `<download_root>/<job id>/`. Progress events are applied to
/// the table in the order the extractor emits them.
pub async fn run_job(ctx: &WorkerContext, ticket: &JobTicket) -> JobState {
    let output_dir = ctx.download_root.join(&ticket.id);
    info!(job_id = %ticket.id, url = %ticket.url, dir = %output_dir.display(), "Job started");

    let final_state = match tokio::fs::create_dir_all(&output_dir).await {
        Ok(()) => transfer(ctx, ticket, output_dir).await,
        Err(e) => JobState::Error {
            error: format!("cannot create {}: {e}", output_dir.display()),
        },
    };

    match &final_state {
        JobState::Completed { filepath, .. } => {
            ctx.metrics.job_completed();
            info!(job_id = %ticket.id, filepath, "Job completed");
        }
        JobState::Error { error } => {
            ctx.metrics.job_failed();
            error!(job_id = %ticket.id, error, "Job failed");
        }
        _ => {}
    }

    if let Err(e) = ctx.jobs.update(&ticket.id, final_state.clone()).await {
        warn!(job_id = %ticket.id, error = %e, "Could not record final job state");
    }

    final_state
}

async fn transfer(ctx: &WorkerContext, ticket: &JobTicket, output_dir: PathBuf) -> JobState {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let download = ctx
        .extractor
        .download(&ticket.url, &output_dir, ctx.policy, tx);

    // The sender lives inside `download`, so the loop ends once it returns
    let apply = async {
        while let Some(event) = rx.recv().await {
            apply_event(&ctx.jobs, &ticket.id, event).await;
        }
    };

    let (result, ()) = tokio::join!(download, apply);

    match result {
        Ok(file) => JobState::Completed {
            filename: file.file_name(),
            filepath: file.path.display().to_string(),
        },
        Err(e) => JobState::Error {
            error: e.to_string(),
        },
    }
}

async fn apply_event(jobs: &JobTable, id: &str, event: ProgressEvent) {
    let next = match event {
        ProgressEvent::Transfer(progress) => JobState::Downloading {
            percent: progress.percent,
            speed: progress.speed,
            eta: progress.eta,
        },
        ProgressEvent::PostProcessing { step } => {
            debug!(job_id = id, step, "Post-processing");
            JobState::processing()
        }
        ProgressEvent::TransferFinished => {
            debug!(job_id = id, "Stream transfer finished");
            return;
        }
    };

    match jobs.update(id, next).await {
        Ok(()) => {}
        Err(JobError::IllegalTransition { from, to, .. }) => {
            debug!(job_id = id, %from, %to, "Dropped out-of-order progress update");
        }
        Err(e) => warn!(job_id = id, error = %e, "Progress update rejected"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{
        DownloadedFile, ExtractError, ProgressSender, TransferProgress, VideoMetadata,
    };
    use crate::jobs::JobPhase;
    use crate::policy::HIGHEST_QUALITY;
    use async_trait::async_trait;
    use std::path::Path;
    use tempfile::TempDir;

    /// Replays a fixed event script, then succeeds or fails
    struct Scripted {
        events: Vec<ProgressEvent>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl Extractor for Scripted {
        async fn probe(&self, _url: &str, _policy: &FormatPolicy) -> crate::extractor::Result<VideoMetadata> {
            Ok(VideoMetadata::default())
        }

        async fn download(
            &self,
            _url: &str,
            output_dir: &Path,
            _policy: &FormatPolicy,
            progress: ProgressSender,
        ) -> crate::extractor::Result<DownloadedFile> {
            for event in &self.events {
                let _ = progress.send(event.clone());
            }
            if let Some(message) = &self.fail_with {
                return Err(ExtractError::Failed(message.clone()));
            }
            let path = output_dir.join("Clip.mkv");
            tokio::fs::write(&path, b"media").await?;
            Ok(DownloadedFile { path })
        }
    }

    fn transfer_event(percent: &str) -> ProgressEvent {
        ProgressEvent::Transfer(TransferProgress {
            percent: percent.into(),
            ..Default::default()
        })
    }

    async fn setup(extractor: Scripted) -> (TempDir, WorkerContext, JobTicket) {
        let dir = TempDir::new().unwrap();
        let ctx = WorkerContext {
            jobs: Arc::new(JobTable::new()),
            extractor: Arc::new(extractor),
            policy: &HIGHEST_QUALITY,
            download_root: dir.path().to_path_buf(),
            metrics: Arc::new(Metrics::new()),
        };
        let ticket = JobTicket {
            id: "job-1".into(),
            url: "https://example.com/watch?v=abc".into(),
        };
        ctx.jobs.create(&ticket.id).await.unwrap();
        (dir, ctx, ticket)
    }

    #[tokio::test]
    async fn test_successful_job_completes_with_path() {
        let (dir, ctx, ticket) = setup(Scripted {
            events: vec![
                transfer_event("10.0%"),
                ProgressEvent::TransferFinished,
                transfer_event("50.0%"),
                ProgressEvent::PostProcessing {
                    step: "Merger".into(),
                },
                // second stream reporting late must not regress the job
                transfer_event("100.0%"),
            ],
            fail_with: None,
        })
        .await;

        let state = run_job(&ctx, &ticket).await;

        let expected_path = dir.path().join("job-1").join("Clip.mkv");
        assert_eq!(
            state,
            JobState::Completed {
                filename: "Clip.mkv".into(),
                filepath: expected_path.display().to_string(),
            }
        );
        assert!(expected_path.exists());
        assert_eq!(ctx.jobs.read("job-1").await.state, state);
        assert_eq!(ctx.metrics.snapshot().jobs_completed, 1);
    }

    #[tokio::test]
    async fn test_failure_records_error_text() {
        let (_dir, ctx, ticket) = setup(Scripted {
            events: vec![transfer_event("3.0%")],
            fail_with: Some("ERROR: Video unavailable".into()),
        })
        .await;

        let state = run_job(&ctx, &ticket).await;

        assert_eq!(
            state,
            JobState::Error {
                error: "ERROR: Video unavailable".into()
            }
        );
        let snapshot = ctx.jobs.read("job-1").await;
        assert_eq!(snapshot.phase(), JobPhase::Error);
        assert_eq!(ctx.metrics.snapshot().jobs_failed, 1);
    }

    #[tokio::test]
    async fn test_progress_is_applied_in_order() {
        let jobs = JobTable::new();
        jobs.create("job").await.unwrap();

        apply_event(&jobs, "job", transfer_event("20.0%")).await;
        apply_event(&jobs, "job", transfer_event("40.0%")).await;
        assert_eq!(
            jobs.read("job").await.state,
            JobState::Downloading {
                percent: "40.0%".into(),
                speed: "N/A".into(),
                eta: "N/A".into(),
            }
        );

        apply_event(&jobs, "job", ProgressEvent::TransferFinished).await;
        assert_eq!(jobs.read("job").await.phase(), JobPhase::Downloading);

        apply_event(&jobs, "job", ProgressEvent::PostProcessing { step: "Merger".into() }).await;
        apply_event(&jobs, "job", transfer_event("90.0%")).await;
        assert_eq!(jobs.read("job").await.state, JobState::processing());
    }
}
