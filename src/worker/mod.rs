//! Download worker pool
//!
//! Jobs are registered in the [`JobTable`](crate::jobs::JobTable) and spawned
//! on a task tracker right away; a semaphore bounds how many actually run.
//! Waiting jobs stay in `starting`. Shutdown closes the pool, fails the jobs
//! still waiting for a slot and waits for running ones up to a deadline.

pub mod runner;

pub use runner::{JobTicket, WorkerContext, run_job};

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};
use uuid::Uuid;

use crate::jobs::{JobError, JobState};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker pool is shutting down")]
    ShuttingDown,

    #[error(transparent)]
    Job(#[from] JobError),
}

pub struct WorkerPool {
    ctx: Arc<WorkerContext>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    max_concurrent: usize,
}

impl WorkerPool {
    pub fn new(ctx: WorkerContext, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            ctx: Arc::new(ctx),
            permits: Arc::new(Semaphore::new(max_concurrent)),
            tracker: TaskTracker::new(),
            max_concurrent,
        }
    }

    pub fn context(&self) -> &WorkerContext {
        &self.ctx
    }

    /// Register a job for `url` and schedule it. Returns the new job id.
    pub async fn submit(&self, url: &str) -> Result<String, PoolError> {
        if !self.is_accepting() {
            return Err(PoolError::ShuttingDown);
        }

        let ticket = JobTicket {
            id: Uuid::now_v7().to_string(),
            url: url.to_string(),
        };
        self.ctx.jobs.create(&ticket.id).await?;
        self.ctx.metrics.job_submitted();

        let ctx = self.ctx.clone();
        let permits = self.permits.clone();
        let id = ticket.id.clone();

        self.tracker.spawn(async move {
            match permits.acquire_owned().await {
                Ok(_permit) => {
                    run_job(&ctx, &ticket).await;
                }
                Err(_) => {
                    warn!(job_id = %ticket.id, "Worker pool closed before job could start");
                    ctx.metrics.job_failed();
                    let _ = ctx
                        .jobs
                        .update(
                            &ticket.id,
                            JobState::Error {
                                error: PoolError::ShuttingDown.to_string(),
                            },
                        )
                        .await;
                }
            }
        });

        Ok(id)
    }

    pub fn is_accepting(&self) -> bool {
        !self.tracker.is_closed()
    }

    /// Jobs spawned and not yet finished, queued ones included
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Jobs currently holding a worker slot
    pub fn running(&self) -> usize {
        self.max_concurrent - self.permits.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Stop accepting jobs, fail queued ones and wait for the running ones.
    ///
    /// Returns `false` when the deadline passed first; remaining extractor
    /// processes are killed when their tasks are dropped with the runtime.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();
        // Queued jobs see the closed semaphore and record an error
        self.permits.close();
        let pending = self.tracker.len();
        if pending > 0 {
            info!(pending, ?timeout, "Draining download jobs");
        }

        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(remaining = self.tracker.len(), "Drain deadline reached");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{
        DownloadedFile, Extractor, ExtractError, ProgressSender, VideoMetadata,
    };
    use crate::jobs::{JobPhase, JobTable};
    use crate::observability::Metrics;
    use crate::policy::{FormatPolicy, HIGHEST_QUALITY};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Holds every download until a release permit is added, tracking peak concurrency
    struct Gate {
        release: Semaphore,
        started: AtomicUsize,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Gate {
        fn new() -> Self {
            Self {
                release: Semaphore::new(0),
                started: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Extractor for Gate {
        async fn probe(&self, _url: &str, _policy: &FormatPolicy) -> crate::extractor::Result<VideoMetadata> {
            Ok(VideoMetadata::default())
        }

        async fn download(
            &self,
            url: &str,
            output_dir: &Path,
            _policy: &FormatPolicy,
            _progress: ProgressSender,
        ) -> crate::extractor::Result<DownloadedFile> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if let Ok(permit) = self.release.acquire().await {
                permit.forget();
            }
            self.active.fetch_sub(1, Ordering::SeqCst);

            if url.contains("broken") {
                return Err(ExtractError::Failed("ERROR: broken".into()));
            }
            Ok(DownloadedFile {
                path: output_dir.join("out.mkv"),
            })
        }
    }

    fn pool_with(extractor: Arc<Gate>, root: &Path, max: usize) -> WorkerPool {
        WorkerPool::new(
            WorkerContext {
                jobs: Arc::new(JobTable::new()),
                extractor,
                policy: &HIGHEST_QUALITY,
                download_root: root.to_path_buf(),
                metrics: Arc::new(Metrics::new()),
            },
            max,
        )
    }

    async fn wait_for_active(gate: &Gate, n: usize) {
        for _ in 0..400 {
            if gate.active.load(Ordering::SeqCst) == n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {n} active downloads");
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let dir = TempDir::new().unwrap();
        let gate = Arc::new(Gate::new());
        let pool = pool_with(gate.clone(), dir.path(), 2);

        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(pool.submit(&format!("https://example.com/{i}")).await.unwrap());
        }
        assert_eq!(pool.context().jobs.len().await, 5);

        wait_for_active(&gate, 2).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(gate.active.load(Ordering::SeqCst), 2);
        assert_eq!(pool.running(), 2);
        assert_eq!(pool.in_flight(), 5);

        let counts = pool.context().jobs.phase_counts().await;
        assert_eq!(counts.get(&JobPhase::Starting), Some(&5));

        gate.release.add_permits(5);
        assert!(pool.drain(Duration::from_secs(5)).await);

        assert_eq!(gate.peak.load(Ordering::SeqCst), 2);
        for id in ids {
            assert_eq!(pool.context().jobs.read(&id).await.phase(), JobPhase::Completed);
        }
        assert_eq!(pool.context().metrics.snapshot().jobs_completed, 5);
    }

    #[tokio::test]
    async fn test_job_ids_are_unique() {
        let dir = TempDir::new().unwrap();
        let pool = pool_with(Arc::new(Gate::new()), dir.path(), 1);

        let a = pool.submit("https://example.com/a").await.unwrap();
        let b = pool.submit("https://example.com/b").await.unwrap();
        assert_ne!(a, b);
        assert!(!a.is_empty());
        assert_eq!(pool.context().metrics.snapshot().jobs_submitted, 2);
    }

    #[tokio::test]
    async fn test_drain_waits_then_rejects_new_work() {
        let dir = TempDir::new().unwrap();
        let gate = Arc::new(Gate::new());
        let pool = pool_with(gate.clone(), dir.path(), 1);

        let id = pool.submit("https://example.com/broken").await.unwrap();
        wait_for_active(&gate, 1).await;

        let releaser = {
            let gate = gate.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                gate.release.add_permits(1);
            })
        };

        assert!(pool.drain(Duration::from_secs(5)).await);
        releaser.await.unwrap();

        assert!(!pool.is_accepting());
        assert!(matches!(
            pool.submit("https://example.com/late").await,
            Err(PoolError::ShuttingDown)
        ));
        assert_eq!(pool.context().jobs.read(&id).await.phase(), JobPhase::Error);
        assert_eq!(pool.context().jobs.len().await, 1);
    }

    #[tokio::test]
    async fn test_drain_fails_queued_jobs_without_starting_them() {
        let dir = TempDir::new().unwrap();
        let gate = Arc::new(Gate::new());
        let pool = pool_with(gate.clone(), dir.path(), 1);

        let running = pool.submit("https://example.com/a").await.unwrap();
        wait_for_active(&gate, 1).await;
        let queued = pool.submit("https://example.com/b").await.unwrap();

        let releaser = {
            let gate = gate.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                gate.release.add_permits(2);
            })
        };

        assert!(pool.drain(Duration::from_secs(5)).await);
        releaser.await.unwrap();

        assert_eq!(gate.started.load(Ordering::SeqCst), 1);
        let jobs = &pool.context().jobs;
        assert_eq!(jobs.read(&running).await.phase(), JobPhase::Completed);
        match jobs.read(&queued).await.state {
            JobState::Error { error } => assert_eq!(error, "worker pool is shutting down"),
            other => panic!("unexpected state {other:?}"),
        }

        let metrics = pool.context().metrics.snapshot();
        assert_eq!(metrics.jobs_completed, 1);
        assert_eq!(metrics.jobs_failed, 1);
    }

    #[tokio::test]
    async fn test_drain_times_out_on_stuck_job() {
        let dir = TempDir::new().unwrap();
        let gate = Arc::new(Gate::new());
        let pool = pool_with(gate.clone(), dir.path(), 1);

        pool.submit("https://example.com/stuck").await.unwrap();
        wait_for_active(&gate, 1).await;

        assert!(!pool.drain(Duration::from_millis(50)).await);
        assert_eq!(pool.in_flight(), 1);
    }
}
