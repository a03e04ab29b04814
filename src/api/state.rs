use std::sync::Arc;

use crate::config::Config;
use crate::extractor::Extractor;
use crate::jobs::JobTable;
use crate::observability::Metrics;
use crate::policy::FormatPolicy;
use crate::worker::{WorkerContext, WorkerPool};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub extractor: Arc<dyn Extractor>,
    pub jobs: Arc<JobTable>,
    pub pool: Arc<WorkerPool>,
    pub policy: &'static FormatPolicy,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Build the process-wide state. The job table starts empty and lives as
    /// long as the process; nothing is persisted.
    pub fn new(config: Config, extractor: Arc<dyn Extractor>) -> Self {
        let jobs = Arc::new(JobTable::new());
        let metrics = Arc::new(Metrics::new());
        let policy = FormatPolicy::highest_quality();

        let pool = WorkerPool::new(
            WorkerContext {
                jobs: jobs.clone(),
                extractor: extractor.clone(),
                policy,
                download_root: config.downloads.root.clone(),
                metrics: metrics.clone(),
            },
            config.downloads.max_concurrent_jobs,
        );

        Self {
            config: Arc::new(config),
            extractor,
            jobs,
            pool: Arc::new(pool),
            policy,
            metrics,
        }
    }
}
