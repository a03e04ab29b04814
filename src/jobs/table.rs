use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::error::{JobError, Result};
use super::state::{JobPhase, JobSnapshot, JobState};

#[derive(Debug, Clone)]
struct JobRecord {
    state: JobState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl JobRecord {
    fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            state: self.state.clone(),
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
        }
    }
}

/// Identifier -> job state map shared by request handlers and workers.
///
/// Each write holds the table lock for the whole replacement, so readers see
/// either the previous or the next state of a job, never a mix.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: RwLock<HashMap<String, JobRecord>>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new job in `starting`. Identifiers are never reused.
    pub async fn create(&self, id: &str) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(id) {
            return Err(JobError::Duplicate(id.to_string()));
        }

        let now = Utc::now();
        jobs.insert(
            id.to_string(),
            JobRecord {
                state: JobState::Starting,
                created_at: now,
                updated_at: now,
            },
        );
        debug!(job_id = id, "Job created");
        Ok(())
    }

    /// Replace a job's state, enforcing forward-only phase order
    pub async fn update(&self, id: &str, state: JobState) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        let record = jobs
            .get_mut(id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;

        let from = record.state.phase();
        let to = state.phase();
        if !from.can_advance_to(to) {
            return Err(JobError::IllegalTransition {
                id: id.to_string(),
                from,
                to,
            });
        }

        if from != to {
            debug!(job_id = id, %from, %to, "Job phase changed");
        }
        record.state = state;
        record.updated_at = Utc::now();
        Ok(())
    }

    /// Current state, or `not_found` for unknown identifiers
    pub async fn read(&self, id: &str) -> JobSnapshot {
        self.jobs
            .read()
            .await
            .get(id)
            .map(JobRecord::snapshot)
            .unwrap_or_else(JobSnapshot::not_found)
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Job count per phase
    pub async fn phase_counts(&self) -> HashMap<JobPhase, usize> {
        let jobs = self.jobs.read().await;
        let mut counts = HashMap::new();
        for record in jobs.values() {
            *counts.entry(record.state.phase()).or_insert(0) += 1;
        }
        counts
    }
}
