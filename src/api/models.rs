//! Request and response bodies of the HTTP surface.
//!
//! Preview (`POST /api/info`) and status (`GET /api/status/{id}`) bodies live
//! with their producers: [`InfoResponse`](crate::info::InfoResponse) and
//! [`JobSnapshot`](crate::jobs::JobSnapshot).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::jobs::JobPhase;
use crate::observability::MetricsSnapshot;

/// Body of both `POST /api/info` and `POST /api/download`.
///
/// A missing `url` reads as empty so it gets the same answer as `""`.
#[derive(Debug, Clone, Deserialize)]
pub struct UrlRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadAccepted {
    pub success: bool,
    pub download_id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: &'static str,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: BTreeMap<String, String>,
    pub version: String,
    pub metrics: MetricsSnapshot,
    pub jobs: JobCounts,
}

#[derive(Debug, Serialize)]
pub struct JobCounts {
    pub total: usize,
    pub in_flight: usize,
    pub running: usize,
    pub by_phase: BTreeMap<JobPhase, usize>,
}
