use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use std::collections::BTreeMap;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use super::{
    error::ApiError,
    models::{DownloadAccepted, HealthResponse, JobCounts, UrlRequest},
    state::AppState,
    utils::{content_disposition, content_type_for, read_json},
    validation::validate_url,
};
use crate::info::{self, InfoResponse};
use crate::jobs::JobState;

const INDEX_HTML: &str = include_str!("../../assets/index.html");

/// Web page (GET /)
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Metadata preview (POST /api/info)
///
/// Blocks for the duration of the probe. Extraction failures come back as
/// `200 {"success": false, "error": ...}`; only malformed requests are errors.
pub async fn get_info(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<InfoResponse>, ApiError> {
    let url = submitted_url(&state, &headers, body).await?;

    let response = info::resolve(state.extractor.as_ref(), state.policy, &url).await;
    if response.success {
        state.metrics.preview_served();
    } else {
        state.metrics.preview_failed();
    }

    Ok(Json(response))
}

/// Start a background download (POST /api/download)
///
/// Returns as soon as the job is registered.
pub async fn start_download(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<DownloadAccepted>, ApiError> {
    let url = submitted_url(&state, &headers, body).await?;

    let download_id = state.pool.submit(&url).await?;
    info!(job_id = %download_id, %url, "Download accepted");

    Ok(Json(DownloadAccepted {
        success: true,
        download_id,
    }))
}

async fn submitted_url(state: &AppState, headers: &HeaderMap, body: Body) -> Result<String, ApiError> {
    let api = &state.config.server.api;
    let request: UrlRequest = read_json(headers, body, api.max_payload_bytes.as_usize()).await?;

    validate_url(&request.url, api.max_url_length)
        .map(str::to_owned)
        .map_err(|e| ApiError::InvalidPayload(e.to_string()))
}

/// Job record (GET /api/status/{download_id}); unknown ids answer `not_found`
pub async fn get_status(
    State(state): State<AppState>,
    Path(download_id): Path<String>,
) -> impl IntoResponse {
    Json(state.jobs.read(&download_id).await)
}

/// Finished file as an attachment (GET /api/download/{download_id})
pub async fn download_file(
    State(state): State<AppState>,
    Path(download_id): Path<String>,
) -> Result<Response, ApiError> {
    let snapshot = state.jobs.read(&download_id).await;
    let phase = snapshot.phase();
    let JobState::Completed { filename, filepath } = snapshot.state else {
        debug!(job_id = %download_id, %phase, "File requested before completion");
        return Err(ApiError::NotReady);
    };

    let file = tokio::fs::File::open(&filepath)
        .await
        .map_err(|_| ApiError::NotFound("File not found".into()))?;
    let length = file
        .metadata()
        .await
        .map_err(|e| ApiError::Internal(format!("cannot stat {filepath}: {e}")))?
        .len();

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&filename)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&content_disposition(&filename))
            .map_err(|_| ApiError::Internal("invalid Content-Disposition".into()))?,
    );

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((headers, body).into_response())
}

/// Health check (GET /health)
///
/// Reports 503 once the worker pool stopped accepting jobs.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let accepting = state.pool.is_accepting();

    let mut components = BTreeMap::new();
    components.insert("api".to_string(), "healthy".to_string());
    components.insert(
        "worker_pool".to_string(),
        if accepting { "healthy" } else { "draining" }.to_string(),
    );

    let jobs = JobCounts {
        total: state.jobs.len().await,
        in_flight: state.pool.in_flight(),
        running: state.pool.running(),
        by_phase: state.jobs.phase_counts().await.into_iter().collect(),
    };

    let (status_code, overall) = if accepting {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    let response = HealthResponse {
        status: overall.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
        metrics: state.metrics.snapshot(),
        jobs,
    };

    (status_code, Json(response))
}
