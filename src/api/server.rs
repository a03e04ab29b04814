use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{decompression::RequestDecompressionLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use super::{
    services::{download_file, get_info, get_status, health, index, start_download},
    state::AppState,
};
use crate::config::Config;
use crate::extractor::{Extractor, YtDlp};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/info", post(get_info))
        .route("/api/download", post(start_download))
        .route("/api/status/{download_id}", get(get_status))
        .route("/api/download/{download_id}", get(download_file))
        .route("/health", get(health))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                // gzip request bodies are inflated before handlers see them
                .layer(RequestDecompressionLayer::new()),
        )
}

/// Serve until Ctrl+C / SIGTERM, then drain in-flight downloads
pub async fn run(config: Config, address: Option<SocketAddr>) -> Result<(), AnyError> {
    let address = address.unwrap_or(config.server.bind_addr);

    let root = config.downloads.root.clone();
    tokio::fs::create_dir_all(&root)
        .await
        .map_err(|e| format!("Failed to create download root {}: {e}", root.display()))?;
    info!(root = %root.display(), "Download root ready");

    let ytdlp = YtDlp::from_config(&config.extractor);
    info!(binary = %ytdlp.binary().display(), "Using yt-dlp backend");
    let extractor: Arc<dyn Extractor> = Arc::new(ytdlp);

    let drain_timeout = config.downloads.drain_timeout();
    let state = AppState::new(config, extractor);
    let pool = state.pool.clone();

    let listener = TcpListener::bind(address).await?;
    info!(%address, "vidfetch listening");

    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if pool.drain(drain_timeout).await {
        info!("All downloads finished");
    } else {
        warn!(abandoned = pool.in_flight(), "Shutting down with unfinished downloads");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
