use axum::{
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
    Json, Router,
};
use tracing::warn;

use crate::config::ClientConfig;
use crate::models::{AppState, CountResponse, StatusResponse};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/config", get(client_config))
        .route("/api/download/count", post(increment_count))
        .with_state(state)
}

async fn status(State(state): State<AppState>) -> ResponseJson<StatusResponse> {
    let total_downloads = state.stats.global_download_count().await.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to read download counter");
        0
    });

    Json(StatusResponse {
        max_file_size_mb: state.config.downloads.max_file_size_mb,
        queue: state.dispatcher.status(),
        total_downloads,
    })
}

async fn client_config(State(state): State<AppState>) -> ResponseJson<ClientConfig> {
    Json(state.config.client.clone())
}

async fn increment_count(State(state): State<AppState>) -> ResponseJson<CountResponse> {
    let total_downloads = match state.stats.increment_global_downloads().await {
        Ok(total) => total,
        Err(e) => {
            warn!(error = %e, "Failed to increment download counter");
            state.stats.global_download_count().await.unwrap_or(0)
        }
    };

    Json(CountResponse { total_downloads })
}
