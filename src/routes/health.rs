use axum::{extract::State, response::Json as ResponseJson, routing::get, Json, Router};
use tracing::{debug, warn};

use crate::db::health_check;
use crate::models::{AppState, HealthResponse};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> ResponseJson<HealthResponse> {
    let database = match state.stats.pool() {
        Some(pool) => match health_check(pool).await {
            Ok(latency) => {
                debug!(latency_ms = latency.as_millis() as u64, "database health check");
                "connected"
            }
            Err(e) => {
                warn!(error = %e, "database health check failed");
                "unreachable"
            }
        },
        None => "disabled",
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        database: database.to_string(),
    })
}
