//! API Routes
//!
//! - `/api/health` - Health check
//! - `/api/status`, `/api/config`, `/api/download/count` - Service status and counters
//! - `/api/grabh` - Media metadata
//! - `/api/download` - Queued download, streamed back as an attachment
//! - everything else - Static files from `PUBLIC_DIR`

pub mod download;
pub mod grabh;
pub mod health;
pub mod static_files;
pub mod status;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::cors_layer;
use crate::models::AppState;

/// Create the main application router
///
/// API routes take precedence; anything unmatched falls through to the
/// static file service.
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let cors = cors_layer(&state.config.server.cors_allowed_origins);
    let public_dir = state.config.server.public_dir.clone();

    let api_router = Router::new()
        .merge(health::router(state.clone()))
        .merge(status::router(state.clone()))
        .merge(grabh::router(state.clone()))
        .merge(download::router(state));

    Router::new()
        .merge(api_router)
        .merge(static_files::router(public_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::db::DownloadStats;
    use crate::engine::{ExtractError, MediaExtractor, VideoInfo};
    use crate::models::AppState;

    /// Extractor that writes `payload` to `<output_dir>/job/<name>` instead
    /// of running yt-dlp.
    pub struct FakeExtractor {
        pub name: String,
        pub payload: Vec<u8>,
        pub fail_with: Option<String>,
        pub delay: Option<Duration>,
        pub downloads: AtomicUsize,
    }

    impl FakeExtractor {
        pub fn new(name: &str, payload: &[u8]) -> Self {
            Self {
                name: name.to_string(),
                payload: payload.to_vec(),
                fail_with: None,
                delay: None,
                downloads: AtomicUsize::new(0),
            }
        }

        /// Wait `delay` before writing the file.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Self::new("unused.mp4", b"")
            }
        }
    }

    #[async_trait]
    impl MediaExtractor for FakeExtractor {
        async fn probe(&self, url: &str) -> Result<VideoInfo, ExtractError> {
            if let Some(message) = &self.fail_with {
                return Err(ExtractError::Probe(message.clone()));
            }
            let json = r#"{"id":"abc","title":"Test clip","uploader":"Tester","duration":75,"formats":[]}"#;
            Ok(VideoInfo::from_json(json, url)?)
        }

        async fn download(&self, _url: &str, output_dir: &Path) -> Result<PathBuf, ExtractError> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            if let Some(message) = &self.fail_with {
                return Err(ExtractError::Download(message.clone()));
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let job_dir = output_dir.join("job");
            tokio::fs::create_dir_all(&job_dir)
                .await
                .map_err(ExtractError::OutputDir)?;
            let path = job_dir.join(&self.name);
            tokio::fs::write(&path, &self.payload)
                .await
                .map_err(ExtractError::OutputDir)?;
            Ok(path)
        }
    }

    pub fn test_config(dir: &Path) -> Config {
        let download_dir = dir.join("downloads").to_string_lossy().into_owned();
        let public_dir = dir.join("public").to_string_lossy().into_owned();
        Config::from_lookup(move |key| match key {
            "DOWNLOAD_DIR" => Some(download_dir.clone()),
            "PUBLIC_DIR" => Some(public_dir.clone()),
            "MAX_FILE_SIZE_MB" => Some("1".to_string()),
            _ => None,
        })
        .unwrap()
    }

    pub fn test_state(dir: &Path, extractor: Arc<dyn MediaExtractor>) -> AppState {
        AppState::new(test_config(dir), extractor, DownloadStats::in_memory())
    }

    pub async fn send(state: AppState, request: Request<Body>) -> Response {
        super::create_router(state).oneshot(request).await.unwrap()
    }

    pub async fn json_body(response: Response) -> (StatusCode, serde_json::Value) {
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }
}
