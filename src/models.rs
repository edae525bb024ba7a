use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::db::DownloadStats;
use crate::engine::{DownloadedFile, ExtractError, MediaExtractor, VideoInfo};
use crate::queue::{Completion, Dispatcher, QueueStatus};

/// Shared by the HTTP router and the Telegram bot.
///
/// Both front ends submit to the same [`Dispatcher`], so the concurrency
/// ceiling holds across the whole process.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub dispatcher: Dispatcher,
    pub extractor: Arc<dyn MediaExtractor>,
    pub stats: DownloadStats,
}

impl AppState {
    pub fn new(config: Config, extractor: Arc<dyn MediaExtractor>, stats: DownloadStats) -> Self {
        let dispatcher = Dispatcher::new(config.downloads.max_concurrent);
        Self {
            config,
            dispatcher,
            extractor,
            stats,
        }
    }

    /// Queue a download of `url` into the configured download directory.
    ///
    /// The file is wrapped in its guard inside the job, so a result nobody
    /// collects is deleted as soon as the job finishes.
    pub fn queue_download(&self, url: String) -> Completion<DownloadedFile, ExtractError> {
        let extractor = Arc::clone(&self.extractor);
        let output_dir = self.config.downloads.dir.clone();
        self.dispatcher.submit(url, move |url: String| async move {
            extractor.download(&url, &output_dir).await.map(DownloadedFile::new)
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadQuery {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrabhResponse {
    pub success: bool,
    pub data: VideoInfo,
    #[serde(rename = "maxFileSizeMB")]
    pub max_file_size_mb: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(rename = "maxFileSizeMB")]
    pub max_file_size_mb: u64,
    pub queue: QueueStatus,
    pub total_downloads: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub total_downloads: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub database: String,
}

/// Trim a user supplied URL, treating blank input as missing.
pub fn non_blank(url: Option<&str>) -> Option<&str> {
    url.map(str::trim).filter(|u| !u.is_empty())
}
