// Media extraction engine: metadata probing and downloading through yt-dlp

pub mod error;
pub mod file;
pub mod info;
pub mod ytdlp;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

pub use error::ExtractError;
pub use file::DownloadedFile;
pub use info::{format_duration, VideoFormat, VideoInfo};
pub use ytdlp::{CookieSource, YtDlp};

/// Resolves media URLs into metadata and local files.
///
/// Implementations must be safe to run concurrently with themselves; every
/// call to [`download`](MediaExtractor::download) writes to its own file.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    async fn probe(&self, url: &str) -> Result<VideoInfo, ExtractError>;

    /// Download `url` below `output_dir` and return the path of the file.
    async fn download(&self, url: &str, output_dir: &Path) -> Result<PathBuf, ExtractError>;
}
