use std::path::PathBuf;

/// Errors raised while running the external extractor.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("yt-dlp is not installed (looked for '{}')", .0.display())]
    NotInstalled(PathBuf),

    #[error("Failed to run yt-dlp: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("yt-dlp timed out after {0}s")]
    Timeout(u64),

    #[error("yt-dlp failed: {0}")]
    Probe(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Failed to parse yt-dlp output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Download completed but file not found on disk")]
    MissingFile,

    #[error("Cannot prepare download directory: {0}")]
    OutputDir(#[source] std::io::Error),
}
