//! `yt-dlp` subprocess wrapper.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};
use uuid::Uuid;

use super::{ExtractError, MediaExtractor, VideoInfo};
use crate::config::ExtractorConfig;

/// Where yt-dlp should take authentication cookies from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CookieSource {
    #[default]
    None,
    /// Netscape cookie file; only used if it exists when a command is built.
    File(PathBuf),
    /// Browser profile to read cookies from, e.g. "chrome" or "firefox".
    Browser(String),
    /// A cookie file with a browser fallback when the file is missing.
    FileOrBrowser(PathBuf, String),
}

#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
    cookies: CookieSource,
    timeout: Duration,
}

impl YtDlp {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            cookies: CookieSource::None,
            timeout: Duration::from_secs(600),
        }
    }

    pub fn from_config(config: &ExtractorConfig) -> Self {
        let cookies = match (&config.cookies_file, &config.cookies_browser) {
            (Some(file), Some(browser)) => CookieSource::FileOrBrowser(file.clone(), browser.clone()),
            (Some(file), None) => CookieSource::File(file.clone()),
            (None, Some(browser)) => CookieSource::Browser(browser.clone()),
            (None, None) => CookieSource::None,
        };

        Self::new(&config.binary)
            .with_cookies(cookies)
            .with_timeout(Duration::from_secs(config.timeout_secs))
    }

    pub fn with_cookies(mut self, cookies: CookieSource) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-warnings".to_string(),
            "--extractor-retries".to_string(),
            "3".to_string(),
        ];

        let (file, browser) = match &self.cookies {
            CookieSource::None => (None, None),
            CookieSource::File(file) => (Some(file), None),
            CookieSource::Browser(browser) => (None, Some(browser)),
            CookieSource::FileOrBrowser(file, browser) => (Some(file), Some(browser)),
        };

        // The file wins when it is actually there.
        if let Some(file) = file.filter(|f| f.exists()) {
            args.push("--cookies".to_string());
            args.push(file.to_string_lossy().into_owned());
        } else if let Some(browser) = browser {
            args.push("--cookies-from-browser".to_string());
            args.push(browser.clone());
        }

        args
    }

    fn probe_args(&self, url: &str) -> Vec<String> {
        let mut args = self.base_args();
        args.push("--dump-json".to_string());
        args.push(url.to_string());
        args
    }

    fn download_args(&self, url: &str, job_dir: &Path) -> Vec<String> {
        let template = job_dir.join("%(id)s.%(ext)s");

        let mut args = self.base_args();
        args.extend([
            "-f".to_string(),
            "best[ext=mp4]/best".to_string(),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            url.to_string(),
        ]);
        args
    }

    async fn run(&self, args: Vec<String>) -> Result<Output, ExtractError> {
        debug!(binary = %self.binary.display(), ?args, "running yt-dlp");

        let mut command = Command::new(&self.binary);
        command.args(&args).kill_on_drop(true);

        timeout(self.timeout, command.output())
            .await
            .map_err(|_| ExtractError::Timeout(self.timeout.as_secs()))?
            .map_err(|err| {
                if err.kind() == ErrorKind::NotFound {
                    ExtractError::NotInstalled(self.binary.clone())
                } else {
                    ExtractError::Spawn(err)
                }
            })
    }
}

#[async_trait]
impl MediaExtractor for YtDlp {
    async fn probe(&self, url: &str) -> Result<VideoInfo, ExtractError> {
        let output = self.run(self.probe_args(url)).await?;
        if !output.status.success() {
            return Err(ExtractError::Probe(stderr_message(&output.stderr)));
        }

        let info = VideoInfo::from_json(&String::from_utf8_lossy(&output.stdout), url)?;
        info!(id = %info.id, extractor = %info.extractor, formats = info.formats.len(), "probed media");
        Ok(info)
    }

    async fn download(&self, url: &str, output_dir: &Path) -> Result<PathBuf, ExtractError> {
        // One scratch directory per download so concurrent requests for the
        // same media never write to the same file.
        let job_dir = output_dir.join(Uuid::new_v4().simple().to_string());
        tokio::fs::create_dir_all(&job_dir)
            .await
            .map_err(ExtractError::OutputDir)?;
        let job_dir = tokio::fs::canonicalize(&job_dir)
            .await
            .map_err(ExtractError::OutputDir)?;

        let output = match self.run(self.download_args(url, &job_dir)).await {
            Ok(output) => output,
            Err(err) => {
                remove_dir_quietly(&job_dir).await;
                return Err(err);
            }
        };
        if !output.status.success() {
            remove_dir_quietly(&job_dir).await;
            return Err(ExtractError::Download(stderr_message(&output.stderr)));
        }

        let path = match last_line(&output.stdout) {
            Some(line) => PathBuf::from(line),
            None => {
                remove_dir_quietly(&job_dir).await;
                return Err(ExtractError::MissingFile);
            }
        };
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            remove_dir_quietly(&job_dir).await;
            return Err(ExtractError::MissingFile);
        }

        info!(path = %path.display(), "download finished");
        Ok(path)
    }
}

async fn remove_dir_quietly(dir: &Path) {
    if let Err(err) = tokio::fs::remove_dir_all(dir).await {
        debug!(dir = %dir.display(), error = %err, "could not remove scratch directory");
    }
}

/// The last non-empty stderr line; yt-dlp prints the actual error there.
fn stderr_message(stderr: &[u8]) -> String {
    last_line(stderr).unwrap_or_else(|| "Unknown error".to_string())
}

fn last_line(stdout: &[u8]) -> Option<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(ToString::to_string)
}
