use anyhow::{Context, Result};
use secrecy::Secret;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Token value shipped in `.env.example`; treated as "no bot configured".
pub const PLACEHOLDER_BOT_TOKEN: &str = "your_telegram_bot_token_here";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub downloads: DownloadConfig,
    pub extractor: ExtractorConfig,
    pub bot: BotConfig,
    pub database: DatabaseConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub public_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadConfig {
    pub dir: PathBuf,
    pub max_file_size_mb: u64,
    pub max_concurrent: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    pub binary: PathBuf,
    pub timeout_secs: u64,
    pub cookies_file: Option<PathBuf>,
    pub cookies_browser: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub token: Option<Secret<String>>,
    /// Largest file the Bot API accepts for upload.
    pub max_upload_mb: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

/// Public web-client settings handed to the front end by `/api/config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
}

impl DownloadConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let string_or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            server: ServerConfig {
                port: parse_or(&var, "PORT", 3000)?,
                host: string_or("HOST", "0.0.0.0"),
                cors_allowed_origins: string_or("ALLOWED_ORIGINS", "*")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                public_dir: PathBuf::from(string_or("PUBLIC_DIR", "public")),
            },
            downloads: DownloadConfig {
                dir: PathBuf::from(string_or("DOWNLOAD_DIR", "./downloads")),
                max_file_size_mb: parse_or(&var, "MAX_FILE_SIZE_MB", 200)?,
                max_concurrent: parse_or(&var, "MAX_CONCURRENT_DOWNLOADS", 2)?,
            },
            extractor: ExtractorConfig {
                binary: var("YTDLP_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(default_ytdlp_binary),
                timeout_secs: parse_or(&var, "YTDLP_TIMEOUT_SECS", 600)?,
                cookies_file: var("COOKIES_FILE").map(PathBuf::from),
                cookies_browser: var("COOKIES_BROWSER"),
            },
            bot: BotConfig {
                token: var("BOT_TOKEN")
                    .filter(|t| t != PLACEHOLDER_BOT_TOKEN)
                    .map(Secret::new),
                max_upload_mb: 50,
            },
            database: DatabaseConfig {
                url: var("DATABASE_URL"),
                max_connections: parse_or(&var, "DB_MAX_CONNECTIONS", 5)?,
            },
            client: ClientConfig {
                api_key: string_or("FIREBASE_API_KEY", ""),
                auth_domain: string_or("FIREBASE_AUTH_DOMAIN", ""),
                project_id: string_or("FIREBASE_PROJECT_ID", ""),
                storage_bucket: string_or("FIREBASE_STORAGE_BUCKET", ""),
                messaging_sender_id: string_or("FIREBASE_MESSAGING_SENDER_ID", ""),
                app_id: string_or("FIREBASE_APP_ID", ""),
            },
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

/// Prefer a binary bundled next to the service, then whatever is on PATH.
fn default_ytdlp_binary() -> PathBuf {
    let bundled = if cfg!(windows) { "bin/yt-dlp.exe" } else { "bin/yt-dlp" };
    if Path::new(bundled).exists() {
        PathBuf::from(bundled)
    } else {
        PathBuf::from("yt-dlp")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.cors_allowed_origins, vec!["*"]);
        assert_eq!(config.downloads.max_file_size_mb, 200);
        assert_eq!(config.downloads.max_concurrent, 2);
        assert_eq!(config.downloads.dir, PathBuf::from("./downloads"));
        assert_eq!(config.extractor.timeout_secs, 600);
        assert!(config.bot.token.is_none());
        assert!(config.database.url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("MAX_CONCURRENT_DOWNLOADS", "4"),
            ("MAX_FILE_SIZE_MB", "50"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example"),
            ("BOT_TOKEN", "123:abc"),
            ("COOKIES_BROWSER", "firefox"),
        ])
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.downloads.max_concurrent, 4);
        assert_eq!(config.downloads.max_file_size_bytes(), 50 * 1024 * 1024);
        assert_eq!(
            config.server.cors_allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.bot.token.as_ref().map(|t| t.expose_secret().as_str()), Some("123:abc"));
        assert_eq!(config.extractor.cookies_browser.as_deref(), Some("firefox"));
    }

    #[test]
    fn test_placeholder_token_disables_bot() {
        let config = config_from(&[("BOT_TOKEN", PLACEHOLDER_BOT_TOKEN)]).unwrap();
        assert!(config.bot.token.is_none());
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let err = config_from(&[("MAX_CONCURRENT_DOWNLOADS", "two")]).unwrap_err();
        assert!(err.to_string().contains("MAX_CONCURRENT_DOWNLOADS"));
    }
}
