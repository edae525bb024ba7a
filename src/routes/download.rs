use std::path::Path;
use std::sync::LazyLock;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use regex::Regex;
use tracing::info;

use crate::models::{non_blank, AppState, DownloadQuery};
use crate::types::{AppError, AppResult};

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\s\-.()]").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/download", get(download))
        .with_state(state)
}

/// Download through the shared queue, then hand the file back as an
/// attachment. The file is removed from disk before the response is sent.
async fn download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> AppResult<Response> {
    let url = non_blank(query.url.as_deref())
        .ok_or_else(|| AppError::InvalidRequest("Missing 'url' query parameter".to_string()))?
        .to_string();

    let completion = state.queue_download(url);
    info!(job_id = %completion.id(), "Download queued");

    let file = completion.await?;
    let path = file.path();

    let size = tokio::fs::metadata(path).await?.len();
    let max_bytes = state.config.downloads.max_file_size_bytes();
    if size > max_bytes {
        return Err(AppError::TooLarge {
            size_mb: size as f64 / 1024.0 / 1024.0,
            max_mb: state.config.downloads.max_file_size_mb,
        });
    }

    let bytes = tokio::fs::read(path).await?;

    let file_name = attachment_name(query.title.as_deref(), path);
    let content_type = mime_guess::from_path(path).first_or(mime_guess::mime::APPLICATION_OCTET_STREAM);
    let disposition = format!(
        "attachment; filename=\"{file_name}\"; filename*=UTF-8''{}",
        urlencoding::encode(&file_name)
    );

    info!(file = %file_name, size, "Sending download");
    drop(file);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, header_value(content_type.as_ref())),
            (header::CONTENT_LENGTH, HeaderValue::from(bytes.len())),
            (header::CONTENT_DISPOSITION, header_value(&disposition)),
        ],
        Body::from(bytes),
    )
        .into_response())
}

fn header_value(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}

/// ASCII-only file name for `Content-Disposition`, always ending in `.mp4`.
///
/// Uses the client supplied title when present, the downloaded file's own
/// name otherwise.
pub fn attachment_name(title: Option<&str>, path: &Path) -> String {
    let raw = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or_else(|| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default();

    let stripped = UNSAFE_FILENAME_CHARS.replace_all(&raw, "");
    let safe = WHITESPACE.replace_all(stripped.trim(), "_").into_owned();
    let safe = if safe.is_empty() { "video".to_string() } else { safe };

    if safe.ends_with(".mp4") {
        safe
    } else {
        format!("{safe}.mp4")
    }
}
