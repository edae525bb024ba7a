use axum::{body::Bytes, extract::State, response::Json as ResponseJson, routing::post, Json, Router};
use serde_json::Value;
use tracing::info;

use crate::models::{non_blank, AppState, GrabhResponse};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/grabh", post(grabh))
        .with_state(state)
}

/// Probe metadata for a URL. Not queued: probing is cheap next to a download.
///
/// The body is parsed by hand so that every malformed request gets the
/// JSON error shape, whatever its content type.
async fn grabh(State(state): State<AppState>, body: Bytes) -> AppResult<ResponseJson<GrabhResponse>> {
    let request: Value = serde_json::from_slice(&body)
        .map_err(|_| AppError::InvalidRequest("Invalid JSON body".to_string()))?;
    let url = non_blank(request.get("url").and_then(Value::as_str))
        .ok_or_else(|| AppError::InvalidRequest("Missing or invalid 'url' field".to_string()))?;

    info!(url = %url, "Fetching media info");
    let data = state.extractor.probe(url).await?;

    Ok(Json(GrabhResponse {
        success: true,
        data,
        max_file_size_mb: state.config.downloads.max_file_size_mb,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};

    use crate::routes::test_support::{json_body, send, test_state, FakeExtractor};

    fn post_json(body: &str) -> Request<Body> {
        Request::post("/api/grabh")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_returns_video_info() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), Arc::new(FakeExtractor::new("a.mp4", b"x")));

        let response = send(state, post_json(r#"{"url":"https://example.com/v/1"}"#)).await;
        let (status, body) = json_body(response).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["maxFileSizeMB"], 1);
        assert_eq!(body["data"]["title"], "Test clip");
        assert_eq!(body["data"]["duration_string"], "1:15");
        assert_eq!(body["data"]["webpage_url"], "https://example.com/v/1");
    }

    #[tokio::test]
    async fn test_missing_url_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), Arc::new(FakeExtractor::new("a.mp4", b"x")));

        for body in [r#"{}"#, r#"{"url":"   "}"#, r#"{"url":123}"#, r#"["https://example.com"]"#] {
            let (status, json) = json_body(send(state.clone(), post_json(body)).await).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["error"], "Missing or invalid 'url' field");
        }
    }

    #[tokio::test]
    async fn test_probe_failure_is_server_error() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), Arc::new(FakeExtractor::failing("Unsupported URL")));

        let response = send(state, post_json(r#"{"url":"https://example.com"}"#)).await;
        let (status, body) = json_body(response).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "yt-dlp failed: Unsupported URL");
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), Arc::new(FakeExtractor::new("a.mp4", b"x")));

        for body in ["not json", r#"{"url":"#, ""] {
            let (status, json) = json_body(send(state.clone(), post_json(body)).await).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["error"], "Invalid JSON body");
        }
    }

    #[tokio::test]
    async fn test_accepts_body_without_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), Arc::new(FakeExtractor::new("a.mp4", b"x")));

        let request = Request::post("/api/grabh")
            .body(Body::from(r#"{"url":"https://example.com/v/2"}"#))
            .unwrap();
        let (status, body) = json_body(send(state, request).await).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["webpage_url"], "https://example.com/v/2");
    }
}
