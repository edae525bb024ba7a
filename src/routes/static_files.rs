//! Static File Serving
//!
//! Serves the web client from `PUBLIC_DIR`. When the directory has no
//! `index.html` a small built-in landing page is returned for `/` so the
//! API is still discoverable.

use std::path::PathBuf;

use axum::{
    handler::HandlerWithoutStateExt,
    http::{header, HeaderValue},
    middleware::map_response,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::types::AppError;

const CACHE_CONTROL: &str = "public, max-age=3600";

/// Create router for serving static files
pub fn router(public_dir: PathBuf) -> Router {
    if public_dir.is_dir() {
        info!(path = %public_dir.display(), "Serving static files");
    } else {
        warn!(path = %public_dir.display(), "Static files directory not found, serving landing page only");
    }

    let index = public_dir.join("index.html");
    let serve_dir = ServeDir::new(&public_dir)
        .append_index_html_on_directories(false)
        .not_found_service(not_found.into_service());

    Router::new()
        .route("/", get(move || serve_index(index.clone())))
        .fallback_service(serve_dir)
        .layer(map_response(cache_successful))
}

async fn serve_index(path: PathBuf) -> Response {
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Html(content).into_response(),
        Err(_) => Html(LANDING_PAGE).into_response(),
    }
}

pub async fn not_found() -> Response {
    AppError::NotFound.into_response()
}

async fn cache_successful(mut response: Response) -> Response {
    if response.status().is_success() {
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL));
    }
    response
}

const LANDING_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>GRABH</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            max-width: 720px;
            margin: 0 auto;
            padding: 40px 20px;
            background: #111;
            color: #e6e6e6;
        }
        h1 { color: #ff5c8a; margin-bottom: 4px; }
        code { background: #222; padding: 2px 6px; border-radius: 4px; color: #ff5c8a; }
        pre { background: #000; padding: 14px; border-radius: 6px; overflow-x: auto; }
    </style>
</head>
<body>
    <h1>GRABH</h1>
    <p>The downloader API is running. No web client was found in the public directory.</p>
    <ul>
        <li><code>GET /api/health</code> - Health check</li>
        <li><code>GET /api/status</code> - Queue status and limits</li>
        <li><code>POST /api/grabh</code> - Media info for <code>{"url": "..."}</code></li>
        <li><code>GET /api/download?url=...</code> - Download through the queue</li>
    </ul>
    <pre>curl -X POST http://localhost:3000/api/grabh \
  -H "Content-Type: application/json" \
  -d '{"url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ"}'</pre>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};

    use crate::routes::test_support::{json_body, send, test_state, FakeExtractor};

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_serves_public_files_with_cache_header() {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().join("public");
        std::fs::create_dir_all(&public).unwrap();
        std::fs::write(public.join("index.html"), "<h1>client</h1>").unwrap();
        std::fs::write(public.join("style.css"), "body{}").unwrap();
        let state = test_state(dir.path(), Arc::new(FakeExtractor::new("a.mp4", b"x")));

        let response = send(state.clone(), get("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "public, max-age=3600");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<h1>client</h1>");

        let response = send(state, get("/style.css")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");
    }

    #[tokio::test]
    async fn test_landing_page_without_client() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), Arc::new(FakeExtractor::new("a.mp4", b"x")));

        let response = send(state, get("/")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("GRABH"));
    }

    #[tokio::test]
    async fn test_unknown_path_is_json_404() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), Arc::new(FakeExtractor::new("a.mp4", b"x")));

        let response = send(state, get("/nope.js")).await;
        assert!(response.headers().get(header::CACHE_CONTROL).is_none());
        let (status, body) = json_body(response).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, serde_json::json!({ "error": "Not found" }));
    }
}
