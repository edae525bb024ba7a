// GRABH - media downloader service with a bounded download queue

pub mod bot;
pub mod config;
pub mod db;
pub mod engine;
pub mod middleware;
pub mod models;
pub mod queue;
pub mod routes;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;
pub use queue::Dispatcher;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
