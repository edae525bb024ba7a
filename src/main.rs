use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use grabh::{
    bot,
    config::Config,
    db::{create_pool, DownloadStats},
    engine::YtDlp,
    routes::create_router,
    utils::init_logger,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);

    tokio::fs::create_dir_all(&config.downloads.dir)
        .await
        .with_context(|| format!("Failed to create download directory {}", config.downloads.dir.display()))?;

    let pool = create_pool(&config.database).await?;
    if pool.is_none() {
        info!("DATABASE_URL not set, download stats are kept in memory");
    }
    let stats = DownloadStats::new(pool);

    let extractor = YtDlp::from_config(&config.extractor);
    info!(binary = %extractor.binary().display(), "Using yt-dlp");

    let state = AppState::new(config.clone(), Arc::new(extractor), stats);
    let shutdown = CancellationToken::new();

    let bot_task = match config.bot.token.as_ref() {
        Some(token) => match bot::start_bot(token, state.clone(), shutdown.clone()).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Failed to start telegram bot: {e:#}");
                None
            }
        },
        None => {
            warn!("BOT_TOKEN not set, telegram bot disabled");
            None
        }
    };

    let app = create_router(state);

    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.server.host, config.server.port))?;
    let addr = listener.local_addr()?;

    info!("GRABH server running at http://{}", addr);
    info!(
        "Max file size: {}MB | Queue: {} concurrent",
        config.downloads.max_file_size_mb, config.downloads.max_concurrent
    );

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {e}");
            }
            info!("Shutting down");
            server_shutdown.cancel();
        })
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    shutdown.cancel();
    if let Some(handle) = bot_task {
        let _ = handle.await;
    }

    Ok(())
}
