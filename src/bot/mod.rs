//! Telegram front end.
//!
//! Long-polls `getUpdates` and handles every message on its own task, so a
//! slow download in one chat never holds up another. Downloads go through
//! the same [`Dispatcher`](crate::queue::Dispatcher) as the HTTP API.

pub mod error;
pub mod handlers;
pub mod markdown;

use std::time::Duration;

use secrecy::{ExposeSecret, Secret};
use teloxide::{
    payloads::{DeleteWebhookSetters, GetUpdatesSetters},
    prelude::*,
    types::{AllowedUpdate, UpdateKind},
    utils::command::BotCommands,
    ApiError, RequestError,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::models::AppState;
use handlers::Command;

const POLL_TIMEOUT_SECS: u32 = 30;
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Connect the bot and start polling in the background until `cancel`
/// fires.
pub async fn start_bot(
    token: &Secret<String>,
    state: AppState,
    cancel: CancellationToken,
) -> anyhow::Result<JoinHandle<()>> {
    // Client timeout must outlive the long-polling timeout.
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(u64::from(POLL_TIMEOUT_SECS) + 15))
        .build()?;
    let bot = Bot::with_client(token.expose_secret(), client);

    let me = bot.get_me().await?;
    let username = me.username.clone().unwrap_or_default();

    bot.delete_webhook().drop_pending_updates(true).send().await?;

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("failed to register bot commands: {e}");
    }

    info!(username = %username, "telegram bot connected");

    Ok(tokio::spawn(poll(bot, state, username, cancel)))
}

async fn poll(bot: Bot, state: AppState, username: String, cancel: CancellationToken) {
    let mut offset: i32 = 0;

    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = bot
                .get_updates()
                .offset(offset)
                .timeout(POLL_TIMEOUT_SECS)
                .allowed_updates(vec![AllowedUpdate::Message])
                .send() => result,
        };

        match result {
            Ok(updates) => {
                debug!(count = updates.len(), "got telegram updates");
                for update in updates {
                    offset = update.id.as_offset();
                    match update.kind {
                        UpdateKind::Message(msg) => {
                            let bot = bot.clone();
                            let state = state.clone();
                            let username = username.clone();
                            tokio::spawn(async move {
                                let chat_id = msg.chat.id.0;
                                if let Err(e) =
                                    handlers::handle_message(&bot, msg, &state, &username).await
                                {
                                    error!(chat_id, error = %e, "error handling telegram message");
                                }
                            });
                        }
                        other => debug!("ignoring non-message update: {other:?}"),
                    }
                }
            }
            Err(RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) => {
                warn!("telegram bot disabled: another instance is already running with this token");
                break;
            }
            Err(e) => {
                warn!(error = %e, "telegram getUpdates failed");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(RETRY_DELAY) => {}
                }
            }
        }
    }

    info!("telegram polling stopped");
}
