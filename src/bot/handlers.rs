use std::path::Path;
use std::time::Duration;

use rand::{rngs::StdRng, SeedableRng};
use teloxide::{
    payloads::{EditMessageTextSetters, SendMessageSetters, SendVideoSetters},
    prelude::*,
    types::{InputFile, MessageId, ParseMode, User},
    utils::command::BotCommands,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bot::error::Result;
use crate::bot::markdown::{self, extract_url, next_progress};
use crate::db::TelegramUser;
use crate::engine::VideoInfo;
use crate::models::AppState;

const PROGRESS_INTERVAL: Duration = Duration::from_secs(3);

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "👋 START PROTOCOL")]
    Start,
    #[command(description = "❓ PROTOCOL INFO")]
    Help,
    #[command(description = "📺 TARGET LIST")]
    Supported,
    #[command(description = "📊 SYSTEM LOAD")]
    Status,
}

/// Entry point for every incoming message.
pub async fn handle_message(bot: &Bot, msg: Message, state: &AppState, bot_username: &str) -> Result<()> {
    let Some(text) = msg.text() else {
        debug!(chat_id = msg.chat.id.0, "ignoring non-text message");
        return Ok(());
    };

    let command = Command::parse(text, bot_username).ok();
    if let Some(command) = command {
        return handle_command(bot, msg.chat.id, command, state).await;
    }

    let Some(url) = extract_url(text) else {
        reply(bot, msg.chat.id, markdown::NO_LINK).await?;
        return Ok(());
    };

    if let Some(user) = msg.from.as_ref() {
        if let Err(e) = state.stats.save_telegram_user(&telegram_user(user)).await {
            warn!(user_id = user.id.0, error = %e, "failed to record telegram user");
        }
    }

    info!(chat_id = msg.chat.id.0, url, "telegram download requested");
    grab(bot, msg.chat.id, msg.from.as_ref().map(|u| u.id.0), url, state).await
}

async fn handle_command(bot: &Bot, chat_id: ChatId, command: Command, state: &AppState) -> Result<()> {
    let text = match command {
        Command::Start => markdown::START.to_string(),
        Command::Help => markdown::help(state.config.bot.max_upload_mb),
        Command::Supported => markdown::SUPPORTED.to_string(),
        Command::Status => markdown::status(&state.dispatcher.status()),
    };
    reply(bot, chat_id, &text).await?;
    Ok(())
}

async fn reply(bot: &Bot, chat_id: ChatId, text: &str) -> Result<Message> {
    Ok(bot
        .send_message(chat_id, text)
        .parse_mode(ParseMode::MarkdownV2)
        .await?)
}

/// Best effort status update; Telegram refuses edits of deleted messages
/// and edits that do not change the text.
async fn edit(bot: &Bot, chat_id: ChatId, message_id: MessageId, text: String) {
    if let Err(e) = bot
        .edit_message_text(chat_id, message_id, text)
        .parse_mode(ParseMode::MarkdownV2)
        .await
    {
        debug!(chat_id = chat_id.0, error = %e, "status edit failed");
    }
}

/// Resolve, queue, download and send one URL, reporting progress in a
/// single status message.
async fn grab(bot: &Bot, chat_id: ChatId, user_id: Option<u64>, url: &str, state: &AppState) -> Result<()> {
    let status = reply(bot, chat_id, markdown::RESOLVING).await?;

    if let Err(err) = download_and_send(bot, chat_id, status.id, user_id, url, state).await {
        warn!(chat_id = chat_id.0, url, error = %err, "telegram download failed");
        let message = err.to_string();
        if bot
            .edit_message_text(chat_id, status.id, markdown::failed(&message))
            .parse_mode(ParseMode::MarkdownV2)
            .await
            .is_err()
        {
            reply(bot, chat_id, &markdown::failed_reply(&message)).await?;
        }
    }
    Ok(())
}

async fn download_and_send(
    bot: &Bot,
    chat_id: ChatId,
    status_id: MessageId,
    user_id: Option<u64>,
    url: &str,
    state: &AppState,
) -> Result<()> {
    let info = state.extractor.probe(url).await?;

    let queue = state.dispatcher.status();
    let position = (queue.waiting > 0).then_some(queue.waiting + 1);
    edit(bot, chat_id, status_id, markdown::acquiring(&info, 0, position)).await;

    let stop = CancellationToken::new();
    let _stop_on_exit = stop.clone().drop_guard();
    let animation = tokio::spawn(animate_progress(
        bot.clone(),
        chat_id,
        status_id,
        info.clone(),
        stop.clone(),
    ));

    let outcome = state.queue_download(url.to_string()).await;

    stop.cancel();
    let _ = animation.await;

    let file = outcome?;
    send_file(bot, chat_id, status_id, user_id, &info, file.path(), state).await
}

async fn send_file(
    bot: &Bot,
    chat_id: ChatId,
    status_id: MessageId,
    user_id: Option<u64>,
    info: &VideoInfo,
    path: &Path,
    state: &AppState,
) -> Result<()> {
    let size = tokio::fs::metadata(path).await?.len();
    let max_mb = state.config.bot.max_upload_mb;
    if size > max_mb * 1024 * 1024 {
        let size_mb = size as f64 / 1024.0 / 1024.0;
        info!(chat_id = chat_id.0, size_mb, "file exceeds telegram upload limit");
        edit(bot, chat_id, status_id, markdown::too_large(info, size_mb, max_mb)).await;
        return Ok(());
    }

    edit(bot, chat_id, status_id, markdown::complete(info)).await;

    match bot
        .send_video(chat_id, InputFile::file(path))
        .caption(markdown::caption(info))
        .parse_mode(ParseMode::MarkdownV2)
        .await
    {
        Ok(_) => record_download(state, user_id).await,
        Err(e) => {
            warn!(chat_id = chat_id.0, error = %e, "failed to send video");
            let _ = reply(bot, chat_id, markdown::SEND_FAILED).await;
        }
    }

    if let Err(e) = bot.delete_message(chat_id, status_id).await {
        debug!(chat_id = chat_id.0, error = %e, "could not delete status message");
    }
    Ok(())
}

async fn record_download(state: &AppState, user_id: Option<u64>) {
    if let Some(user_id) = user_id {
        if let Err(e) = state.stats.increment_telegram_downloads(user_id).await {
            warn!(user_id, error = %e, "failed to count telegram download");
        }
    }
    if let Err(e) = state.stats.increment_global_downloads().await {
        warn!(error = %e, "failed to count download");
    }
}

/// Simulated progress: the extractor reports none, so the bar creeps up
/// until `stop` fires.
async fn animate_progress(
    bot: Bot,
    chat_id: ChatId,
    status_id: MessageId,
    info: VideoInfo,
    stop: CancellationToken,
) {
    let mut rng = StdRng::from_entropy();
    let mut percent = 0;
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {
                let next = next_progress(percent, &mut rng);
                if next == percent {
                    continue;
                }
                percent = next;
                edit(&bot, chat_id, status_id, markdown::acquiring(&info, percent, None)).await;
            }
        }
    }
}

fn telegram_user(user: &User) -> TelegramUser {
    TelegramUser {
        id: user.id.0,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
    }
}
