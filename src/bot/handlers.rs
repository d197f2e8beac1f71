use crate::bot::views::{link_action_keyboard, DefaultLinkView, LinkView, QR_FILE_NAME};
use crate::conversation::{Action, ActionOutcome, ConversationHandler, PendingAction, Submission};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use teloxide::{
    prelude::*,
    types::{ChatId, InputFile, MessageId},
    utils::command::BotCommands,
};
use tracing::{debug, error, info, warn};

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show the welcome message
    #[command(description = "Start the bot.")]
    Start,
    /// List commands
    #[command(description = "Show this help.")]
    Help,
    /// Drop the pending URL
    #[command(description = "Forget the URL you sent last.")]
    Cancel,
}

/// Safe extraction of the sender ID from a message.
/// Returns `None` for messages without a sender (e.g. channel posts).
#[must_use]
pub fn sender_id(msg: &Message) -> Option<i64> {
    msg.from.as_ref().map(|u| u.id.0.cast_signed())
}

/// Start handler
///
/// # Errors
///
/// Returns an error if the welcome message cannot be sent.
pub async fn start(bot: Bot, msg: Message) -> Result<()> {
    info!(user_id = ?sender_id(&msg), "User initiated /start command.");
    bot.send_message(msg.chat.id, DefaultLinkView::welcome_message())
        .await?;
    Ok(())
}

/// Help handler
///
/// # Errors
///
/// Returns an error if the message cannot be sent.
pub async fn help(bot: Bot, msg: Message) -> Result<()> {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

/// Cancel handler: forgets the pending URL of the sender.
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn cancel(
    bot: Bot,
    msg: Message,
    conversation: Arc<ConversationHandler>,
) -> Result<()> {
    let Some(user_id) = sender_id(&msg) else {
        return Ok(());
    };

    let text = if conversation.cancel(user_id).await {
        DefaultLinkView::pending_cleared()
    } else {
        DefaultLinkView::nothing_pending()
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// Free text handler: stores a valid URL and offers the two actions.
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn handle_text(
    bot: Bot,
    msg: Message,
    conversation: Arc<ConversationHandler>,
) -> Result<()> {
    let (Some(user_id), Some(text)) = (sender_id(&msg), msg.text()) else {
        return Ok(());
    };

    match conversation.submit(user_id, text).await {
        Submission::Accepted(_) => {
            bot.send_message(msg.chat.id, DefaultLinkView::choose_action())
                .reply_markup(link_action_keyboard())
                .await?;
        }
        Submission::Rejected => {
            bot.send_message(msg.chat.id, DefaultLinkView::invalid_url())
                .await?;
        }
    }

    Ok(())
}

/// Inline button handler for the shorten / QR actions.
///
/// # Errors
///
/// Returns an error if the callback carries no message or a reply cannot be sent.
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    conversation: Arc<ConversationHandler>,
) -> Result<()> {
    // Answer first so the client stops showing a spinner on the button
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        warn!("Failed to answer callback query: {e}");
    }

    let user_id = q.from.id.0.cast_signed();
    let message = q
        .message
        .as_ref()
        .ok_or_else(|| anyhow!("Callback message missing chat id"))?;
    let chat_id = message.chat().id;
    let prompt_id = message.id();

    // A missing session is reported whatever button was pressed
    let Some(url) = conversation.pending_url(user_id).await else {
        bot.edit_message_text(chat_id, prompt_id, DefaultLinkView::no_url_found())
            .await?;
        return Ok(());
    };
    let Some(action) = q.data.as_deref().and_then(Action::from_callback_data) else {
        debug!("Ignoring unknown callback data: {:?}", q.data);
        return Ok(());
    };
    let pending = PendingAction {
        action,
        url,
        user_id,
    };

    update_status(&bot, chat_id, prompt_id, action).await;

    match conversation.complete(pending).await {
        ActionOutcome::Shortened(short_url) => {
            bot.send_message(chat_id, DefaultLinkView::shortened(&short_url))
                .await?;
        }
        ActionOutcome::ShortenFailed => {
            bot.send_message(chat_id, DefaultLinkView::shorten_failed())
                .await?;
        }
        ActionOutcome::QrCode(png) => {
            let photo = InputFile::memory(png).file_name(QR_FILE_NAME);
            if let Err(e) = bot
                .send_photo(chat_id, photo)
                .caption(DefaultLinkView::qr_caption())
                .await
            {
                error!(user_id, "Failed to upload QR code: {e}");
                bot.send_message(chat_id, DefaultLinkView::qr_failed())
                    .await?;
            }
        }
        ActionOutcome::QrFailed => {
            bot.send_message(chat_id, DefaultLinkView::qr_failed())
                .await?;
        }
    }

    Ok(())
}

// Status edit is cosmetic; a failure must not stop the action.
async fn update_status(bot: &Bot, chat_id: ChatId, prompt_id: MessageId, action: Action) {
    if let Err(e) = bot
        .edit_message_text(chat_id, prompt_id, DefaultLinkView::action_in_progress(action))
        .await
    {
        warn!("Failed to edit prompt message: {e}");
    }
}
