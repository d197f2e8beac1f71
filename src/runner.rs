use crate::bot;
use crate::bot::handlers::Command;
use crate::config::Settings;
use crate::conversation::ConversationHandler;
use crate::qr::PngQrEncoder;
use crate::session::MokaSessionStore;
use crate::shortener::TinyUrlClient;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use teloxide::update_listeners::webhooks;
use tracing::{error, info};

/// Run the Telegram bot until Ctrl+C.
///
/// Uses a webhook listener on `0.0.0.0:<port>` when a webhook URL is
/// configured and long polling otherwise.
///
/// # Errors
///
/// Returns an error if the collaborators cannot be built or the webhook
/// cannot be registered.
pub async fn run_bot(settings: Arc<Settings>) -> Result<()> {
    let conversation = Arc::new(init_conversation(&settings)?);
    let bot = Bot::new(settings.telegram_token.clone());
    let handler = setup_handler();

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![conversation])
        .enable_ctrlc_handler()
        .build();

    match settings.webhook()? {
        Some(url) => {
            let address = SocketAddr::from(([0, 0, 0, 0], settings.port));
            let mut options = webhooks::Options::new(address, url.clone());

            if let Some(secret) = &settings.webhook_secret {
                options = options.secret_token(secret.clone());
                info!("Webhook secret token configured");
            }

            info!("🔗 Setting webhook URL: {}", url);
            info!("📡 Listening on: {}", address);

            // Registers the webhook, serves it with axum and deletes it on shutdown
            let listener = webhooks::axum(bot, options)
                .await
                .context("Failed to set up webhook")?;

            info!("Bot is running in webhook mode...");
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("Error from update listener"),
                )
                .await;
        }
        None => {
            info!("Bot is running in polling mode...");
            dispatcher.dispatch().await;
        }
    }

    Ok(())
}

/// Builds the conversation handler with the production collaborators.
///
/// # Errors
///
/// Returns an error if the HTTP client for the shortening service cannot be built.
pub fn init_conversation(settings: &Settings) -> Result<ConversationHandler> {
    let sessions = MokaSessionStore::new(settings.session_ttl_secs, settings.session_max_capacity);
    info!(
        "Initializing session store (ttl: {}s, max_size: {})",
        settings.session_ttl_secs, settings.session_max_capacity
    );

    let shortener = TinyUrlClient::new(
        settings.tinyurl_token.clone(),
        settings.tinyurl_api_url.clone(),
        settings.tinyurl_domain.clone(),
        settings.shortener_timeout(),
    )
    .context("Failed to build shortening client")?;

    let qr = PngQrEncoder::new(settings.qr_module_px);

    Ok(ConversationHandler::new(
        Arc::new(sessions),
        Arc::new(shortener),
        Arc::new(qr),
    ))
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_callback))
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(
                    // Unknown commands are ignored rather than treated as bad URLs
                    dptree::filter(|msg: Message| {
                        msg.text().is_some_and(|text| !text.starts_with('/'))
                    })
                    .endpoint(handle_text),
                ),
        )
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    conversation: Arc<ConversationHandler>,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => bot::handlers::start(bot, msg).await,
        Command::Help => bot::handlers::help(bot, msg).await,
        Command::Cancel => bot::handlers::cancel(bot, msg, conversation).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_text(
    bot: Bot,
    msg: Message,
    conversation: Arc<ConversationHandler>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_text(bot, msg, conversation).await {
        error!("Text handler error: {}", e);
    }
    respond(())
}

async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    conversation: Arc<ConversationHandler>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handlers::handle_callback(bot, q, conversation).await {
        error!("Callback handler error: {}", e);
    }
    respond(())
}
