use dotenvy::dotenv;
use linkqr_bot::config::Settings;
use linkqr_bot::logging::{init_logging, RedactionPatterns};
use linkqr_bot::runner::run_bot;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Initialize redaction patterns early (before logging)
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    init_logging(patterns);

    info!("Starting link shortener / QR code bot...");

    let settings = init_settings();

    if let Err(e) = run_bot(settings).await {
        error!("Bot stopped with error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}
