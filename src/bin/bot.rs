use anyhow::Result;
use pro_speed_test::bot;
use pro_speed_test::config::BotConfig;
use teloxide::prelude::*;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = BotConfig::from_env()?;

    info!("Starting Telegram bot...");

    // Create bot
    let bot = Bot::new(&config.telegram_token);

    // Start bot
    bot::start_bot(bot, config).await?;

    Ok(())
}
