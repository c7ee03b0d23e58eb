use crate::config::BotConfig;
use crate::handlers;
use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::Message;
use tracing::info;

pub async fn start_bot(bot: Bot, config: BotConfig) -> Result<()> {
    info!("Bot is starting...");

    let config = Arc::new(config);

    let config_clone = config.clone();
    let handler = dptree::entry()
        .branch(
            // Данные из Mini App приходят как service message, не текстом.
            Update::filter_message()
                .filter(|msg: Message| handlers::web_app_payload(&msg).is_some())
                .endpoint(|bot: Bot, msg: Message| async move {
                    handlers::handle_web_app_data(bot, msg).await
                }),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| {
                    if let Some(text) = msg.text() {
                        text.starts_with('/')
                    } else {
                        false
                    }
                })
                .endpoint(move |bot: Bot, msg: Message| {
                    let config = config_clone.clone();
                    async move { handle_commands(bot, msg, config).await }
                }),
        );

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_commands(bot: Bot, msg: Message, config: Arc<BotConfig>) -> ResponseResult<()> {
    let text = msg.text().unwrap_or_default();
    let command = text.split_whitespace().next().unwrap_or("");

    match command {
        "/start" => {
            handlers::handle_start(bot, msg, config).await?;
        }
        _ => {
            // Неизвестная команда, игнорируем
        }
    }

    Ok(())
}
