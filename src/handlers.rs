use crate::config::BotConfig;
use serde_json::Value;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{
    ButtonRequest, KeyboardButton, KeyboardMarkup, MessageKind, ParseMode, WebAppData, WebAppInfo,
};
use tracing::{error, info, warn};
use url::Url;

const START_BUTTON: &str = "🚀 Тест скорости";

const WELCOME: &str = "👋 **Добро пожаловать в Pro Speed Test!**\n\n\
Этот бот поможет вам измерить реальную скорость вашего интернет-соединения.\n\n\
Для начала просто нажмите кнопку «🚀 Тест скорости» внизу экрана.";

const CONFIG_ERROR: &str = "🚫 **Ошибка конфигурации бота.**\n\n\
URL веб-приложения не настроен или имеет неверный формат. \
Он должен начинаться с `https://`.";

const APOLOGY: &str = "😔 Произошла внутренняя ошибка при обработке вашей команды. \
Попробуйте еще раз позже или свяжитесь с администратором.";

const PARSE_ERROR: &str = "⚠️ Не удалось разобрать результаты теста. \
Попробуйте запустить тест еще раз.";

pub async fn handle_start(bot: Bot, msg: Message, config: Arc<BotConfig>) -> ResponseResult<()> {
    info!("Command /start received from chat {}", msg.chat.id);

    let url = match valid_web_app_url(config.web_app_url.as_deref()) {
        Some(url) => url,
        None => {
            error!("WEB_APP_URL is not set or invalid: {:?}", config.web_app_url);
            if let Err(e) = bot
                .send_message(msg.chat.id, CONFIG_ERROR)
                .parse_mode(ParseMode::Markdown)
                .await
            {
                error!("Failed to send config error to chat {}: {e}", msg.chat.id);
            }
            return Ok(());
        }
    };

    // Постоянная кнопка внизу экрана, открывающая Mini App.
    let keyboard = KeyboardMarkup::new(vec![vec![KeyboardButton::new(START_BUTTON)
        .request(ButtonRequest::WebApp(WebAppInfo { url }))]])
    .resize_keyboard(true);

    let sent = bot
        .send_message(msg.chat.id, WELCOME)
        .parse_mode(ParseMode::Markdown)
        .reply_markup(keyboard)
        .await;

    match sent {
        Ok(_) => info!("Welcome message sent to chat {}", msg.chat.id),
        Err(e) => {
            // Ошибка не должна уйти в диспетчер: логируем и извиняемся.
            error!("An error occurred in start handler for chat {}: {e}", msg.chat.id);
            let _ = bot.send_message(msg.chat.id, APOLOGY).await;
        }
    }

    Ok(())
}

/// Данные Mini App приходят только в варианте `MessageKind::WebAppData`;
/// геттера для них у `Message` нет.
pub fn web_app_payload(msg: &Message) -> Option<&WebAppData> {
    match &msg.kind {
        MessageKind::WebAppData(data) => Some(&data.web_app_data),
        _ => None,
    }
}

/// Обрабатывает данные, присланные из Mini App, и отправляет пользователю
/// сводку результатов.
pub async fn handle_web_app_data(bot: Bot, msg: Message) -> ResponseResult<()> {
    let Some(web_app_data) = web_app_payload(&msg) else {
        return Ok(());
    };

    info!("Web app data received from chat {}", msg.chat.id);

    let text = match serde_json::from_str::<Value>(&web_app_data.data) {
        Ok(results) => format_results_message(&results),
        Err(e) => {
            warn!("Malformed web app payload from chat {}: {e}", msg.chat.id);
            if let Err(e) = bot.send_message(msg.chat.id, PARSE_ERROR).await {
                error!("Failed to send parse error to chat {}: {e}", msg.chat.id);
            }
            return Ok(());
        }
    };

    if let Err(e) = bot
        .send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Markdown)
        .await
    {
        error!("Failed to send results to chat {}: {e}", msg.chat.id);
        let _ = bot.send_message(msg.chat.id, APOLOGY).await;
    }

    Ok(())
}

fn valid_web_app_url(raw: Option<&str>) -> Option<Url> {
    let raw = raw?;
    if !raw.starts_with("https://") {
        return None;
    }
    Url::parse(raw).ok()
}

fn format_results_message(results: &Value) -> String {
    let field = |key: &str| {
        results
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or("N/A")
            .to_string()
    };

    format!(
        "✅ **Ваш тест скорости завершен!**\n\n\
         **Пинг (задержка):**\n  `{}`\n\n\
         **Скорость загрузки (Download):**\n  `{}`\n\n\
         **Скорость отправки (Upload):**\n  `{}`",
        field("ping"),
        field("download"),
        field("upload")
    )
}
