//! Telegram notification and command handling.
//!
//! Provides the [`TelegramNotifier`] for pushing lifecycle events to the
//! operator chat and [`spawn_command_handler`] for the admin bot. Both run
//! as background workers.
//!
//! Requires the `telegram` feature to be enabled.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{BotCommand, ParseMode};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::infrastructure::config::telegram::TelegramAppConfig;
use crate::port::AdminPort;
use crate::port::{outbound::notifier::Event, outbound::notifier::Notifier};

use super::auth::command_response_for_message;
use super::command::bot_commands;
use super::control::TelegramControl;
use super::format::format_event_message;

/// Configuration for the Telegram notifier and admin bot.
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot API token obtained from BotFather.
    pub bot_token: String,
    /// The only chat allowed to receive notifications and send commands.
    pub chat_id: i64,
    pub notify_new_transactions: bool,
    /// Every status change (noisy).
    pub notify_status_changes: bool,
    pub notify_receipts: bool,
    pub notify_balances: bool,
    /// Maximum transactions listed by `/transactions`.
    pub list_limit: usize,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("notify_new_transactions", &self.notify_new_transactions)
            .field("notify_status_changes", &self.notify_status_changes)
            .field("notify_receipts", &self.notify_receipts)
            .field("notify_balances", &self.notify_balances)
            .field("list_limit", &self.list_limit)
            .finish()
    }
}

impl TelegramConfig {
    /// Configuration with the default notification flags.
    #[must_use]
    pub fn new(bot_token: String, chat_id: i64) -> Self {
        Self::with_settings(bot_token, chat_id, &TelegramAppConfig::default())
    }

    #[must_use]
    pub fn with_settings(bot_token: String, chat_id: i64, settings: &TelegramAppConfig) -> Self {
        Self {
            bot_token,
            chat_id,
            notify_new_transactions: settings.notify_new_transactions,
            notify_status_changes: settings.notify_status_changes,
            notify_receipts: settings.notify_receipts,
            notify_balances: settings.notify_balances,
            list_limit: settings.list_limit,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Reads `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID`; notification flags
    /// come from `settings`. Returns `None` if either variable is missing or
    /// invalid.
    #[must_use]
    pub fn from_env(settings: &TelegramAppConfig) -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID")
            .ok()
            .and_then(|s| s.trim().parse().ok())?;

        Some(Self::with_settings(bot_token, chat_id, settings))
    }
}

/// Telegram notifier that sends messages to a chat.
///
/// `notify` only queues the event. A background worker formats and delivers
/// it.
pub struct TelegramNotifier {
    sender: mpsc::UnboundedSender<Event>,
}

impl TelegramNotifier {
    /// Create a new Telegram notifier and spawn the background worker.
    #[must_use]
    pub fn new(config: TelegramConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(telegram_worker(config, receiver));
        Self { sender }
    }
}

impl Notifier for TelegramNotifier {
    fn notify(&self, event: Event) {
        if self.sender.send(event).is_err() {
            warn!("Telegram notifier channel closed");
        }
    }
}

/// Spawn the admin bot that answers commands from the configured chat.
pub fn spawn_command_handler(config: TelegramConfig, admin: Arc<dyn AdminPort>) -> JoinHandle<()> {
    let control = TelegramControl::with_list_limit(admin, config.list_limit);
    tokio::spawn(telegram_command_worker(config, control))
}

/// Background worker that sends Telegram messages.
async fn telegram_worker(config: TelegramConfig, mut receiver: mpsc::UnboundedReceiver<Event>) {
    let bot = Bot::new(&config.bot_token);
    let chat_id = ChatId(config.chat_id);

    info!(chat_id = config.chat_id, "Telegram notifier started");

    while let Some(event) = receiver.recv().await {
        let Some(text) = format_event_message(&event, &config) else {
            continue;
        };
        if let Err(e) = bot
            .send_message(chat_id, &text)
            .parse_mode(ParseMode::MarkdownV2)
            .await
        {
            error!(error = %e, event = event.name(), "Failed to send Telegram message");
        }
    }

    warn!("Telegram notifier worker shutting down");
}

/// Background worker that handles inbound Telegram commands.
async fn telegram_command_worker(config: TelegramConfig, control: TelegramControl) {
    let bot = Bot::new(&config.bot_token);
    let allowed_chat = ChatId(config.chat_id);

    // Register commands with Telegram so they appear in the "/" menu
    if let Err(e) = register_bot_commands(&bot).await {
        warn!(error = %e, "Failed to register bot commands with Telegram");
    }

    info!(chat_id = config.chat_id, "Telegram command listener started");

    teloxide::repl(bot, move |bot: Bot, msg: Message| {
        let control = control.clone();
        async move {
            let Some(text) = msg.text() else {
                return respond(());
            };

            if let Some(response) =
                command_response_for_message(text, msg.chat.id, allowed_chat, &control).await
            {
                if let Err(e) = bot.send_message(msg.chat.id, response).await {
                    error!(error = %e, "Failed to send Telegram command response");
                }
            }

            respond(())
        }
    })
    .await;
}

/// Register bot commands with Telegram for the "/" menu.
async fn register_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    let commands: Vec<BotCommand> = bot_commands()
        .into_iter()
        .map(|(cmd, desc)| BotCommand::new(cmd, desc))
        .collect();

    bot.set_my_commands(commands).await?;
    info!("Registered bot commands with Telegram");
    Ok(())
}
