//! Telegram admin channel configuration.
//!
//! The bot token and chat id never live in the config file. They are read
//! from `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID`.

use serde::Deserialize;

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramAppConfig {
    /// Enable the Telegram notifier and command bot.
    #[serde(default)]
    pub enabled: bool,
    /// Announce newly ingested transactions.
    #[serde(default = "default_true")]
    pub notify_new_transactions: bool,
    /// Announce every status change (noisy).
    #[serde(default)]
    pub notify_status_changes: bool,
    /// Announce receipt outcomes, matched or not.
    #[serde(default = "default_true")]
    pub notify_receipts: bool,
    /// Announce balance refreshes.
    #[serde(default)]
    pub notify_balances: bool,
    /// Maximum transactions listed by `/transactions`.
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
}

const fn default_list_limit() -> usize {
    10
}

impl Default for TelegramAppConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            notify_new_transactions: default_true(),
            notify_status_changes: false,
            notify_receipts: default_true(),
            notify_balances: false,
            list_limit: default_list_limit(),
        }
    }
}
