use std::sync::Arc;

use chrono::Utc;

use crate::port::AdminPort;

use super::super::command::{command_help, TelegramCommand};
use super::{TelegramControl, DEFAULT_LIST_LIMIT};

impl TelegramControl {
    #[must_use]
    pub fn new(admin: Arc<dyn AdminPort>) -> Self {
        Self::with_list_limit(admin, DEFAULT_LIST_LIMIT)
    }

    /// Create a control with a custom `/transactions` display limit.
    #[must_use]
    pub fn with_list_limit(admin: Arc<dyn AdminPort>, list_limit: usize) -> Self {
        Self {
            admin,
            started_at: Utc::now(),
            list_limit: list_limit.max(1),
        }
    }

    /// Execute one parsed command and return response text.
    pub async fn execute(&self, command: TelegramCommand) -> String {
        match command {
            TelegramCommand::Start | TelegramCommand::Help => command_help().to_string(),
            TelegramCommand::Status => self.status_text().await,
            TelegramCommand::Stats => self.stats_text().await,
            TelegramCommand::Accounts => self.accounts_text(),
            TelegramCommand::Transactions(status) => self.transactions_text(status).await,
            TelegramCommand::Transaction(id) => self.transaction_text(&id).await,
            TelegramCommand::Approve(id) => self.approve_text(&id).await,
            TelegramCommand::Reject { id, reason } => self.reject_text(&id, &reason).await,
            TelegramCommand::Balance(account) => self.balance_text(account.as_ref()).await,
            TelegramCommand::Relogin(account) => self.relogin_text(account.as_ref()).await,
        }
    }
}
