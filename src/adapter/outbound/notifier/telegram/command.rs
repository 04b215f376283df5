//! Telegram command parsing.

use std::str::FromStr;

use uuid::Uuid;

use crate::domain::{AccountId, TransactionId, TransactionStatus};

/// Supported Telegram commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelegramCommand {
    Start,
    Help,
    Status,
    Stats,
    Accounts,
    Transactions(Option<TransactionStatus>),
    Transaction(TransactionId),
    Approve(TransactionId),
    Reject { id: TransactionId, reason: String },
    Balance(Option<AccountId>),
    Relogin(Option<AccountId>),
}

/// Parse error for Telegram command messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    NotACommand,
    UnknownCommand(String),
    MissingArgument(&'static str),
    InvalidTransactionId(String),
    InvalidStatus(String),
}

impl std::fmt::Display for CommandParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotACommand => write!(f, "message is not a command"),
            Self::UnknownCommand(cmd) => write!(f, "unknown command `{cmd}`"),
            Self::MissingArgument(name) => write!(f, "missing argument `{name}`"),
            Self::InvalidTransactionId(id) => write!(f, "invalid transaction id `{id}`"),
            Self::InvalidStatus(status) => write!(
                f,
                "invalid status `{status}` (e.g. pending, waiting_payment, approved)"
            ),
        }
    }
}

impl std::error::Error for CommandParseError {}

/// Reason recorded when `/reject` is sent without one.
pub const DEFAULT_REJECT_REASON: &str = "rejected via Telegram";

/// Parse a Telegram message into a bot command.
pub fn parse_command(text: &str) -> Result<TelegramCommand, CommandParseError> {
    let mut parts = text.split_whitespace();
    let Some(raw_command) = parts.next() else {
        return Err(CommandParseError::NotACommand);
    };
    if !raw_command.starts_with('/') {
        return Err(CommandParseError::NotACommand);
    }

    let command = raw_command
        .split_once('@')
        .map_or(raw_command, |(head, _)| head);

    match command {
        "/start" => Ok(TelegramCommand::Start),
        "/help" => Ok(TelegramCommand::Help),
        "/status" => Ok(TelegramCommand::Status),
        "/stats" => Ok(TelegramCommand::Stats),
        "/accounts" => Ok(TelegramCommand::Accounts),
        "/transactions" => parts
            .next()
            .map(parse_status)
            .transpose()
            .map(TelegramCommand::Transactions),
        "/tx" => Ok(TelegramCommand::Transaction(required_id(parts.next())?)),
        "/approve" => Ok(TelegramCommand::Approve(required_id(parts.next())?)),
        "/reject" => {
            let id = required_id(parts.next())?;
            let reason = parts.collect::<Vec<_>>().join(" ");
            let reason = if reason.is_empty() {
                DEFAULT_REJECT_REASON.to_string()
            } else {
                reason
            };
            Ok(TelegramCommand::Reject { id, reason })
        }
        "/balance" => Ok(TelegramCommand::Balance(parts.next().map(AccountId::new))),
        "/relogin" => Ok(TelegramCommand::Relogin(parts.next().map(AccountId::new))),
        other => Err(CommandParseError::UnknownCommand(other.to_string())),
    }
}

fn required_id(raw: Option<&str>) -> Result<TransactionId, CommandParseError> {
    let raw = raw.ok_or(CommandParseError::MissingArgument("id"))?;
    Uuid::parse_str(raw)
        .map(TransactionId::from_uuid)
        .map_err(|_| CommandParseError::InvalidTransactionId(raw.to_string()))
}

fn parse_status(raw: &str) -> Result<TransactionStatus, CommandParseError> {
    TransactionStatus::from_str(raw).map_err(|_| CommandParseError::InvalidStatus(raw.to_string()))
}

/// Help text returned by `/start` and `/help`.
#[must_use]
pub const fn command_help() -> &'static str {
    "📋 Commands\n\n\
    /status - 📊 Engine status\n\
    /stats - 📈 Transaction and negotiation statistics\n\
    /accounts - 👤 Exchange accounts\n\
    /transactions [status] - 📄 Recent transactions\n\
    /tx <id> - 🔍 Transaction details\n\
    /approve <id> - ✅ Approve a transaction awaiting its receipt\n\
    /reject <id> [reason] - ❌ Reject or cancel a transaction\n\
    /balance [account] - 💰 Refresh balances\n\
    /relogin [account] - 🔑 Log in again\n\n\
    Statuses: pending, processing, waiting_response, waiting_payment, validating, approved"
}

/// Bot commands for Telegram menu registration.
///
/// Returns tuples of (command, description) for `set_my_commands`.
#[must_use]
pub fn bot_commands() -> Vec<(&'static str, &'static str)> {
    vec![
        ("status", "Engine status"),
        ("stats", "Transaction and negotiation statistics"),
        ("accounts", "Exchange accounts"),
        ("transactions", "Recent transactions"),
        ("tx", "Transaction details"),
        ("approve", "Approve a transaction"),
        ("reject", "Reject or cancel a transaction"),
        ("balance", "Refresh balances"),
        ("relogin", "Log in again"),
        ("help", "Show all commands"),
    ]
}
