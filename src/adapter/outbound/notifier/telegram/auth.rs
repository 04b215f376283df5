//! Authorization for Telegram command handling.

use teloxide::types::ChatId;
use tracing::warn;

use super::command::{command_help, parse_command, CommandParseError};
use super::control::TelegramControl;

/// Process a message and return a response if it's an authorized command.
///
/// Returns `None` for:
/// - Messages from unauthorized chats
/// - Messages that are not commands (don't start with `/`)
///
/// Returns `Some(response)` for:
/// - Valid commands from the authorized chat
/// - Invalid commands (with error message and help)
pub async fn command_response_for_message(
    text: &str,
    incoming_chat: ChatId,
    allowed_chat: ChatId,
    control: &TelegramControl,
) -> Option<String> {
    if !is_authorized_chat(incoming_chat, allowed_chat) {
        return None;
    }

    match parse_command(text) {
        Ok(command) => Some(control.execute(command).await),
        Err(CommandParseError::NotACommand) => None,
        Err(err) => Some(format!("Invalid command: {err}\n\n{}", command_help())),
    }
}

/// Check if a chat is authorized to send commands.
fn is_authorized_chat(incoming_chat: ChatId, allowed_chat: ChatId) -> bool {
    if incoming_chat == allowed_chat {
        return true;
    }

    warn!(
        chat_id = incoming_chat.0,
        "Ignoring Telegram message from unauthorized chat"
    );
    false
}
