//! Message formatting for Telegram notifications.

use rust_decimal::Decimal;

use crate::port::outbound::notifier::{Event, ReceiptEvent, TransactionEvent};

use super::notifier::TelegramConfig;

/// Format an event into a Telegram message, or None if the event should be skipped.
pub fn format_event_message(event: &Event, config: &TelegramConfig) -> Option<String> {
    match event {
        Event::NewTransaction(e) if config.notify_new_transactions => {
            Some(transaction_message("🆕", "New Transaction", e))
        }
        Event::StatusChanged(e) if config.notify_status_changes => Some(format!(
            "🔄 *Status Changed*\n\
            \n\
            🔗 `{}`\n\
            {} ➡️ *{}*",
            escape_markdown(e.external_id.as_str()),
            escape_markdown(e.from.as_str()),
            escape_markdown(e.to.as_str())
        )),
        Event::NegotiationCompleted(e) => Some(format!(
            "🤝 *Payment Details Sent*\n\
            \n\
            🔗 `{}`\n\
            💳 {} \\| {}",
            escape_markdown(e.external_id.as_str()),
            escape_markdown(&e.payment_method),
            escape_markdown(&e.bank)
        )),
        Event::CounterpartyRejected(e) => Some(format!(
            "🚫 *Counterparty Rejected*\n\
            \n\
            🔗 `{}`\n\
            📝 {}",
            escape_markdown(e.external_id.as_str()),
            escape_markdown(e.reason.describe())
        )),
        Event::ReceiptProcessed(e) if config.notify_receipts => Some(receipt_message(e, true)),
        Event::ReceiptUnmatched(e) if config.notify_receipts => Some(receipt_message(e, false)),
        Event::BalanceUpdated(e) if config.notify_balances => Some(format!(
            "💰 *Balance Updated*\n\
            \n\
            👤 `{}`\n\
            💵 `{}`",
            escape_markdown(e.account_id.as_str()),
            escape_markdown(&e.balance.to_string())
        )),
        Event::AccountStatusChanged(e) => {
            let mut msg = format!(
                "👤 *Account Status*\n\
                \n\
                `{}` is now *{}*",
                escape_markdown(e.account_id.as_str()),
                escape_markdown(e.status.as_str())
            );
            if let Some(error) = &e.error {
                msg.push_str(&format!("\n⚠️ {}", escape_markdown(&truncate(error, 120))));
            }
            Some(msg)
        }
        Event::ReleaseExecuted(e) => Some(transaction_message("💸", "Funds Released", e)),
        Event::TransactionFailed(e) => Some(format!(
            "❌ *Transaction Failed*\n\
            \n\
            🔗 `{}`\n\
            📝 {}",
            escape_markdown(e.external_id.as_str()),
            escape_markdown(&truncate(&e.reason, 200))
        )),
        Event::PaymentTimedOut(e) => Some(transaction_message("🃏", "Payment Timed Out", e)),
        _ => None,
    }
}

fn transaction_message(emoji: &str, title: &str, e: &TransactionEvent) -> String {
    format!(
        "{} *{}*\n\
        \n\
        🔗 `{}`\n\
        💵 `{}` {}",
        emoji,
        title,
        escape_markdown(e.external_id.as_str()),
        escape_markdown(&e.amount.to_string()),
        escape_markdown(&e.currency)
    )
}

fn receipt_message(e: &ReceiptEvent, matched: bool) -> String {
    let (emoji, title) = match (matched, e.valid) {
        (true, true) => ("🧾", "Receipt Accepted"),
        (true, false) => ("⚠️", "Receipt Invalid"),
        (false, _) => ("❓", "Receipt Unmatched"),
    };
    let amount = e
        .amount
        .map_or_else(|| "unknown".to_string(), |a: Decimal| a.to_string());
    let mut msg = format!(
        "{} *{}*\n\
        \n\
        📎 `{}`\n\
        💵 `{}`",
        emoji,
        title,
        escape_markdown(&truncate(&e.evidence_ref, 40)),
        escape_markdown(&amount)
    );
    if let Some(id) = e.transaction_id {
        msg.push_str(&format!("\n🆔 `{}`", escape_markdown(&id.to_string())));
    }
    if !e.detail.is_empty() {
        msg.push_str(&format!("\n📝 {}", escape_markdown(&truncate(&e.detail, 200))));
    }
    msg
}

/// Truncate a string with ellipsis (Unicode-safe).
pub fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{}...", truncated)
    } else {
        s.to_string()
    }
}

/// Escape special characters for Telegram `MarkdownV2`.
pub fn escape_markdown(text: &str) -> String {
    let special_chars = [
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    ];
    let mut result = String::with_capacity(text.len() * 2);

    for c in text.chars() {
        if special_chars.contains(&c) {
            result.push('\\');
        }
        result.push(c);
    }

    result
}
