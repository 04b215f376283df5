//! Payment methods, revealed payment details and payer contact data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A payment method the engine can offer to a counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    /// Display name, e.g. "SBP".
    pub name: String,
    /// Receiving bank, e.g. "Альфа-Банк".
    pub bank: String,
}

impl PaymentMethod {
    pub fn new(name: impl Into<String>, bank: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bank: bank.into(),
        }
    }
}

/// Payment details as sent to the counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub method: String,
    pub bank: String,
    pub phone: String,
    pub sent_at: DateTime<Utc>,
}

/// Payer contact reported by the source exchange.
///
/// Receipts are matched against these fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentContact {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub card: Option<String>,
    #[serde(default)]
    pub bank: Option<String>,
}

impl PaymentContact {
    #[must_use]
    pub fn card_last_four(&self) -> Option<String> {
        self.card.as_deref().and_then(last_four)
    }

    #[must_use]
    pub fn normalized_phone(&self) -> Option<String> {
        self.phone
            .as_deref()
            .map(normalize_phone)
            .filter(|p| !p.is_empty())
    }
}

/// Reduce a phone number to its national digits.
///
/// Separators are dropped, and a leading country code `7` or trunk prefix
/// `8` is removed from 11-digit numbers.
#[must_use]
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 11 && (digits.starts_with('7') || digits.starts_with('8')) {
        digits[1..].to_string()
    } else {
        digits
    }
}

/// Last four digits of a card number, if it has at least four.
#[must_use]
pub fn last_four(raw: &str) -> Option<String> {
    let digits: Vec<char> = raw.chars().filter(char::is_ascii_digit).collect();
    (digits.len() >= 4).then(|| digits[digits.len() - 4..].iter().collect())
}
