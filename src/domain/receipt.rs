//! Payment receipts extracted from counterparty evidence.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::TransactionId;
use super::transaction::ReceiptValidation;

/// Structured fields read off a payment receipt.
///
/// Extraction is noisy, so every field except the evidence reference may be
/// missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub last_four_digits: Option<String>,
    #[serde(default)]
    pub bank: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// The receipt states that the transfer succeeded.
    #[serde(default)]
    pub success: bool,
    /// Where the original document can be found, e.g. a file path.
    pub evidence_ref: String,
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl Receipt {
    /// Whether any contact fragment was extracted.
    #[must_use]
    pub fn has_contact(&self) -> bool {
        self.last_four_digits.as_deref().is_some_and(|s| !s.trim().is_empty())
            || self.phone.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

/// Why a receipt matched no transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoMatchReason {
    /// No open transaction within the amount tolerance.
    NoAmountMatch,
    /// Amount matched, but neither card digits nor phone did.
    NoContactMatch,
    /// Amount and contact matched, but the issuing bank did not.
    BankMismatch,
}

impl NoMatchReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoAmountMatch => "no open transaction with a matching amount",
            Self::NoContactMatch => "no matching card digits or phone",
            Self::BankMismatch => "issuing bank does not match",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched {
        transaction_id: TransactionId,
        validation: ReceiptValidation,
    },
    NoMatch {
        reason: NoMatchReason,
    },
}

impl MatchOutcome {
    #[must_use]
    pub const fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            Self::Matched { transaction_id, .. } => Some(*transaction_id),
            Self::NoMatch { .. } => None,
        }
    }
}
