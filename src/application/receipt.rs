//! Matching extracted receipts to open transactions.
//!
//! A receipt matches a transaction only when all three hold:
//!
//! 1. the amount is within the relative tolerance of the transaction amount,
//! 2. the card's last four digits or the normalized phone agree with the
//!    payer contact recorded on the transaction,
//! 3. the issuing bank is the expected issuer.
//!
//! Candidates are tried oldest first. Nothing is ever matched on amount
//! alone.

use rust_decimal::Decimal;

use crate::domain::payment::{last_four, normalize_phone};
use crate::domain::{MatchOutcome, NoMatchReason, Receipt, ReceiptValidation, Transaction};
use crate::error::{Error, Result};

/// Bank label comparison with alias groups.
///
/// Labels are compared after lowercasing and dropping everything except
/// letters and digits, so "T-Bank" equals "tbank".
#[derive(Debug, Clone)]
pub struct BankAliases {
    groups: Vec<Vec<String>>,
}

impl BankAliases {
    pub fn new<S: AsRef<str>>(groups: &[Vec<S>]) -> Self {
        Self {
            groups: groups
                .iter()
                .map(|group| group.iter().map(|label| Self::canonical(label.as_ref())).collect())
                .collect(),
        }
    }

    fn canonical(label: &str) -> String {
        label
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase()
    }

    #[must_use]
    pub fn same_bank(&self, a: &str, b: &str) -> bool {
        let (a, b) = (Self::canonical(a), Self::canonical(b));
        if a.is_empty() || b.is_empty() {
            return false;
        }
        a == b
            || self
                .groups
                .iter()
                .any(|group| group.contains(&a) && group.contains(&b))
    }
}

impl Default for BankAliases {
    fn default() -> Self {
        Self::new(&[
            vec!["T-Bank", "Т-Банк", "Tinkoff", "Тинькофф", "Тинькофф Банк"],
            vec!["Alfa-Bank", "Альфа-Банк"],
            vec!["Sber", "Сбер", "Сбербанк", "Sberbank"],
        ])
    }
}

#[derive(Debug, Clone)]
pub struct ReceiptMatcher {
    /// Relative amount tolerance, e.g. 0.01 for 1%.
    tolerance: Decimal,
    expected_issuer: String,
    banks: BankAliases,
}

impl ReceiptMatcher {
    pub fn new(tolerance: Decimal, expected_issuer: impl Into<String>, banks: BankAliases) -> Self {
        Self {
            tolerance,
            expected_issuer: expected_issuer.into(),
            banks,
        }
    }

    /// Find the transaction `receipt` pays for.
    ///
    /// Candidates that cannot take a receipt any more are skipped. A matched
    /// receipt that does not report success yields an invalid validation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExtractionIncomplete`] when the amount, bank or
    /// every contact fragment is missing from the receipt.
    pub fn match_receipt(&self, receipt: &Receipt, candidates: &[Transaction]) -> Result<MatchOutcome> {
        let amount = receipt
            .amount
            .ok_or(Error::ExtractionIncomplete { field: "amount" })?;
        let bank = receipt
            .bank
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .ok_or(Error::ExtractionIncomplete { field: "bank" })?;
        if !receipt.has_contact() {
            return Err(Error::ExtractionIncomplete { field: "contact" });
        }

        let mut open: Vec<&Transaction> = candidates
            .iter()
            .filter(|tx| tx.status().accepts_receipt() && !tx.receipt_received())
            .collect();
        open.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let by_amount: Vec<&Transaction> = open
            .into_iter()
            .filter(|tx| self.amount_matches(tx.amount, amount))
            .collect();
        if by_amount.is_empty() {
            return Ok(MatchOutcome::NoMatch {
                reason: NoMatchReason::NoAmountMatch,
            });
        }

        let by_contact: Vec<(&Transaction, &'static str)> = by_amount
            .into_iter()
            .filter_map(|tx| contact_match(receipt, tx).map(|check| (tx, check)))
            .collect();
        if by_contact.is_empty() {
            return Ok(MatchOutcome::NoMatch {
                reason: NoMatchReason::NoContactMatch,
            });
        }

        if !self.banks.same_bank(bank, &self.expected_issuer) {
            return Ok(MatchOutcome::NoMatch {
                reason: NoMatchReason::BankMismatch,
            });
        }

        let (tx, contact_check) = by_contact[0];
        let mut validation = ReceiptValidation {
            valid: true,
            checks: vec![
                "amount".to_string(),
                contact_check.to_string(),
                "bank".to_string(),
            ],
            errors: Vec::new(),
        };
        if receipt.success {
            validation.checks.push("success".to_string());
        } else {
            validation.valid = false;
            validation
                .errors
                .push("receipt does not confirm a successful transfer".to_string());
        }
        Ok(MatchOutcome::Matched {
            transaction_id: tx.id,
            validation,
        })
    }

    fn amount_matches(&self, expected: Decimal, actual: Decimal) -> bool {
        (expected - actual).abs() <= expected.abs() * self.tolerance
    }
}

/// Shortest phone fragment that counts as a contact match, as strong as a
/// card's last four.
const MIN_PHONE_DIGITS: usize = 4;

/// Which contact check `receipt` passes against `tx`, if any.
fn contact_match(receipt: &Receipt, tx: &Transaction) -> Option<&'static str> {
    let card_hit = receipt
        .last_four_digits
        .as_deref()
        .and_then(last_four)
        .zip(tx.payment_contact.card_last_four())
        .is_some_and(|(a, b)| a == b);
    if card_hit {
        return Some("card_last_four");
    }

    let receipt_phone = receipt
        .phone
        .as_deref()
        .map(normalize_phone)
        .filter(|p| p.len() >= MIN_PHONE_DIGITS)?;
    let tx_phone = tx
        .payment_contact
        .normalized_phone()
        .filter(|p| p.len() >= MIN_PHONE_DIGITS)?;
    (tx_phone.contains(&receipt_phone) || receipt_phone.contains(&tx_phone)).then_some("phone")
}
