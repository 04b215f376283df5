//! Builders for domain primitives used across tests.
//!
//! Every transaction built here carries the same payer contact, and
//! [`receipt`] produces a receipt that matches it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{
    Account, AccountId, Credentials, ExchangeKind, ExternalId, PaymentContact, Receipt,
    Transaction, TransactionDraft, TransactionStatus,
};
use crate::port::ExternalTransaction;

pub const PAYER_PHONE: &str = "+7 (900) 123-45-67";
pub const PAYER_CARD: &str = "2200 7000 1234 5678";
pub const PAYER_BANK: &str = "T-Bank";

pub fn payer_contact() -> PaymentContact {
    PaymentContact {
        phone: Some(PAYER_PHONE.to_string()),
        card: Some(PAYER_CARD.to_string()),
        bank: Some(PAYER_BANK.to_string()),
    }
}

/// An inactive account with two ad slots.
pub fn account(id: &str, kind: ExchangeKind) -> Account {
    Account::new(id, kind, Credentials::new("user", "secret"), 2)
}

/// Same as [`account`], already logged in at `now`.
pub fn active_account(id: &str, kind: ExchangeKind, now: DateTime<Utc>) -> Account {
    let mut account = account(id, kind);
    account.status = crate::domain::AccountStatus::Active;
    account.last_login = Some(now);
    account
}

/// A request as the source exchange reports it.
pub fn external(external_id: &str, amount: Decimal) -> ExternalTransaction {
    ExternalTransaction::new(external_id, amount).with_contact(payer_contact())
}

pub fn draft(external_id: &str, amount: Decimal) -> TransactionDraft {
    TransactionDraft {
        external_id: ExternalId::new(external_id),
        account_id: AccountId::new("gate-1"),
        kind: ExchangeKind::Gate,
        counterparty_id: None,
        amount,
        currency: "RUB".to_string(),
        asset: "USDT".to_string(),
        price: None,
        payment_contact: payer_contact(),
    }
}

/// A `PENDING` transaction created at `now`.
pub fn transaction(external_id: &str, amount: Decimal, now: DateTime<Utc>) -> Transaction {
    Transaction::new(draft(external_id, amount), now).expect("valid draft")
}

/// A transaction forced into `status`, bypassing the transition table.
pub fn transaction_in(
    external_id: &str,
    amount: Decimal,
    status: TransactionStatus,
    now: DateTime<Utc>,
) -> Transaction {
    let mut tx = transaction(external_id, amount, now);
    tx.status = status;
    tx
}

/// A successful T-Bank receipt paid from the test payer's card.
pub fn receipt(amount: Decimal, evidence_ref: &str) -> Receipt {
    Receipt {
        amount: Some(amount),
        last_four_digits: Some("5678".to_string()),
        bank: Some("Т-Банк".to_string()),
        phone: None,
        success: true,
        evidence_ref: evidence_ref.to_string(),
        received_at: Utc::now(),
    }
}
