//! Transaction lifecycle state machine.
//!
//! The happy path is linear:
//!
//! ```text
//! PENDING -> PROCESSING -> WAITING_RESPONSE -> WAITING_PAYMENT -> VALIDATING
//!     VALIDATING -> APPROVED -> RELEASED
//!     VALIDATING -> REJECTED
//! ```
//!
//! Any non-terminal status may additionally abort to `ERROR`, `FOOL_POOL`
//! or `CANCELLED`. Terminal statuses never change again.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::ExchangeKind;
use super::error::DomainError;
use super::id::{AccountId, AdId, ExternalId, OrderId, TransactionId};
use super::payment::{PaymentContact, PaymentDetails};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Processing,
    WaitingResponse,
    WaitingPayment,
    Validating,
    Approved,
    Released,
    Rejected,
    FoolPool,
    Cancelled,
    Error,
}

impl TransactionStatus {
    pub const ALL: [Self; 11] = [
        Self::Pending,
        Self::Processing,
        Self::WaitingResponse,
        Self::WaitingPayment,
        Self::Validating,
        Self::Approved,
        Self::Released,
        Self::Rejected,
        Self::FoolPool,
        Self::Cancelled,
        Self::Error,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::WaitingResponse => "WAITING_RESPONSE",
            Self::WaitingPayment => "WAITING_PAYMENT",
            Self::Validating => "VALIDATING",
            Self::Approved => "APPROVED",
            Self::Released => "RELEASED",
            Self::Rejected => "REJECTED",
            Self::FoolPool => "FOOL_POOL",
            Self::Cancelled => "CANCELLED",
            Self::Error => "ERROR",
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Released | Self::Rejected | Self::FoolPool | Self::Cancelled | Self::Error
        )
    }

    /// Statuses in which a receipt may still be matched.
    #[must_use]
    pub const fn accepts_receipt(&self) -> bool {
        matches!(self, Self::WaitingPayment | Self::Validating)
    }

    /// The next status on the happy path, if any.
    #[must_use]
    pub const fn successors(&self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Processing],
            Self::Processing => &[Self::WaitingResponse],
            Self::WaitingResponse => &[Self::WaitingPayment],
            Self::WaitingPayment => &[Self::Validating],
            Self::Validating => &[Self::Approved, Self::Rejected],
            Self::Approved => &[Self::Released],
            Self::Released | Self::Rejected | Self::FoolPool | Self::Cancelled | Self::Error => {
                &[]
            }
        }
    }

    #[must_use]
    pub fn can_transition_to(&self, to: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match to {
            Self::Error | Self::FoolPool | Self::Cancelled => true,
            _ => self.successors().contains(&to),
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| DomainError::UnknownStatus(s.to_string()))
    }
}

/// Trust tag attached to the counterparty of a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuyerReputation {
    #[default]
    Unknown,
    /// Failed negotiation, timed out, or sent an invalid receipt.
    Fool,
}

impl BuyerReputation {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Fool => "fool",
        }
    }
}

/// Outcome of checking a receipt against a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptValidation {
    pub valid: bool,
    /// Checks that passed.
    pub checks: Vec<String>,
    /// Checks that failed.
    pub errors: Vec<String>,
}

/// A receipt accepted for a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptRecord {
    pub evidence_ref: String,
    pub amount: Decimal,
    pub received_at: DateTime<Utc>,
    pub validation: ReceiptValidation,
}

/// Everything known about a transaction when it is first observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDraft {
    pub external_id: ExternalId,
    pub account_id: AccountId,
    pub kind: ExchangeKind,
    pub counterparty_id: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub asset: String,
    pub price: Option<Decimal>,
    pub payment_contact: PaymentContact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub external_id: ExternalId,
    /// Source account the transaction was observed on.
    pub account_id: AccountId,
    pub kind: ExchangeKind,
    /// Account holding the advertisement for this transaction.
    pub counterparty_account_id: Option<AccountId>,
    pub ad_id: Option<AdId>,
    pub order_id: Option<OrderId>,
    pub counterparty_id: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub asset: String,
    pub price: Option<Decimal>,
    pub(crate) status: TransactionStatus,
    pub payment_contact: PaymentContact,
    /// Stamped when the negotiation reveals payment details.
    pub payment: Option<PaymentDetails>,
    pub receipt: Option<ReceiptRecord>,
    pub reputation: BuyerReputation,
    pub last_error: Option<String>,
    pub status_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a `PENDING` transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NonPositiveAmount`] for zero or negative amounts.
    pub fn new(draft: TransactionDraft, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if draft.amount <= Decimal::ZERO {
            return Err(DomainError::NonPositiveAmount {
                amount: draft.amount,
            });
        }
        Ok(Self {
            id: TransactionId::new(),
            external_id: draft.external_id,
            account_id: draft.account_id,
            kind: draft.kind,
            counterparty_account_id: None,
            ad_id: None,
            order_id: None,
            counterparty_id: draft.counterparty_id,
            amount: draft.amount,
            currency: draft.currency,
            asset: draft.asset,
            price: draft.price,
            status: TransactionStatus::Pending,
            payment_contact: draft.payment_contact,
            payment: None,
            receipt: None,
            reputation: BuyerReputation::Unknown,
            last_error: None,
            status_changed_at: now,
            created_at: now,
            updated_at: now,
        })
    }

    #[must_use]
    pub const fn status(&self) -> TransactionStatus {
        self.status
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `to`, enforcing the transition table.
    ///
    /// Entering `FOOL_POOL` or `REJECTED` tags the counterparty as low-trust.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::TerminalState`] when already terminal and
    /// [`DomainError::InvalidTransition`] for moves outside the table.
    pub fn transition(
        &mut self,
        to: TransactionStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.status.is_terminal() {
            return Err(DomainError::TerminalState {
                status: self.status,
            });
        }
        if !self.status.can_transition_to(to) {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        if matches!(to, TransactionStatus::FoolPool | TransactionStatus::Rejected) {
            self.reputation = BuyerReputation::Fool;
        }
        self.status = to;
        self.status_changed_at = now;
        self.updated_at = now;
        Ok(())
    }

    /// Time spent in the current status.
    #[must_use]
    pub fn time_in_status(&self, now: DateTime<Utc>) -> Duration {
        now - self.status_changed_at
    }

    /// `WAITING_PAYMENT` for at least `timeout`.
    #[must_use]
    pub fn payment_timed_out(&self, timeout: Duration, now: DateTime<Utc>) -> bool {
        self.status == TransactionStatus::WaitingPayment && self.time_in_status(now) >= timeout
    }

    /// `APPROVED` for at least `grace`.
    #[must_use]
    pub fn release_due(&self, grace: Duration, now: DateTime<Utc>) -> bool {
        self.status == TransactionStatus::Approved && self.time_in_status(now) >= grace
    }

    #[must_use]
    pub const fn receipt_received(&self) -> bool {
        self.receipt.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use TransactionStatus::*;

    fn draft(amount: Decimal) -> TransactionDraft {
        TransactionDraft {
            external_id: ExternalId::new("GATE-100"),
            account_id: AccountId::new("gate-1"),
            kind: ExchangeKind::Gate,
            counterparty_id: None,
            amount,
            currency: "RUB".into(),
            asset: "USDT".into(),
            price: None,
            payment_contact: PaymentContact::default(),
        }
    }

    fn walk(tx: &mut Transaction, path: &[TransactionStatus]) {
        for status in path {
            tx.transition(*status, Utc::now()).unwrap();
        }
    }

    // --- Construction ---

    #[test]
    fn new_transaction_is_pending() {
        let tx = Transaction::new(draft(dec!(5000)), Utc::now()).unwrap();
        assert_eq!(tx.status(), Pending);
        assert_eq!(tx.reputation, BuyerReputation::Unknown);
        assert!(!tx.receipt_received());
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let err = Transaction::new(draft(dec!(0)), Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::NonPositiveAmount { amount: dec!(0) });
    }

    // --- Transition table ---

    #[test]
    fn happy_path_reaches_released() {
        let mut tx = Transaction::new(draft(dec!(5000)), Utc::now()).unwrap();
        walk(
            &mut tx,
            &[Processing, WaitingResponse, WaitingPayment, Validating, Approved, Released],
        );
        assert_eq!(tx.status(), Released);
    }

    #[test]
    fn skipping_a_step_is_invalid() {
        let mut tx = Transaction::new(draft(dec!(5000)), Utc::now()).unwrap();
        let err = tx.transition(Approved, Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::InvalidTransition { from: Pending, to: Approved });
        assert_eq!(tx.status(), Pending);
    }

    #[test]
    fn abort_branches_are_reachable_from_any_open_status() {
        for open in [Pending, Processing, WaitingResponse, WaitingPayment, Validating, Approved] {
            for abort in [Error, FoolPool, Cancelled] {
                assert!(open.can_transition_to(abort), "{open} -> {abort}");
            }
        }
    }

    #[test]
    fn terminal_statuses_never_transition() {
        for terminal in TransactionStatus::ALL.into_iter().filter(TransactionStatus::is_terminal) {
            for to in TransactionStatus::ALL {
                assert!(!terminal.can_transition_to(to), "{terminal} -> {to}");
            }
        }
    }

    #[test]
    fn transition_out_of_terminal_reports_terminal_state() {
        let mut tx = Transaction::new(draft(dec!(5000)), Utc::now()).unwrap();
        walk(&mut tx, &[Cancelled]);
        let err = tx.transition(Error, Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::TerminalState { status: Cancelled });
    }

    #[test]
    fn fool_pool_and_rejected_tag_reputation() {
        let mut pooled = Transaction::new(draft(dec!(5000)), Utc::now()).unwrap();
        walk(&mut pooled, &[Processing, WaitingResponse, FoolPool]);
        assert_eq!(pooled.reputation, BuyerReputation::Fool);

        let mut rejected = Transaction::new(draft(dec!(5000)), Utc::now()).unwrap();
        walk(
            &mut rejected,
            &[Processing, WaitingResponse, WaitingPayment, Validating, Rejected],
        );
        assert_eq!(rejected.reputation, BuyerReputation::Fool);
    }

    // --- Timers ---

    #[test]
    fn payment_timeout_fires_at_the_boundary() {
        let start = Utc::now();
        let mut tx = Transaction::new(draft(dec!(5000)), start).unwrap();
        for status in [Processing, WaitingResponse, WaitingPayment] {
            tx.transition(status, start).unwrap();
        }
        let timeout = Duration::minutes(10);
        assert!(!tx.payment_timed_out(timeout, start + timeout - Duration::seconds(1)));
        assert!(tx.payment_timed_out(timeout, start + timeout + Duration::seconds(1)));
    }

    #[test]
    fn release_is_due_only_when_approved() {
        let start = Utc::now();
        let tx = Transaction::new(draft(dec!(5000)), start).unwrap();
        assert!(!tx.release_due(Duration::zero(), start + Duration::hours(1)));
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("waiting_payment".parse::<TransactionStatus>().unwrap(), WaitingPayment);
        assert!("LIMBO".parse::<TransactionStatus>().is_err());
    }
}
