//! Notifier port for lifecycle events.
//!
//! Every significant transition is broadcast as an [`Event`]. Operators see
//! forced transitions and failures without reading logs.

use rust_decimal::Decimal;

use crate::domain::{
    AccountId, AccountStatus, ExternalId, RejectionReason, Transaction, TransactionId,
    TransactionStatus,
};

/// Events broadcast by the engine.
#[derive(Debug, Clone)]
pub enum Event {
    /// A new external transaction was ingested.
    NewTransaction(TransactionEvent),
    StatusChanged(StatusChangeEvent),
    /// Payment details were sent to the counterparty.
    NegotiationCompleted(NegotiationEvent),
    /// The counterparty failed the negotiation script.
    CounterpartyRejected(RejectionEvent),
    /// A receipt was matched to a transaction.
    ReceiptProcessed(ReceiptEvent),
    /// A receipt matched nothing and was kept for manual review.
    ReceiptUnmatched(ReceiptEvent),
    BalanceUpdated(BalanceEvent),
    AccountStatusChanged(AccountEvent),
    /// Escrowed funds were released.
    ReleaseExecuted(TransactionEvent),
    /// A permanent error moved the transaction to `ERROR`.
    TransactionFailed(FailureEvent),
    /// Payment never arrived before the timeout.
    PaymentTimedOut(TransactionEvent),
}

impl Event {
    /// Stable snake_case name used by admin channels.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NewTransaction(_) => "new_transaction",
            Self::StatusChanged(_) => "status_changed",
            Self::NegotiationCompleted(_) => "negotiation_completed",
            Self::CounterpartyRejected(_) => "counterparty_rejected",
            Self::ReceiptProcessed(_) => "receipt_processed",
            Self::ReceiptUnmatched(_) => "receipt_unmatched",
            Self::BalanceUpdated(_) => "balance_update",
            Self::AccountStatusChanged(_) => "account_status",
            Self::ReleaseExecuted(_) => "release_executed",
            Self::TransactionFailed(_) => "transaction_failed",
            Self::PaymentTimedOut(_) => "fool_pool",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransactionEvent {
    pub transaction_id: TransactionId,
    pub external_id: ExternalId,
    pub amount: Decimal,
    pub currency: String,
}

impl From<&Transaction> for TransactionEvent {
    fn from(tx: &Transaction) -> Self {
        Self {
            transaction_id: tx.id,
            external_id: tx.external_id.clone(),
            amount: tx.amount,
            currency: tx.currency.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusChangeEvent {
    pub transaction_id: TransactionId,
    pub external_id: ExternalId,
    pub from: TransactionStatus,
    pub to: TransactionStatus,
}

#[derive(Debug, Clone)]
pub struct NegotiationEvent {
    pub transaction_id: TransactionId,
    pub external_id: ExternalId,
    pub payment_method: String,
    pub bank: String,
}

#[derive(Debug, Clone)]
pub struct RejectionEvent {
    pub transaction_id: TransactionId,
    pub external_id: ExternalId,
    pub reason: RejectionReason,
}

#[derive(Debug, Clone)]
pub struct ReceiptEvent {
    /// Matched transaction, if any.
    pub transaction_id: Option<TransactionId>,
    pub evidence_ref: String,
    pub amount: Option<Decimal>,
    pub valid: bool,
    /// Human-readable summary of the outcome.
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct BalanceEvent {
    pub account_id: AccountId,
    pub balance: Decimal,
}

#[derive(Debug, Clone)]
pub struct AccountEvent {
    pub account_id: AccountId,
    pub status: AccountStatus,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FailureEvent {
    pub transaction_id: TransactionId,
    pub external_id: ExternalId,
    pub reason: String,
}

/// Trait for notification handlers.
///
/// `notify` must return quickly. Slow delivery such as HTTP calls belongs in
/// a spawned task.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: Event);
}

/// Broadcasts events to all registered notifiers.
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { notifiers: vec![] }
    }

    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    pub fn notify_all(&self, event: Event) {
        for notifier in &self.notifiers {
            notifier.notify(event.clone());
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A no-op notifier for testing or when notifications are disabled.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: Event) {}
}

/// Logs every event through tracing.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Event) {
        use tracing::{info, warn};
        match event {
            Event::NewTransaction(e) => {
                info!(
                    transaction_id = %e.transaction_id,
                    external_id = %e.external_id,
                    amount = %e.amount,
                    currency = %e.currency,
                    "New transaction"
                );
            }
            Event::StatusChanged(e) => {
                info!(
                    transaction_id = %e.transaction_id,
                    from = %e.from,
                    to = %e.to,
                    "Transaction status changed"
                );
            }
            Event::NegotiationCompleted(e) => {
                info!(
                    transaction_id = %e.transaction_id,
                    method = %e.payment_method,
                    bank = %e.bank,
                    "Payment details sent"
                );
            }
            Event::CounterpartyRejected(e) => {
                info!(
                    transaction_id = %e.transaction_id,
                    reason = %e.reason,
                    "Counterparty rejected"
                );
            }
            Event::ReceiptProcessed(e) => {
                info!(
                    evidence = %e.evidence_ref,
                    valid = e.valid,
                    detail = %e.detail,
                    "Receipt processed"
                );
            }
            Event::ReceiptUnmatched(e) => {
                warn!(evidence = %e.evidence_ref, detail = %e.detail, "Receipt unmatched");
            }
            Event::BalanceUpdated(e) => {
                info!(account = %e.account_id, balance = %e.balance, "Balance updated");
            }
            Event::AccountStatusChanged(e) => {
                info!(account = %e.account_id, status = %e.status, "Account status changed");
            }
            Event::ReleaseExecuted(e) => {
                info!(
                    transaction_id = %e.transaction_id,
                    external_id = %e.external_id,
                    "Funds released"
                );
            }
            Event::TransactionFailed(e) => {
                warn!(
                    transaction_id = %e.transaction_id,
                    reason = %e.reason,
                    "Transaction failed"
                );
            }
            Event::PaymentTimedOut(e) => {
                warn!(transaction_id = %e.transaction_id, "Payment timed out");
            }
        }
    }
}
