//! Persistence ports.
//!
//! Each store is an async trait so adapters can be swapped behind
//! `Arc<dyn Store>`. Implementations must make
//! [`TransactionStore::insert_if_absent`] atomic: it is the single point
//! that guarantees one transaction per external id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Account, AccountId, ExternalId, NegotiationSession, Receipt, Transaction, TransactionId,
    TransactionStatus,
};
use crate::error::Result;

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Insert `tx` unless its external id is already known.
    ///
    /// Returns `false` when a transaction with the same external id exists.
    async fn insert_if_absent(&self, tx: &Transaction) -> Result<bool>;

    /// Overwrite an existing transaction.
    async fn save(&self, tx: &Transaction) -> Result<()>;

    async fn get(&self, id: &TransactionId) -> Result<Option<Transaction>>;

    async fn find_by_external_id(&self, external_id: &ExternalId) -> Result<Option<Transaction>>;

    /// Transactions in any of `statuses`, oldest first.
    async fn list_by_status(&self, statuses: &[TransactionStatus]) -> Result<Vec<Transaction>>;

    /// Every transaction, oldest first.
    async fn list_transactions(&self) -> Result<Vec<Transaction>>;

    /// Delete terminal transactions last updated before `cutoff`.
    async fn purge_terminal_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save_session(&self, session: &NegotiationSession) -> Result<()>;

    async fn get_session(&self, transaction_id: &TransactionId)
        -> Result<Option<NegotiationSession>>;

    async fn list_sessions(&self) -> Result<Vec<NegotiationSession>>;

    /// Delete closed sessions last updated before `cutoff`.
    async fn purge_closed_sessions_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn save_account(&self, account: &Account) -> Result<()>;

    async fn list_accounts(&self) -> Result<Vec<Account>>;

    /// Returns whether an account was removed.
    async fn delete_account(&self, id: &AccountId) -> Result<bool>;
}

/// Receipts that matched nothing, kept for manual review.
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    async fn retain_receipt(&self, receipt: &Receipt, reason: &str) -> Result<()>;

    async fn list_retained_receipts(&self) -> Result<Vec<(Receipt, String)>>;
}

/// All persistence concerns behind one object.
pub trait Store: TransactionStore + SessionStore + AccountStore + ReceiptStore {}

impl<T> Store for T where T: TransactionStore + SessionStore + AccountStore + ReceiptStore {}
