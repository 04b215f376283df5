//! Operator control port.
//!
//! Admin surfaces such as the Telegram bot talk to the engine only through
//! [`AdminPort`]. Overrides bypass the automatic flow, but they still go
//! through the transaction state machine and per-transaction serialization.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Account, AccountId, AccountStats, SessionStats, Transaction, TransactionId, TransactionStats,
    TransactionStatus,
};
use crate::error::Result;

/// Point-in-time view of the running engine.
#[derive(Debug, Clone)]
pub struct RuntimeStatus {
    pub started_at: DateTime<Utc>,
    pub accounts: AccountStats,
    /// Transactions not yet in a terminal status.
    pub open_transactions: usize,
    /// Negotiations still waiting on counterparty answers.
    pub active_sessions: usize,
    /// Transactions currently being processed by a worker.
    pub in_flight: usize,
}

#[derive(Debug, Clone)]
pub struct Statistics {
    pub transactions: TransactionStats,
    pub sessions: SessionStats,
    pub accounts: AccountStats,
}

#[async_trait]
pub trait AdminPort: Send + Sync {
    async fn status(&self) -> Result<RuntimeStatus>;

    async fn statistics(&self) -> Result<Statistics>;

    fn list_accounts(&self) -> Vec<Account>;

    /// Transactions, optionally restricted to one status. Oldest first.
    async fn list_transactions(&self, status: Option<TransactionStatus>)
        -> Result<Vec<Transaction>>;

    async fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>>;

    /// Force a receipt-awaiting transaction to `APPROVED`.
    async fn approve_transaction(&self, id: &TransactionId) -> Result<Transaction>;

    /// Reject or cancel a non-terminal transaction.
    async fn reject_transaction(&self, id: &TransactionId, reason: &str) -> Result<Transaction>;

    /// Refresh balances now. `None` means every active account.
    ///
    /// Returns the number of accounts refreshed.
    async fn force_balance_refresh(&self, account: Option<&AccountId>) -> Result<usize>;

    /// Log in again now. `None` means every account.
    ///
    /// Returns the number of successful logins.
    async fn force_relogin(&self, account: Option<&AccountId>) -> Result<usize>;
}
