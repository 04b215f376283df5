//! In-memory store implementation for tests and `backend = "memory"`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::domain::{
    Account, AccountId, ExternalId, NegotiationSession, Receipt, Transaction, TransactionId,
    TransactionStatus,
};
use crate::error::{Error, Result};
use crate::port::{AccountStore, ReceiptStore, SessionStore, TransactionStore};

#[derive(Debug, Default)]
struct Transactions {
    /// Insertion sequence breaks ties between equal creation times.
    by_id: HashMap<TransactionId, (u64, Transaction)>,
    by_external: HashMap<ExternalId, TransactionId>,
    next_seq: u64,
}

impl Transactions {
    fn sorted(&self, keep: impl Fn(&Transaction) -> bool) -> Vec<Transaction> {
        let mut rows: Vec<_> = self.by_id.values().filter(|(_, tx)| keep(tx)).collect();
        rows.sort_by_key(|(seq, tx)| (tx.created_at, *seq));
        rows.into_iter().map(|(_, tx)| tx.clone()).collect()
    }
}

/// In-memory store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    transactions: RwLock<Transactions>,
    sessions: RwLock<HashMap<TransactionId, NegotiationSession>>,
    accounts: RwLock<HashMap<AccountId, Account>>,
    receipts: RwLock<Vec<(Receipt, String)>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn insert_if_absent(&self, tx: &Transaction) -> Result<bool> {
        let mut guard = self.transactions.write();
        if guard.by_external.contains_key(&tx.external_id) || guard.by_id.contains_key(&tx.id) {
            return Ok(false);
        }
        let seq = guard.next_seq;
        guard.next_seq += 1;
        guard.by_external.insert(tx.external_id.clone(), tx.id);
        guard.by_id.insert(tx.id, (seq, tx.clone()));
        Ok(true)
    }

    async fn save(&self, tx: &Transaction) -> Result<()> {
        let mut guard = self.transactions.write();
        match guard.by_id.get_mut(&tx.id) {
            Some((_, stored)) => {
                *stored = tx.clone();
                Ok(())
            }
            None => Err(Error::not_found("transaction", tx.id)),
        }
    }

    async fn get(&self, id: &TransactionId) -> Result<Option<Transaction>> {
        Ok(self
            .transactions
            .read()
            .by_id
            .get(id)
            .map(|(_, tx)| tx.clone()))
    }

    async fn find_by_external_id(&self, external_id: &ExternalId) -> Result<Option<Transaction>> {
        let guard = self.transactions.read();
        Ok(guard
            .by_external
            .get(external_id)
            .and_then(|id| guard.by_id.get(id))
            .map(|(_, tx)| tx.clone()))
    }

    async fn list_by_status(&self, statuses: &[TransactionStatus]) -> Result<Vec<Transaction>> {
        Ok(self
            .transactions
            .read()
            .sorted(|tx| statuses.contains(&tx.status())))
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.transactions.read().sorted(|_| true))
    }

    async fn purge_terminal_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut guard = self.transactions.write();
        let expired: Vec<(TransactionId, ExternalId)> = guard
            .by_id
            .values()
            .filter(|(_, tx)| tx.is_terminal() && tx.updated_at < cutoff)
            .map(|(_, tx)| (tx.id, tx.external_id.clone()))
            .collect();
        for (id, external_id) in &expired {
            guard.by_id.remove(id);
            guard.by_external.remove(external_id);
        }
        Ok(expired.len())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn save_session(&self, session: &NegotiationSession) -> Result<()> {
        self.sessions
            .write()
            .insert(session.transaction_id, session.clone());
        Ok(())
    }

    async fn get_session(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<NegotiationSession>> {
        Ok(self.sessions.read().get(transaction_id).cloned())
    }

    async fn list_sessions(&self) -> Result<Vec<NegotiationSession>> {
        let mut sessions: Vec<_> = self.sessions.read().values().cloned().collect();
        sessions.sort_by_key(|s| s.created_at);
        Ok(sessions)
    }

    async fn purge_closed_sessions_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| !(s.is_closed() && s.updated_at < cutoff));
        Ok(before - sessions.len())
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn save_account(&self, account: &Account) -> Result<()> {
        self.accounts
            .write()
            .insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let mut accounts: Vec<_> = self.accounts.read().values().cloned().collect();
        accounts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(accounts)
    }

    async fn delete_account(&self, id: &AccountId) -> Result<bool> {
        Ok(self.accounts.write().remove(id).is_some())
    }
}

#[async_trait]
impl ReceiptStore for MemoryStore {
    async fn retain_receipt(&self, receipt: &Receipt, reason: &str) -> Result<()> {
        self.receipts
            .write()
            .push((receipt.clone(), reason.to_string()));
        Ok(())
    }

    async fn list_retained_receipts(&self) -> Result<Vec<(Receipt, String)>> {
        Ok(self.receipts.read().clone())
    }
}
