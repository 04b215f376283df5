//! [`AdminPort`] implementation over the lifecycle services.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::application::lifecycle::{TransactionLifecycle, OPEN_STATUSES};
use crate::application::maintenance::AccountMaintenance;
use crate::application::worker::WorkerPool;
use crate::domain::{Account, AccountId, Transaction, TransactionId, TransactionStatus};
use crate::error::Result;
use crate::port::{AdminPort, RuntimeStatus, Statistics};

pub struct AdminService {
    lifecycle: Arc<TransactionLifecycle>,
    maintenance: Arc<AccountMaintenance>,
    pool: WorkerPool,
    started_at: DateTime<Utc>,
}

impl AdminService {
    pub fn new(
        lifecycle: Arc<TransactionLifecycle>,
        maintenance: Arc<AccountMaintenance>,
        pool: WorkerPool,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            lifecycle,
            maintenance,
            pool,
            started_at,
        }
    }

    fn targets(&self, account: Option<&AccountId>, active_only: bool) -> Result<Vec<AccountId>> {
        let registry = self.maintenance.accounts();
        match account {
            Some(id) => Ok(vec![registry.require(id)?.id]),
            None => Ok(registry
                .list()
                .into_iter()
                .filter(|a| !active_only || a.is_active())
                .map(|a| a.id)
                .collect()),
        }
    }
}

#[async_trait]
impl AdminPort for AdminService {
    async fn status(&self) -> Result<RuntimeStatus> {
        let open = self
            .lifecycle
            .store()
            .list_by_status(&OPEN_STATUSES)
            .await?;
        let sessions = self.lifecycle.session_stats().await?;
        Ok(RuntimeStatus {
            started_at: self.started_at,
            accounts: self.lifecycle.accounts().stats(),
            open_transactions: open.len(),
            active_sessions: sessions.active,
            in_flight: self.pool.in_flight(),
        })
    }

    async fn statistics(&self) -> Result<Statistics> {
        Ok(Statistics {
            transactions: self.lifecycle.transaction_stats().await?,
            sessions: self.lifecycle.session_stats().await?,
            accounts: self.lifecycle.accounts().stats(),
        })
    }

    fn list_accounts(&self) -> Vec<Account> {
        self.lifecycle.accounts().list()
    }

    async fn list_transactions(
        &self,
        status: Option<TransactionStatus>,
    ) -> Result<Vec<Transaction>> {
        let store = self.lifecycle.store();
        match status {
            Some(status) => store.list_by_status(&[status]).await,
            None => store.list_transactions().await,
        }
    }

    async fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>> {
        self.lifecycle.store().get(id).await
    }

    async fn approve_transaction(&self, id: &TransactionId) -> Result<Transaction> {
        self.pool
            .run_exclusive(*id, self.lifecycle.approve_manual(id, Utc::now()))
            .await
    }

    async fn reject_transaction(&self, id: &TransactionId, reason: &str) -> Result<Transaction> {
        self.pool
            .run_exclusive(*id, self.lifecycle.reject_manual(id, reason, Utc::now()))
            .await
    }

    async fn force_balance_refresh(&self, account: Option<&AccountId>) -> Result<usize> {
        let mut refreshed = 0;
        for id in self.targets(account, account.is_none())? {
            match self.maintenance.refresh_balance(&id, Utc::now()).await {
                Ok(_) => refreshed += 1,
                Err(err) if account.is_some() => return Err(err),
                Err(err) => warn!(account = %id, error = %err, "Balance refresh failed"),
            }
        }
        Ok(refreshed)
    }

    async fn force_relogin(&self, account: Option<&AccountId>) -> Result<usize> {
        let mut logged_in = 0;
        for id in self.targets(account, false)? {
            match self.maintenance.relogin(&id, Utc::now()).await {
                Ok(_) => logged_in += 1,
                Err(err) if account.is_some() => return Err(err),
                Err(err) => warn!(account = %id, error = %err, "Relogin failed"),
            }
        }
        Ok(logged_in)
    }
}
