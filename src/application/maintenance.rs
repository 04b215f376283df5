//! Account session and balance upkeep.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::application::account::AccountRegistry;
use crate::domain::{Account, AccountId, AccountStatus};
use crate::error::{ConnectorError, Result};
use crate::port::outbound::notifier::{AccountEvent, BalanceEvent};
use crate::port::{ConnectorRegistry, Event, NotifierRegistry, Store};

pub struct AccountMaintenance {
    accounts: Arc<AccountRegistry>,
    connectors: ConnectorRegistry,
    store: Arc<dyn Store>,
    notifiers: Arc<NotifierRegistry>,
}

impl AccountMaintenance {
    pub fn new(
        accounts: Arc<AccountRegistry>,
        connectors: ConnectorRegistry,
        store: Arc<dyn Store>,
        notifiers: Arc<NotifierRegistry>,
    ) -> Self {
        Self {
            accounts,
            connectors,
            store,
            notifiers,
        }
    }

    #[must_use]
    pub fn accounts(&self) -> &Arc<AccountRegistry> {
        &self.accounts
    }

    /// Open a fresh exchange session for `id`.
    ///
    /// Rejected credentials and permanent failures mark the account
    /// `error`; transient failures leave its status unchanged. The error is
    /// returned in every failure case.
    pub async fn relogin(&self, id: &AccountId, now: DateTime<Utc>) -> Result<Account> {
        let account = self.accounts.require(id)?;
        let connector = self.connectors.get(account.kind)?;

        match connector.login(&account).await {
            Ok(()) => {
                let updated = self
                    .accounts
                    .mark_status(id, AccountStatus::Active, None, now)?;
                info!(account = %id, kind = %updated.kind, "Account logged in");
                self.persist_status(&updated, account.status).await?;
                Ok(updated)
            }
            Err(err @ (ConnectorError::Authentication(_) | ConnectorError::Permanent(_))) => {
                let updated = self.accounts.mark_status(
                    id,
                    AccountStatus::Error,
                    Some(err.to_string()),
                    now,
                )?;
                warn!(account = %id, error = %err, "Login failed");
                self.persist_status(&updated, account.status).await?;
                Err(err.into())
            }
            Err(err) => {
                warn!(account = %id, error = %err, "Login failed, will retry");
                Err(err.into())
            }
        }
    }

    /// Fetch and record the balance of an active account.
    pub async fn refresh_balance(&self, id: &AccountId, now: DateTime<Utc>) -> Result<Decimal> {
        let account = self.accounts.require(id)?;
        let connector = self.connectors.get(account.kind)?;

        let balance = match connector.fetch_balance(&account).await {
            Ok(balance) => balance,
            Err(err) => {
                if err.is_authentication() {
                    let updated = self.accounts.mark_status(
                        id,
                        AccountStatus::Error,
                        Some(err.to_string()),
                        now,
                    )?;
                    self.persist_status(&updated, account.status).await?;
                }
                return Err(err.into());
            }
        };

        let updated = self.accounts.record_balance(id, balance, now)?;
        self.store.save_account(&updated).await?;
        self.notifiers.notify_all(Event::BalanceUpdated(BalanceEvent {
            account_id: id.clone(),
            balance,
        }));
        Ok(balance)
    }

    /// Load configured accounts, merging balances and errors persisted by a
    /// previous run.
    ///
    /// Every account starts `inactive`: sessions do not survive a restart.
    /// Accounts only present in the store are registered as well. Returns
    /// the number of registered accounts.
    pub async fn restore(&self, configured: Vec<Account>) -> Result<usize> {
        let mut persisted = self.store.list_accounts().await?;

        for mut account in configured {
            if let Some(index) = persisted.iter().position(|p| p.id == account.id) {
                let previous = persisted.swap_remove(index);
                account.usage.balance = previous.usage.balance;
                account.usage.last_balance_update = previous.usage.last_balance_update;
                account.last_error = previous.last_error;
            }
            account.status = AccountStatus::Inactive;
            account.last_login = None;
            self.store.save_account(&account).await?;
            self.accounts.register(account);
        }

        for mut account in persisted {
            account.status = AccountStatus::Inactive;
            account.last_login = None;
            account.usage.active_ads = 0;
            account.usage.ads_with_interest = 0;
            self.accounts.register(account);
        }

        info!(accounts = self.accounts.len(), "Accounts restored");
        Ok(self.accounts.len())
    }

    async fn persist_status(&self, account: &Account, previous: AccountStatus) -> Result<()> {
        self.store.save_account(account).await?;
        if account.status != previous {
            self.notifiers
                .notify_all(Event::AccountStatusChanged(AccountEvent {
                    account_id: account.id.clone(),
                    status: account.status,
                    error: account.last_error.clone(),
                }));
        }
        Ok(())
    }
}
