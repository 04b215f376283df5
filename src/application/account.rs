//! In-memory registry of exchange accounts.
//!
//! The registry is the single writer for account status and usage
//! counters. Every mutation happens under one write lock, so selecting an
//! account and reserving an ad slot on it is atomic.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::domain::{Account, AccountId, AccountStats, AccountStatus, ExchangeKind};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct AccountRegistry {
    accounts: RwLock<Vec<Account>>,
}

impl AccountRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account, or replace the one with the same id.
    ///
    /// Returns the replaced account.
    pub fn register(&self, account: Account) -> Option<Account> {
        let mut accounts = self.accounts.write();
        match accounts.iter_mut().find(|a| a.id == account.id) {
            Some(slot) => Some(std::mem::replace(slot, account)),
            None => {
                accounts.push(account);
                None
            }
        }
    }

    pub fn remove(&self, id: &AccountId) -> Option<Account> {
        let mut accounts = self.accounts.write();
        let index = accounts.iter().position(|a| &a.id == id)?;
        Some(accounts.remove(index))
    }

    #[must_use]
    pub fn get(&self, id: &AccountId) -> Option<Account> {
        self.accounts.read().iter().find(|a| &a.id == id).cloned()
    }

    /// Like [`get`](Self::get), but a missing account is an error.
    pub fn require(&self, id: &AccountId) -> Result<Account> {
        self.get(id).ok_or_else(|| Error::not_found("account", id))
    }

    /// Every account in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<Account> {
        self.accounts.read().clone()
    }

    #[must_use]
    pub fn list_active(&self, kind: ExchangeKind) -> Vec<Account> {
        self.accounts
            .read()
            .iter()
            .filter(|a| a.kind == kind && a.is_active())
            .cloned()
            .collect()
    }

    /// Set the account status.
    ///
    /// Becoming active records a fresh login and clears the last error.
    pub fn mark_status(
        &self,
        id: &AccountId,
        status: AccountStatus,
        error: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Account> {
        self.update(id, |account| {
            account.status = status;
            match status {
                AccountStatus::Active => {
                    account.last_login = Some(now);
                    account.last_error = None;
                }
                AccountStatus::Error | AccountStatus::Inactive => {
                    if error.is_some() {
                        account.last_error = error;
                    }
                }
            }
        })
    }

    /// Accounts that need a new session: never logged in, logged in longer
    /// ago than `max_age`, or not currently active.
    #[must_use]
    pub fn accounts_due_for_relogin(&self, max_age: Duration, now: DateTime<Utc>) -> Vec<AccountId> {
        self.accounts
            .read()
            .iter()
            .filter(|a| !a.is_active() || a.session_expired(max_age, now))
            .map(|a| a.id.clone())
            .collect()
    }

    /// Active accounts whose balance is older than `interval`.
    #[must_use]
    pub fn accounts_due_for_balance_refresh(
        &self,
        interval: Duration,
        now: DateTime<Utc>,
    ) -> Vec<AccountId> {
        self.accounts
            .read()
            .iter()
            .filter(|a| a.is_active() && a.balance_stale(interval, now))
            .map(|a| a.id.clone())
            .collect()
    }

    /// First active account of `kind` with ad capacity left.
    ///
    /// `None` is backpressure: the caller should retry on a later cycle.
    #[must_use]
    pub fn find_available(&self, kind: ExchangeKind) -> Option<Account> {
        self.accounts
            .read()
            .iter()
            .find(|a| a.kind == kind && a.has_capacity())
            .cloned()
    }

    /// Select an available account and count one more ad on it.
    #[must_use]
    pub fn reserve_ad_slot(&self, kind: ExchangeKind) -> Option<Account> {
        let mut accounts = self.accounts.write();
        let account = accounts
            .iter_mut()
            .find(|a| a.kind == kind && a.has_capacity())?;
        account.usage.active_ads += 1;
        Some(account.clone())
    }

    /// Record that a counterparty responded to one of the account's ads.
    pub fn mark_ad_interest(&self, id: &AccountId) -> Result<Account> {
        self.update(id, |account| {
            if account.usage.ads_with_interest < account.usage.active_ads {
                account.usage.ads_with_interest += 1;
            }
        })
    }

    /// Give back an ad slot once its transaction is finished.
    pub fn release_ad_slot(&self, id: &AccountId, had_interest: bool) -> Result<Account> {
        self.update(id, |account| {
            account.usage.active_ads = account.usage.active_ads.saturating_sub(1);
            if had_interest {
                account.usage.ads_with_interest = account.usage.ads_with_interest.saturating_sub(1);
            }
            account.usage.ads_with_interest =
                account.usage.ads_with_interest.min(account.usage.active_ads);
        })
    }

    /// Overwrite usage counters, used when rebuilding state after restart.
    pub fn restore_usage(&self, id: &AccountId, active_ads: u32, ads_with_interest: u32) -> Result<Account> {
        self.update(id, |account| {
            account.usage.active_ads = active_ads;
            account.usage.ads_with_interest = ads_with_interest.min(active_ads);
        })
    }

    pub fn record_balance(&self, id: &AccountId, balance: Decimal, now: DateTime<Utc>) -> Result<Account> {
        self.update(id, |account| {
            account.usage.balance = Some(balance);
            account.usage.last_balance_update = Some(now);
        })
    }

    #[must_use]
    pub fn stats(&self) -> AccountStats {
        AccountStats::from_accounts(self.accounts.read().iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }

    fn update(&self, id: &AccountId, apply: impl FnOnce(&mut Account)) -> Result<Account> {
        let mut accounts = self.accounts.write();
        let account = accounts
            .iter_mut()
            .find(|a| &a.id == id)
            .ok_or_else(|| Error::not_found("account", id))?;
        apply(account);
        Ok(account.clone())
    }
}
