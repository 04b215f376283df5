//! Exchange accounts and their advertisement capacity.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::AccountId;

/// Supported exchange platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    /// Source exchange where fiat/crypto requests originate.
    Gate,
    /// Counterparty exchange where advertisements are published.
    Bybit,
}

impl ExchangeKind {
    pub const ALL: [Self; 2] = [Self::Gate, Self::Bybit];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gate => "gate",
            Self::Bybit => "bybit",
        }
    }
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gate" => Ok(Self::Gate),
            "bybit" => Ok(Self::Bybit),
            other => Err(DomainError::UnknownExchangeKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Inactive,
    Active,
    Error,
}

impl AccountStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Active => "active",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inactive" => Ok(Self::Inactive),
            "active" => Ok(Self::Active),
            "error" => Ok(Self::Error),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Login material for an exchange account. Never printed.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Advertisement usage and balance bookkeeping for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUsage {
    /// Advertisements currently published by this account.
    pub active_ads: u32,
    /// Published advertisements a counterparty has already responded to.
    pub ads_with_interest: u32,
    /// Maximum number of idle advertisements at once.
    pub ad_limit: u32,
    pub balance: Option<Decimal>,
    pub last_balance_update: Option<DateTime<Utc>>,
}

impl AccountUsage {
    #[must_use]
    pub const fn with_limit(ad_limit: u32) -> Self {
        Self {
            active_ads: 0,
            ads_with_interest: 0,
            ad_limit,
            balance: None,
            last_balance_update: None,
        }
    }

    /// Advertisements nobody has responded to yet.
    #[must_use]
    pub const fn idle_ads(&self) -> u32 {
        self.active_ads.saturating_sub(self.ads_with_interest)
    }
}

/// A configured exchange account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub kind: ExchangeKind,
    pub credentials: Credentials,
    pub status: AccountStatus,
    pub last_login: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub usage: AccountUsage,
}

impl Account {
    /// A freshly configured account. It stays inactive until the first login.
    pub fn new(
        id: impl Into<AccountId>,
        kind: ExchangeKind,
        credentials: Credentials,
        ad_limit: u32,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            credentials,
            status: AccountStatus::Inactive,
            last_login: None,
            last_error: None,
            usage: AccountUsage::with_limit(ad_limit),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Active, and with fewer idle advertisements than its limit.
    #[must_use]
    pub fn has_capacity(&self) -> bool {
        self.is_active() && self.usage.idle_ads() < self.usage.ad_limit
    }

    /// Whether the session is older than `max_age` or was never established.
    #[must_use]
    pub fn session_expired(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.last_login.map_or(true, |at| now - at >= max_age)
    }

    #[must_use]
    pub fn balance_stale(&self, interval: Duration, now: DateTime<Utc>) -> bool {
        self.usage
            .last_balance_update
            .map_or(true, |at| now - at >= interval)
    }
}
