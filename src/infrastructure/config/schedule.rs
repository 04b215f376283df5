//! Loop intervals, timeouts and retention windows.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Poll source accounts for pending transactions (seconds).
    #[serde(default = "default_discovery_interval_secs")]
    pub discovery_interval_secs: u64,
    /// Poll advertising accounts for orders and chat (seconds).
    #[serde(default = "default_order_monitor_interval_secs")]
    pub order_monitor_interval_secs: u64,
    #[serde(default = "default_balance_refresh_interval_secs")]
    pub balance_refresh_interval_secs: u64,
    /// Maximum session age before re-login (seconds).
    #[serde(default = "default_relogin_interval_secs")]
    pub relogin_interval_secs: u64,
    /// How often accounts are checked for stale sessions and balances
    /// (seconds).
    #[serde(default = "default_account_check_interval_secs")]
    pub account_check_interval_secs: u64,
    #[serde(default = "default_release_scan_interval_secs")]
    pub release_scan_interval_secs: u64,
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Time a counterparty has to send a receipt (seconds).
    #[serde(default = "default_payment_timeout_secs")]
    pub payment_timeout_secs: u64,
    /// Delay between approval and release (seconds).
    #[serde(default = "default_release_grace_secs")]
    pub release_grace_secs: u64,
    #[serde(default = "default_transaction_retention_days")]
    pub transaction_retention_days: u64,
    #[serde(default = "default_session_retention_days")]
    pub session_retention_days: u64,
}

const fn default_discovery_interval_secs() -> u64 {
    15
}

const fn default_order_monitor_interval_secs() -> u64 {
    5
}

const fn default_balance_refresh_interval_secs() -> u64 {
    4 * 60 * 60
}

const fn default_relogin_interval_secs() -> u64 {
    30 * 60
}

const fn default_account_check_interval_secs() -> u64 {
    60
}

const fn default_release_scan_interval_secs() -> u64 {
    5
}

const fn default_cleanup_interval_secs() -> u64 {
    60 * 60
}

const fn default_payment_timeout_secs() -> u64 {
    600
}

const fn default_release_grace_secs() -> u64 {
    30
}

const fn default_transaction_retention_days() -> u64 {
    30
}

const fn default_session_retention_days() -> u64 {
    7
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            discovery_interval_secs: default_discovery_interval_secs(),
            order_monitor_interval_secs: default_order_monitor_interval_secs(),
            balance_refresh_interval_secs: default_balance_refresh_interval_secs(),
            relogin_interval_secs: default_relogin_interval_secs(),
            account_check_interval_secs: default_account_check_interval_secs(),
            release_scan_interval_secs: default_release_scan_interval_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            payment_timeout_secs: default_payment_timeout_secs(),
            release_grace_secs: default_release_grace_secs(),
            transaction_retention_days: default_transaction_retention_days(),
            session_retention_days: default_session_retention_days(),
        }
    }
}

impl ScheduleConfig {
    #[must_use]
    pub const fn discovery_interval(&self) -> Duration {
        Duration::from_secs(self.discovery_interval_secs)
    }

    #[must_use]
    pub const fn order_monitor_interval(&self) -> Duration {
        Duration::from_secs(self.order_monitor_interval_secs)
    }

    #[must_use]
    pub const fn account_check_interval(&self) -> Duration {
        Duration::from_secs(self.account_check_interval_secs)
    }

    #[must_use]
    pub const fn release_scan_interval(&self) -> Duration {
        Duration::from_secs(self.release_scan_interval_secs)
    }

    #[must_use]
    pub const fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    /// All intervals with their config keys, for validation.
    pub(crate) fn intervals(&self) -> [(&'static str, u64); 9] {
        [
            ("discovery_interval_secs", self.discovery_interval_secs),
            ("order_monitor_interval_secs", self.order_monitor_interval_secs),
            ("balance_refresh_interval_secs", self.balance_refresh_interval_secs),
            ("relogin_interval_secs", self.relogin_interval_secs),
            ("account_check_interval_secs", self.account_check_interval_secs),
            ("release_scan_interval_secs", self.release_scan_interval_secs),
            ("cleanup_interval_secs", self.cleanup_interval_secs),
            ("payment_timeout_secs", self.payment_timeout_secs),
            ("transaction_retention_days", self.transaction_retention_days),
        ]
    }
}
