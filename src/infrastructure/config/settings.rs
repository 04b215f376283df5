//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings.
//! Configuration is loaded from a TOML file with environment variable
//! overrides for sensitive values such as `DEALFLOW_PAYMENT_PHONE`.
//!
//! # Example
//!
//! ```no_run
//! use dealflow::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use chrono::Duration;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::accounts::AccountConfig;
use super::database::DatabaseConfig;
use super::logging::LoggingConfig;
use super::negotiation::{NegotiationConfig, PAYMENT_PHONE_ENV};
use super::receipts::ReceiptsConfig;
use super::schedule::ScheduleConfig;
use super::telegram::TelegramAppConfig;
use super::trading::TradingConfig;
use super::workers::{RateLimitConfig, RetryConfig, WorkersConfig};
use crate::application::lifecycle::LifecycleSettings;
use crate::application::negotiation::NegotiationSettings;
use crate::domain::Account;
use crate::error::{ConfigError, Result};

/// Main application configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub workers: WorkersConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Backoff for loops after failed cycles.
    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub trading: TradingConfig,

    #[serde(default)]
    pub negotiation: NegotiationConfig,

    #[serde(default)]
    pub receipts: ReceiptsConfig,

    #[serde(default)]
    pub telegram: TelegramAppConfig,

    /// Exchange accounts registered at startup.
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,

    /// Run against the in-process paper exchange instead of live connectors.
    #[serde(default)]
    pub dry_run: bool,
}

impl Config {
    /// Parse configuration from TOML content and apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation
    /// fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;

        if let Ok(phone) = std::env::var(PAYMENT_PHONE_ENV) {
            if !phone.trim().is_empty() {
                config.negotiation.payment_phone = phone.trim().to_string();
            }
        }

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is
    /// malformed, or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        for (field, value) in self.schedule.intervals() {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be greater than 0".to_string(),
                }
                .into());
            }
        }
        if self.workers.pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pool_size",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.rate_limit.requests_per_window == 0 || self.rate_limit.window_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit",
                reason: "requests_per_window and window_secs must be greater than 0".to_string(),
            }
            .into());
        }

        if self.retry.initial_delay_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "initial_delay_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "max_delay_ms",
                reason: "must be >= initial_delay_ms".to_string(),
            }
            .into());
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "backoff_multiplier",
                reason: "must be >= 1.0".to_string(),
            }
            .into());
        }

        let trading = &self.trading;
        if trading.min_order_amount <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "min_order_amount",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if trading.max_order_amount < trading.min_order_amount {
            return Err(ConfigError::InvalidValue {
                field: "max_order_amount",
                reason: "must be >= min_order_amount".to_string(),
            }
            .into());
        }
        if trading.source_exchange == trading.advertise_on {
            return Err(ConfigError::InvalidValue {
                field: "advertise_on",
                reason: "must differ from source_exchange".to_string(),
            }
            .into());
        }

        if self.negotiation.payment_methods.is_empty() {
            return Err(ConfigError::MissingField {
                field: "negotiation.payment_methods",
            }
            .into());
        }
        if self.negotiation.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_retries",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        let tolerance = self.receipts.amount_tolerance;
        if tolerance < Decimal::ZERO || tolerance >= Decimal::ONE {
            return Err(ConfigError::InvalidValue {
                field: "amount_tolerance",
                reason: "must be in [0, 1)".to_string(),
            }
            .into());
        }

        let mut seen = HashSet::new();
        for account in &self.accounts {
            if account.id.trim().is_empty() {
                return Err(ConfigError::MissingField { field: "accounts.id" }.into());
            }
            if !seen.insert(account.id.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "accounts.id",
                    reason: format!("duplicate account id {}", account.id),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Accounts from the seed list, all inactive.
    #[must_use]
    pub fn seed_accounts(&self) -> Vec<Account> {
        self.accounts.iter().map(AccountConfig::to_account).collect()
    }

    #[must_use]
    pub fn lifecycle_settings(&self) -> LifecycleSettings {
        let schedule = &self.schedule;
        LifecycleSettings {
            source_kind: self.trading.source_exchange,
            advertise_on: self.trading.advertise_on,
            min_order_amount: self.trading.min_order_amount,
            max_order_amount: self.trading.max_order_amount,
            min_ad_amount: self.trading.min_ad_amount,
            payment_method_ids: self.trading.payment_method_ids.clone(),
            ad_remarks: self.trading.ad_remarks.clone(),
            payment_timeout: secs(schedule.payment_timeout_secs),
            release_grace: secs(schedule.release_grace_secs),
            transaction_retention: days(schedule.transaction_retention_days),
            session_retention: days(schedule.session_retention_days),
        }
    }

    #[must_use]
    pub fn negotiation_settings(&self) -> NegotiationSettings {
        NegotiationSettings {
            max_retries: self.negotiation.max_retries,
            payee_phone: self.negotiation.payment_phone.clone(),
            receipt_email: self.negotiation.receipt_email.clone(),
        }
    }

    /// Session age after which accounts log in again.
    #[must_use]
    pub fn session_max_age(&self) -> Duration {
        secs(self.schedule.relogin_interval_secs)
    }

    /// Balance age after which it is fetched again.
    #[must_use]
    pub fn balance_max_age(&self) -> Duration {
        secs(self.schedule.balance_refresh_interval_secs)
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

fn secs(value: u64) -> Duration {
    Duration::seconds(i64::try_from(value).map_or(i64::MAX / 1000, |v| v.min(i64::MAX / 1000)))
}

fn days(value: u64) -> Duration {
    Duration::days(i64::try_from(value).unwrap_or(365 * 100).min(365 * 100))
}
