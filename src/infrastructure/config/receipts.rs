//! Receipt intake and matching configuration.

use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::application::receipt::{BankAliases, ReceiptMatcher};

#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptsConfig {
    /// Bank every receipt must be issued by.
    #[serde(default = "default_expected_bank")]
    pub expected_bank: String,
    /// Labels that name the same bank. Empty keeps the built-in groups.
    #[serde(default)]
    pub bank_aliases: Vec<Vec<String>>,
    /// Relative amount tolerance (0.01 = 1%).
    #[serde(default = "default_amount_tolerance")]
    pub amount_tolerance: Decimal,
    /// Directory watched for extracted receipts. Unset disables intake.
    #[serde(default = "default_spool_dir")]
    pub spool_dir: Option<PathBuf>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_expected_bank() -> String {
    "T-Bank".to_string()
}

fn default_amount_tolerance() -> Decimal {
    dec!(0.01)
}

fn default_spool_dir() -> Option<PathBuf> {
    Some(PathBuf::from("receipts"))
}

const fn default_poll_interval_secs() -> u64 {
    5
}

impl ReceiptsConfig {
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub fn matcher(&self) -> ReceiptMatcher {
        let banks = if self.bank_aliases.is_empty() {
            BankAliases::default()
        } else {
            BankAliases::new(&self.bank_aliases)
        };
        ReceiptMatcher::new(self.amount_tolerance, self.expected_bank.clone(), banks)
    }
}

impl Default for ReceiptsConfig {
    fn default() -> Self {
        Self {
            expected_bank: default_expected_bank(),
            bank_aliases: Vec::new(),
            amount_tolerance: default_amount_tolerance(),
            spool_dir: default_spool_dir(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}
