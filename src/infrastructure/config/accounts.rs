//! Seed list of exchange accounts.

use serde::Deserialize;

use crate::domain::{Account, Credentials, ExchangeKind};

#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub id: String,
    pub kind: ExchangeKind,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub secret: String,
    /// Environment variable holding the secret. Wins over `secret`.
    #[serde(default)]
    pub secret_env: Option<String>,
    /// Idle advertisements allowed at once.
    #[serde(default = "default_ad_limit")]
    pub ad_limit: u32,
}

const fn default_ad_limit() -> u32 {
    2
}

impl AccountConfig {
    #[must_use]
    pub fn to_account(&self) -> Account {
        let secret = self
            .secret_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .unwrap_or_else(|| self.secret.clone());
        Account::new(
            self.id.as_str(),
            self.kind,
            Credentials::new(self.login.clone(), secret),
            self.ad_limit,
        )
    }
}
