//! Configuration health reporting.

use crate::domain::ExchangeKind;
use crate::infrastructure::config::database::DatabaseBackend;
use crate::infrastructure::config::settings::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy(String),
}

#[derive(Debug, Clone)]
pub struct HealthCheck {
    name: &'static str,
    critical: bool,
    status: HealthStatus,
}

impl HealthCheck {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn critical(&self) -> bool {
        self.critical
    }

    pub fn status(&self) -> &HealthStatus {
        &self.status
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self.status, HealthStatus::Healthy)
    }
}

#[derive(Debug, Clone)]
pub struct HealthReport {
    checks: Vec<HealthCheck>,
}

impl HealthReport {
    pub fn checks(&self) -> &[HealthCheck] {
        &self.checks
    }

    pub fn is_healthy(&self) -> bool {
        self.checks
            .iter()
            .filter(|check| check.critical())
            .all(HealthCheck::is_healthy)
    }
}

fn check(name: &'static str, critical: bool, problem: Option<String>) -> HealthCheck {
    HealthCheck {
        name,
        critical,
        status: problem.map_or(HealthStatus::Healthy, HealthStatus::Unhealthy),
    }
}

fn account_check(config: &Config, name: &'static str, kind: ExchangeKind) -> HealthCheck {
    let present = config.accounts.iter().any(|a| a.kind == kind);
    check(
        name,
        true,
        (!present).then(|| format!("no {kind} account configured")),
    )
}

pub fn health_check(config: &Config) -> HealthReport {
    let mut checks = Vec::new();

    checks.push(check(
        "database",
        true,
        (config.database.backend == DatabaseBackend::Sqlite
            && config.database.path.trim().is_empty())
        .then(|| "database path is empty".to_string()),
    ));

    checks.push(account_check(
        config,
        "source_accounts",
        config.trading.source_exchange,
    ));
    checks.push(account_check(
        config,
        "advertising_accounts",
        config.trading.advertise_on,
    ));

    checks.push(check(
        "payment_methods",
        true,
        config
            .negotiation
            .payment_methods
            .is_empty()
            .then(|| "no payment methods configured".to_string()),
    ));

    checks.push(check(
        "payment_phone",
        !config.dry_run,
        config
            .negotiation
            .payment_phone
            .trim()
            .is_empty()
            .then(|| "payment phone not set (DEALFLOW_PAYMENT_PHONE)".to_string()),
    ));

    let telegram_ready = std::env::var("TELEGRAM_BOT_TOKEN").is_ok_and(|v| !v.is_empty())
        && std::env::var("TELEGRAM_CHAT_ID").is_ok_and(|v| !v.is_empty());
    checks.push(check(
        "telegram",
        false,
        (config.telegram.enabled && !telegram_ready)
            .then(|| "TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID not set".to_string()),
    ));

    HealthReport { checks }
}
