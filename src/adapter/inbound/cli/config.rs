//! Handler for the `config` command group.

use std::fs;
use std::path::Path;

use serde_json::json;

use crate::adapter::inbound::cli::{operator, output, paths};
use crate::error::{ConfigError, Result};
use crate::infrastructure::config::settings::Config;

/// Default config template with documentation.
const CONFIG_TEMPLATE: &str = include_str!("../../../../config.toml.example");

/// Execute `config init`.
pub fn execute_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(ConfigError::InvalidValue {
            field: "config",
            reason: "file already exists (use --force to overwrite)".to_string(),
        }
        .into());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, CONFIG_TEMPLATE)?;
    output::section("Config Initialized");
    output::success("Created configuration file");
    output::field("Path", path.display());
    output::section("Next Steps");
    output::note(&format!("1. Edit {} with your accounts", path.display()));
    output::note("2. Set DEALFLOW_PAYMENT_PHONE and the account secrets");
    output::note(&format!("3. Run: dealflow check health -c {}", path.display()));
    output::note(&format!("4. Run: dealflow run -c {}", path.display()));
    output::hint(&format!(
        "point receipts.spool_dir at {} to share it with the OCR side",
        paths::default_spool().display()
    ));
    Ok(())
}

/// Execute `config show`.
pub fn execute_show(path: &Path) -> Result<()> {
    let config = Config::load(path)?;

    if output::is_json() {
        output::json_output(show_json(&config));
        return Ok(());
    }

    output::section("Effective Configuration");
    output::field("Config", path.display());
    output::field("Dry run", config.dry_run);
    output::field("Store", operator::store_label(&config));
    output::field(
        "Logging",
        format!("{} ({})", config.logging.level, config.logging.format),
    );

    output::section("Trading");
    output::field("Source", config.trading.source_exchange);
    output::field("Advertise on", config.trading.advertise_on);
    output::field(
        "Order range",
        format!(
            "{}..={}",
            config.trading.min_order_amount, config.trading.max_order_amount
        ),
    );

    output::section("Schedule");
    let schedule = &config.schedule;
    output::field("Discovery", format!("{}s", schedule.discovery_interval_secs));
    output::field("Orders", format!("{}s", schedule.order_monitor_interval_secs));
    output::field("Payment", format!("{}s timeout", schedule.payment_timeout_secs));
    output::field("Release", format!("{}s grace", schedule.release_grace_secs));
    output::field(
        "Retention",
        format!(
            "{}d transactions, {}d sessions",
            schedule.transaction_retention_days, schedule.session_retention_days
        ),
    );

    output::section("Negotiation");
    output::field("Max retries", config.negotiation.max_retries);
    output::field("Receipt email", &config.negotiation.receipt_email);
    for method in &config.negotiation.payment_methods {
        output::note(&format!("- {} ({})", method.name, method.bank));
    }

    output::section("Receipts");
    output::field("Bank", &config.receipts.expected_bank);
    output::field("Tolerance", config.receipts.amount_tolerance);
    output::field(
        "Spool",
        config
            .receipts
            .spool_dir
            .as_ref()
            .map_or_else(|| "disabled".to_string(), |dir| dir.display().to_string()),
    );

    output::section("Accounts");
    if config.accounts.is_empty() {
        output::note("(none configured)");
    }
    for account in &config.accounts {
        output::note(&format!(
            "- {} ({}, ad limit {})",
            account.id, account.kind, account.ad_limit
        ));
    }

    output::section("Telegram");
    output::field("Enabled", config.telegram.enabled);
    Ok(())
}

/// Execute `config validate`.
pub fn execute_validate(path: &Path) -> Result<()> {
    Config::load(path)?;
    if output::is_json() {
        output::json_output(json!({
            "command": "config.validate",
            "path": path.display().to_string(),
            "valid": true,
        }));
        return Ok(());
    }
    output::success(&format!("{} is valid", path.display()));
    Ok(())
}

fn show_json(config: &Config) -> serde_json::Value {
    json!({
        "command": "config.show",
        "dry_run": config.dry_run,
        "store": operator::store_label(config),
        "trading": {
            "source_exchange": config.trading.source_exchange,
            "advertise_on": config.trading.advertise_on,
            "min_order_amount": config.trading.min_order_amount,
            "max_order_amount": config.trading.max_order_amount,
        },
        "schedule": {
            "payment_timeout_secs": config.schedule.payment_timeout_secs,
            "release_grace_secs": config.schedule.release_grace_secs,
        },
        "payment_methods": config
            .negotiation
            .payment_methods
            .iter()
            .map(|m| json!({ "name": m.name, "bank": m.bank }))
            .collect::<Vec<_>>(),
        "accounts": config
            .accounts
            .iter()
            .map(|a| json!({ "id": a.id, "kind": a.kind, "ad_limit": a.ad_limit }))
            .collect::<Vec<_>>(),
        "telegram_enabled": config.telegram.enabled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_and_validates() {
        let config = Config::parse_toml(CONFIG_TEMPLATE).unwrap();
        assert!(config.dry_run);
        assert_eq!(config.accounts.len(), 2);
        assert_eq!(config.negotiation.payment_methods.len(), 2);
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        execute_init(&path, false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), CONFIG_TEMPLATE);

        let err = execute_init(&path, false).unwrap_err();
        assert!(err.to_string().contains("--force"));
        execute_init(&path, true).unwrap();
    }

    #[test]
    fn show_json_never_contains_secrets() {
        let toml = r#"
            [[accounts]]
            id = "gate-1"
            kind = "gate"
            login = "alice"
            secret = "hunter2"
        "#;
        let config = Config::parse_toml(toml).unwrap();
        let rendered = show_json(&config).to_string();
        assert!(rendered.contains("gate-1"));
        assert!(!rendered.contains("hunter2"));
    }
}
