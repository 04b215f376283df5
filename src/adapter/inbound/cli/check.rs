//! Handlers for the `check` command group.

use std::path::Path;

use serde_json::json;

use crate::adapter::inbound::cli::output;
use crate::error::{ConfigError, Result};
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::orchestration::{health_check, HealthReport, HealthStatus};

/// Validate the configuration file without starting the engine.
pub fn execute_config(path: &Path) -> Result<()> {
    let config = Config::load(path)?;

    output::section("Configuration Check");
    output::field("Config", path.display());
    output::success("Configuration file is valid");

    output::section("Summary");
    output::field("Dry run", config.dry_run);
    output::field("Accounts", config.accounts.len());
    output::field("Methods", config.negotiation.payment_methods.len());

    if config.negotiation.payment_phone.trim().is_empty() {
        output::warning("Payment phone not set (set DEALFLOW_PAYMENT_PHONE)");
    } else {
        output::success("Payment phone configured");
    }

    if config.telegram.enabled {
        let token = std::env::var("TELEGRAM_BOT_TOKEN").is_ok_and(|v| !v.trim().is_empty());
        let chat = std::env::var("TELEGRAM_CHAT_ID").is_ok_and(|v| !v.trim().is_empty());
        if token && chat {
            output::success("Telegram integration configured");
        } else {
            output::warning("Telegram enabled but environment variables are missing");
            if !token {
                output::field("Missing", "TELEGRAM_BOT_TOKEN");
            }
            if !chat {
                output::field("Missing", "TELEGRAM_CHAT_ID");
            }
        }
    } else {
        output::field("Telegram", "disabled");
    }

    output::success("Configuration check complete");
    Ok(())
}

/// Run the readiness checks. Fails when a critical check fails.
pub fn execute_health(path: &Path) -> Result<()> {
    let config = Config::load(path)?;
    let report = health_check(&config);

    if output::is_json() {
        output::json_output(report_json(&report));
    } else {
        output::section("Health Check");
        for check in report.checks() {
            match check.status() {
                HealthStatus::Healthy => output::success(check.name()),
                HealthStatus::Unhealthy(reason) if check.critical() => {
                    output::error(&format!("{}: {reason}", check.name()));
                }
                HealthStatus::Unhealthy(reason) => {
                    output::warning(&format!("{}: {reason}", check.name()));
                }
            }
        }
    }

    if report.is_healthy() {
        if !output::is_json() {
            output::success("All critical checks passed");
        }
        Ok(())
    } else {
        Err(ConfigError::Other("critical health checks failed".to_string()).into())
    }
}

fn report_json(report: &HealthReport) -> serde_json::Value {
    let checks: Vec<_> = report
        .checks()
        .iter()
        .map(|check| {
            let reason = match check.status() {
                HealthStatus::Healthy => None,
                HealthStatus::Unhealthy(reason) => Some(reason.clone()),
            };
            json!({
                "name": check.name(),
                "critical": check.critical(),
                "healthy": check.is_healthy(),
                "reason": reason,
            })
        })
        .collect();
    json!({
        "command": "check.health",
        "healthy": report.is_healthy(),
        "checks": checks,
    })
}
