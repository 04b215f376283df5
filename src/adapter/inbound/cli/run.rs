//! Handler for the `run` command.

use tokio::sync::watch;
use tracing::{info, warn};

use crate::adapter::inbound::cli::command::RunArgs;
use crate::adapter::inbound::cli::{operator, output};
use crate::error::Result;
use crate::infrastructure::config::database::DatabaseBackend;
use crate::infrastructure::config::logging::LogFormat;
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::orchestration::run_with_shutdown;

/// Execute the run command.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let mut config = Config::load(&args.config)?;
    apply_overrides(&mut config, args, output::is_json());

    print_startup(&config);
    config.init_logging();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, shutting down"),
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
        let _ = shutdown_tx.send(true);
    });

    run_with_shutdown(config, shutdown_rx).await
}

fn apply_overrides(config: &mut Config, args: &RunArgs, force_json_logs: bool) {
    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }
    if args.json_logs || force_json_logs {
        config.logging.format = LogFormat::Json;
    }
    if args.dry_run {
        config.dry_run = true;
    }
    if let Some(path) = &args.database {
        config.database.backend = DatabaseBackend::Sqlite;
        config.database.path = path.to_string_lossy().to_string();
    }
    if args.telegram_enabled {
        config.telegram.enabled = true;
    }
}

fn print_startup(config: &Config) {
    if output::is_quiet() && !output::is_json() {
        return;
    }
    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Store", operator::store_label(config));
    output::field("Accounts", config.accounts.len());
    output::field("Workers", config.workers.pool_size);
    output::field(
        "Timeout",
        format!(
            "{}s payment, {}s grace",
            config.schedule.payment_timeout_secs, config.schedule.release_grace_secs
        ),
    );
    if output::verbosity() > 0 {
        let methods: Vec<_> = config
            .negotiation
            .payment_methods
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        output::field("Methods", methods.join(", "));
        output::field("Log level", &config.logging.level);
    }
    if config.dry_run {
        output::warning("Dry-run mode enabled, deals run against the paper exchange");
    }
}
