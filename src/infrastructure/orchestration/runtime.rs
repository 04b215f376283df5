//! Orchestrator runtime lifecycle.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::context::Engine;
use super::health::{health_check, HealthStatus};
use super::loops::{
    balance_cycle, cleanup_cycle, discovery_cycle, login_all, monitor_cycle, receipt_loop,
    release_cycle, relogin_cycle, run_periodic,
};
use crate::application::worker::wait_for_shutdown;
use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::settings::Config;
use crate::port::ReceiptSource;

/// Main application orchestrator.
pub struct Orchestrator;

impl Orchestrator {
    /// Run the main application loop.
    pub async fn run(config: Config) -> Result<()> {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        run_with_shutdown(config, shutdown_rx).await
    }

    /// Run with externally controlled shutdown signal.
    pub async fn run_with_shutdown(config: Config, shutdown: watch::Receiver<bool>) -> Result<()> {
        run_with_shutdown(config, shutdown).await
    }
}

/// Build the engine from `config` and run it until `shutdown` turns `true`.
pub async fn run_with_shutdown(config: Config, shutdown: watch::Receiver<bool>) -> Result<()> {
    info!(
        dry_run = config.dry_run,
        backend = ?config.database.backend,
        accounts = config.accounts.len(),
        "Starting dealflow"
    );
    for check in health_check(&config).checks() {
        if let HealthStatus::Unhealthy(reason) = check.status() {
            warn!(check = check.name(), critical = check.critical(), reason, "Health check failed");
        }
    }

    let runtime = bootstrap::build(&config, shutdown.clone()).await?;

    #[cfg(feature = "telegram")]
    let _bot = runtime.telegram.map(|tg| {
        crate::adapter::outbound::notifier::telegram::notifier::spawn_command_handler(
            tg,
            Arc::clone(&runtime.engine.admin) as Arc<dyn crate::port::AdminPort>,
        )
    });

    start(runtime.engine, runtime.receipts, shutdown).await
}

/// Log in, spawn every loop and wait for shutdown.
///
/// On shutdown the loops stop at their next await point and queued
/// transaction jobs are dropped. Each transaction keeps its last committed
/// status.
pub async fn start(
    engine: Arc<Engine>,
    receipts: Option<Box<dyn ReceiptSource>>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let logged_in = login_all(&engine).await;
    info!(logged_in, total = engine.accounts.len(), "Accounts logged in");

    let mut handles = spawn_loops(&engine, &shutdown);
    if let Some(source) = receipts {
        handles.push(tokio::spawn(receipt_loop(
            Arc::clone(&engine),
            source,
            shutdown.clone(),
        )));
    }
    info!(loops = handles.len(), "Engine running");

    wait_for_shutdown(&mut shutdown).await;
    info!("Shutdown signal received");

    for result in join_all(handles).await {
        if let Err(e) = result {
            error!(error = %e, "Loop task ended abnormally");
        }
    }
    engine.pool.wait_idle().await;
    info!("Engine stopped");
    Ok(())
}

fn spawn_loops(engine: &Arc<Engine>, shutdown: &watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
    let schedule = &engine.schedule;
    vec![
        spawn_cycle(engine, "discovery", schedule.discovery_interval(), shutdown, |e| async move {
            discovery_cycle(&e).await
        }),
        spawn_cycle(engine, "order_monitor", schedule.order_monitor_interval(), shutdown, |e| async move {
            monitor_cycle(&e).await
        }),
        spawn_cycle(engine, "release", schedule.release_scan_interval(), shutdown, |e| async move {
            release_cycle(&e).await
        }),
        spawn_cycle(engine, "relogin", schedule.account_check_interval(), shutdown, |e| async move {
            relogin_cycle(&e).await
        }),
        spawn_cycle(engine, "balance", schedule.account_check_interval(), shutdown, |e| async move {
            balance_cycle(&e).await
        }),
        spawn_cycle(engine, "cleanup", schedule.cleanup_interval(), shutdown, |e| async move {
            cleanup_cycle(&e).await
        }),
    ]
}

fn spawn_cycle<F, Fut>(
    engine: &Arc<Engine>,
    name: &'static str,
    period: Duration,
    shutdown: &watch::Receiver<bool>,
    cycle: F,
) -> JoinHandle<()>
where
    F: Fn(Arc<Engine>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let engine = Arc::clone(engine);
    let retry = engine.retry.clone();
    tokio::spawn(run_periodic(name, period, retry, shutdown.clone(), move || {
        cycle(Arc::clone(&engine))
    }))
}
