//! Periodic cycles and the receipt intake loop.
//!
//! Every cycle fans out over accounts concurrently, so a slow or failing
//! account never delays its siblings. Per-transaction work is handed to the
//! worker pool. A cycle fails only when every account it touched failed;
//! the loop then backs off and tries again.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use tokio::sync::watch;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::context::Engine;
use crate::application::worker::wait_for_shutdown;
use crate::domain::{Account, AccountId, MatchOutcome, Receipt, TransactionId, TransactionStatus};
use crate::error::{Error, Result};
use crate::infrastructure::config::workers::RetryConfig;
use crate::infrastructure::retry::Backoff;
use crate::port::ReceiptSource;

/// Run `cycle` every `period` until shutdown.
///
/// A failed cycle is logged and followed by a backoff sleep. The loop
/// itself never ends on an error.
pub async fn run_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    retry: RetryConfig,
    mut shutdown: watch::Receiver<bool>,
    mut cycle: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut backoff = Backoff::new(retry);
    info!(loop_name = name, period_ms = period.as_millis() as u64, "Loop started");

    loop {
        tokio::select! {
            () = wait_for_shutdown(&mut shutdown) => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            () = wait_for_shutdown(&mut shutdown) => break,
            result = cycle() => result,
        };

        match result {
            Ok(()) => backoff.reset(),
            Err(e) => {
                let delay = backoff.next_delay();
                error!(
                    loop_name = name,
                    error = %e,
                    failures = backoff.consecutive_failures(),
                    retry_in_ms = delay.as_millis() as u64,
                    "Loop cycle failed"
                );
                tokio::select! {
                    () = wait_for_shutdown(&mut shutdown) => break,
                    () = sleep(delay) => {}
                }
            }
        }
    }
    info!(loop_name = name, "Loop stopped");
}

/// Queue processing of one transaction. Returns whether it was queued.
pub fn dispatch(engine: &Engine, id: TransactionId) -> bool {
    let lifecycle = Arc::clone(&engine.lifecycle);
    engine.pool.try_spawn(id, async move {
        if let Err(e) = lifecycle.process(&id, Utc::now()).await {
            log_step_error(&id, &e);
        }
    })
}

/// Queue every transaction in `statuses`.
pub async fn dispatch_status(engine: &Engine, statuses: &[TransactionStatus]) -> Result<usize> {
    let transactions = engine.lifecycle.store().list_by_status(statuses).await?;
    Ok(transactions
        .into_iter()
        .filter(|tx| dispatch(engine, tx.id))
        .count())
}

/// Ingest new requests from every active source account, then queue all
/// transactions still waiting for an advertisement.
pub async fn discovery_cycle(engine: &Engine) -> Result<()> {
    let now = Utc::now();
    let accounts = engine
        .accounts
        .list_active(engine.lifecycle.settings().source_kind);
    let results = join_all(
        accounts
            .iter()
            .map(|account| engine.lifecycle.discover(account, now)),
    )
    .await;
    let failures = count_failures("discovery", accounts.iter().map(|a| &a.id), &results);

    let created: usize = results.iter().flatten().map(Vec::len).sum();
    if created > 0 {
        info!(created, "New transactions discovered");
    }
    dispatch_status(
        engine,
        &[TransactionStatus::Pending, TransactionStatus::Processing],
    )
    .await?;
    all_failed("discovery", failures, accounts.len())
}

/// Pair counterparty orders with their transactions, advance chats and
/// expire unpaid transactions.
pub async fn monitor_cycle(engine: &Engine) -> Result<()> {
    let now = Utc::now();
    let accounts = engine
        .accounts
        .list_active(engine.lifecycle.settings().advertise_on);
    let results = join_all(
        accounts
            .iter()
            .map(|account| engine.lifecycle.poll_orders(account, now)),
    )
    .await;
    let failures = count_failures("order_monitor", accounts.iter().map(|a| &a.id), &results);

    for (id, update) in results.into_iter().flatten().flatten() {
        let lifecycle = Arc::clone(&engine.lifecycle);
        engine.pool.try_spawn(id, async move {
            if let Err(e) = lifecycle.apply_order_update(&id, &update, Utc::now()).await {
                log_step_error(&id, &e);
            }
        });
    }

    dispatch_status(
        engine,
        &[
            TransactionStatus::WaitingResponse,
            TransactionStatus::WaitingPayment,
        ],
    )
    .await?;
    all_failed("order_monitor", failures, accounts.len())
}

/// Queue approved transactions for release.
pub async fn release_cycle(engine: &Engine) -> Result<()> {
    let queued = dispatch_status(engine, &[TransactionStatus::Approved]).await?;
    if queued > 0 {
        debug!(queued, "Release checks queued");
    }
    Ok(())
}

/// Log in again on accounts whose session is stale or broken.
pub async fn relogin_cycle(engine: &Engine) -> Result<()> {
    let now = Utc::now();
    let due = engine
        .accounts
        .accounts_due_for_relogin(engine.session_max_age, now);
    let results = join_all(due.iter().map(|id| engine.maintenance.relogin(id, now))).await;
    // Errors already marked the accounts. The loop itself stays healthy.
    count_failures("relogin", due.iter(), &results);
    Ok(())
}

/// Refresh balances that are older than the refresh interval.
pub async fn balance_cycle(engine: &Engine) -> Result<()> {
    let now = Utc::now();
    let due = engine
        .accounts
        .accounts_due_for_balance_refresh(engine.balance_max_age, now);
    let results = join_all(
        due.iter()
            .map(|id| engine.maintenance.refresh_balance(id, now)),
    )
    .await;
    let failures = count_failures("balance", due.iter(), &results);
    all_failed("balance", failures, due.len())
}

pub async fn cleanup_cycle(engine: &Engine) -> Result<()> {
    let report = engine.lifecycle.purge_expired(Utc::now()).await?;
    if report.transactions > 0 || report.sessions > 0 {
        info!(
            transactions = report.transactions,
            sessions = report.sessions,
            "Expired records purged"
        );
    }
    Ok(())
}

/// Feed receipts from `source` to the matcher until shutdown or until the
/// source is exhausted.
pub async fn receipt_loop(
    engine: Arc<Engine>,
    mut source: Box<dyn ReceiptSource>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("Receipt intake started");
    loop {
        let receipt = tokio::select! {
            () = wait_for_shutdown(&mut shutdown) => break,
            receipt = source.next_receipt() => receipt,
        };
        let Some(receipt) = receipt else {
            info!("Receipt source closed");
            break;
        };
        match handle_receipt(&engine, &receipt).await {
            Ok(MatchOutcome::Matched { transaction_id, .. }) => {
                info!(evidence = %receipt.evidence_ref, transaction_id = %transaction_id, "Receipt matched");
            }
            Ok(MatchOutcome::NoMatch { reason }) => {
                debug!(evidence = %receipt.evidence_ref, reason = reason.as_str(), "Receipt kept for review");
            }
            Err(e) => {
                warn!(evidence = %receipt.evidence_ref, error = %e, "Receipt processing failed");
            }
        }
    }
}

/// Match a receipt, then apply it under the transaction's lock.
pub async fn handle_receipt(engine: &Engine, receipt: &Receipt) -> Result<MatchOutcome> {
    let outcome = engine.lifecycle.match_receipt(receipt).await?;
    if let MatchOutcome::Matched {
        transaction_id,
        validation,
    } = &outcome
    {
        engine
            .pool
            .run_exclusive(
                *transaction_id,
                engine.lifecycle.apply_receipt(
                    transaction_id,
                    receipt,
                    validation.clone(),
                    Utc::now(),
                ),
            )
            .await?;
    }
    Ok(outcome)
}

/// Log in every registered account. Returns the number of successes.
pub async fn login_all(engine: &Engine) -> usize {
    let now = Utc::now();
    let accounts: Vec<Account> = engine.accounts.list();
    let results = join_all(
        accounts
            .iter()
            .map(|account| engine.maintenance.relogin(&account.id, now)),
    )
    .await;
    let failures = count_failures("startup_login", accounts.iter().map(|a| &a.id), &results);
    accounts.len() - failures
}

fn log_step_error(id: &TransactionId, err: &Error) {
    match err.as_connector() {
        Some(connector) if connector.is_retryable() => {
            warn!(transaction_id = %id, error = %err, "Step deferred, will retry");
        }
        _ => error!(transaction_id = %id, error = %err, "Step failed"),
    }
}

fn count_failures<'a, T>(
    loop_name: &'static str,
    accounts: impl Iterator<Item = &'a AccountId>,
    results: &[Result<T>],
) -> usize {
    accounts
        .zip(results)
        .filter(|(account, result)| match result {
            Ok(_) => false,
            Err(e) => {
                warn!(loop_name, account = %account, error = %e, "Account step failed");
                true
            }
        })
        .count()
}

fn all_failed(loop_name: &'static str, failures: usize, total: usize) -> Result<()> {
    if total > 0 && failures == total {
        return Err(Error::Connection(format!(
            "{loop_name}: all {total} accounts failed"
        )));
    }
    Ok(())
}
