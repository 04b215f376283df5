mod harness;

use std::sync::Arc;
use std::time::Duration;

use dealflow::adapter::inbound::receipt::receipt_channel;
use dealflow::adapter::outbound::paper::PaperOp;
use dealflow::domain::{AccountId, AccountStatus, ExternalId, TransactionStatus};
use dealflow::error::ConnectorError;
use dealflow::infrastructure::orchestration::{loops, start};
use dealflow::port::{AccountStore, TransactionStore};
use dealflow::testkit;
use harness::{TestEngine, ADVERTISER, AGREE, SOURCE};
use rust_decimal_macros::dec;

async fn status_of(h: &TestEngine, external_id: &str) -> TransactionStatus {
    h.engine
        .lifecycle
        .store()
        .find_by_external_id(&ExternalId::new(external_id))
        .await
        .unwrap()
        .expect("ingested")
        .status()
}

async fn monitor(h: &TestEngine) {
    loops::monitor_cycle(&h.engine).await.unwrap();
    h.engine.pool.wait_idle().await;
}

#[tokio::test]
async fn loops_drive_a_request_to_release() {
    let mut config = testkit::config::engine();
    config.schedule.release_grace_secs = 0;
    let h = TestEngine::with_config(config).await;

    h.gate.push_pending(
        &AccountId::new(SOURCE),
        testkit::domain::external("GATE-100", dec!(5000)),
    );
    loops::discovery_cycle(&h.engine).await.unwrap();
    h.engine.pool.wait_idle().await;
    assert_eq!(status_of(&h, "GATE-100").await, TransactionStatus::WaitingResponse);

    let ad = h.bybit.advertisements().remove(0);
    let order_id = h.bybit.open_order(&ad.ad_id, "buyer-7").unwrap();
    monitor(&h).await;
    assert_eq!(h.bybit.sent_messages(&order_id).len(), 1);

    for text in AGREE {
        h.bybit.counterparty_says(&order_id, text);
    }
    monitor(&h).await;
    assert_eq!(status_of(&h, "GATE-100").await, TransactionStatus::WaitingPayment);
    assert_eq!(h.bybit.sent_messages(&order_id).len(), 4);

    let (sender, source) = receipt_channel(4);
    let intake = tokio::spawn(loops::receipt_loop(
        Arc::clone(&h.engine),
        Box::new(source),
        h.shutdown.subscribe(),
    ));
    sender
        .send(testkit::domain::receipt(dec!(5000), "receipts/100.pdf"))
        .await
        .unwrap();
    drop(sender);
    intake.await.unwrap();
    assert_eq!(status_of(&h, "GATE-100").await, TransactionStatus::Approved);

    loops::release_cycle(&h.engine).await.unwrap();
    h.engine.pool.wait_idle().await;
    assert_eq!(status_of(&h, "GATE-100").await, TransactionStatus::Released);
    assert_eq!(h.bybit.released(), vec![order_id]);
}

#[tokio::test]
async fn repeated_discovery_never_duplicates() {
    let h = TestEngine::start().await;
    h.gate.push_pending(
        &AccountId::new(SOURCE),
        testkit::domain::external("GATE-101", dec!(2000)),
    );

    for _ in 0..3 {
        loops::discovery_cycle(&h.engine).await.unwrap();
        h.engine.pool.wait_idle().await;
    }

    let all = h.engine.lifecycle.store().list_transactions().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(h.bybit.advertisements().len(), 1);
    assert_eq!(h.events.count("new_transaction"), 1);
}

#[tokio::test]
async fn discovery_fails_when_every_source_account_fails() {
    let h = TestEngine::start().await;
    h.gate.fail_next(
        PaperOp::ListPending,
        ConnectorError::Transient("gateway timeout".into()),
    );

    let err = loops::discovery_cycle(&h.engine).await.unwrap_err();
    assert!(err.to_string().contains("discovery"));
    loops::discovery_cycle(&h.engine).await.unwrap();
}

#[tokio::test]
async fn cancelled_order_is_picked_up_by_the_monitor() {
    let h = TestEngine::start().await;
    let now = chrono::Utc::now();
    let id = h.advertised("GATE-102", dec!(2000), now).await;
    let order_id = h.open_order(&id, now).await;

    h.bybit
        .set_order_status(&order_id, dealflow::port::OrderStatus::Cancelled);
    monitor(&h).await;

    assert_eq!(h.status(&id).await, TransactionStatus::Cancelled);
    assert_eq!(h.active_ads(), 0);
}

#[tokio::test]
async fn balance_cycle_records_balances() {
    let h = TestEngine::start().await;
    h.gate.set_balance(&AccountId::new(SOURCE), dec!(1250.5));
    h.bybit.set_balance(&AccountId::new(ADVERTISER), dec!(800));

    loops::balance_cycle(&h.engine).await.unwrap();

    assert_eq!(h.account(SOURCE).usage.balance, Some(dec!(1250.5)));
    assert_eq!(h.account(ADVERTISER).usage.balance, Some(dec!(800)));
    assert_eq!(h.events.count("balance_update"), 2);

    let stored = h.engine.lifecycle.store().list_accounts().await.unwrap();
    assert!(stored.iter().all(|a| a.usage.last_balance_update.is_some()));

    // Fresh balances are not fetched again.
    loops::balance_cycle(&h.engine).await.unwrap();
    assert_eq!(h.events.count("balance_update"), 2);
}

#[tokio::test]
async fn relogin_cycle_recovers_failed_accounts() {
    let h = TestEngine::start().await;
    let id = AccountId::new(ADVERTISER);
    h.engine
        .accounts
        .mark_status(&id, AccountStatus::Error, Some("session expired".into()), chrono::Utc::now())
        .unwrap();
    let logins = h.bybit.login_count(&id);

    loops::relogin_cycle(&h.engine).await.unwrap();

    let account = h.account(ADVERTISER);
    assert_eq!(account.status, AccountStatus::Active);
    assert_eq!(h.bybit.login_count(&id), logins + 1);
}

#[tokio::test]
async fn rejected_login_parks_the_account() {
    let h = TestEngine::start().await;
    let id = AccountId::new(SOURCE);
    h.engine
        .accounts
        .mark_status(&id, AccountStatus::Inactive, None, chrono::Utc::now())
        .unwrap();
    h.gate.fail_next(
        PaperOp::Login,
        ConnectorError::Authentication("bad password".into()),
    );

    loops::relogin_cycle(&h.engine).await.unwrap();

    let account = h.account(SOURCE);
    assert_eq!(account.status, AccountStatus::Error);
    assert!(account.last_error.unwrap().contains("bad password"));
    assert!(h.engine.accounts.list_active(account.kind).is_empty());
}

#[tokio::test]
async fn start_stops_on_shutdown() {
    let h = TestEngine::start().await;
    let (_sender, source) = receipt_channel(1);
    let engine = Arc::clone(&h.engine);
    let shutdown = h.shutdown.subscribe();
    let running = tokio::spawn(start(engine, Some(Box::new(source)), shutdown));

    tokio::time::sleep(Duration::from_millis(50)).await;
    h.shutdown.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("engine stops within timeout")
        .unwrap()
        .unwrap();
}
