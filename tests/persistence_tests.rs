mod harness;

use chrono::{Duration, Utc};
use dealflow::domain::{AccountId, AccountStatus, TransactionStatus};
use dealflow::port::{AccountStore, TransactionStore};
use dealflow::testkit;
use harness::{TestEngine, ADVERTISER, AGREE, SOURCE};
use rust_decimal_macros::dec;

#[tokio::test]
async fn restart_resumes_open_transactions() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("dealflow.db");
    let now = Utc::now();

    let h = TestEngine::with_config(testkit::config::sqlite(&db)).await;
    h.gate.set_balance(&AccountId::new(SOURCE), dec!(321));
    h.engine
        .maintenance
        .refresh_balance(&AccountId::new(SOURCE), now)
        .await
        .unwrap();
    let (waiting, waiting_order) = h.awaiting_payment("GATE-300", dec!(5000), now).await;
    let talking = h.advertised("GATE-301", dec!(2000), now).await;

    let h = h.restart(testkit::config::sqlite(&db)).await;
    let tx = h.tx(&waiting).await;
    assert_eq!(tx.status(), TransactionStatus::WaitingPayment);
    assert_eq!(tx.order_id, Some(waiting_order));
    assert_eq!(tx.payment.unwrap().method, "SBP");
    assert_eq!(h.status(&talking).await, TransactionStatus::WaitingResponse);

    // Ad usage is rebuilt from the open transactions.
    let advertiser = h.account(ADVERTISER);
    assert_eq!(advertiser.usage.active_ads, 2);
    assert_eq!(advertiser.usage.ads_with_interest, 1);
    assert_eq!(h.account(SOURCE).usage.balance, Some(dec!(321)));

    // The payment method rotation continues after the last one used.
    let order_id = h.open_order(&talking, now).await;
    h.answer(&talking, &order_id, &AGREE, now).await;
    assert_eq!(h.tx(&talking).await.payment.unwrap().method, "Tinkoff");

    // Receipts still match after the restart.
    h.engine
        .lifecycle
        .process_receipt(&testkit::domain::receipt(dec!(5000), "receipts/300.pdf"), now)
        .await
        .unwrap();
    assert_eq!(h.status(&waiting).await, TransactionStatus::Approved);
}

#[tokio::test]
async fn sessions_survive_a_restart_mid_negotiation() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("dealflow.db");
    let now = Utc::now();

    let h = TestEngine::with_config(testkit::config::sqlite(&db)).await;
    let id = h.advertised("GATE-310", dec!(2000), now).await;
    let order_id = h.open_order(&id, now).await;
    h.answer(&id, &order_id, &["да"], now).await;

    let h = h.restart(testkit::config::sqlite(&db)).await;
    let session = h.session(&id).await;
    assert_eq!(session.consumed_inbound(), 1);
    assert_eq!(session.history().len(), 3);

    // Only the answers that arrived after the restart are read.
    h.answer(&id, &order_id, &["да", "подтверждаю"], now).await;
    assert_eq!(h.status(&id).await, TransactionStatus::WaitingPayment);
    assert_eq!(h.session(&id).await.consumed_inbound(), 3);
    assert_eq!(h.bybit.sent_messages(&order_id).len(), 4);
}

#[tokio::test]
async fn accounts_restart_inactive_and_keep_their_history() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("dealflow.db");

    {
        let h = TestEngine::with_config(testkit::config::sqlite(&db)).await;
        h.engine
            .accounts
            .mark_status(
                &AccountId::new(ADVERTISER),
                AccountStatus::Error,
                Some("captcha".into()),
                Utc::now(),
            )
            .unwrap();
        let account = h.account(ADVERTISER);
        h.engine.lifecycle.store().save_account(&account).await.unwrap();
    }

    let store = dealflow::infrastructure::bootstrap::build_store(&testkit::config::sqlite(&db)).unwrap();
    let config = testkit::config::sqlite(&db);
    let seeds = config.seed_accounts();
    let registry = std::sync::Arc::new(dealflow::application::AccountRegistry::new());
    let maintenance = dealflow::application::AccountMaintenance::new(
        std::sync::Arc::clone(&registry),
        dealflow::port::ConnectorRegistry::new(),
        std::sync::Arc::clone(&store),
        testkit::notifier::RecordingNotifier::new().registry(),
    );
    assert_eq!(maintenance.restore(seeds).await.unwrap(), 2);

    let advertiser = registry.require(&AccountId::new(ADVERTISER)).unwrap();
    assert_eq!(advertiser.status, AccountStatus::Inactive);
    assert_eq!(advertiser.last_error.as_deref(), Some("captcha"));
    assert!(advertiser.last_login.is_none());
    assert_eq!(store.list_accounts().await.unwrap().len(), 2);
}

#[tokio::test]
async fn purge_removes_old_terminal_rows_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("dealflow.db");
    let t0 = Utc::now();
    let h = TestEngine::with_config(testkit::config::sqlite(&db)).await;

    let cancelled = h.ingest("GATE-320", dec!(1), t0).await;
    let open = h.ingest("GATE-321", dec!(2000), t0).await;

    let report = h
        .engine
        .lifecycle
        .purge_expired(t0 + Duration::days(31))
        .await
        .unwrap();
    assert_eq!(report.transactions, 1);

    let store = h.engine.lifecycle.store();
    assert!(store.get(&cancelled).await.unwrap().is_none());
    assert!(store.get(&open).await.unwrap().is_some());
    assert_eq!(store.list_transactions().await.unwrap().len(), 1);
}
