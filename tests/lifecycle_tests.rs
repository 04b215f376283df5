mod harness;

use chrono::{Duration, Utc};
use dealflow::adapter::outbound::paper::PaperOp;
use dealflow::application::negotiation::script;
use dealflow::domain::{
    AccountId, AccountStatus, ExternalId, MatchOutcome, NegotiationState, NoMatchReason, RejectionReason,
    TransactionStatus,
};
use dealflow::error::{ConnectorError, Error};
use dealflow::port::{OrderStatus, ReceiptStore, TransactionStore};
use dealflow::testkit;
use harness::{TestEngine, ADVERTISER, AGREE, SOURCE};
use rust_decimal_macros::dec;

#[tokio::test]
async fn request_goes_from_discovery_to_release() {
    let h = TestEngine::start().await;
    let t0 = Utc::now();

    let id = h.ingest("GATE-1", dec!(5000), t0).await;
    assert_eq!(h.status(&id).await, TransactionStatus::Pending);

    h.process(&id, t0).await;
    let tx = h.tx(&id).await;
    assert_eq!(tx.status(), TransactionStatus::WaitingResponse);
    assert_eq!(tx.counterparty_account_id, Some(AccountId::new(ADVERTISER)));
    assert_eq!(h.gate.accepted(), vec![ExternalId::new("GATE-1")]);
    let ads = h.bybit.advertisements();
    assert_eq!(ads.len(), 1);
    assert_eq!(ads[0].params.amount, dec!(5000));
    assert_eq!(ads[0].params.transaction_id, id);
    assert_eq!(h.active_ads(), 1);

    let order_id = h.open_order(&id, t0).await;
    assert_eq!(h.bybit.sent_messages(&order_id), vec![script::GREETING.to_string()]);
    assert_eq!(h.tx(&id).await.order_id, Some(order_id.clone()));

    h.answer(&id, &order_id, &AGREE, t0).await;
    let tx = h.tx(&id).await;
    assert_eq!(tx.status(), TransactionStatus::WaitingPayment);
    assert_eq!(tx.payment.as_ref().map(|p| p.method.as_str()), Some("SBP"));
    let sent = h.bybit.sent_messages(&order_id);
    assert_eq!(sent.len(), 4);
    assert!(sent[3].contains(testkit::config::PAYEE_PHONE));
    assert!(sent[3].contains("5000"));
    assert_eq!(h.session(&id).await.state(), NegotiationState::PaymentDetailsSent);

    let t1 = t0 + Duration::seconds(60);
    let outcome = h
        .engine
        .lifecycle
        .process_receipt(&testkit::domain::receipt(dec!(5000), "receipts/1.pdf"), t1)
        .await
        .unwrap();
    assert!(matches!(outcome, MatchOutcome::Matched { transaction_id, .. } if transaction_id == id));
    let tx = h.tx(&id).await;
    assert_eq!(tx.status(), TransactionStatus::Approved);
    assert_eq!(tx.receipt.as_ref().map(|r| r.evidence_ref.as_str()), Some("receipts/1.pdf"));

    // Grace delay not over yet.
    assert!(!h
        .engine
        .lifecycle
        .release_if_due(&id, t1 + Duration::seconds(10))
        .await
        .unwrap());
    assert!(h.bybit.released().is_empty());

    assert!(h
        .engine
        .lifecycle
        .release_if_due(&id, t1 + Duration::seconds(30))
        .await
        .unwrap());
    assert_eq!(h.status(&id).await, TransactionStatus::Released);
    assert_eq!(h.bybit.released(), vec![order_id]);
    assert_eq!(h.active_ads(), 0);

    let names = h.events.names();
    for expected in [
        "new_transaction",
        "negotiation_completed",
        "receipt_processed",
        "release_executed",
    ] {
        assert_eq!(h.events.count(expected), 1, "{expected} in {names:?}");
    }
    assert_eq!(h.events.count("status_changed"), 6);
}

#[tokio::test]
async fn negative_answer_sends_counterparty_to_fool_pool() {
    let h = TestEngine::start().await;
    let now = Utc::now();
    let id = h.advertised("GATE-2", dec!(3000), now).await;
    let order_id = h.open_order(&id, now).await;

    h.answer(&id, &order_id, &["нет"], now).await;

    let tx = h.tx(&id).await;
    assert_eq!(tx.status(), TransactionStatus::FoolPool);
    assert_eq!(
        tx.last_error.as_deref(),
        Some(RejectionReason::NotUsingTBank.describe())
    );
    assert!(tx.payment.is_none());
    assert_eq!(
        h.bybit.sent_messages(&order_id).last().map(String::as_str),
        Some(script::REJECTION)
    );
    assert_eq!(h.events.count("counterparty_rejected"), 1);
    assert_eq!(h.active_ads(), 0);
}

#[tokio::test]
async fn denied_warning_is_rejected_without_payment_details() {
    let h = TestEngine::start().await;
    let now = Utc::now();
    let id = h.advertised("GATE-3", dec!(3000), now).await;
    let order_id = h.open_order(&id, now).await;

    h.answer(&id, &order_id, &["да", "да", "не подтверждаю"], now).await;

    assert_eq!(h.status(&id).await, TransactionStatus::FoolPool);
    let sent = h.bybit.sent_messages(&order_id);
    assert!(sent.iter().all(|m| !m.contains(testkit::config::PAYEE_PHONE)));
    assert_eq!(h.events.count("negotiation_completed"), 0);
}

#[tokio::test]
async fn unresponsive_counterparty_is_rejected_after_retries() {
    let h = TestEngine::start().await;
    let now = Utc::now();
    let id = h.advertised("GATE-4", dec!(3000), now).await;
    let order_id = h.open_order(&id, now).await;

    h.answer(&id, &order_id, &["хм", "что?", "ну", "эээ"], now).await;

    let tx = h.tx(&id).await;
    assert_eq!(tx.status(), TransactionStatus::FoolPool);
    assert_eq!(
        tx.last_error.as_deref(),
        Some(RejectionReason::Unresponsive.describe())
    );
    // Greeting, three re-asks, then the rejection.
    let sent = h.bybit.sent_messages(&order_id);
    assert_eq!(sent.len(), 5);
    assert_eq!(sent[1], script::GREETING);
}

#[tokio::test]
async fn answers_spread_over_several_polls_are_read_once() {
    let h = TestEngine::start().await;
    let now = Utc::now();
    let id = h.advertised("GATE-5", dec!(3000), now).await;
    let order_id = h.open_order(&id, now).await;

    h.answer(&id, &order_id, &["да"], now).await;
    h.process(&id, now).await;
    h.answer(&id, &order_id, &["да"], now).await;
    assert_eq!(h.status(&id).await, TransactionStatus::WaitingResponse);
    assert_eq!(h.session(&id).await.consumed_inbound(), 2);

    h.answer(&id, &order_id, &["подтверждаю"], now).await;
    assert_eq!(h.status(&id).await, TransactionStatus::WaitingPayment);
    assert_eq!(h.bybit.sent_messages(&order_id).len(), 4);
}

#[tokio::test]
async fn payment_methods_alternate_between_transactions() {
    let h = TestEngine::start().await;
    let now = Utc::now();
    let (first, _) = h.awaiting_payment("GATE-6", dec!(3000), now).await;
    let (second, _) = h.awaiting_payment("GATE-7", dec!(4000), now).await;

    assert_eq!(h.session(&first).await.payment_method(), Some("SBP"));
    assert_eq!(h.session(&second).await.payment_method(), Some("Tinkoff"));
}

#[tokio::test]
async fn unpaid_transaction_times_out_and_late_receipt_is_kept() {
    let h = TestEngine::start().await;
    let t0 = Utc::now();
    let (id, _) = h.awaiting_payment("GATE-8", dec!(5000), t0).await;

    assert!(!h
        .engine
        .lifecycle
        .expire_overdue(&id, t0 + Duration::seconds(599))
        .await
        .unwrap());
    assert_eq!(h.status(&id).await, TransactionStatus::WaitingPayment);

    assert!(h
        .engine
        .lifecycle
        .expire_overdue(&id, t0 + Duration::seconds(600))
        .await
        .unwrap());
    let tx = h.tx(&id).await;
    assert_eq!(tx.status(), TransactionStatus::FoolPool);
    assert!(tx.last_error.unwrap().contains("600"));
    assert_eq!(h.events.count("fool_pool"), 1);
    assert_eq!(h.active_ads(), 0);

    let late = testkit::domain::receipt(dec!(5000), "receipts/late.pdf");
    let outcome = h
        .engine
        .lifecycle
        .process_receipt(&late, t0 + Duration::seconds(700))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        MatchOutcome::NoMatch {
            reason: NoMatchReason::NoAmountMatch
        }
    );
    assert_eq!(h.status(&id).await, TransactionStatus::FoolPool);
    let retained = h.engine.lifecycle.store().list_retained_receipts().await.unwrap();
    assert_eq!(retained.len(), 1);
    assert_eq!(retained[0].0.evidence_ref, "receipts/late.pdf");
    assert_eq!(h.events.count("receipt_unmatched"), 1);
}

#[tokio::test]
async fn unsuccessful_receipt_rejects_the_transaction() {
    let h = TestEngine::start().await;
    let now = Utc::now();
    let (id, order_id) = h.awaiting_payment("GATE-9", dec!(5000), now).await;

    let mut receipt = testkit::domain::receipt(dec!(5000), "receipts/failed.pdf");
    receipt.success = false;
    h.engine.lifecycle.process_receipt(&receipt, now).await.unwrap();

    let tx = h.tx(&id).await;
    assert_eq!(tx.status(), TransactionStatus::Rejected);
    assert!(tx.last_error.unwrap().contains("successful transfer"));
    assert!(!h
        .engine
        .lifecycle
        .release_if_due(&id, now + Duration::hours(1))
        .await
        .unwrap());
    assert!(!h.bybit.released().contains(&order_id));
}

#[tokio::test]
async fn receipt_matching_amount_only_is_never_applied() {
    let h = TestEngine::start().await;
    let now = Utc::now();
    let (id, _) = h.awaiting_payment("GATE-10", dec!(5000), now).await;

    let mut stranger = testkit::domain::receipt(dec!(5000), "receipts/stranger.pdf");
    stranger.last_four_digits = Some("0000".into());
    let outcome = h.engine.lifecycle.process_receipt(&stranger, now).await.unwrap();
    assert_eq!(
        outcome,
        MatchOutcome::NoMatch {
            reason: NoMatchReason::NoContactMatch
        }
    );

    let mut wrong_bank = testkit::domain::receipt(dec!(5000), "receipts/sber.pdf");
    wrong_bank.bank = Some("Сбербанк".into());
    let outcome = h.engine.lifecycle.process_receipt(&wrong_bank, now).await.unwrap();
    assert_eq!(
        outcome,
        MatchOutcome::NoMatch {
            reason: NoMatchReason::BankMismatch
        }
    );

    assert_eq!(h.status(&id).await, TransactionStatus::WaitingPayment);
    assert_eq!(
        h.engine.lifecycle.store().list_retained_receipts().await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn incomplete_receipt_is_retained_for_review() {
    let h = TestEngine::start().await;
    let now = Utc::now();
    let (id, _) = h.awaiting_payment("GATE-11", dec!(5000), now).await;

    let mut blurry = testkit::domain::receipt(dec!(5000), "receipts/blurry.jpg");
    blurry.amount = None;
    let err = h.engine.lifecycle.process_receipt(&blurry, now).await.unwrap_err();
    assert!(matches!(err, Error::ExtractionIncomplete { field: "amount" }));

    assert_eq!(h.status(&id).await, TransactionStatus::WaitingPayment);
    let retained = h.engine.lifecycle.store().list_retained_receipts().await.unwrap();
    assert_eq!(retained.len(), 1);
    assert!(retained[0].1.contains("amount"));
}

#[tokio::test]
async fn second_receipt_for_the_same_transaction_is_ignored() {
    let h = TestEngine::start().await;
    let now = Utc::now();
    let (id, _) = h.awaiting_payment("GATE-12", dec!(5000), now).await;

    let receipt = testkit::domain::receipt(dec!(5000), "receipts/a.pdf");
    h.engine.lifecycle.process_receipt(&receipt, now).await.unwrap();
    assert_eq!(h.status(&id).await, TransactionStatus::Approved);

    let again = testkit::domain::receipt(dec!(5000), "receipts/b.pdf");
    let outcome = h.engine.lifecycle.process_receipt(&again, now).await.unwrap();
    assert!(matches!(outcome, MatchOutcome::NoMatch { .. }));
    let tx = h.tx(&id).await;
    assert_eq!(tx.status(), TransactionStatus::Approved);
    assert_eq!(tx.receipt.unwrap().evidence_ref, "receipts/a.pdf");
}

#[tokio::test]
async fn duplicate_requests_are_ingested_once() {
    let h = TestEngine::start().await;
    let now = Utc::now();
    let source = h.account(SOURCE);
    h.gate.push_pending(&source.id, testkit::domain::external("GATE-20", dec!(2500)));
    h.gate.push_pending(&source.id, testkit::domain::external("GATE-20", dec!(2500)));

    let created = h.engine.lifecycle.discover(&source, now).await.unwrap();
    assert_eq!(created.len(), 1);
    let again = h.engine.lifecycle.discover(&source, now).await.unwrap();
    assert!(again.is_empty());

    let all = h.engine.lifecycle.store().list_transactions().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(h.events.count("new_transaction"), 1);
}

#[tokio::test]
async fn out_of_range_amounts_are_cancelled_on_ingest() {
    let h = TestEngine::start().await;
    let now = Utc::now();

    let small = h.ingest("GATE-21", dec!(999), now).await;
    let large = h.ingest("GATE-22", dec!(50001), now).await;
    for id in [small, large] {
        let tx = h.tx(&id).await;
        assert_eq!(tx.status(), TransactionStatus::Cancelled);
        assert!(tx.last_error.unwrap().contains("outside order limits"));
        h.process(&id, now).await;
    }
    assert!(h.bybit.advertisements().is_empty());
    assert!(h.gate.accepted().is_empty());
}

#[tokio::test]
async fn missing_capacity_keeps_requests_pending() {
    let h = TestEngine::start().await;
    let now = Utc::now();
    let first = h.advertised("GATE-30", dec!(2000), now).await;
    let _second = h.advertised("GATE-31", dec!(2000), now).await;
    assert_eq!(h.active_ads(), 2);

    let third = h.ingest("GATE-32", dec!(2000), now).await;
    h.process(&third, now).await;
    assert_eq!(h.status(&third).await, TransactionStatus::Pending);
    assert!(!h.gate.accepted().contains(&ExternalId::new("GATE-32")));

    // The counterparty walks away from the first advertisement.
    let order_id = h.open_order(&first, now).await;
    h.bybit.set_order_status(&order_id, OrderStatus::Cancelled);
    h.poll_orders(now).await;
    assert_eq!(h.status(&first).await, TransactionStatus::Cancelled);
    assert_eq!(h.active_ads(), 1);

    h.process(&third, now).await;
    assert_eq!(h.status(&third).await, TransactionStatus::WaitingResponse);
    assert_eq!(h.active_ads(), 2);
}

#[tokio::test]
async fn terminal_transactions_do_not_move() {
    let h = TestEngine::start().await;
    let now = Utc::now();
    let id = h.advertised("GATE-40", dec!(2000), now).await;
    let order_id = h.open_order(&id, now).await;
    h.answer(&id, &order_id, &["нет"], now).await;
    assert_eq!(h.status(&id).await, TransactionStatus::FoolPool);
    h.events.clear();

    assert!(h.engine.lifecycle.approve_manual(&id, now).await.is_err());
    assert!(h
        .engine
        .lifecycle
        .reject_manual(&id, "late", now)
        .await
        .is_err());
    h.bybit.set_order_status(&order_id, OrderStatus::Cancelled);
    h.poll_orders(now).await;
    h.answer(&id, &order_id, &AGREE, now).await;
    assert!(!h
        .engine
        .lifecycle
        .expire_overdue(&id, now + Duration::hours(1))
        .await
        .unwrap());

    assert_eq!(h.status(&id).await, TransactionStatus::FoolPool);
    assert_eq!(h.events.count("status_changed"), 0);
}

#[tokio::test]
async fn operator_can_approve_and_reject() {
    let h = TestEngine::start().await;
    let now = Utc::now();
    let (approved, _) = h.awaiting_payment("GATE-50", dec!(2000), now).await;
    let tx = h.engine.lifecycle.approve_manual(&approved, now).await.unwrap();
    assert_eq!(tx.status(), TransactionStatus::Approved);

    let (rejected, _) = h.awaiting_payment("GATE-51", dec!(2000), now).await;
    let tx = h
        .engine
        .lifecycle
        .reject_manual(&rejected, "fake receipt", now)
        .await
        .unwrap();
    assert_eq!(tx.status(), TransactionStatus::Rejected);
    assert!(tx.last_error.unwrap().contains("fake receipt"));

    let pending = h.ingest("GATE-52", dec!(2000), now).await;
    assert!(h.engine.lifecycle.approve_manual(&pending, now).await.is_err());
    let tx = h
        .engine
        .lifecycle
        .reject_manual(&pending, "duplicate", now)
        .await
        .unwrap();
    assert_eq!(tx.status(), TransactionStatus::Cancelled);
}

#[tokio::test]
async fn permanent_ad_failure_moves_to_error() {
    let h = TestEngine::start().await;
    let now = Utc::now();
    h.bybit.fail_next(
        PaperOp::CreateAd,
        ConnectorError::Permanent("ad rejected by moderation".into()),
    );
    let id = h.ingest("GATE-60", dec!(2000), now).await;
    h.process(&id, now).await;

    let tx = h.tx(&id).await;
    assert_eq!(tx.status(), TransactionStatus::Error);
    assert_eq!(tx.last_error.as_deref(), Some("ad rejected by moderation"));
    assert_eq!(h.events.count("transaction_failed"), 1);
    assert_eq!(h.active_ads(), 0);
}

#[tokio::test]
async fn transient_failure_is_retried_on_the_next_step() {
    let h = TestEngine::start().await;
    let now = Utc::now();
    h.gate
        .fail_next(PaperOp::Accept, ConnectorError::Transient("timeout".into()));
    let id = h.ingest("GATE-61", dec!(2000), now).await;

    let err = h.engine.lifecycle.process(&id, now).await.unwrap_err();
    assert!(err.as_connector().is_some_and(ConnectorError::is_retryable));
    assert_eq!(h.status(&id).await, TransactionStatus::Processing);
    assert_eq!(h.active_ads(), 1);

    h.process(&id, now).await;
    assert_eq!(h.status(&id).await, TransactionStatus::WaitingResponse);
    assert_eq!(h.active_ads(), 1);
}

#[tokio::test]
async fn rejected_session_marks_the_account_and_keeps_the_transaction() {
    let h = TestEngine::start().await;
    let now = Utc::now();
    let id = h.ingest("GATE-62", dec!(2000), now).await;
    h.events.clear();
    h.bybit.fail_next(
        PaperOp::CreateAd,
        ConnectorError::Authentication("session expired".into()),
    );

    assert!(h.engine.lifecycle.process(&id, now).await.is_err());
    assert_eq!(h.status(&id).await, TransactionStatus::Processing);
    let advertiser = h.account(ADVERTISER);
    assert_eq!(advertiser.status, AccountStatus::Error);
    assert!(advertiser.last_error.unwrap().contains("session expired"));
    assert_eq!(h.events.count("account_status"), 1);

    h.engine
        .maintenance
        .relogin(&advertiser.id, now)
        .await
        .unwrap();
    h.process(&id, now).await;
    assert_eq!(h.status(&id).await, TransactionStatus::WaitingResponse);
}

#[tokio::test]
async fn retention_purges_only_old_terminal_records() {
    let h = TestEngine::start().await;
    let t0 = Utc::now();
    let id = h.advertised("GATE-70", dec!(2000), t0).await;
    let order_id = h.open_order(&id, t0).await;
    h.answer(&id, &order_id, &["нет"], t0).await;
    let open = h.advertised("GATE-71", dec!(2000), t0).await;

    let report = h
        .engine
        .lifecycle
        .purge_expired(t0 + Duration::days(29))
        .await
        .unwrap();
    assert_eq!(report.transactions, 0);
    assert_eq!(report.sessions, 1);

    let report = h
        .engine
        .lifecycle
        .purge_expired(t0 + Duration::days(31))
        .await
        .unwrap();
    assert_eq!(report.transactions, 1);
    assert_eq!(report.sessions, 0);
    assert!(h.engine.lifecycle.get(&id).await.is_err());
    assert_eq!(h.status(&open).await, TransactionStatus::WaitingResponse);
}
