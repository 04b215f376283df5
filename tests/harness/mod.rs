#![allow(dead_code)]

//! An engine wired to two paper exchanges and a recording notifier.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dealflow::adapter::outbound::paper::PaperExchange;
use dealflow::domain::{
    Account, AccountId, ExchangeKind, ExternalId, NegotiationSession, OrderId, Transaction,
    TransactionId, TransactionStatus,
};
use dealflow::infrastructure::bootstrap;
use dealflow::infrastructure::config::settings::Config;
use dealflow::infrastructure::orchestration::{loops, Engine};
use dealflow::port::{ExchangeConnector, SessionStore, Store, TransactionStore};
use dealflow::testkit;
use dealflow::testkit::notifier::RecordingNotifier;
use rust_decimal::Decimal;
use tokio::sync::watch;

pub const SOURCE: &str = "gate-1";
pub const ADVERTISER: &str = "bybit-1";

/// The three answers that take a negotiation to payment details.
pub const AGREE: [&str; 3] = ["да", "да", "подтверждаю"];

pub struct TestEngine {
    pub engine: Arc<Engine>,
    pub gate: Arc<PaperExchange>,
    pub bybit: Arc<PaperExchange>,
    pub events: RecordingNotifier,
    pub shutdown: watch::Sender<bool>,
}

impl TestEngine {
    /// Memory-backed engine with every account logged in.
    pub async fn start() -> Self {
        Self::with_config(testkit::config::engine()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let store = bootstrap::build_store(&config).expect("open store");
        Self::with_store(config, store).await
    }

    pub async fn with_store(config: Config, store: Arc<dyn Store>) -> Self {
        let gate = Arc::new(PaperExchange::new(ExchangeKind::Gate));
        let bybit = Arc::new(PaperExchange::new(ExchangeKind::Bybit));
        Self::assemble(config, store, gate, bybit).await
    }

    /// Stop this engine and build a new one over the same exchanges, as a
    /// process restart would see them.
    pub async fn restart(self, config: Config) -> Self {
        let gate = Arc::clone(&self.gate);
        let bybit = Arc::clone(&self.bybit);
        let _ = self.shutdown.send(true);
        drop(self);
        let store = bootstrap::build_store(&config).expect("reopen store");
        Self::assemble(config, store, gate, bybit).await
    }

    async fn assemble(
        config: Config,
        store: Arc<dyn Store>,
        gate: Arc<PaperExchange>,
        bybit: Arc<PaperExchange>,
    ) -> Self {
        let events = RecordingNotifier::new();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let engine = bootstrap::build_engine(
            &config,
            store,
            vec![
                Arc::clone(&gate) as Arc<dyn ExchangeConnector>,
                Arc::clone(&bybit) as Arc<dyn ExchangeConnector>,
            ],
            events.registry(),
            shutdown_rx,
        )
        .await
        .expect("build engine");
        loops::login_all(&engine).await;

        Self {
            engine,
            gate,
            bybit,
            events,
            shutdown,
        }
    }

    pub fn account(&self, id: &str) -> Account {
        self.engine
            .accounts
            .require(&AccountId::new(id))
            .expect("registered account")
    }

    /// Publish a request on the source exchange and run discovery once.
    pub async fn ingest(&self, external_id: &str, amount: Decimal, now: DateTime<Utc>) -> TransactionId {
        self.gate.push_pending(
            &AccountId::new(SOURCE),
            testkit::domain::external(external_id, amount),
        );
        self.engine
            .lifecycle
            .discover(&self.account(SOURCE), now)
            .await
            .expect("discover");
        self.engine
            .lifecycle
            .store()
            .find_by_external_id(&ExternalId::new(external_id))
            .await
            .expect("lookup")
            .expect("ingested")
            .id
    }

    pub async fn process(&self, id: &TransactionId, now: DateTime<Utc>) {
        self.engine
            .lifecycle
            .process(id, now)
            .await
            .expect("process step");
    }

    /// Ingest and advertise. The transaction ends up `WAITING_RESPONSE`.
    pub async fn advertised(&self, external_id: &str, amount: Decimal, now: DateTime<Utc>) -> TransactionId {
        let id = self.ingest(external_id, amount, now).await;
        self.process(&id, now).await;
        assert_eq!(self.status(&id).await, TransactionStatus::WaitingResponse);
        id
    }

    /// A counterparty takes the advertisement and the engine notices.
    pub async fn open_order(&self, id: &TransactionId, now: DateTime<Utc>) -> OrderId {
        let ad_id = self.tx(id).await.ad_id.expect("advertised");
        let order_id = self.bybit.open_order(&ad_id, "buyer-1").expect("open order");
        self.poll_orders(now).await;
        order_id
    }

    /// Poll the advertising account and apply every update.
    pub async fn poll_orders(&self, now: DateTime<Utc>) {
        let updates = self
            .engine
            .lifecycle
            .poll_orders(&self.account(ADVERTISER), now)
            .await
            .expect("poll orders");
        for (id, update) in updates {
            self.engine
                .lifecycle
                .apply_order_update(&id, &update, now)
                .await
                .expect("apply order update");
        }
    }

    /// The counterparty answers, then the engine reads the chat.
    pub async fn answer(&self, id: &TransactionId, order_id: &OrderId, texts: &[&str], now: DateTime<Utc>) {
        for text in texts {
            self.bybit.counterparty_says(order_id, text);
        }
        self.process(id, now).await;
    }

    /// Drive a fresh request all the way to `WAITING_PAYMENT`.
    pub async fn awaiting_payment(
        &self,
        external_id: &str,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> (TransactionId, OrderId) {
        let id = self.advertised(external_id, amount, now).await;
        let order_id = self.open_order(&id, now).await;
        self.answer(&id, &order_id, &AGREE, now).await;
        assert_eq!(self.status(&id).await, TransactionStatus::WaitingPayment);
        (id, order_id)
    }

    pub async fn tx(&self, id: &TransactionId) -> Transaction {
        self.engine.lifecycle.get(id).await.expect("transaction")
    }

    pub async fn status(&self, id: &TransactionId) -> TransactionStatus {
        self.tx(id).await.status()
    }

    pub async fn session(&self, id: &TransactionId) -> NegotiationSession {
        self.engine
            .lifecycle
            .store()
            .get_session(id)
            .await
            .expect("session lookup")
            .expect("session exists")
    }

    pub fn active_ads(&self) -> u32 {
        self.account(ADVERTISER).usage.active_ads
    }
}
