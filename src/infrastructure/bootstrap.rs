//! Composition root: turns a [`Config`] into a wired [`Engine`].

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::adapter::inbound::receipt::SpoolReceiptSource;
use crate::adapter::outbound::memory::MemoryStore;
#[cfg(feature = "telegram")]
use crate::adapter::outbound::notifier::telegram::notifier::{TelegramConfig, TelegramNotifier};
use crate::adapter::outbound::paper::PaperExchange;
use crate::adapter::outbound::sqlite::database::connection::{create_pool, run_migrations};
use crate::adapter::outbound::sqlite::SqliteStore;
use crate::application::negotiation::{KeywordClassifier, PaymentAlternator};
use crate::application::{
    AccountMaintenance, AccountRegistry, AdminService, NegotiationStateMachine,
    TransactionLifecycle, WorkerPool,
};
use crate::domain::ExchangeKind;
use crate::error::Result;
use crate::infrastructure::config::database::DatabaseBackend;
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::exchange::{RateLimitedConnector, RateLimiter};
use crate::infrastructure::orchestration::Engine;
use crate::port::outbound::notifier::{LogNotifier, NotifierRegistry};
use crate::port::{ConnectorRegistry, ExchangeConnector, ReceiptSource, Store};

/// A wired engine plus the inbound collaborators that feed it.
pub struct Runtime {
    pub engine: Arc<Engine>,
    /// `None` when no spool directory is configured.
    pub receipts: Option<Box<dyn ReceiptSource>>,
    /// Credentials for the admin bot, when enabled and present.
    #[cfg(feature = "telegram")]
    pub telegram: Option<TelegramConfig>,
}

/// Build the runtime against the in-process paper exchange.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or restored.
pub async fn build(config: &Config, shutdown: watch::Receiver<bool>) -> Result<Runtime> {
    if !config.dry_run {
        warn!("No live exchange connectors are linked in, using the paper exchange");
    }
    let connectors = ExchangeKind::ALL
        .into_iter()
        .map(|kind| Arc::new(PaperExchange::new(kind)) as Arc<dyn ExchangeConnector>)
        .collect();
    build_with_connectors(config, connectors, shutdown).await
}

/// Build the runtime around caller-supplied connectors.
///
/// Every connector is wrapped with the shared per-account rate limiter.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or restored.
pub async fn build_with_connectors(
    config: &Config,
    connectors: Vec<Arc<dyn ExchangeConnector>>,
    shutdown: watch::Receiver<bool>,
) -> Result<Runtime> {
    let store = build_store(config)?;

    #[cfg(feature = "telegram")]
    let (notifiers, telegram) = build_notifier_registry(config);
    #[cfg(not(feature = "telegram"))]
    let notifiers = build_notifier_registry(config);

    let engine = build_engine(config, store, connectors, Arc::new(notifiers), shutdown).await?;
    let receipts = build_receipt_source(config)?;

    Ok(Runtime {
        engine,
        receipts,
        #[cfg(feature = "telegram")]
        telegram,
    })
}

/// Wire services over an existing store and notifier registry, restore the
/// seed accounts and resume open work from the store.
///
/// # Errors
///
/// Returns an error if the payment methods are invalid or the store fails.
pub async fn build_engine(
    config: &Config,
    store: Arc<dyn Store>,
    connectors: Vec<Arc<dyn ExchangeConnector>>,
    notifiers: Arc<NotifierRegistry>,
    shutdown: watch::Receiver<bool>,
) -> Result<Arc<Engine>> {
    let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
    let mut registry = ConnectorRegistry::new();
    for connector in connectors {
        registry.register(Arc::new(RateLimitedConnector::new(
            connector,
            Arc::clone(&limiter),
        )));
    }
    info!(exchanges = ?registry.kinds(), "Exchange connectors registered");

    let negotiation = NegotiationStateMachine::new(
        Box::new(KeywordClassifier::default()),
        PaymentAlternator::new(config.negotiation.methods())?,
        config.negotiation_settings(),
    );
    let accounts = Arc::new(AccountRegistry::new());
    let lifecycle = Arc::new(TransactionLifecycle::new(
        Arc::clone(&store),
        Arc::clone(&accounts),
        registry.clone(),
        negotiation,
        config.receipts.matcher(),
        Arc::clone(&notifiers),
        config.lifecycle_settings(),
    ));
    let maintenance = Arc::new(AccountMaintenance::new(
        Arc::clone(&accounts),
        registry,
        store,
        notifiers,
    ));

    let restored = maintenance.restore(config.seed_accounts()).await?;
    let open = lifecycle.resume().await?;
    info!(accounts = restored, open_transactions = open, "Engine state restored");

    let pool = WorkerPool::new(config.workers.pool_size, shutdown);
    let admin = Arc::new(AdminService::new(
        Arc::clone(&lifecycle),
        Arc::clone(&maintenance),
        pool.clone(),
        Utc::now(),
    ));

    Ok(Arc::new(Engine {
        lifecycle,
        maintenance,
        accounts,
        admin,
        pool,
        schedule: config.schedule.clone(),
        retry: config.retry.clone(),
        session_max_age: config.session_max_age(),
        balance_max_age: config.balance_max_age(),
    }))
}

/// Open the configured store. SQLite databases are migrated on open.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or migrated.
pub fn build_store(config: &Config) -> Result<Arc<dyn Store>> {
    match config.database.backend {
        DatabaseBackend::Sqlite => {
            let pool = create_pool(&format!("sqlite://{}", config.database.path))?;
            run_migrations(&pool)?;
            info!(path = %config.database.path, "SQLite store ready");
            Ok(Arc::new(SqliteStore::new(pool)))
        }
        DatabaseBackend::Memory => {
            warn!("Using the in-memory store, nothing survives a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn build_receipt_source(config: &Config) -> Result<Option<Box<dyn ReceiptSource>>> {
    let Some(dir) = &config.receipts.spool_dir else {
        info!("Receipt spool disabled");
        return Ok(None);
    };
    let source = SpoolReceiptSource::open(dir, config.receipts.poll_interval())?;
    Ok(Some(Box::new(source)))
}

/// Build notifier registry from configuration.
///
/// Also returns the Telegram credentials so the caller can start the admin
/// bot next to the notifier.
#[cfg(feature = "telegram")]
pub(crate) fn build_notifier_registry(
    config: &Config,
) -> (NotifierRegistry, Option<TelegramConfig>) {
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(LogNotifier));

    if !config.telegram.enabled {
        return (registry, None);
    }
    match TelegramConfig::from_env(&config.telegram) {
        Some(tg_config) => {
            registry.register(Box::new(TelegramNotifier::new(tg_config.clone())));
            info!("Telegram notifier enabled");
            (registry, Some(tg_config))
        }
        None => {
            warn!("Telegram enabled but TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID not set");
            (registry, None)
        }
    }
}

/// Build notifier registry from configuration (non-telegram variant).
#[cfg(not(feature = "telegram"))]
pub(crate) fn build_notifier_registry(config: &Config) -> NotifierRegistry {
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(LogNotifier));
    if config.telegram.enabled {
        warn!("Telegram enabled in config but the telegram feature is not compiled in");
    }
    registry
}
