//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!     ┌──────────────┤  Domain + Port          ├──────────────┐
//!     │              └─────────────────────────┘              │
//!     ▼                         ▼                             ▼
//! ┌─────────┐            ┌─────────────┐              ┌───────────┐
//! │Exchange │            │   Store     │              │ Notifier  │
//! │ Adapter │            │   Adapter   │              │  Adapter  │
//! └─────────┘            └─────────────┘              └───────────┘
//! ```

pub mod inbound;
pub mod outbound;

pub use inbound::admin::{AdminPort, RuntimeStatus, Statistics};
pub use outbound::exchange::{
    AdvertisementParams, ChatMessage, ConnectorRegistry, ExchangeConnector, ExternalTransaction,
    OrderStatus, OrderUpdate,
};
pub use outbound::notifier::{Event, LogNotifier, Notifier, NotifierRegistry, NullNotifier};
pub use outbound::receipt::ReceiptSource;
pub use outbound::store::{AccountStore, ReceiptStore, SessionStore, Store, TransactionStore};
