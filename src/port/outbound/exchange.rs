//! Exchange connector port.
//!
//! One connector exists per [`ExchangeKind`]. Every call receives the
//! account it acts for, so a single connector serves all accounts of its
//! kind. Calls fail with [`ConnectorError`], whose variant tells the caller
//! whether to retry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{
    Account, AdId, ExchangeKind, ExternalId, OrderId, PaymentContact, Transaction, TransactionId,
};
use crate::error::ConnectorError;

/// A pending payment request as reported by a source exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTransaction {
    pub external_id: ExternalId,
    pub amount: Decimal,
    pub currency: String,
    pub asset: String,
    pub price: Option<Decimal>,
    pub counterparty_id: Option<String>,
    pub contact: PaymentContact,
}

impl ExternalTransaction {
    /// A RUB to USDT request without counterparty details.
    pub fn new(external_id: impl Into<ExternalId>, amount: Decimal) -> Self {
        Self {
            external_id: external_id.into(),
            amount,
            currency: "RUB".to_string(),
            asset: "USDT".to_string(),
            price: None,
            counterparty_id: None,
            contact: PaymentContact::default(),
        }
    }

    #[must_use]
    pub fn with_contact(mut self, contact: PaymentContact) -> Self {
        self.contact = contact;
        self
    }
}

/// Parameters of an advertisement published for one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisementParams {
    pub transaction_id: TransactionId,
    pub amount: Decimal,
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub price: Option<Decimal>,
    pub currency: String,
    pub asset: String,
    pub payment_method_ids: Vec<String>,
    pub remarks: String,
}

impl AdvertisementParams {
    /// Build ad parameters sized to `tx`.
    ///
    /// The order window runs from 10% of the amount (but never below
    /// `floor`) up to the full amount.
    #[must_use]
    pub fn for_transaction(
        tx: &Transaction,
        floor: Decimal,
        payment_method_ids: &[String],
        remarks: &str,
    ) -> Self {
        let tenth = tx.amount / Decimal::TEN;
        let min_amount = tenth.max(floor).min(tx.amount);
        Self {
            transaction_id: tx.id,
            amount: tx.amount,
            min_amount,
            max_amount: tx.amount,
            price: tx.price,
            currency: tx.currency.clone(),
            asset: tx.asset.clone(),
            payment_method_ids: payment_method_ids.to_vec(),
            remarks: remarks.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    /// Counterparty opened an order on the ad and is talking to us.
    Open,
    /// Counterparty marked the order as paid.
    Paid,
    Cancelled,
}

/// An order placed by a counterparty on one of our advertisements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderUpdate {
    pub order_id: OrderId,
    pub ad_id: AdId,
    pub counterparty_id: Option<String>,
    pub status: OrderStatus,
}

/// A message in an order chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    /// Written by the counterparty rather than by us.
    pub from_counterparty: bool,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

#[async_trait]
pub trait ExchangeConnector: Send + Sync {
    fn kind(&self) -> ExchangeKind;

    /// Establish or refresh the account session.
    async fn login(&self, account: &Account) -> Result<(), ConnectorError>;

    async fn fetch_balance(&self, account: &Account) -> Result<Decimal, ConnectorError>;

    async fn list_pending_transactions(
        &self,
        account: &Account,
    ) -> Result<Vec<ExternalTransaction>, ConnectorError>;

    async fn accept_transaction(
        &self,
        account: &Account,
        external_id: &ExternalId,
    ) -> Result<bool, ConnectorError>;

    async fn create_advertisement(
        &self,
        account: &Account,
        params: &AdvertisementParams,
    ) -> Result<AdId, ConnectorError>;

    /// Orders counterparties placed on this account's advertisements.
    async fn list_orders(&self, account: &Account) -> Result<Vec<OrderUpdate>, ConnectorError>;

    /// Full chat of an order, oldest first.
    async fn list_chat_messages(
        &self,
        account: &Account,
        order_id: &OrderId,
    ) -> Result<Vec<ChatMessage>, ConnectorError>;

    async fn send_chat_message(
        &self,
        account: &Account,
        order_id: &OrderId,
        text: &str,
    ) -> Result<bool, ConnectorError>;

    async fn release_funds(
        &self,
        account: &Account,
        order_id: &OrderId,
    ) -> Result<bool, ConnectorError>;
}

/// Connectors keyed by exchange kind.
#[derive(Default, Clone)]
pub struct ConnectorRegistry {
    connectors: HashMap<ExchangeKind, Arc<dyn ExchangeConnector>>,
}

impl ConnectorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connector under its own kind, replacing any previous one.
    pub fn register(&mut self, connector: Arc<dyn ExchangeConnector>) {
        self.connectors.insert(connector.kind(), connector);
    }

    /// Connector for `kind`.
    ///
    /// # Errors
    ///
    /// Returns a permanent connector error when no connector is configured.
    pub fn get(&self, kind: ExchangeKind) -> Result<Arc<dyn ExchangeConnector>, ConnectorError> {
        self.connectors
            .get(&kind)
            .cloned()
            .ok_or_else(|| ConnectorError::Permanent(format!("no connector for {kind}")))
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<ExchangeKind> {
        let mut kinds: Vec<_> = self.connectors.keys().copied().collect();
        kinds.sort();
        kinds
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}
