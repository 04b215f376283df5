//! Rate-limited wrapper for any [`ExchangeConnector`].

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::limiter::RateLimiter;
use crate::domain::{Account, AdId, ExchangeKind, ExternalId, OrderId};
use crate::error::ConnectorError;
use crate::port::{AdvertisementParams, ChatMessage, ExchangeConnector, ExternalTransaction, OrderUpdate};

/// Charges every call against the calling account's budget before
/// forwarding it.
pub struct RateLimitedConnector {
    inner: Arc<dyn ExchangeConnector>,
    limiter: Arc<RateLimiter>,
}

impl RateLimitedConnector {
    pub fn new(inner: Arc<dyn ExchangeConnector>, limiter: Arc<RateLimiter>) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl ExchangeConnector for RateLimitedConnector {
    fn kind(&self) -> ExchangeKind {
        self.inner.kind()
    }

    async fn login(&self, account: &Account) -> Result<(), ConnectorError> {
        self.limiter.acquire(&account.id).await;
        self.inner.login(account).await
    }

    async fn fetch_balance(&self, account: &Account) -> Result<Decimal, ConnectorError> {
        self.limiter.acquire(&account.id).await;
        self.inner.fetch_balance(account).await
    }

    async fn list_pending_transactions(
        &self,
        account: &Account,
    ) -> Result<Vec<ExternalTransaction>, ConnectorError> {
        self.limiter.acquire(&account.id).await;
        self.inner.list_pending_transactions(account).await
    }

    async fn accept_transaction(
        &self,
        account: &Account,
        external_id: &ExternalId,
    ) -> Result<bool, ConnectorError> {
        self.limiter.acquire(&account.id).await;
        self.inner.accept_transaction(account, external_id).await
    }

    async fn create_advertisement(
        &self,
        account: &Account,
        params: &AdvertisementParams,
    ) -> Result<AdId, ConnectorError> {
        self.limiter.acquire(&account.id).await;
        self.inner.create_advertisement(account, params).await
    }

    async fn list_orders(&self, account: &Account) -> Result<Vec<OrderUpdate>, ConnectorError> {
        self.limiter.acquire(&account.id).await;
        self.inner.list_orders(account).await
    }

    async fn list_chat_messages(
        &self,
        account: &Account,
        order_id: &OrderId,
    ) -> Result<Vec<ChatMessage>, ConnectorError> {
        self.limiter.acquire(&account.id).await;
        self.inner.list_chat_messages(account, order_id).await
    }

    async fn send_chat_message(
        &self,
        account: &Account,
        order_id: &OrderId,
        text: &str,
    ) -> Result<bool, ConnectorError> {
        self.limiter.acquire(&account.id).await;
        self.inner.send_chat_message(account, order_id, text).await
    }

    async fn release_funds(
        &self,
        account: &Account,
        order_id: &OrderId,
    ) -> Result<bool, ConnectorError> {
        self.limiter.acquire(&account.id).await;
        self.inner.release_funds(account, order_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::paper::PaperExchange;
    use crate::domain::Credentials;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn calls_beyond_budget_wait_for_a_free_cell() {
        let paper = Arc::new(PaperExchange::new(ExchangeKind::Gate));
        let limiter = Arc::new(RateLimiter::new(2, Duration::from_millis(400)));
        let connector = RateLimitedConnector::new(paper, limiter.clone());
        let account = Account::new("gate-1", ExchangeKind::Gate, Credentials::default(), 2);

        let start = Instant::now();
        for _ in 0..3 {
            connector.list_pending_transactions(&account).await.unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(150));
        assert!(!limiter.try_acquire(&account.id));
        assert_eq!(connector.kind(), ExchangeKind::Gate);
    }
}
