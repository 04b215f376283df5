//! Paper exchange connector.
//!
//! Simulates one exchange in memory. Used for dry runs and tests: pending
//! requests and counterparty behaviour are scripted through the helper
//! methods, and everything the engine does is recorded for inspection.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::{Account, AccountId, AdId, ExchangeKind, ExternalId, OrderId};
use crate::error::ConnectorError;
use crate::port::{
    AdvertisementParams, ChatMessage, ExchangeConnector, ExternalTransaction, OrderStatus,
    OrderUpdate,
};

/// Connector operations that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaperOp {
    Login,
    FetchBalance,
    ListPending,
    Accept,
    CreateAd,
    ListOrders,
    ListChat,
    SendChat,
    Release,
}

/// An advertisement published on the paper exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperAd {
    pub ad_id: AdId,
    pub account_id: AccountId,
    pub params: AdvertisementParams,
}

#[derive(Debug, Default)]
struct PaperState {
    balances: HashMap<AccountId, Decimal>,
    pending: HashMap<AccountId, Vec<ExternalTransaction>>,
    accepted: Vec<ExternalId>,
    ads: Vec<PaperAd>,
    orders: Vec<(AccountId, OrderUpdate)>,
    chats: HashMap<OrderId, Vec<ChatMessage>>,
    released: Vec<OrderId>,
    logins: HashMap<AccountId, usize>,
    failures: HashMap<PaperOp, VecDeque<ConnectorError>>,
    next_id: u64,
}

impl PaperState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn take_failure(&mut self, op: PaperOp) -> Result<(), ConnectorError> {
        match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn push_chat(&mut self, order_id: &OrderId, from_counterparty: bool, text: &str) {
        let id = self.next_id("msg");
        self.chats
            .entry(order_id.clone())
            .or_default()
            .push(ChatMessage {
                id,
                from_counterparty,
                text: text.to_string(),
                sent_at: Utc::now(),
            });
    }
}

/// In-memory [`ExchangeConnector`] for one exchange kind.
#[derive(Debug)]
pub struct PaperExchange {
    kind: ExchangeKind,
    state: Mutex<PaperState>,
}

impl PaperExchange {
    #[must_use]
    pub fn new(kind: ExchangeKind) -> Self {
        Self {
            kind,
            state: Mutex::new(PaperState::default()),
        }
    }

    /// Make `account` report a new pending request.
    pub fn push_pending(&self, account: &AccountId, transaction: ExternalTransaction) {
        self.state
            .lock()
            .pending
            .entry(account.clone())
            .or_default()
            .push(transaction);
    }

    pub fn set_balance(&self, account: &AccountId, balance: Decimal) {
        self.state.lock().balances.insert(account.clone(), balance);
    }

    /// Queue `err` for the next call of `op`. Failures queue up per operation.
    pub fn fail_next(&self, op: PaperOp, err: ConnectorError) {
        self.state
            .lock()
            .failures
            .entry(op)
            .or_default()
            .push_back(err);
    }

    /// A counterparty opens an order on `ad_id`.
    ///
    /// # Errors
    ///
    /// Returns a permanent error when the advertisement does not exist.
    pub fn open_order(&self, ad_id: &AdId, counterparty: &str) -> Result<OrderId, ConnectorError> {
        let mut state = self.state.lock();
        let account = state
            .ads
            .iter()
            .find(|ad| &ad.ad_id == ad_id)
            .map(|ad| ad.account_id.clone())
            .ok_or_else(|| ConnectorError::Permanent(format!("unknown advertisement {ad_id}")))?;
        let order_id = OrderId::new(state.next_id("order"));
        state.orders.push((
            account,
            OrderUpdate {
                order_id: order_id.clone(),
                ad_id: ad_id.clone(),
                counterparty_id: Some(counterparty.to_string()),
                status: OrderStatus::Open,
            },
        ));
        Ok(order_id)
    }

    pub fn set_order_status(&self, order_id: &OrderId, status: OrderStatus) {
        let mut state = self.state.lock();
        if let Some((_, order)) = state
            .orders
            .iter_mut()
            .find(|(_, order)| &order.order_id == order_id)
        {
            order.status = status;
        }
    }

    /// The counterparty writes `text` into the order chat.
    pub fn counterparty_says(&self, order_id: &OrderId, text: &str) {
        self.state.lock().push_chat(order_id, true, text);
    }

    /// Messages the engine sent into the order chat, oldest first.
    #[must_use]
    pub fn sent_messages(&self, order_id: &OrderId) -> Vec<String> {
        self.state
            .lock()
            .chats
            .get(order_id)
            .map(|chat| {
                chat.iter()
                    .filter(|m| !m.from_counterparty)
                    .map(|m| m.text.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn advertisements(&self) -> Vec<PaperAd> {
        self.state.lock().ads.clone()
    }

    #[must_use]
    pub fn accepted(&self) -> Vec<ExternalId> {
        self.state.lock().accepted.clone()
    }

    #[must_use]
    pub fn released(&self) -> Vec<OrderId> {
        self.state.lock().released.clone()
    }

    #[must_use]
    pub fn login_count(&self, account: &AccountId) -> usize {
        self.state.lock().logins.get(account).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ExchangeConnector for PaperExchange {
    fn kind(&self) -> ExchangeKind {
        self.kind
    }

    async fn login(&self, account: &Account) -> Result<(), ConnectorError> {
        let mut state = self.state.lock();
        state.take_failure(PaperOp::Login)?;
        *state.logins.entry(account.id.clone()).or_default() += 1;
        debug!(exchange = %self.kind, account = %account.id, "Paper login");
        Ok(())
    }

    async fn fetch_balance(&self, account: &Account) -> Result<Decimal, ConnectorError> {
        let mut state = self.state.lock();
        state.take_failure(PaperOp::FetchBalance)?;
        Ok(state
            .balances
            .get(&account.id)
            .copied()
            .unwrap_or(Decimal::ZERO))
    }

    async fn list_pending_transactions(
        &self,
        account: &Account,
    ) -> Result<Vec<ExternalTransaction>, ConnectorError> {
        let mut state = self.state.lock();
        state.take_failure(PaperOp::ListPending)?;
        Ok(state.pending.get(&account.id).cloned().unwrap_or_default())
    }

    async fn accept_transaction(
        &self,
        account: &Account,
        external_id: &ExternalId,
    ) -> Result<bool, ConnectorError> {
        let mut state = self.state.lock();
        state.take_failure(PaperOp::Accept)?;
        if let Some(pending) = state.pending.get_mut(&account.id) {
            pending.retain(|p| &p.external_id != external_id);
        }
        if !state.accepted.contains(external_id) {
            state.accepted.push(external_id.clone());
        }
        Ok(true)
    }

    async fn create_advertisement(
        &self,
        account: &Account,
        params: &AdvertisementParams,
    ) -> Result<AdId, ConnectorError> {
        let mut state = self.state.lock();
        state.take_failure(PaperOp::CreateAd)?;
        if params.amount <= Decimal::ZERO {
            return Err(ConnectorError::Permanent(format!(
                "invalid ad amount {}",
                params.amount
            )));
        }
        let ad_id = AdId::new(state.next_id("ad"));
        state.ads.push(PaperAd {
            ad_id: ad_id.clone(),
            account_id: account.id.clone(),
            params: params.clone(),
        });
        Ok(ad_id)
    }

    async fn list_orders(&self, account: &Account) -> Result<Vec<OrderUpdate>, ConnectorError> {
        let mut state = self.state.lock();
        state.take_failure(PaperOp::ListOrders)?;
        Ok(state
            .orders
            .iter()
            .filter(|(owner, _)| owner == &account.id)
            .map(|(_, order)| order.clone())
            .collect())
    }

    async fn list_chat_messages(
        &self,
        _account: &Account,
        order_id: &OrderId,
    ) -> Result<Vec<ChatMessage>, ConnectorError> {
        let mut state = self.state.lock();
        state.take_failure(PaperOp::ListChat)?;
        Ok(state.chats.get(order_id).cloned().unwrap_or_default())
    }

    async fn send_chat_message(
        &self,
        _account: &Account,
        order_id: &OrderId,
        text: &str,
    ) -> Result<bool, ConnectorError> {
        let mut state = self.state.lock();
        state.take_failure(PaperOp::SendChat)?;
        state.push_chat(order_id, false, text);
        Ok(true)
    }

    async fn release_funds(
        &self,
        _account: &Account,
        order_id: &OrderId,
    ) -> Result<bool, ConnectorError> {
        let mut state = self.state.lock();
        state.take_failure(PaperOp::Release)?;
        if !state.orders.iter().any(|(_, order)| &order.order_id == order_id) {
            return Err(ConnectorError::Permanent(format!("unknown order {order_id}")));
        }
        if !state.released.contains(order_id) {
            state.released.push(order_id.clone());
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Credentials, TransactionId};
    use rust_decimal_macros::dec;

    fn account(id: &str, kind: ExchangeKind) -> Account {
        Account::new(id, kind, Credentials::new("user", "pw"), 2)
    }

    fn params(amount: Decimal) -> AdvertisementParams {
        AdvertisementParams {
            transaction_id: TransactionId::new(),
            amount,
            min_amount: dec!(1000),
            max_amount: amount,
            price: None,
            currency: "RUB".into(),
            asset: "USDT".into(),
            payment_method_ids: vec!["75".into()],
            remarks: String::new(),
        }
    }

    #[tokio::test]
    async fn accepted_requests_leave_the_pending_list() {
        let gate = PaperExchange::new(ExchangeKind::Gate);
        let source = account("gate-1", ExchangeKind::Gate);
        gate.push_pending(&source.id, ExternalTransaction::new("GATE-1", dec!(5000)));

        assert_eq!(gate.list_pending_transactions(&source).await.unwrap().len(), 1);
        assert!(gate
            .accept_transaction(&source, &ExternalId::new("GATE-1"))
            .await
            .unwrap());
        assert!(gate.list_pending_transactions(&source).await.unwrap().is_empty());
        assert_eq!(gate.accepted(), vec![ExternalId::new("GATE-1")]);
    }

    #[tokio::test]
    async fn orders_are_visible_to_the_ad_owner_only() {
        let bybit = PaperExchange::new(ExchangeKind::Bybit);
        let owner = account("bybit-1", ExchangeKind::Bybit);
        let other = account("bybit-2", ExchangeKind::Bybit);
        let ad_id = bybit.create_advertisement(&owner, &params(dec!(5000))).await.unwrap();

        let order_id = bybit.open_order(&ad_id, "buyer-1").unwrap();
        assert_eq!(bybit.list_orders(&owner).await.unwrap().len(), 1);
        assert!(bybit.list_orders(&other).await.unwrap().is_empty());

        bybit.counterparty_says(&order_id, "да");
        bybit.send_chat_message(&owner, &order_id, "hello").await.unwrap();
        let chat = bybit.list_chat_messages(&owner, &order_id).await.unwrap();
        assert_eq!(chat.len(), 2);
        assert!(chat[0].from_counterparty);
        assert_eq!(bybit.sent_messages(&order_id), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn scripted_failures_fire_once() {
        let bybit = PaperExchange::new(ExchangeKind::Bybit);
        let owner = account("bybit-1", ExchangeKind::Bybit);
        bybit.fail_next(PaperOp::Login, ConnectorError::Authentication("expired".into()));

        assert!(bybit.login(&owner).await.unwrap_err().is_authentication());
        assert!(bybit.login(&owner).await.is_ok());
        assert_eq!(bybit.login_count(&owner.id), 1);
    }

    #[tokio::test]
    async fn releasing_an_unknown_order_is_permanent() {
        let bybit = PaperExchange::new(ExchangeKind::Bybit);
        let owner = account("bybit-1", ExchangeKind::Bybit);
        let err = bybit
            .release_funds(&owner, &OrderId::new("nope"))
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }
}
