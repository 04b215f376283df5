//! Transaction lifecycle service.
//!
//! Owns every status change of a [`Transaction`]. Each method performs one
//! step for one transaction and persists the result before returning, so an
//! interrupted step leaves the last committed status in the store. Callers
//! serialize steps per transaction through the worker pool.
//!
//! Connector failures are routed by kind:
//!
//! - authentication: the account is marked `error`, the transaction waits,
//! - transient: the error is returned and the step runs again next cycle,
//! - permanent: the transaction moves to `ERROR`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::application::account::AccountRegistry;
use crate::application::negotiation::NegotiationStateMachine;
use crate::application::receipt::ReceiptMatcher;
use crate::domain::{
    Account, AccountId, AccountStatus, ExchangeKind, MatchOutcome, NegotiationSession,
    NegotiationState, OrderId, Receipt, ReceiptRecord, ReceiptValidation, RejectionReason,
    SessionStats, Transaction, TransactionDraft, TransactionId, TransactionStats,
    TransactionStatus,
};
use crate::error::{ConnectorError, Error, Result};
use crate::port::outbound::notifier::{
    AccountEvent, FailureEvent, NegotiationEvent, ReceiptEvent, RejectionEvent, StatusChangeEvent,
    TransactionEvent,
};
use crate::port::{
    AdvertisementParams, ConnectorRegistry, Event, ExchangeConnector, ExternalTransaction,
    NotifierRegistry, OrderStatus, OrderUpdate, Store,
};

/// Statuses a transaction can still leave.
pub const OPEN_STATUSES: [TransactionStatus; 6] = [
    TransactionStatus::Pending,
    TransactionStatus::Processing,
    TransactionStatus::WaitingResponse,
    TransactionStatus::WaitingPayment,
    TransactionStatus::Validating,
    TransactionStatus::Approved,
];

#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    /// Exchange where payment requests are discovered.
    pub source_kind: ExchangeKind,
    /// Exchange where advertisements are published.
    pub advertise_on: ExchangeKind,
    pub min_order_amount: Decimal,
    pub max_order_amount: Decimal,
    /// Lower bound of an advertisement's order window.
    pub min_ad_amount: Decimal,
    pub payment_method_ids: Vec<String>,
    pub ad_remarks: String,
    pub payment_timeout: Duration,
    pub release_grace: Duration,
    pub transaction_retention: Duration,
    pub session_retention: Duration,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            source_kind: ExchangeKind::Gate,
            advertise_on: ExchangeKind::Bybit,
            min_order_amount: Decimal::ONE_THOUSAND,
            max_order_amount: Decimal::from(50_000),
            min_ad_amount: Decimal::ONE_THOUSAND,
            payment_method_ids: vec!["75".to_string(), "382".to_string()],
            ad_remarks: "Быстрая сделка. Отправьте чек на email после оплаты.".to_string(),
            payment_timeout: Duration::minutes(10),
            release_grace: Duration::seconds(30),
            transaction_retention: Duration::days(30),
            session_retention: Duration::days(7),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Created(Transaction),
    /// The external id was already known. Nothing changed.
    Duplicate,
}

/// Rows removed by a retention pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub transactions: usize,
    pub sessions: usize,
}

pub struct TransactionLifecycle {
    store: Arc<dyn Store>,
    accounts: Arc<AccountRegistry>,
    connectors: ConnectorRegistry,
    negotiation: NegotiationStateMachine,
    matcher: ReceiptMatcher,
    notifiers: Arc<NotifierRegistry>,
    settings: LifecycleSettings,
}

impl TransactionLifecycle {
    pub fn new(
        store: Arc<dyn Store>,
        accounts: Arc<AccountRegistry>,
        connectors: ConnectorRegistry,
        negotiation: NegotiationStateMachine,
        matcher: ReceiptMatcher,
        notifiers: Arc<NotifierRegistry>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            store,
            accounts,
            connectors,
            negotiation,
            matcher,
            notifiers,
            settings,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    #[must_use]
    pub fn accounts(&self) -> &Arc<AccountRegistry> {
        &self.accounts
    }

    #[must_use]
    pub const fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    #[must_use]
    pub const fn negotiation(&self) -> &NegotiationStateMachine {
        &self.negotiation
    }

    pub async fn get(&self, id: &TransactionId) -> Result<Transaction> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| Error::not_found("transaction", id))
    }

    // --- Discovery ---

    /// Poll `account` for pending requests and ingest them.
    ///
    /// Returns the ids of newly created `PENDING` transactions.
    pub async fn discover(&self, account: &Account, now: DateTime<Utc>) -> Result<Vec<TransactionId>> {
        let connector = self.connectors.get(account.kind)?;
        let pending = match connector.list_pending_transactions(account).await {
            Ok(pending) => pending,
            Err(err) => {
                self.on_account_error(&account.id, &err, now);
                return Err(err.into());
            }
        };

        let mut created = Vec::new();
        for external in pending {
            match self.ingest(account, external, now).await {
                Ok(IngestOutcome::Created(tx)) if tx.status() == TransactionStatus::Pending => {
                    created.push(tx.id);
                }
                Ok(_) => {}
                Err(Error::Domain(err)) => {
                    warn!(account = %account.id, error = %err, "Skipping malformed external transaction");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(created)
    }

    /// Record an external transaction once.
    ///
    /// Amounts outside the order limits are recorded as `CANCELLED` so
    /// they are never processed and never ingested again.
    pub async fn ingest(
        &self,
        account: &Account,
        external: ExternalTransaction,
        now: DateTime<Utc>,
    ) -> Result<IngestOutcome> {
        if self
            .store
            .find_by_external_id(&external.external_id)
            .await?
            .is_some()
        {
            return Ok(IngestOutcome::Duplicate);
        }

        let mut tx = Transaction::new(
            TransactionDraft {
                external_id: external.external_id,
                account_id: account.id.clone(),
                kind: account.kind,
                counterparty_id: external.counterparty_id,
                amount: external.amount,
                currency: external.currency,
                asset: external.asset,
                price: external.price,
                payment_contact: external.contact,
            },
            now,
        )?;

        let within_limits = (self.settings.min_order_amount..=self.settings.max_order_amount)
            .contains(&tx.amount);
        if !within_limits {
            tx.last_error = Some(format!(
                "amount {} outside order limits {}..={}",
                tx.amount, self.settings.min_order_amount, self.settings.max_order_amount
            ));
            tx.transition(TransactionStatus::Cancelled, now)?;
        }

        if !self.store.insert_if_absent(&tx).await? {
            return Ok(IngestOutcome::Duplicate);
        }

        info!(
            transaction_id = %tx.id,
            external_id = %tx.external_id,
            amount = %tx.amount,
            status = %tx.status(),
            "Transaction ingested"
        );
        self.notifiers
            .notify_all(Event::NewTransaction(TransactionEvent::from(&tx)));
        if !within_limits {
            self.notify_status(&tx, TransactionStatus::Pending);
        }
        Ok(IngestOutcome::Created(tx))
    }

    // --- Per-transaction processing ---

    /// Run the step due for the transaction's current status.
    pub async fn process(&self, id: &TransactionId, now: DateTime<Utc>) -> Result<()> {
        let mut tx = self.get(id).await?;
        match tx.status() {
            TransactionStatus::Pending | TransactionStatus::Processing => {
                self.advertise(&mut tx, now).await
            }
            TransactionStatus::WaitingResponse => self.converse(&mut tx, now).await,
            TransactionStatus::WaitingPayment => self.expire(&mut tx, now).await.map(|_| ()),
            TransactionStatus::Approved => self.release(&mut tx, now).await.map(|_| ()),
            _ => Ok(()),
        }
    }

    /// Reserve an advertising account, accept the request and publish an ad.
    ///
    /// Without free capacity the transaction stays `PENDING`.
    async fn advertise(&self, tx: &mut Transaction, now: DateTime<Utc>) -> Result<()> {
        if tx.status() == TransactionStatus::Pending {
            let Some(account) = self.accounts.reserve_ad_slot(self.settings.advertise_on) else {
                debug!(transaction_id = %tx.id, "No advertising capacity, staying pending");
                return Ok(());
            };
            tx.counterparty_account_id = Some(account.id);
            self.commit(tx, TransactionStatus::Processing, now).await?;
        }

        let Some(ad_account_id) = tx.counterparty_account_id.clone() else {
            return self
                .fail(tx, "processing transaction has no advertising account", now)
                .await;
        };
        let source = self.accounts.require(&tx.account_id)?;
        let source_connector = match self.connectors.get(source.kind) {
            Ok(connector) => connector,
            Err(err) => return self.on_connector_error(tx, &source.id, err, now).await,
        };
        match source_connector
            .accept_transaction(&source, &tx.external_id)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                warn!(transaction_id = %tx.id, "Source exchange did not accept the request yet");
                return Ok(());
            }
            Err(err) => return self.on_connector_error(tx, &source.id, err, now).await,
        }

        let ad_account = self.accounts.require(&ad_account_id)?;
        let ad_connector = match self.connectors.get(ad_account.kind) {
            Ok(connector) => connector,
            Err(err) => return self.on_connector_error(tx, &ad_account.id, err, now).await,
        };
        let params = AdvertisementParams::for_transaction(
            tx,
            self.settings.min_ad_amount,
            &self.settings.payment_method_ids,
            &self.settings.ad_remarks,
        );
        match ad_connector.create_advertisement(&ad_account, &params).await {
            Ok(ad_id) => {
                info!(transaction_id = %tx.id, ad_id = %ad_id, account = %ad_account.id, "Advertisement created");
                tx.ad_id = Some(ad_id);
                self.commit(tx, TransactionStatus::WaitingResponse, now).await
            }
            Err(err) => self.on_connector_error(tx, &ad_account.id, err, now).await,
        }
    }

    /// Poll orders on an advertising account and pair them with transactions.
    pub async fn poll_orders(
        &self,
        account: &Account,
        now: DateTime<Utc>,
    ) -> Result<Vec<(TransactionId, OrderUpdate)>> {
        let connector = self.connectors.get(account.kind)?;
        let orders = match connector.list_orders(account).await {
            Ok(orders) => orders,
            Err(err) => {
                self.on_account_error(&account.id, &err, now);
                return Err(err.into());
            }
        };
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let open = self.store.list_by_status(&OPEN_STATUSES).await?;
        let by_ad: HashMap<_, _> = open
            .iter()
            .filter(|tx| tx.counterparty_account_id.as_ref() == Some(&account.id))
            .filter_map(|tx| tx.ad_id.clone().map(|ad| (ad, tx.id)))
            .collect();
        Ok(orders
            .into_iter()
            .filter_map(|order| by_ad.get(&order.ad_id).map(|id| (*id, order)))
            .collect())
    }

    /// Attach a counterparty order to its transaction, or cancel on a
    /// cancelled order.
    pub async fn apply_order_update(
        &self,
        id: &TransactionId,
        update: &OrderUpdate,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.get(id).await?;
        if tx.is_terminal() {
            return Ok(());
        }
        let same_order = tx.order_id.as_ref().map_or(true, |o| o == &update.order_id);
        match update.status {
            OrderStatus::Cancelled if same_order => {
                tx.last_error = Some(format!("order {} cancelled by counterparty", update.order_id));
                self.commit(&mut tx, TransactionStatus::Cancelled, now).await
            }
            OrderStatus::Cancelled => Ok(()),
            OrderStatus::Open | OrderStatus::Paid => {
                if tx.status() != TransactionStatus::WaitingResponse || !same_order {
                    return Ok(());
                }
                if tx.order_id.is_none() {
                    tx.order_id = Some(update.order_id.clone());
                    if update.counterparty_id.is_some() {
                        tx.counterparty_id = update.counterparty_id.clone();
                    }
                    tx.updated_at = now;
                    self.store.save(&tx).await?;
                    if let Some(account) = &tx.counterparty_account_id {
                        if let Err(err) = self.accounts.mark_ad_interest(account) {
                            warn!(account = %account, error = %err, "Could not record ad interest");
                        }
                    }
                    info!(transaction_id = %tx.id, order_id = %update.order_id, "Counterparty responded");
                }
                // Already attached orders still need their chat read.
                self.converse(&mut tx, now).await
            }
        }
    }

    // --- Negotiation ---

    /// Advance the chat for a transaction waiting on its counterparty.
    async fn converse(&self, tx: &mut Transaction, now: DateTime<Utc>) -> Result<()> {
        let Some(order_id) = tx.order_id.clone() else {
            return Ok(());
        };
        let (account, connector) = match self.ad_side(tx) {
            Ok(side) => side,
            Err(Error::Connector(err)) => {
                let account = tx.counterparty_account_id.clone().unwrap_or_else(|| tx.account_id.clone());
                return self.on_connector_error(tx, &account, err, now).await;
            }
            Err(err) => return Err(err),
        };

        let mut session = match self.store.get_session(&tx.id).await? {
            Some(session) => session,
            None => {
                let mut session = NegotiationSession::new(tx.id, Some(order_id.clone()), now);
                session.pending_reply = self.negotiation.open(&mut session, now);
                self.store.save_session(&session).await?;
                session
            }
        };

        if !self
            .deliver_pending(tx, &mut session, &account, connector.as_ref(), &order_id, now)
            .await?
        {
            return Ok(());
        }
        if session.is_closed() {
            return self.settle(tx, &session, now).await;
        }

        let messages = match connector.list_chat_messages(&account, &order_id).await {
            Ok(messages) => messages,
            Err(err) => return self.on_connector_error(tx, &account.id, err, now).await,
        };
        let inbound: Vec<_> = messages
            .into_iter()
            .filter(|m| m.from_counterparty)
            .skip(session.consumed_inbound())
            .collect();

        for message in inbound {
            let turn = self.negotiation.handle(&mut session, tx.amount, &message.text, now);
            debug!(transaction_id = %tx.id, state = %session.state(), outcome = ?turn.outcome, "Negotiation step");
            session.pending_reply = turn.reply;
            self.store.save_session(&session).await?;

            if !self
                .deliver_pending(tx, &mut session, &account, connector.as_ref(), &order_id, now)
                .await?
            {
                return Ok(());
            }
            if session.is_closed() {
                return self.settle(tx, &session, now).await;
            }
        }
        Ok(())
    }

    /// Send the session's undelivered reply. Returns whether the chat is
    /// caught up.
    async fn deliver_pending(
        &self,
        tx: &mut Transaction,
        session: &mut NegotiationSession,
        account: &Account,
        connector: &dyn ExchangeConnector,
        order_id: &OrderId,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let Some(text) = session.pending_reply.clone() else {
            return Ok(true);
        };
        match connector.send_chat_message(account, order_id, &text).await {
            Ok(true) => {
                session.pending_reply = None;
                self.store.save_session(session).await?;
                Ok(true)
            }
            Ok(false) => {
                warn!(transaction_id = %tx.id, order_id = %order_id, "Chat message not delivered, will retry");
                Ok(false)
            }
            Err(err) => {
                self.on_connector_error(tx, &account.id, err, now).await?;
                Ok(false)
            }
        }
    }

    /// Apply a finished negotiation to its transaction.
    async fn settle(
        &self,
        tx: &mut Transaction,
        session: &NegotiationSession,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if tx.status() != TransactionStatus::WaitingResponse {
            return Ok(());
        }
        match session.state() {
            NegotiationState::PaymentDetailsSent => {
                let Some(details) = session.payment_details().cloned() else {
                    return self.fail(tx, "negotiation finished without payment details", now).await;
                };
                tx.payment = Some(details.clone());
                self.commit(tx, TransactionStatus::WaitingPayment, now).await?;
                self.notifiers
                    .notify_all(Event::NegotiationCompleted(NegotiationEvent {
                        transaction_id: tx.id,
                        external_id: tx.external_id.clone(),
                        payment_method: details.method,
                        bank: details.bank,
                    }));
                Ok(())
            }
            NegotiationState::Rejected => {
                let reason = session
                    .rejection_reason()
                    .unwrap_or(RejectionReason::Unresponsive);
                tx.last_error = Some(reason.describe().to_string());
                self.commit(tx, TransactionStatus::FoolPool, now).await?;
                self.notifiers
                    .notify_all(Event::CounterpartyRejected(RejectionEvent {
                        transaction_id: tx.id,
                        external_id: tx.external_id.clone(),
                        reason,
                    }));
                Ok(())
            }
            _ => Ok(()),
        }
    }

    // --- Timers ---

    /// Move an overdue `WAITING_PAYMENT` transaction to `FOOL_POOL`.
    ///
    /// Returns whether the transaction was moved.
    pub async fn expire_overdue(&self, id: &TransactionId, now: DateTime<Utc>) -> Result<bool> {
        let mut tx = self.get(id).await?;
        self.expire(&mut tx, now).await
    }

    async fn expire(&self, tx: &mut Transaction, now: DateTime<Utc>) -> Result<bool> {
        if !tx.payment_timed_out(self.settings.payment_timeout, now) {
            return Ok(false);
        }
        tx.last_error = Some(format!(
            "no receipt within {} seconds",
            self.settings.payment_timeout.num_seconds()
        ));
        self.commit(tx, TransactionStatus::FoolPool, now).await?;
        self.notifiers
            .notify_all(Event::PaymentTimedOut(TransactionEvent::from(&*tx)));
        Ok(true)
    }

    /// Release funds for an `APPROVED` transaction once the grace delay has
    /// passed.
    ///
    /// Returns whether the funds were released.
    pub async fn release_if_due(&self, id: &TransactionId, now: DateTime<Utc>) -> Result<bool> {
        let mut tx = self.get(id).await?;
        self.release(&mut tx, now).await
    }

    async fn release(&self, tx: &mut Transaction, now: DateTime<Utc>) -> Result<bool> {
        if !tx.release_due(self.settings.release_grace, now) {
            return Ok(false);
        }
        let Some(order_id) = tx.order_id.clone() else {
            self.fail(tx, "approved transaction has no order to release", now)
                .await?;
            return Ok(false);
        };
        let (account, connector) = match self.ad_side(tx) {
            Ok(side) => side,
            Err(Error::Connector(err)) => {
                let account = tx.account_id.clone();
                self.on_connector_error(tx, &account, err, now).await?;
                return Ok(false);
            }
            Err(err) => return Err(err),
        };
        match connector.release_funds(&account, &order_id).await {
            Ok(true) => {
                self.commit(tx, TransactionStatus::Released, now).await?;
                info!(transaction_id = %tx.id, order_id = %order_id, "Funds released");
                self.notifiers
                    .notify_all(Event::ReleaseExecuted(TransactionEvent::from(&*tx)));
                Ok(true)
            }
            Ok(false) => {
                warn!(transaction_id = %tx.id, "Release not confirmed, will retry");
                Ok(false)
            }
            Err(err) => {
                self.on_connector_error(tx, &account.id, err, now).await?;
                Ok(false)
            }
        }
    }

    // --- Receipts ---

    /// Find the transaction a receipt pays for.
    ///
    /// Unmatched and incomplete receipts are retained for manual review and
    /// broadcast as `receipt_unmatched`.
    pub async fn match_receipt(&self, receipt: &Receipt) -> Result<MatchOutcome> {
        let candidates = self
            .store
            .list_by_status(&[TransactionStatus::WaitingPayment, TransactionStatus::Validating])
            .await?;
        match self.matcher.match_receipt(receipt, &candidates) {
            Ok(MatchOutcome::NoMatch { reason }) => {
                self.retain_unmatched(receipt, reason.as_str()).await?;
                Ok(MatchOutcome::NoMatch { reason })
            }
            Err(err @ Error::ExtractionIncomplete { .. }) => {
                self.retain_unmatched(receipt, &err.to_string()).await?;
                Err(err)
            }
            other => other,
        }
    }

    /// Record a matched receipt and decide the transaction.
    ///
    /// A transaction that stopped waiting for a receipt in the meantime is
    /// left untouched and the receipt is retained instead.
    pub async fn apply_receipt(
        &self,
        id: &TransactionId,
        receipt: &Receipt,
        validation: ReceiptValidation,
        now: DateTime<Utc>,
    ) -> Result<TransactionStatus> {
        let mut tx = self.get(id).await?;
        if !tx.status().accepts_receipt() || tx.receipt_received() {
            self.retain_unmatched(receipt, "transaction no longer awaiting a receipt")
                .await?;
            return Ok(tx.status());
        }

        let valid = validation.valid;
        let detail = if valid {
            validation.checks.join(", ")
        } else {
            validation.errors.join("; ")
        };
        tx.receipt = Some(ReceiptRecord {
            evidence_ref: receipt.evidence_ref.clone(),
            amount: receipt.amount.unwrap_or(tx.amount),
            received_at: receipt.received_at,
            validation,
        });
        if tx.status() == TransactionStatus::WaitingPayment {
            self.commit(&mut tx, TransactionStatus::Validating, now).await?;
        }
        let decided = if valid {
            TransactionStatus::Approved
        } else {
            TransactionStatus::Rejected
        };
        if !valid {
            tx.last_error = Some(detail.clone());
        }
        self.commit(&mut tx, decided, now).await?;

        self.notifiers
            .notify_all(Event::ReceiptProcessed(ReceiptEvent {
                transaction_id: Some(tx.id),
                evidence_ref: receipt.evidence_ref.clone(),
                amount: receipt.amount,
                valid,
                detail,
            }));
        Ok(decided)
    }

    /// Match and apply in one call.
    pub async fn process_receipt(&self, receipt: &Receipt, now: DateTime<Utc>) -> Result<MatchOutcome> {
        let outcome = self.match_receipt(receipt).await?;
        if let MatchOutcome::Matched {
            transaction_id,
            validation,
        } = &outcome
        {
            self.apply_receipt(transaction_id, receipt, validation.clone(), now)
                .await?;
        }
        Ok(outcome)
    }

    async fn retain_unmatched(&self, receipt: &Receipt, reason: &str) -> Result<()> {
        warn!(evidence = %receipt.evidence_ref, reason, "Receipt not matched");
        self.store.retain_receipt(receipt, reason).await?;
        self.notifiers
            .notify_all(Event::ReceiptUnmatched(ReceiptEvent {
                transaction_id: None,
                evidence_ref: receipt.evidence_ref.clone(),
                amount: receipt.amount,
                valid: false,
                detail: reason.to_string(),
            }));
        Ok(())
    }

    // --- Operator overrides ---

    /// Approve without a receipt. Only for transactions awaiting one.
    pub async fn approve_manual(&self, id: &TransactionId, now: DateTime<Utc>) -> Result<Transaction> {
        let mut tx = self.get(id).await?;
        match tx.status() {
            TransactionStatus::WaitingPayment => {
                self.commit(&mut tx, TransactionStatus::Validating, now).await?;
                self.commit(&mut tx, TransactionStatus::Approved, now).await?;
            }
            TransactionStatus::Validating => {
                self.commit(&mut tx, TransactionStatus::Approved, now).await?;
            }
            other => {
                return Err(crate::domain::error::DomainError::InvalidTransition {
                    from: other,
                    to: TransactionStatus::Approved,
                }
                .into());
            }
        }
        info!(transaction_id = %tx.id, "Transaction approved by operator");
        Ok(tx)
    }

    /// Reject a transaction awaiting a receipt, or cancel any other open one.
    pub async fn reject_manual(
        &self,
        id: &TransactionId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Transaction> {
        let mut tx = self.get(id).await?;
        tx.last_error = Some(format!("rejected by operator: {reason}"));
        match tx.status() {
            TransactionStatus::WaitingPayment => {
                self.commit(&mut tx, TransactionStatus::Validating, now).await?;
                self.commit(&mut tx, TransactionStatus::Rejected, now).await?;
            }
            TransactionStatus::Validating => {
                self.commit(&mut tx, TransactionStatus::Rejected, now).await?;
            }
            _ => self.commit(&mut tx, TransactionStatus::Cancelled, now).await?,
        }
        info!(transaction_id = %tx.id, status = %tx.status(), reason, "Transaction rejected by operator");
        Ok(tx)
    }

    // --- Maintenance ---

    /// Delete terminal transactions and closed sessions past retention.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<PurgeReport> {
        let transactions = self
            .store
            .purge_terminal_before(now - self.settings.transaction_retention)
            .await?;
        let sessions = self
            .store
            .purge_closed_sessions_before(now - self.settings.session_retention)
            .await?;
        Ok(PurgeReport {
            transactions,
            sessions,
        })
    }

    /// Rebuild in-memory state from the store after a restart.
    ///
    /// Restores ad usage counters and continues the payment method rotation.
    /// Returns the number of open transactions.
    pub async fn resume(&self) -> Result<usize> {
        let open = self.store.list_by_status(&OPEN_STATUSES).await?;
        let mut usage: HashMap<AccountId, (u32, u32)> = HashMap::new();
        for tx in &open {
            if let Some(account) = &tx.counterparty_account_id {
                let entry = usage.entry(account.clone()).or_default();
                entry.0 += 1;
                if tx.order_id.is_some() {
                    entry.1 += 1;
                }
            }
        }
        for (account, (ads, interest)) in usage {
            if let Err(err) = self.accounts.restore_usage(&account, ads, interest) {
                warn!(account = %account, error = %err, "Open transaction references unknown account");
            }
        }

        let sessions = self.store.list_sessions().await?;
        if let Some(method) = sessions
            .iter()
            .filter_map(|s| s.payment_details().map(|d| (s.updated_at, d.method.clone())))
            .max_by_key(|(at, _)| *at)
            .map(|(_, method)| method)
        {
            self.negotiation.alternator().resume_after(&method);
        }
        info!(open = open.len(), sessions = sessions.len(), "Resumed from store");
        Ok(open.len())
    }

    pub async fn transaction_stats(&self) -> Result<TransactionStats> {
        let all = self.store.list_transactions().await?;
        Ok(TransactionStats::from_transactions(&all))
    }

    pub async fn session_stats(&self) -> Result<SessionStats> {
        let sessions = self.store.list_sessions().await?;
        Ok(SessionStats::from_sessions(&sessions))
    }

    // --- Internals ---

    /// Transition, persist, release capacity on terminal statuses and
    /// broadcast.
    async fn commit(
        &self,
        tx: &mut Transaction,
        to: TransactionStatus,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let from = tx.status();
        tx.transition(to, now)?;
        self.store.save(tx).await?;
        if to.is_terminal() {
            self.release_capacity(tx);
        }
        self.notify_status(tx, from);
        Ok(())
    }

    fn notify_status(&self, tx: &Transaction, from: TransactionStatus) {
        self.notifiers
            .notify_all(Event::StatusChanged(StatusChangeEvent {
                transaction_id: tx.id,
                external_id: tx.external_id.clone(),
                from,
                to: tx.status(),
            }));
    }

    fn release_capacity(&self, tx: &Transaction) {
        if let Some(account) = &tx.counterparty_account_id {
            if let Err(err) = self.accounts.release_ad_slot(account, tx.order_id.is_some()) {
                warn!(account = %account, error = %err, "Could not release ad slot");
            }
        }
    }

    async fn fail(&self, tx: &mut Transaction, reason: &str, now: DateTime<Utc>) -> Result<()> {
        warn!(transaction_id = %tx.id, reason, "Transaction failed");
        tx.last_error = Some(reason.to_string());
        self.commit(tx, TransactionStatus::Error, now).await?;
        self.notifiers
            .notify_all(Event::TransactionFailed(FailureEvent {
                transaction_id: tx.id,
                external_id: tx.external_id.clone(),
                reason: reason.to_string(),
            }));
        Ok(())
    }

    async fn on_connector_error(
        &self,
        tx: &mut Transaction,
        account: &AccountId,
        err: ConnectorError,
        now: DateTime<Utc>,
    ) -> Result<()> {
        match err {
            ConnectorError::Permanent(ref reason) => self.fail(tx, reason, now).await,
            ConnectorError::Authentication(_) | ConnectorError::Transient(_) => {
                self.on_account_error(account, &err, now);
                Err(err.into())
            }
        }
    }

    /// Park an account whose session was rejected.
    fn on_account_error(&self, account: &AccountId, err: &ConnectorError, now: DateTime<Utc>) {
        if !err.is_authentication() {
            return;
        }
        match self
            .accounts
            .mark_status(account, AccountStatus::Error, Some(err.to_string()), now)
        {
            Ok(updated) => {
                warn!(account = %account, error = %err, "Account session rejected");
                self.notifiers
                    .notify_all(Event::AccountStatusChanged(AccountEvent {
                        account_id: updated.id,
                        status: updated.status,
                        error: updated.last_error,
                    }));
            }
            Err(e) => warn!(account = %account, error = %e, "Could not mark account error"),
        }
    }

    fn ad_side(&self, tx: &Transaction) -> Result<(Account, Arc<dyn ExchangeConnector>)> {
        let account_id = tx
            .counterparty_account_id
            .as_ref()
            .ok_or_else(|| ConnectorError::Permanent("no advertising account assigned".into()))?;
        let account = self.accounts.require(account_id)?;
        let connector = self.connectors.get(account.kind)?;
        Ok((account, connector))
    }
}
