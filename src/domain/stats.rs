//! Aggregate statistics over transactions, sessions and accounts.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::account::{Account, AccountStatus, ExchangeKind};
use super::negotiation::{NegotiationSession, NegotiationState};
use super::transaction::{BuyerReputation, Transaction, TransactionStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransactionStats {
    pub total: usize,
    pub by_status: BTreeMap<TransactionStatus, usize>,
    pub by_kind: BTreeMap<ExchangeKind, usize>,
    pub by_payment_method: BTreeMap<String, usize>,
    pub total_amount: Decimal,
    /// Volume that reached `APPROVED` or `RELEASED`.
    pub approved_amount: Decimal,
    pub rejected_count: usize,
    /// Transactions whose counterparty is tagged low-trust.
    pub fool_count: usize,
}

impl TransactionStats {
    pub fn from_transactions<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut stats = Self::default();
        for tx in transactions {
            stats.total += 1;
            *stats.by_status.entry(tx.status()).or_default() += 1;
            *stats.by_kind.entry(tx.kind).or_default() += 1;
            if let Some(payment) = &tx.payment {
                *stats
                    .by_payment_method
                    .entry(payment.method.clone())
                    .or_default() += 1;
            }
            stats.total_amount += tx.amount;
            match tx.status() {
                TransactionStatus::Approved | TransactionStatus::Released => {
                    stats.approved_amount += tx.amount;
                }
                TransactionStatus::Rejected => stats.rejected_count += 1,
                _ => {}
            }
            if tx.reputation == BuyerReputation::Fool {
                stats.fool_count += 1;
            }
        }
        stats
    }

    #[must_use]
    pub fn count(&self, status: TransactionStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    /// Transactions not yet in a terminal status.
    #[must_use]
    pub fn open(&self) -> usize {
        self.by_status
            .iter()
            .filter(|(status, _)| !status.is_terminal())
            .map(|(_, n)| n)
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub total: usize,
    /// Sessions still waiting for counterparty answers.
    pub active: usize,
    pub rejected: usize,
    /// Sessions that reached a terminal state.
    pub completed: usize,
    /// Sessions that revealed payment details.
    pub payment_sent: usize,
    pub by_state: BTreeMap<NegotiationState, usize>,
}

impl SessionStats {
    pub fn from_sessions<'a>(sessions: impl IntoIterator<Item = &'a NegotiationSession>) -> Self {
        let mut stats = Self::default();
        for session in sessions {
            stats.total += 1;
            *stats.by_state.entry(session.state()).or_default() += 1;
            match session.state() {
                NegotiationState::Rejected => stats.rejected += 1,
                NegotiationState::PaymentDetailsSent => stats.payment_sent += 1,
                _ => stats.active += 1,
            }
            if session.is_closed() {
                stats.completed += 1;
            }
        }
        stats
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountKindStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub error: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountStats {
    pub by_kind: BTreeMap<ExchangeKind, AccountKindStats>,
}

impl AccountStats {
    pub fn from_accounts<'a>(accounts: impl IntoIterator<Item = &'a Account>) -> Self {
        let mut by_kind: BTreeMap<ExchangeKind, AccountKindStats> = ExchangeKind::ALL
            .into_iter()
            .map(|kind| (kind, AccountKindStats::default()))
            .collect();
        for account in accounts {
            let entry = by_kind.entry(account.kind).or_default();
            entry.total += 1;
            match account.status {
                AccountStatus::Active => entry.active += 1,
                AccountStatus::Inactive => entry.inactive += 1,
                AccountStatus::Error => entry.error += 1,
            }
        }
        Self { by_kind }
    }

    #[must_use]
    pub fn kind(&self, kind: ExchangeKind) -> AccountKindStats {
        self.by_kind.get(&kind).cloned().unwrap_or_default()
    }
}
