//! SQLite store implementation.
//!
//! Provides persistent storage for accounts, transactions, negotiation
//! sessions and retained receipts using SQLite and Diesel ORM.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::adapter::outbound::sqlite::database::connection::DbPool;
use crate::adapter::outbound::sqlite::database::model::{
    AccountRow, NewReceiptRow, ReceiptRow, SessionRow, TransactionRow,
};
use crate::adapter::outbound::sqlite::database::schema::{
    accounts, negotiation_sessions, receipts, transactions,
};
use crate::domain::{
    Account, AccountId, AccountStatus, AccountUsage, AdId, BuyerReputation, Credentials,
    ExchangeKind, ExternalId, NegotiationSession, NegotiationState, OrderId, Receipt, Transaction,
    TransactionId, TransactionStatus,
};
use crate::error::{Error, Result};
use crate::port::{AccountStore, ReceiptStore, SessionStore, TransactionStore};

type Conn = PooledConnection<ConnectionManager<diesel::SqliteConnection>>;

/// SQLite-backed implementation of every store port.
pub struct SqliteStore {
    /// Database connection pool.
    pool: DbPool,
}

impl SqliteStore {
    /// Create a new SQLite store with the given connection pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Run `work` on a pooled connection on the blocking thread pool, off
    /// the runtime threads that drive the loops.
    async fn with_conn<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Conn) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| Error::Connection(e.to_string()))?;
            work(&mut conn)
        })
        .await
        .map_err(|e| Error::Database(format!("store task failed: {e}")))?
    }
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| Error::Parse(format!("timestamp `{raw}`: {e}")))
}

fn parse_decimal(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw).map_err(|e| Error::Parse(format!("decimal `{raw}`: {e}")))
}

fn parse_optional<T>(raw: Option<&str>, parse: impl Fn(&str) -> Result<T>) -> Result<Option<T>> {
    raw.map(parse).transpose()
}

fn db_err(e: diesel::result::Error) -> Error {
    Error::Database(e.to_string())
}

fn terminal_statuses() -> Vec<String> {
    TransactionStatus::ALL
        .iter()
        .filter(|s| s.is_terminal())
        .map(|s| s.as_str().to_string())
        .collect()
}

fn closed_states() -> Vec<String> {
    NegotiationState::ALL
        .iter()
        .filter(|s| s.is_terminal())
        .map(|s| s.as_str().to_string())
        .collect()
}

fn account_to_row(account: &Account) -> AccountRow {
    let clamp = |v: u32| i32::try_from(v).unwrap_or(i32::MAX);
    AccountRow {
        id: account.id.to_string(),
        kind: account.kind.as_str().to_string(),
        login: account.credentials.login.clone(),
        status: account.status.as_str().to_string(),
        last_login: account.last_login.as_ref().map(timestamp),
        last_error: account.last_error.clone(),
        active_ads: clamp(account.usage.active_ads),
        ads_with_interest: clamp(account.usage.ads_with_interest),
        ad_limit: clamp(account.usage.ad_limit),
        balance: account.usage.balance.map(|b| b.to_string()),
        last_balance_update: account.usage.last_balance_update.as_ref().map(timestamp),
    }
}

fn account_from_row(row: AccountRow) -> Result<Account> {
    let count = |v: i32| u32::try_from(v).unwrap_or(0);
    Ok(Account {
        id: AccountId::new(row.id),
        kind: ExchangeKind::from_str(&row.kind)?,
        credentials: Credentials::new(row.login, String::new()),
        status: AccountStatus::from_str(&row.status)?,
        last_login: parse_optional(row.last_login.as_deref(), parse_timestamp)?,
        last_error: row.last_error,
        usage: AccountUsage {
            active_ads: count(row.active_ads),
            ads_with_interest: count(row.ads_with_interest),
            ad_limit: count(row.ad_limit),
            balance: parse_optional(row.balance.as_deref(), parse_decimal)?,
            last_balance_update: parse_optional(
                row.last_balance_update.as_deref(),
                parse_timestamp,
            )?,
        },
    })
}

fn transaction_to_row(tx: &Transaction) -> Result<TransactionRow> {
    Ok(TransactionRow {
        id: tx.id.to_string(),
        external_id: tx.external_id.to_string(),
        account_id: tx.account_id.to_string(),
        kind: tx.kind.as_str().to_string(),
        counterparty_account_id: tx.counterparty_account_id.as_ref().map(ToString::to_string),
        ad_id: tx.ad_id.as_ref().map(ToString::to_string),
        order_id: tx.order_id.as_ref().map(ToString::to_string),
        counterparty_id: tx.counterparty_id.clone(),
        amount: tx.amount.to_string(),
        currency: tx.currency.clone(),
        asset: tx.asset.clone(),
        price: tx.price.map(|p| p.to_string()),
        status: tx.status().as_str().to_string(),
        payment_contact: serde_json::to_string(&tx.payment_contact)?,
        payment: tx.payment.as_ref().map(serde_json::to_string).transpose()?,
        receipt: tx.receipt.as_ref().map(serde_json::to_string).transpose()?,
        reputation: tx.reputation.as_str().to_string(),
        last_error: tx.last_error.clone(),
        status_changed_at: timestamp(&tx.status_changed_at),
        created_at: timestamp(&tx.created_at),
        updated_at: timestamp(&tx.updated_at),
    })
}

fn transaction_from_row(row: TransactionRow) -> Result<Transaction> {
    let id = Uuid::parse_str(&row.id)
        .map(TransactionId::from_uuid)
        .map_err(|e| Error::Parse(format!("transaction id `{}`: {e}", row.id)))?;
    let reputation = match row.reputation.as_str() {
        "fool" => BuyerReputation::Fool,
        _ => BuyerReputation::Unknown,
    };
    Ok(Transaction {
        id,
        external_id: ExternalId::new(row.external_id),
        account_id: AccountId::new(row.account_id),
        kind: ExchangeKind::from_str(&row.kind)?,
        counterparty_account_id: row.counterparty_account_id.map(AccountId::new),
        ad_id: row.ad_id.map(AdId::new),
        order_id: row.order_id.map(OrderId::new),
        counterparty_id: row.counterparty_id,
        amount: parse_decimal(&row.amount)?,
        currency: row.currency,
        asset: row.asset,
        price: parse_optional(row.price.as_deref(), parse_decimal)?,
        status: TransactionStatus::from_str(&row.status)?,
        payment_contact: serde_json::from_str(&row.payment_contact)?,
        payment: row.payment.as_deref().map(serde_json::from_str).transpose()?,
        receipt: row.receipt.as_deref().map(serde_json::from_str).transpose()?,
        reputation,
        last_error: row.last_error,
        status_changed_at: parse_timestamp(&row.status_changed_at)?,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}

fn session_to_row(session: &NegotiationSession) -> Result<SessionRow> {
    Ok(SessionRow {
        transaction_id: session.transaction_id.to_string(),
        order_id: session.order_id.as_ref().map(ToString::to_string),
        state: session.state().as_str().to_string(),
        payload: serde_json::to_string(session)?,
        created_at: timestamp(&session.created_at),
        updated_at: timestamp(&session.updated_at),
    })
}

fn session_from_row(row: SessionRow) -> Result<NegotiationSession> {
    Ok(serde_json::from_str(&row.payload)?)
}

#[async_trait]
impl TransactionStore for SqliteStore {
    async fn insert_if_absent(&self, tx: &Transaction) -> Result<bool> {
        let row = transaction_to_row(tx)?;
        let inserted = self
            .with_conn(move |conn| {
                diesel::insert_or_ignore_into(transactions::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(db_err)
            })
            .await?;
        Ok(inserted > 0)
    }

    async fn save(&self, tx: &Transaction) -> Result<()> {
        let row = transaction_to_row(tx)?;
        let updated = self
            .with_conn(move |conn| {
                diesel::update(transactions::table.find(row.id.as_str()))
                    .set(&row)
                    .execute(conn)
                    .map_err(db_err)
            })
            .await?;
        if updated == 0 {
            return Err(Error::not_found("transaction", tx.id));
        }
        Ok(())
    }

    async fn get(&self, id: &TransactionId) -> Result<Option<Transaction>> {
        let key = id.to_string();
        let row: Option<TransactionRow> = self
            .with_conn(move |conn| {
                transactions::table
                    .find(key)
                    .select(TransactionRow::as_select())
                    .first(conn)
                    .optional()
                    .map_err(db_err)
            })
            .await?;
        row.map(transaction_from_row).transpose()
    }

    async fn find_by_external_id(&self, external_id: &ExternalId) -> Result<Option<Transaction>> {
        let key = external_id.as_str().to_string();
        let row: Option<TransactionRow> = self
            .with_conn(move |conn| {
                transactions::table
                    .filter(transactions::external_id.eq(key))
                    .select(TransactionRow::as_select())
                    .first(conn)
                    .optional()
                    .map_err(db_err)
            })
            .await?;
        row.map(transaction_from_row).transpose()
    }

    async fn list_by_status(&self, statuses: &[TransactionStatus]) -> Result<Vec<Transaction>> {
        let names: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let rows: Vec<TransactionRow> = self
            .with_conn(move |conn| {
                transactions::table
                    .filter(transactions::status.eq_any(names))
                    .order(transactions::created_at.asc())
                    .select(TransactionRow::as_select())
                    .load(conn)
                    .map_err(db_err)
            })
            .await?;
        rows.into_iter().map(transaction_from_row).collect()
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let rows: Vec<TransactionRow> = self
            .with_conn(|conn| {
                transactions::table
                    .order(transactions::created_at.asc())
                    .select(TransactionRow::as_select())
                    .load(conn)
                    .map_err(db_err)
            })
            .await?;
        rows.into_iter().map(transaction_from_row).collect()
    }

    async fn purge_terminal_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let cutoff = timestamp(&cutoff);
        self.with_conn(move |conn| {
            diesel::delete(
                transactions::table
                    .filter(transactions::status.eq_any(terminal_statuses()))
                    .filter(transactions::updated_at.lt(cutoff)),
            )
            .execute(conn)
            .map_err(db_err)
        })
        .await
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn save_session(&self, session: &NegotiationSession) -> Result<()> {
        let row = session_to_row(session)?;
        self.with_conn(move |conn| {
            diesel::replace_into(negotiation_sessions::table)
                .values(&row)
                .execute(conn)
                .map_err(db_err)
        })
        .await?;
        Ok(())
    }

    async fn get_session(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<NegotiationSession>> {
        let key = transaction_id.to_string();
        let row: Option<SessionRow> = self
            .with_conn(move |conn| {
                negotiation_sessions::table
                    .find(key)
                    .select(SessionRow::as_select())
                    .first(conn)
                    .optional()
                    .map_err(db_err)
            })
            .await?;
        row.map(session_from_row).transpose()
    }

    async fn list_sessions(&self) -> Result<Vec<NegotiationSession>> {
        let rows: Vec<SessionRow> = self
            .with_conn(|conn| {
                negotiation_sessions::table
                    .order(negotiation_sessions::created_at.asc())
                    .select(SessionRow::as_select())
                    .load(conn)
                    .map_err(db_err)
            })
            .await?;
        rows.into_iter().map(session_from_row).collect()
    }

    async fn purge_closed_sessions_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let cutoff = timestamp(&cutoff);
        self.with_conn(move |conn| {
            diesel::delete(
                negotiation_sessions::table
                    .filter(negotiation_sessions::state.eq_any(closed_states()))
                    .filter(negotiation_sessions::updated_at.lt(cutoff)),
            )
            .execute(conn)
            .map_err(db_err)
        })
        .await
    }
}

#[async_trait]
impl AccountStore for SqliteStore {
    async fn save_account(&self, account: &Account) -> Result<()> {
        let row = account_to_row(account);
        self.with_conn(move |conn| {
            diesel::replace_into(accounts::table)
                .values(&row)
                .execute(conn)
                .map_err(db_err)
        })
        .await?;
        Ok(())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows: Vec<AccountRow> = self
            .with_conn(|conn| {
                accounts::table
                    .order(accounts::id.asc())
                    .select(AccountRow::as_select())
                    .load(conn)
                    .map_err(db_err)
            })
            .await?;
        rows.into_iter().map(account_from_row).collect()
    }

    async fn delete_account(&self, id: &AccountId) -> Result<bool> {
        let key = id.as_str().to_string();
        let deleted = self
            .with_conn(move |conn| {
                diesel::delete(accounts::table.find(key))
                    .execute(conn)
                    .map_err(db_err)
            })
            .await?;
        Ok(deleted > 0)
    }
}

#[async_trait]
impl ReceiptStore for SqliteStore {
    async fn retain_receipt(&self, receipt: &Receipt, reason: &str) -> Result<()> {
        let row = NewReceiptRow {
            evidence_ref: receipt.evidence_ref.clone(),
            payload: serde_json::to_string(receipt)?,
            reason: reason.to_string(),
            retained_at: timestamp(&Utc::now()),
        };
        self.with_conn(move |conn| {
            diesel::insert_into(receipts::table)
                .values(&row)
                .execute(conn)
                .map_err(db_err)
        })
        .await?;
        Ok(())
    }

    async fn list_retained_receipts(&self) -> Result<Vec<(Receipt, String)>> {
        let rows: Vec<ReceiptRow> = self
            .with_conn(|conn| {
                receipts::table
                    .order(receipts::id.asc())
                    .select(ReceiptRow::as_select())
                    .load(conn)
                    .map_err(db_err)
            })
            .await?;
        rows.into_iter()
            .map(|row| Ok((serde_json::from_str(&row.payload)?, row.reason)))
            .collect()
    }
}
