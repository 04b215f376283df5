//! Database model types for Diesel ORM.

use diesel::prelude::*;

use super::schema::{accounts, negotiation_sessions, receipts, transactions};

/// Database row for an account. Secrets are never persisted.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct AccountRow {
    pub id: String,
    pub kind: String,
    pub login: String,
    pub status: String,
    pub last_login: Option<String>,
    pub last_error: Option<String>,
    pub active_ads: i32,
    pub ads_with_interest: i32,
    pub ad_limit: i32,
    pub balance: Option<String>,
    pub last_balance_update: Option<String>,
}

/// Database row for a transaction.
///
/// Decimals are stored as text. Contact, payment and receipt records are
/// JSON documents.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct TransactionRow {
    pub id: String,
    pub external_id: String,
    pub account_id: String,
    pub kind: String,
    pub counterparty_account_id: Option<String>,
    pub ad_id: Option<String>,
    pub order_id: Option<String>,
    pub counterparty_id: Option<String>,
    pub amount: String,
    pub currency: String,
    pub asset: String,
    pub price: Option<String>,
    pub status: String,
    pub payment_contact: String,
    pub payment: Option<String>,
    pub receipt: Option<String>,
    pub reputation: String,
    pub last_error: Option<String>,
    pub status_changed_at: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Database row for a negotiation session. The full session lives in
/// `payload`; `state` is duplicated for filtering.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = negotiation_sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct SessionRow {
    pub transaction_id: String,
    pub order_id: Option<String>,
    pub state: String,
    pub payload: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Database row for a retained receipt (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = receipts)]
pub struct NewReceiptRow {
    pub evidence_ref: String,
    pub payload: String,
    pub reason: String,
    pub retained_at: String,
}

/// Database row for a retained receipt (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = receipts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ReceiptRow {
    pub id: Option<i32>,
    pub evidence_ref: String,
    pub payload: String,
    pub reason: String,
    pub retained_at: String,
}
