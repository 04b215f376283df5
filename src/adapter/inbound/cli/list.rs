//! Handlers for `accounts` and `transactions`.

use std::path::Path;

use serde_json::json;
use tabled::{Table, Tabled};

use crate::adapter::inbound::cli::command::TransactionsArgs;
use crate::adapter::inbound::cli::{operator, output};
use crate::domain::{Account, Transaction, TransactionStatus};
use crate::error::Result;
use crate::port::{AccountStore, TransactionStore};

#[derive(Tabled)]
struct AccountRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Exchange")]
    kind: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Ads")]
    ads: String,
    #[tabled(rename = "Balance")]
    balance: String,
    #[tabled(rename = "Last Error")]
    last_error: String,
}

impl From<&Account> for AccountRow {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.to_string(),
            kind: account.kind.to_string(),
            status: account.status.to_string(),
            ads: format!("{}/{}", account.usage.active_ads, account.usage.ad_limit),
            balance: account
                .usage
                .balance
                .map_or_else(|| "-".to_string(), |b| b.to_string()),
            last_error: account.last_error.clone().unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct TransactionRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "External")]
    external_id: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Method")]
    method: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&Transaction> for TransactionRow {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id.to_string(),
            external_id: tx.external_id.to_string(),
            status: tx.status().to_string(),
            amount: format!("{} {}", tx.amount, tx.currency),
            method: tx
                .payment
                .as_ref()
                .map_or_else(|| "-".to_string(), |p| p.method.clone()),
            created: tx.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Execute `accounts`.
pub async fn execute_accounts(config_path: &Path) -> Result<()> {
    let Some((_, store)) = operator::open_store(config_path)? else {
        output::warning("Database not found");
        return Ok(());
    };
    let accounts = store.list_accounts().await?;

    if output::is_json() {
        let rows: Vec<_> = accounts
            .iter()
            .map(|a| {
                json!({
                    "id": a.id.as_str(),
                    "kind": a.kind,
                    "status": a.status,
                    "active_ads": a.usage.active_ads,
                    "ad_limit": a.usage.ad_limit,
                    "balance": a.usage.balance,
                    "last_error": a.last_error,
                })
            })
            .collect();
        output::json_output(json!({ "command": "accounts", "accounts": rows }));
        return Ok(());
    }

    if accounts.is_empty() {
        output::note("No accounts stored");
        return Ok(());
    }
    let rows: Vec<AccountRow> = accounts.iter().map(AccountRow::from).collect();
    output::table(&Table::new(rows).to_string());
    Ok(())
}

/// Execute `transactions`.
pub async fn execute_transactions(args: &TransactionsArgs) -> Result<()> {
    let Some((_, store)) = operator::open_store(&args.config)? else {
        output::warning("Database not found");
        return Ok(());
    };
    let all = store.list_transactions().await?;
    let selected = newest(&all, args.status, args.limit);

    if output::is_json() {
        output::json_output(json!({
            "command": "transactions",
            "total": all.len(),
            "transactions": selected,
        }));
        return Ok(());
    }

    if selected.is_empty() {
        output::note("No matching transactions");
        return Ok(());
    }
    let rows: Vec<TransactionRow> = selected.iter().copied().map(TransactionRow::from).collect();
    output::table(&Table::new(rows).to_string());
    if output::verbosity() > 0 {
        output::field("Stored", all.len());
    }
    Ok(())
}

/// Up to `limit` transactions in `status`, newest first.
fn newest(
    transactions: &[Transaction],
    status: Option<TransactionStatus>,
    limit: usize,
) -> Vec<&Transaction> {
    transactions
        .iter()
        .rev()
        .filter(|tx| status.map_or(true, |s| tx.status() == s))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountId, ExchangeKind, ExternalId, PaymentContact, TransactionDraft};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn tx(external: &str, status: TransactionStatus) -> Transaction {
        let mut tx = Transaction::new(
            TransactionDraft {
                external_id: ExternalId::new(external),
                account_id: AccountId::new("gate-1"),
                kind: ExchangeKind::Gate,
                counterparty_id: None,
                amount: dec!(5000),
                currency: "RUB".into(),
                asset: "USDT".into(),
                price: None,
                payment_contact: PaymentContact::default(),
            },
            Utc::now(),
        )
        .unwrap();
        tx.status = status;
        tx
    }

    #[test]
    fn newest_filters_and_limits() {
        let all = vec![
            tx("GATE-1", TransactionStatus::Released),
            tx("GATE-2", TransactionStatus::WaitingPayment),
            tx("GATE-3", TransactionStatus::Released),
            tx("GATE-4", TransactionStatus::Released),
        ];

        let released = newest(&all, Some(TransactionStatus::Released), 2);
        let ids: Vec<_> = released.iter().map(|t| t.external_id.as_str()).collect();
        assert_eq!(ids, vec!["GATE-4", "GATE-3"]);

        assert_eq!(newest(&all, None, 10).len(), 4);
        assert!(newest(&all, Some(TransactionStatus::Error), 10).is_empty());
    }

    #[test]
    fn transaction_row_shows_amount_and_method() {
        let row = TransactionRow::from(&tx("GATE-9", TransactionStatus::Pending));
        assert_eq!(row.amount, "5000 RUB");
        assert_eq!(row.method, "-");
        assert_eq!(row.status, "PENDING");
    }
}
