//! Handler for the `stats` command.

use std::path::Path;

use serde_json::json;
use tabled::{Table, Tabled};

use crate::adapter::inbound::cli::{operator, output};
use crate::domain::{AccountStats, SessionStats, TransactionStats};
use crate::error::Result;
use crate::port::{AccountStore, ReceiptStore, SessionStore, TransactionStore};

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Count")]
    count: usize,
}

#[derive(Tabled)]
struct AccountRow {
    #[tabled(rename = "Exchange")]
    kind: String,
    #[tabled(rename = "Total")]
    total: usize,
    #[tabled(rename = "Active")]
    active: usize,
    #[tabled(rename = "Inactive")]
    inactive: usize,
    #[tabled(rename = "Error")]
    error: usize,
}

/// Execute the stats command.
pub async fn execute(config_path: &Path) -> Result<()> {
    if output::is_quiet() && !output::is_json() {
        return Ok(());
    }

    let Some((config, store)) = operator::open_store(config_path)? else {
        output::warning("Database not found");
        output::hint("run `dealflow run` first to create it");
        return Ok(());
    };

    let transactions = store.list_transactions().await?;
    let sessions = store.list_sessions().await?;
    let accounts = store.list_accounts().await?;
    let retained = store.list_retained_receipts().await?;

    let tx = TransactionStats::from_transactions(&transactions);
    let sessions = SessionStats::from_sessions(&sessions);
    let accounts = AccountStats::from_accounts(&accounts);

    if output::is_json() {
        output::json_output(json!({
            "command": "stats",
            "store": operator::store_label(&config),
            "transactions": tx,
            "sessions": sessions,
            "accounts": accounts,
            "receipts_for_review": retained.len(),
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Store", operator::store_label(&config));

    output::section("Transactions");
    output::field("Total", tx.total);
    output::field("Open", tx.open());
    output::field("Volume", tx.total_amount);
    output::field("Approved", output::positive(tx.approved_amount));
    output::field("Rejected", output::negative(tx.rejected_count));
    output::field("Flagged", tx.fool_count);
    if !tx.by_status.is_empty() {
        let rows: Vec<_> = tx
            .by_status
            .iter()
            .map(|(status, count)| StatusRow {
                status: status.to_string(),
                count: *count,
            })
            .collect();
        output::table(&Table::new(rows).to_string());
    }
    for (method, count) in &tx.by_payment_method {
        output::field(method, count);
    }

    output::section("Negotiations");
    output::field("Total", sessions.total);
    output::field("Active", sessions.active);
    output::field("Details sent", sessions.payment_sent);
    output::field("Rejected", sessions.rejected);
    output::field("Closed", sessions.completed);

    output::section("Accounts");
    let rows: Vec<_> = accounts
        .by_kind
        .iter()
        .map(|(kind, stats)| AccountRow {
            kind: kind.to_string(),
            total: stats.total,
            active: stats.active,
            inactive: stats.inactive,
            error: stats.error,
        })
        .collect();
    output::table(&Table::new(rows).to_string());

    if !retained.is_empty() {
        output::warning(&format!("{} receipt(s) waiting for review", retained.len()));
    }
    Ok(())
}
