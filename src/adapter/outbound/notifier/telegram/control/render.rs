use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::domain::{AccountStatus, TransactionId, TransactionStatus};

use super::TelegramControl;

impl TelegramControl {
    pub(super) async fn status_text(&self) -> String {
        let status = match self.admin.status().await {
            Ok(status) => status,
            Err(err) => return format!("❌ Error: status unavailable: {err}"),
        };

        let mut response = format!(
            "📊 Status\n\n\
            ⏱️ Uptime: {}\n\
            📄 Open Transactions: {}\n\
            💬 Active Negotiations: {}\n\
            ⚙️ In-Flight: {}\n\n\
            👤 Accounts",
            format_uptime(status.started_at.min(self.started_at)),
            status.open_transactions,
            status.active_sessions,
            status.in_flight,
        );
        let configured: Vec<_> = status
            .accounts
            .by_kind
            .iter()
            .filter(|(_, stats)| stats.total > 0)
            .collect();
        if configured.is_empty() {
            response.push_str("\n• none configured");
        }
        for (kind, stats) in configured {
            let _ = write!(
                response,
                "\n• {kind}: {}/{} active, {} error",
                stats.active, stats.total, stats.error
            );
        }
        response
    }

    pub(super) async fn stats_text(&self) -> String {
        let stats = match self.admin.statistics().await {
            Ok(stats) => stats,
            Err(err) => return format!("❌ Error: statistics unavailable: {err}"),
        };
        let tx = &stats.transactions;
        let sessions = &stats.sessions;

        let mut response = format!(
            "📈 Statistics\n\n\
            📄 Transactions: {}\n\
            • Open: {}\n\
            • Approved: {} ({})\n\
            • Rejected: {}\n\
            • Total Volume: {}\n\
            • Flagged Buyers: {}\n",
            tx.total,
            tx.open(),
            tx.count(TransactionStatus::Approved),
            tx.approved_amount,
            tx.rejected_count,
            tx.total_amount,
            tx.fool_count,
        );

        if !tx.by_payment_method.is_empty() {
            response.push_str("\n💳 By Payment Method\n");
            for (method, count) in &tx.by_payment_method {
                let _ = writeln!(response, "• {method}: {count}");
            }
        }

        let _ = write!(
            response,
            "\n💬 Negotiations: {}\n\
            • Active: {}\n\
            • Details Sent: {}\n\
            • Completed: {}\n\
            • Rejected: {}",
            sessions.total,
            sessions.active,
            sessions.payment_sent,
            sessions.completed,
            sessions.rejected,
        );
        response
    }

    pub(super) fn accounts_text(&self) -> String {
        let accounts = self.admin.list_accounts();
        if accounts.is_empty() {
            return "👤 No accounts configured".to_string();
        }

        let mut response = format!("👤 Accounts ({})\n", accounts.len());
        for account in &accounts {
            let emoji = match account.status {
                AccountStatus::Active => "🟢",
                AccountStatus::Inactive => "⚪",
                AccountStatus::Error => "🔴",
            };
            let balance = account
                .usage
                .balance
                .map_or_else(|| "n/a".to_string(), |b| b.to_string());
            let _ = write!(
                response,
                "\n{emoji} {} ({})\n   Ads: {}/{} | Balance: {balance}",
                account.id, account.kind, account.usage.active_ads, account.usage.ad_limit,
            );
            if let Some(error) = &account.last_error {
                let _ = write!(response, "\n   ⚠️ {error}");
            }
        }
        response
    }

    pub(super) async fn transactions_text(&self, status: Option<TransactionStatus>) -> String {
        let transactions = match self.admin.list_transactions(status).await {
            Ok(transactions) => transactions,
            Err(err) => return format!("❌ Error: cannot list transactions: {err}"),
        };
        if transactions.is_empty() {
            return match status {
                Some(status) => format!("📄 No {status} transactions"),
                None => "📄 No transactions".to_string(),
            };
        }

        let total = transactions.len();
        let skip = total.saturating_sub(self.list_limit);
        let mut response = format!("📄 Transactions ({total})\n");
        for tx in transactions.iter().skip(skip).rev() {
            let _ = write!(
                response,
                "\n{} {} {} {}\n   {}",
                status_emoji(tx.status()),
                tx.status(),
                tx.amount,
                tx.currency,
                tx.id,
            );
        }
        if skip > 0 {
            let _ = write!(response, "\n\n... and {skip} older");
        }
        response
    }

    pub(super) async fn transaction_text(&self, id: &TransactionId) -> String {
        let tx = match self.admin.get_transaction(id).await {
            Ok(Some(tx)) => tx,
            Ok(None) => return format!("🔍 Transaction {id} not found"),
            Err(err) => return format!("❌ Error: cannot load {id}: {err}"),
        };

        let mut response = format!(
            "🔍 Transaction\n\n\
            🆔 {}\n\
            🔗 External: {}\n\
            {} Status: {}\n\
            💵 Amount: {} {} ({})\n\
            👤 Account: {} ({})\n\
            🕐 Created: {}",
            tx.id,
            tx.external_id,
            status_emoji(tx.status()),
            tx.status(),
            tx.amount,
            tx.currency,
            tx.asset,
            tx.account_id,
            tx.kind,
            tx.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        );
        if let Some(order) = &tx.order_id {
            let _ = write!(response, "\n📦 Order: {order}");
        }
        if let Some(payment) = &tx.payment {
            let _ = write!(response, "\n💳 Payment: {} ({})", payment.method, payment.bank);
        }
        if let Some(receipt) = &tx.receipt {
            let verdict = if receipt.validation.valid { "valid" } else { "invalid" };
            let _ = write!(response, "\n🧾 Receipt: {} {verdict}", receipt.amount);
        }
        let _ = write!(response, "\n🏷️ Buyer: {}", tx.reputation.as_str());
        if let Some(error) = &tx.last_error {
            let _ = write!(response, "\n⚠️ {error}");
        }
        response
    }
}

const fn status_emoji(status: TransactionStatus) -> &'static str {
    match status {
        TransactionStatus::Approved => "✅",
        TransactionStatus::Released => "💸",
        TransactionStatus::FoolPool => "🃏",
        TransactionStatus::Rejected | TransactionStatus::Cancelled => "🚫",
        TransactionStatus::Error => "🔴",
        TransactionStatus::WaitingPayment | TransactionStatus::Validating => "⏳",
        _ => "🔵",
    }
}

pub(super) fn format_uptime(started_at: DateTime<Utc>) -> String {
    let secs = (Utc::now() - started_at).num_seconds().max(0);
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
