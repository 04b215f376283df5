use crate::domain::{AccountId, TransactionId};

use super::TelegramControl;

impl TelegramControl {
    pub(super) async fn approve_text(&self, id: &TransactionId) -> String {
        match self.admin.approve_transaction(id).await {
            Ok(tx) => format!(
                "✅ Approved {}\n\n💵 {} {}\n📌 Status: {}",
                tx.external_id,
                tx.amount,
                tx.currency,
                tx.status()
            ),
            Err(err) => format!("❌ Error: cannot approve {id}: {err}"),
        }
    }

    pub(super) async fn reject_text(&self, id: &TransactionId, reason: &str) -> String {
        match self.admin.reject_transaction(id, reason).await {
            Ok(tx) => format!(
                "🚫 {} is now {}\n📝 Reason: {}",
                tx.external_id,
                tx.status(),
                reason
            ),
            Err(err) => format!("❌ Error: cannot reject {id}: {err}"),
        }
    }

    pub(super) async fn balance_text(&self, account: Option<&AccountId>) -> String {
        match self.admin.force_balance_refresh(account).await {
            Ok(0) => "💰 No balances refreshed".to_string(),
            Ok(count) => format!("💰 Refreshed {count} balance(s)"),
            Err(err) => format!("❌ Error: balance refresh failed: {err}"),
        }
    }

    pub(super) async fn relogin_text(&self, account: Option<&AccountId>) -> String {
        match self.admin.force_relogin(account).await {
            Ok(count) => format!("🔑 {count} account(s) logged in"),
            Err(err) => format!("❌ Error: relogin failed: {err}"),
        }
    }
}
