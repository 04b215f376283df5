//! Receipt source port.
//!
//! OCR and mailbox polling live outside the engine. Whatever extracts
//! receipts hands them over through this trait.

use async_trait::async_trait;

use crate::domain::Receipt;

#[async_trait]
pub trait ReceiptSource: Send {
    /// Wait for the next extracted receipt.
    ///
    /// Returns `None` once the source is exhausted and will never yield again.
    async fn next_receipt(&mut self) -> Option<Receipt>;
}
