//! In-process receipt source fed through an mpsc channel.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::Receipt;
use crate::port::ReceiptSource;

/// Receipts pushed by an in-process producer.
pub struct ChannelReceiptSource {
    receiver: mpsc::Receiver<Receipt>,
}

/// Create a bounded receipt channel.
///
/// The source is exhausted once every sender is dropped.
#[must_use]
pub fn receipt_channel(capacity: usize) -> (mpsc::Sender<Receipt>, ChannelReceiptSource) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (sender, ChannelReceiptSource { receiver })
}

#[async_trait]
impl ReceiptSource for ChannelReceiptSource {
    async fn next_receipt(&mut self) -> Option<Receipt> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn receipt(evidence: &str) -> Receipt {
        Receipt {
            amount: Some(dec!(5000)),
            last_four_digits: Some("4242".into()),
            bank: Some("T-Bank".into()),
            phone: None,
            success: true,
            evidence_ref: evidence.into(),
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn yields_in_order_then_closes() {
        let (tx, mut source) = receipt_channel(4);
        tx.send(receipt("a")).await.unwrap();
        tx.send(receipt("b")).await.unwrap();
        drop(tx);

        assert_eq!(source.next_receipt().await.unwrap().evidence_ref, "a");
        assert_eq!(source.next_receipt().await.unwrap().evidence_ref, "b");
        assert!(source.next_receipt().await.is_none());
    }
}
