//! Round-robin payment method selection shared by all negotiations.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::PaymentMethod;
use crate::error::ConfigError;

#[derive(Debug)]
pub struct PaymentAlternator {
    methods: Vec<PaymentMethod>,
    cursor: AtomicUsize,
}

impl PaymentAlternator {
    #[allow(clippy::result_large_err)]
    pub fn new(methods: Vec<PaymentMethod>) -> Result<Self, ConfigError> {
        if methods.is_empty() {
            return Err(ConfigError::MissingField {
                field: "negotiation.payment_methods",
            });
        }
        Ok(Self {
            methods,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Take the next method. Safe to call from many tasks at once.
    pub fn next(&self) -> PaymentMethod {
        let n = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.methods[n % self.methods.len()].clone()
    }

    /// Continue the rotation after the method named `last_used`.
    ///
    /// Unknown names leave the rotation untouched.
    pub fn resume_after(&self, last_used: &str) {
        if let Some(index) = self.methods.iter().position(|m| m.name == last_used) {
            self.cursor.store(index + 1, Ordering::SeqCst);
        }
    }

    #[must_use]
    pub fn methods(&self) -> &[PaymentMethod] {
        &self.methods
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn methods() -> Vec<PaymentMethod> {
        vec![
            PaymentMethod::new("SBP", "Альфа-Банк"),
            PaymentMethod::new("Tinkoff", "Тинькофф"),
        ]
    }

    #[test]
    fn empty_method_list_is_rejected() {
        assert!(PaymentAlternator::new(vec![]).is_err());
    }

    #[test]
    fn consecutive_picks_differ() {
        let alternator = PaymentAlternator::new(methods()).unwrap();
        let picks: Vec<_> = (0..6).map(|_| alternator.next().name).collect();
        assert_eq!(picks[0], "SBP");
        for pair in picks.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn resume_continues_after_last_used() {
        let alternator = PaymentAlternator::new(methods()).unwrap();
        alternator.resume_after("SBP");
        assert_eq!(alternator.next().name, "Tinkoff");
        alternator.resume_after("unknown");
        assert_eq!(alternator.next().name, "SBP");
    }

    #[tokio::test]
    async fn concurrent_picks_split_evenly() {
        let alternator = Arc::new(PaymentAlternator::new(methods()).unwrap());
        let handles: Vec<_> = (0..100)
            .map(|_| {
                let alternator = alternator.clone();
                tokio::spawn(async move { alternator.next().name })
            })
            .collect();
        let mut sbp = 0;
        for handle in handles {
            if handle.await.unwrap() == "SBP" {
                sbp += 1;
            }
        }
        assert_eq!(sbp, 50);
    }
}
