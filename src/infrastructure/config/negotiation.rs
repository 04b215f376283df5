//! Negotiation script settings and the payment methods it rotates through.

use serde::Deserialize;

use crate::domain::PaymentMethod;

/// Environment variable overriding `payment_phone`.
pub const PAYMENT_PHONE_ENV: &str = "DEALFLOW_PAYMENT_PHONE";

#[derive(Debug, Clone, Deserialize)]
pub struct NegotiationConfig {
    /// Unrecognized answers tolerated per question.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Address counterparties mail receipts to.
    #[serde(default = "default_receipt_email")]
    pub receipt_email: String,
    /// Phone number payments are sent to.
    #[serde(default)]
    pub payment_phone: String,
    /// Rotated in order across completed negotiations.
    #[serde(default = "default_payment_methods")]
    pub payment_methods: Vec<PaymentMethodConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentMethodConfig {
    pub name: String,
    pub bank: String,
}

impl From<&PaymentMethodConfig> for PaymentMethod {
    fn from(config: &PaymentMethodConfig) -> Self {
        PaymentMethod::new(config.name.clone(), config.bank.clone())
    }
}

const fn default_max_retries() -> u32 {
    3
}

fn default_receipt_email() -> String {
    "receipts@example.com".to_string()
}

fn default_payment_methods() -> Vec<PaymentMethodConfig> {
    vec![
        PaymentMethodConfig {
            name: "SBP".to_string(),
            bank: "Альфа-Банк".to_string(),
        },
        PaymentMethodConfig {
            name: "Tinkoff".to_string(),
            bank: "Тинькофф".to_string(),
        },
    ]
}

impl NegotiationConfig {
    #[must_use]
    pub fn methods(&self) -> Vec<PaymentMethod> {
        self.payment_methods.iter().map(PaymentMethod::from).collect()
    }
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            receipt_email: default_receipt_email(),
            payment_phone: String::new(),
            payment_methods: default_payment_methods(),
        }
    }
}
