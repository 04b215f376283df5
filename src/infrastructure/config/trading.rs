//! Which exchanges play which role, order limits and advertisement terms.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::domain::ExchangeKind;

#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    /// Exchange polled for incoming payment requests.
    #[serde(default = "default_source_exchange")]
    pub source_exchange: ExchangeKind,
    /// Exchange where advertisements are published.
    #[serde(default = "default_advertise_on")]
    pub advertise_on: ExchangeKind,
    #[serde(default = "default_min_order_amount")]
    pub min_order_amount: Decimal,
    #[serde(default = "default_max_order_amount")]
    pub max_order_amount: Decimal,
    /// Floor for an advertisement's minimum order.
    #[serde(default = "default_min_ad_amount")]
    pub min_ad_amount: Decimal,
    /// Exchange-side payment method ids attached to advertisements.
    #[serde(default = "default_payment_method_ids")]
    pub payment_method_ids: Vec<String>,
    #[serde(default = "default_ad_remarks")]
    pub ad_remarks: String,
}

const fn default_source_exchange() -> ExchangeKind {
    ExchangeKind::Gate
}

const fn default_advertise_on() -> ExchangeKind {
    ExchangeKind::Bybit
}

fn default_min_order_amount() -> Decimal {
    dec!(1000)
}

fn default_max_order_amount() -> Decimal {
    dec!(50000)
}

fn default_min_ad_amount() -> Decimal {
    dec!(1000)
}

fn default_payment_method_ids() -> Vec<String> {
    vec!["75".to_string(), "382".to_string()]
}

fn default_ad_remarks() -> String {
    "Быстрая сделка. Отправьте чек на email после оплаты.".to_string()
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            source_exchange: default_source_exchange(),
            advertise_on: default_advertise_on(),
            min_order_amount: default_min_order_amount(),
            max_order_amount: default_max_order_amount(),
            min_ad_amount: default_min_ad_amount(),
            payment_method_ids: default_payment_method_ids(),
            ad_remarks: default_ad_remarks(),
        }
    }
}
