//! Fixed chat texts sent to counterparties.

use rust_decimal::Decimal;

use crate::domain::{NegotiationState, PaymentDetails};

pub const GREETING: &str = "Здравствуйте!\nОплата будет с Т банка? \n( просто напишите да/нет)";

pub const PDF_QUESTION: &str =
    "Чек в формате пдф с официальной почты Т банка сможете отправить ? \n( просто напишите да/нет)";

pub const SBP_WARNING: &str = "При СБП, если оплата будет на неверный банк, деньги потеряны.\n( просто напишите подтверждаю/ не подтверждаю)";

pub const REJECTION: &str = "Извините, мы не можем продолжить сделку.";

const PAYMENT_TEMPLATE: &str = "Спасибо за подтверждение!

Детали оплаты:
💳 Способ оплаты: {payment_method}
🏦 Банк получателя: {bank}
📱 Номер телефона: {phone}
💰 Сумма: {amount} RUB

📋 ВАЖНО:
1. Переводите ТОЛЬКО с Т-Банка
2. После оплаты отправьте PDF чек на email: {email}
3. Чек должен быть отправлен с официальной почты Т-Банка

⚠️ При отправке на неверный банк деньги будут потеряны!";

/// The question asked while waiting in `state`.
#[must_use]
pub const fn question(state: NegotiationState) -> Option<&'static str> {
    match state {
        NegotiationState::WaitingBankConfirmation => Some(GREETING),
        NegotiationState::WaitingPdfConfirmation => Some(PDF_QUESTION),
        NegotiationState::WaitingSbpConfirmation => Some(SBP_WARNING),
        NegotiationState::Initial
        | NegotiationState::PaymentDetailsSent
        | NegotiationState::Rejected => None,
    }
}

#[must_use]
pub fn payment_details(details: &PaymentDetails, amount: Decimal, email: &str) -> String {
    PAYMENT_TEMPLATE
        .replace("{payment_method}", &details.method)
        .replace("{bank}", &details.bank)
        .replace("{phone}", &details.phone)
        .replace("{amount}", &amount.round_dp(2).normalize().to_string())
        .replace("{email}", email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn every_waiting_state_has_a_question() {
        for state in NegotiationState::ALL {
            let waiting = !state.is_terminal() && state != NegotiationState::Initial;
            assert_eq!(question(state).is_some(), waiting, "{state}");
        }
    }

    #[test]
    fn payment_details_fill_every_placeholder() {
        let details = PaymentDetails {
            method: "SBP".into(),
            bank: "Альфа-Банк".into(),
            phone: "+79990001122".into(),
            sent_at: Utc::now(),
        };
        let text = payment_details(&details, dec!(5000.00), "receipts@example.com");
        assert!(text.contains("Способ оплаты: SBP"));
        assert!(text.contains("Банк получателя: Альфа-Банк"));
        assert!(text.contains("Номер телефона: +79990001122"));
        assert!(text.contains("Сумма: 5000 RUB"));
        assert!(text.contains("email: receipts@example.com"));
        assert!(!text.contains('{'));
    }
}
