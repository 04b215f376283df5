//! Scripted buyer negotiation.
//!
//! The counterparty answers three questions in a fixed order: pays from
//! T-Bank, can send a PDF receipt, accepts the SBP warning. A negative
//! answer at any step ends the deal. Unrecognized answers re-send the
//! current question until the retry budget runs out. Payment details are
//! revealed only after all three confirmations.

mod alternator;
mod classifier;
pub mod script;

pub use alternator::PaymentAlternator;
pub use classifier::{normalize, IntentClassifier, KeywordClassifier};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{
    Direction, NegotiationSession, NegotiationState, PaymentDetails, RejectionReason, Step,
};

#[derive(Debug, Clone)]
pub struct NegotiationSettings {
    /// Re-asks allowed per question before the counterparty is rejected.
    pub max_retries: u32,
    /// Phone number payments are sent to.
    pub payee_phone: String,
    /// Address receipts must be mailed to.
    pub receipt_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Waiting for the next answer.
    Continue,
    PaymentDetailsSent(PaymentDetails),
    Rejected(RejectionReason),
    /// The message was not fed to the protocol.
    Ignored,
}

/// Result of feeding one message to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// Text to send back, if any.
    pub reply: Option<String>,
    pub outcome: Outcome,
}

impl Turn {
    const fn ignored() -> Self {
        Self {
            reply: None,
            outcome: Outcome::Ignored,
        }
    }
}

pub struct NegotiationStateMachine {
    classifier: Box<dyn IntentClassifier>,
    alternator: PaymentAlternator,
    settings: NegotiationSettings,
}

impl NegotiationStateMachine {
    pub fn new(
        classifier: Box<dyn IntentClassifier>,
        alternator: PaymentAlternator,
        settings: NegotiationSettings,
    ) -> Self {
        Self {
            classifier,
            alternator,
            settings,
        }
    }

    #[must_use]
    pub const fn alternator(&self) -> &PaymentAlternator {
        &self.alternator
    }

    /// Start the conversation and return the greeting.
    ///
    /// Returns `None` if the session was already opened.
    pub fn open(&self, session: &mut NegotiationSession, now: DateTime<Utc>) -> Option<String> {
        if session.state != NegotiationState::Initial {
            return None;
        }
        session.state = NegotiationState::WaitingBankConfirmation;
        let text = script::GREETING.to_string();
        session.append(Direction::Outbound, text.clone(), now);
        Some(text)
    }

    /// Feed one counterparty message. `amount` goes into the payment details.
    pub fn handle(
        &self,
        session: &mut NegotiationSession,
        amount: Decimal,
        inbound: &str,
        now: DateTime<Utc>,
    ) -> Turn {
        if session.is_closed() || session.state == NegotiationState::Initial {
            return Turn::ignored();
        }
        session.append(Direction::Inbound, inbound, now);
        session.consumed_inbound += 1;

        let intent = self.classifier.classify(&normalize(inbound));
        match session.state.on_intent(intent) {
            Step::Advance(NegotiationState::PaymentDetailsSent) => {
                let method = self.alternator.next();
                let details = PaymentDetails {
                    method: method.name,
                    bank: method.bank,
                    phone: self.settings.payee_phone.clone(),
                    sent_at: now,
                };
                let text = script::payment_details(&details, amount, &self.settings.receipt_email);
                session.state = NegotiationState::PaymentDetailsSent;
                session.retries = 0;
                session.payment = Some(details.clone());
                Self::reply(session, text, Outcome::PaymentDetailsSent(details), now)
            }
            Step::Advance(next) => {
                session.state = next;
                session.retries = 0;
                match script::question(next) {
                    Some(text) => Self::reply(session, text.to_string(), Outcome::Continue, now),
                    None => Turn {
                        reply: None,
                        outcome: Outcome::Continue,
                    },
                }
            }
            Step::Reask if session.retries >= self.settings.max_retries => {
                Self::reject(session, RejectionReason::Unresponsive, now)
            }
            Step::Reask => {
                session.retries += 1;
                match script::question(session.state) {
                    Some(text) => Self::reply(session, text.to_string(), Outcome::Continue, now),
                    None => Turn::ignored(),
                }
            }
            Step::Reject(reason) => Self::reject(session, reason, now),
            Step::Ignore => Turn::ignored(),
        }
    }

    fn reject(
        session: &mut NegotiationSession,
        reason: RejectionReason,
        now: DateTime<Utc>,
    ) -> Turn {
        session.state = NegotiationState::Rejected;
        session.rejection_reason = Some(reason);
        Self::reply(
            session,
            script::REJECTION.to_string(),
            Outcome::Rejected(reason),
            now,
        )
    }

    fn reply(
        session: &mut NegotiationSession,
        text: String,
        outcome: Outcome,
        now: DateTime<Utc>,
    ) -> Turn {
        session.append(Direction::Outbound, text.clone(), now);
        Turn {
            reply: Some(text),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PaymentMethod, TransactionId};
    use rust_decimal_macros::dec;

    fn machine(max_retries: u32) -> NegotiationStateMachine {
        let alternator = PaymentAlternator::new(vec![
            PaymentMethod::new("SBP", "Альфа-Банк"),
            PaymentMethod::new("Tinkoff", "Тинькофф"),
        ])
        .unwrap();
        NegotiationStateMachine::new(
            Box::new(KeywordClassifier::default()),
            alternator,
            NegotiationSettings {
                max_retries,
                payee_phone: "+79990001122".into(),
                receipt_email: "receipts@example.com".into(),
            },
        )
    }

    fn opened(machine: &NegotiationStateMachine) -> NegotiationSession {
        let mut session = NegotiationSession::new(TransactionId::new(), None, Utc::now());
        assert_eq!(machine.open(&mut session, Utc::now()).as_deref(), Some(script::GREETING));
        session
    }

    fn feed(machine: &NegotiationStateMachine, session: &mut NegotiationSession, text: &str) -> Turn {
        machine.handle(session, dec!(5000), text, Utc::now())
    }

    // --- Happy path ---

    #[test]
    fn three_confirmations_reveal_payment_details() {
        let machine = machine(3);
        let mut session = opened(&machine);

        assert_eq!(feed(&machine, &mut session, "да").reply.as_deref(), Some(script::PDF_QUESTION));
        assert_eq!(feed(&machine, &mut session, "Да!").reply.as_deref(), Some(script::SBP_WARNING));

        let turn = feed(&machine, &mut session, "подтверждаю");
        let Outcome::PaymentDetailsSent(details) = turn.outcome else {
            panic!("expected payment details, got {:?}", turn.outcome);
        };
        assert_eq!(details.method, "SBP");
        assert!(turn.reply.unwrap().contains("+79990001122"));
        assert_eq!(session.state(), NegotiationState::PaymentDetailsSent);
        assert_eq!(session.payment_method(), Some("SBP"));
        assert_eq!(session.consumed_inbound(), 3);
        assert_eq!(session.history().len(), 7);
    }

    #[test]
    fn consecutive_sessions_alternate_methods() {
        let machine = machine(3);
        let mut methods = Vec::new();
        for _ in 0..4 {
            let mut session = opened(&machine);
            feed(&machine, &mut session, "да");
            feed(&machine, &mut session, "да");
            if let Outcome::PaymentDetailsSent(details) = feed(&machine, &mut session, "п").outcome {
                methods.push(details.method);
            }
        }
        assert_eq!(methods, ["SBP", "Tinkoff", "SBP", "Tinkoff"]);
    }

    // --- Rejections ---

    #[test]
    fn no_at_bank_question_rejects() {
        let machine = machine(3);
        let mut session = opened(&machine);
        let turn = feed(&machine, &mut session, "нет");
        assert_eq!(turn.outcome, Outcome::Rejected(RejectionReason::NotUsingTBank));
        assert_eq!(turn.reply.as_deref(), Some(script::REJECTION));
        assert_eq!(session.rejection_reason(), Some(RejectionReason::NotUsingTBank));
        assert_eq!(session.payment_method(), None);
    }

    #[test]
    fn deny_at_sbp_question_rejects() {
        let machine = machine(3);
        let mut session = opened(&machine);
        feed(&machine, &mut session, "да");
        feed(&machine, &mut session, "да");
        let turn = feed(&machine, &mut session, "не подтверждаю");
        assert_eq!(turn.outcome, Outcome::Rejected(RejectionReason::SbpNotConfirmed));
    }

    #[test]
    fn closed_session_ignores_further_input() {
        let machine = machine(3);
        let mut session = opened(&machine);
        feed(&machine, &mut session, "нет");
        let before = session.history().len();
        assert_eq!(feed(&machine, &mut session, "да"), Turn::ignored());
        assert_eq!(session.history().len(), before);
    }

    // --- Re-asks ---

    #[test]
    fn unrecognized_answer_repeats_question_verbatim() {
        let machine = machine(3);
        let mut session = opened(&machine);
        feed(&machine, &mut session, "да");
        let turn = feed(&machine, &mut session, "а что это значит?");
        assert_eq!(turn.outcome, Outcome::Continue);
        assert_eq!(turn.reply.as_deref(), Some(script::PDF_QUESTION));
        assert_eq!(session.state(), NegotiationState::WaitingPdfConfirmation);
        assert_eq!(session.retries(), 1);
    }

    #[test]
    fn retries_exhausted_rejects_as_unresponsive() {
        let machine = machine(2);
        let mut session = opened(&machine);
        assert_eq!(feed(&machine, &mut session, "?").outcome, Outcome::Continue);
        assert_eq!(feed(&machine, &mut session, "??").outcome, Outcome::Continue);
        assert_eq!(
            feed(&machine, &mut session, "???").outcome,
            Outcome::Rejected(RejectionReason::Unresponsive)
        );
    }

    #[test]
    fn advancing_resets_retry_counter() {
        let machine = machine(1);
        let mut session = opened(&machine);
        feed(&machine, &mut session, "хм");
        feed(&machine, &mut session, "да");
        assert_eq!(session.retries(), 0);
        assert_eq!(feed(&machine, &mut session, "хм").outcome, Outcome::Continue);
    }

    #[test]
    fn open_is_one_shot() {
        let machine = machine(3);
        let mut session = opened(&machine);
        assert!(machine.open(&mut session, Utc::now()).is_none());
    }
}
