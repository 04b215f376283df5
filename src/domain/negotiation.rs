//! Scripted buyer negotiation: protocol states and session history.
//!
//! The transition table lives in [`NegotiationState::on_intent`] as one
//! exhaustive match, so a new state cannot be added without deciding every
//! outgoing edge.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{OrderId, TransactionId};
use super::payment::PaymentDetails;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationState {
    Initial,
    WaitingBankConfirmation,
    WaitingPdfConfirmation,
    WaitingSbpConfirmation,
    PaymentDetailsSent,
    Rejected,
}

/// Classified meaning of one counterparty message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Affirmative,
    Negative,
    Confirm,
    Deny,
    Unrecognized,
}

/// Why a counterparty was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    NotUsingTBank,
    CannotSendPdf,
    SbpNotConfirmed,
    /// Kept answering outside the script after every re-ask.
    Unresponsive,
}

impl RejectionReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotUsingTBank => "not_using_tbank",
            Self::CannotSendPdf => "cannot_send_pdf",
            Self::SbpNotConfirmed => "sbp_not_confirmed",
            Self::Unresponsive => "unresponsive",
        }
    }

    #[must_use]
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::NotUsingTBank => "Not using T-Bank",
            Self::CannotSendPdf => "Cannot send PDF receipt",
            Self::SbpNotConfirmed => "Did not confirm SBP warning",
            Self::Unresponsive => "No recognizable answer after retries",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// What the protocol does with a classified message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Move to the given state.
    Advance(NegotiationState),
    /// Ask the current question again.
    Reask,
    Reject(RejectionReason),
    /// The session does not take input in this state.
    Ignore,
}

impl NegotiationState {
    pub const ALL: [Self; 6] = [
        Self::Initial,
        Self::WaitingBankConfirmation,
        Self::WaitingPdfConfirmation,
        Self::WaitingSbpConfirmation,
        Self::PaymentDetailsSent,
        Self::Rejected,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "INITIAL",
            Self::WaitingBankConfirmation => "WAITING_BANK_CONFIRMATION",
            Self::WaitingPdfConfirmation => "WAITING_PDF_CONFIRMATION",
            Self::WaitingSbpConfirmation => "WAITING_SBP_CONFIRMATION",
            Self::PaymentDetailsSent => "PAYMENT_DETAILS_SENT",
            Self::Rejected => "REJECTED",
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::PaymentDetailsSent | Self::Rejected)
    }

    #[must_use]
    pub const fn on_intent(self, intent: Intent) -> Step {
        use Intent::*;
        match (self, intent) {
            (Self::WaitingBankConfirmation, Affirmative) => {
                Step::Advance(Self::WaitingPdfConfirmation)
            }
            (Self::WaitingBankConfirmation, Negative) => {
                Step::Reject(RejectionReason::NotUsingTBank)
            }
            (Self::WaitingBankConfirmation, Confirm | Deny | Unrecognized) => Step::Reask,

            (Self::WaitingPdfConfirmation, Affirmative) => {
                Step::Advance(Self::WaitingSbpConfirmation)
            }
            (Self::WaitingPdfConfirmation, Negative) => Step::Reject(RejectionReason::CannotSendPdf),
            (Self::WaitingPdfConfirmation, Confirm | Deny | Unrecognized) => Step::Reask,

            (Self::WaitingSbpConfirmation, Confirm) => Step::Advance(Self::PaymentDetailsSent),
            (Self::WaitingSbpConfirmation, Deny | Negative) => {
                Step::Reject(RejectionReason::SbpNotConfirmed)
            }
            (Self::WaitingSbpConfirmation, Affirmative | Unrecognized) => Step::Reask,

            (Self::Initial | Self::PaymentDetailsSent | Self::Rejected, _) => Step::Ignore,
        }
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NegotiationState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| DomainError::UnknownNegotiationState(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// One message in the negotiation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub direction: Direction,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Negotiation bound to one transaction.
///
/// The transcript is append-only. State, retries and the rejection reason
/// are changed by the negotiation state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationSession {
    pub transaction_id: TransactionId,
    pub order_id: Option<OrderId>,
    pub(crate) state: NegotiationState,
    history: Vec<ChatEntry>,
    pub(crate) retries: u32,
    pub(crate) rejection_reason: Option<RejectionReason>,
    /// Counterparty messages already fed through the protocol.
    pub(crate) consumed_inbound: usize,
    /// Details revealed on reaching `PAYMENT_DETAILS_SENT`.
    pub(crate) payment: Option<PaymentDetails>,
    /// Reply decided but not yet delivered to the chat.
    #[serde(default)]
    pub(crate) pending_reply: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NegotiationSession {
    #[must_use]
    pub fn new(transaction_id: TransactionId, order_id: Option<OrderId>, now: DateTime<Utc>) -> Self {
        Self {
            transaction_id,
            order_id,
            state: NegotiationState::Initial,
            history: Vec::new(),
            retries: 0,
            rejection_reason: None,
            consumed_inbound: 0,
            payment: None,
            pending_reply: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub const fn state(&self) -> NegotiationState {
        self.state
    }

    #[must_use]
    pub fn history(&self) -> &[ChatEntry] {
        &self.history
    }

    #[must_use]
    pub const fn retries(&self) -> u32 {
        self.retries
    }

    #[must_use]
    pub const fn rejection_reason(&self) -> Option<RejectionReason> {
        self.rejection_reason
    }

    #[must_use]
    pub const fn consumed_inbound(&self) -> usize {
        self.consumed_inbound
    }

    #[must_use]
    pub fn payment_method(&self) -> Option<&str> {
        self.payment.as_ref().map(|p| p.method.as_str())
    }

    #[must_use]
    pub const fn payment_details(&self) -> Option<&PaymentDetails> {
        self.payment.as_ref()
    }

    #[must_use]
    pub fn pending_reply(&self) -> Option<&str> {
        self.pending_reply.as_deref()
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.state.is_terminal()
    }

    /// The most recent outbound message.
    #[must_use]
    pub fn last_outbound(&self) -> Option<&ChatEntry> {
        self.history
            .iter()
            .rev()
            .find(|entry| entry.direction == Direction::Outbound)
    }

    pub(crate) fn append(&mut self, direction: Direction, text: impl Into<String>, at: DateTime<Utc>) {
        self.history.push(ChatEntry {
            direction,
            text: text.into(),
            at,
        });
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use NegotiationState::*;

    #[test]
    fn yes_no_questions_advance_only_on_affirmative() {
        assert_eq!(
            WaitingBankConfirmation.on_intent(Intent::Affirmative),
            Step::Advance(WaitingPdfConfirmation)
        );
        assert_eq!(
            WaitingPdfConfirmation.on_intent(Intent::Affirmative),
            Step::Advance(WaitingSbpConfirmation)
        );
        assert_eq!(WaitingBankConfirmation.on_intent(Intent::Confirm), Step::Reask);
    }

    #[test]
    fn negative_answers_reject_with_step_reason() {
        assert_eq!(
            WaitingBankConfirmation.on_intent(Intent::Negative),
            Step::Reject(RejectionReason::NotUsingTBank)
        );
        assert_eq!(
            WaitingPdfConfirmation.on_intent(Intent::Negative),
            Step::Reject(RejectionReason::CannotSendPdf)
        );
        assert_eq!(
            WaitingSbpConfirmation.on_intent(Intent::Deny),
            Step::Reject(RejectionReason::SbpNotConfirmed)
        );
        assert_eq!(
            WaitingSbpConfirmation.on_intent(Intent::Negative),
            Step::Reject(RejectionReason::SbpNotConfirmed)
        );
    }

    #[test]
    fn sbp_question_needs_explicit_confirmation() {
        assert_eq!(WaitingSbpConfirmation.on_intent(Intent::Affirmative), Step::Reask);
        assert_eq!(
            WaitingSbpConfirmation.on_intent(Intent::Confirm),
            Step::Advance(PaymentDetailsSent)
        );
    }

    #[test]
    fn closed_and_initial_states_ignore_input() {
        for state in [Initial, PaymentDetailsSent, Rejected] {
            assert_eq!(state.on_intent(Intent::Affirmative), Step::Ignore);
        }
    }

    #[test]
    fn session_history_is_append_only() {
        let now = Utc::now();
        let mut session = NegotiationSession::new(TransactionId::new(), None, now);
        session.append(Direction::Outbound, "question", now);
        session.append(Direction::Inbound, "да", now);
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.last_outbound().map(|e| e.text.as_str()), Some("question"));
    }

    #[test]
    fn state_names_round_trip() {
        for state in NegotiationState::ALL {
            assert_eq!(state.as_str().parse::<NegotiationState>().unwrap(), state);
        }
    }
}
