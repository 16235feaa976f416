use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{ConversationState, RateRecord};

/// What the engine wants to tell the user. Rendering is left to the
/// transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    DatePrompt,
    InvalidDate { input: String },
    FutureDate { input: String },
    DateBeforeHistory,
    CurrencyPrompt { choices: Vec<String> },
    AmountPrompt { date: NaiveDate, currency: String },
    InvalidNumber,
    AmountReceived { amount: Decimal, currency: String },
    FetchingRate,
    RateApplied { rate: RateRecord },
    /// Converted income in GEL.
    Income { amount: Decimal },
    PriorIncomePrompt,
    YearTotal { amount: Decimal },
    Monthly { amount: Decimal },
    Tax { amount: Decimal },
    ThankYou,
    Cancelled,
    LookupFailed,
}

impl Response {
    /// `true` for the messages that reject an input.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Response::InvalidDate { .. }
                | Response::FutureDate { .. }
                | Response::DateBeforeHistory
                | Response::InvalidNumber
                | Response::LookupFailed
        )
    }
}

/// A response plus the transport hint to pin it as the conversation summary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    pub response: Response,
    pub pinned: bool,
}

impl OutboundMessage {
    pub fn pinned(response: Response) -> Self {
        Self {
            response,
            pinned: true,
        }
    }
}

impl From<Response> for OutboundMessage {
    fn from(response: Response) -> Self {
        Self {
            response,
            pinned: false,
        }
    }
}

/// Result of handling one input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub messages: Vec<OutboundMessage>,
    pub state: ConversationState,
}

impl Reply {
    pub fn responses(&self) -> impl Iterator<Item = &Response> {
        self.messages.iter().map(|m| &m.response)
    }
}
