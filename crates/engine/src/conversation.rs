//! Per-user conversation state.
//!
//! The step carries the data collected so far, so a context can never hold a
//! currency without a date, or an income outside the last step.
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Which input the conversation is waiting for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConversationState {
    Idle,
    AwaitingDate,
    AwaitingCurrency,
    AwaitingAmount,
    AwaitingPriorIncome,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Step {
    #[default]
    Idle,
    AwaitingDate,
    AwaitingCurrency {
        date: NaiveDate,
    },
    AwaitingAmount {
        date: NaiveDate,
        currency: String,
    },
    AwaitingPriorIncome {
        date: NaiveDate,
        currency: String,
        /// Converted income in GEL, already rounded.
        income: Decimal,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConversationContext {
    step: Step,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> &Step {
        &self.step
    }

    pub(crate) fn advance(&mut self, step: Step) {
        self.step = step;
    }

    /// Drops every collected field and goes back to [`ConversationState::Idle`].
    pub fn reset(&mut self) {
        self.step = Step::Idle;
    }

    pub fn state(&self) -> ConversationState {
        match self.step {
            Step::Idle => ConversationState::Idle,
            Step::AwaitingDate => ConversationState::AwaitingDate,
            Step::AwaitingCurrency { .. } => ConversationState::AwaitingCurrency,
            Step::AwaitingAmount { .. } => ConversationState::AwaitingAmount,
            Step::AwaitingPriorIncome { .. } => ConversationState::AwaitingPriorIncome,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.step == Step::Idle
    }

    pub fn income_date(&self) -> Option<NaiveDate> {
        match &self.step {
            Step::AwaitingCurrency { date }
            | Step::AwaitingAmount { date, .. }
            | Step::AwaitingPriorIncome { date, .. } => Some(*date),
            Step::Idle | Step::AwaitingDate => None,
        }
    }

    pub fn currency_code(&self) -> Option<&str> {
        match &self.step {
            Step::AwaitingAmount { currency, .. } | Step::AwaitingPriorIncome { currency, .. } => {
                Some(currency)
            }
            _ => None,
        }
    }

    pub fn computed_income(&self) -> Option<Decimal> {
        match &self.step {
            Step::AwaitingPriorIncome { income, .. } => Some(*income),
            _ => None,
        }
    }
}

impl From<Step> for ConversationContext {
    fn from(step: Step) -> Self {
        Self { step }
    }
}
