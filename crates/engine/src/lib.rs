//! Income conversation engine.
//!
//! Guides a user through date, currency, amount and prior income, converts
//! the amount to GEL at the official rate of that day and reports the yearly
//! total and the 1% tax. The engine owns no transport: it receives raw text
//! with the user's [`ConversationContext`] and answers with a [`Reply`].
use std::{fmt, sync::Arc};

use chrono::{NaiveDate, Utc};
use chrono_tz::Asia::Tbilisi;
use rust_decimal::Decimal;

pub use conversation::{ConversationContext, ConversationState, Step};
pub use error::{EngineError, InputError, LookupError};
pub use money::{IncomeSummary, REFERENCE_CURRENCY, TAX_RATE};
pub use rates::{RateRecord, RateSource};
pub use response::{OutboundMessage, Reply, Response};
pub use validation::{Command, FIRST_RATE_DAY};

mod conversation;
mod error;
pub mod money;
mod rates;
mod response;
pub mod validation;

type ResultEngine<T> = Result<T, EngineError>;

/// Returns the current calendar day.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

pub struct Engine<R> {
    rates: R,
    currencies: Vec<String>,
    clock: Clock,
}

impl<R> fmt::Debug for Engine<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("currencies", &self.currencies)
            .finish_non_exhaustive()
    }
}

impl<R: RateSource> Engine<R> {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder<R> {
        EngineBuilder::default()
    }

    /// Currencies offered in the currency step.
    pub fn currencies(&self) -> &[String] {
        &self.currencies
    }

    /// Handles one input of the conversation owned by `ctx`.
    ///
    /// Rejected inputs leave `ctx` untouched. The only suspending call is the
    /// rate lookup of the amount step, so callers must not feed another input
    /// for the same context until this returns.
    pub async fn handle_input(&self, ctx: &mut ConversationContext, input: &str) -> Reply {
        let messages = match validation::parse_command(input) {
            Some(Command::Start) => self.start(ctx),
            Some(Command::Cancel) => cancel(ctx),
            None => self.step(ctx, input).await,
        };

        Reply {
            messages,
            state: ctx.state(),
        }
    }

    fn start(&self, ctx: &mut ConversationContext) -> Vec<OutboundMessage> {
        if !ctx.is_idle() {
            tracing::debug!("restarting conversation from {:?}", ctx.state());
        }
        ctx.advance(Step::AwaitingDate);
        vec![Response::DatePrompt.into()]
    }

    async fn step(&self, ctx: &mut ConversationContext, input: &str) -> Vec<OutboundMessage> {
        match ctx.step().clone() {
            Step::Idle => Vec::new(),
            Step::AwaitingDate => self.accept_date(ctx, input),
            Step::AwaitingCurrency { date } => self.accept_currency(ctx, date, input),
            Step::AwaitingAmount { date, currency } => {
                self.accept_amount(ctx, date, currency, input).await
            }
            Step::AwaitingPriorIncome { income, .. } => accept_prior_income(ctx, income, input),
        }
    }

    fn accept_date(&self, ctx: &mut ConversationContext, input: &str) -> Vec<OutboundMessage> {
        let rejection = match validation::parse_date(input, (self.clock)()) {
            Ok(date) => {
                tracing::debug!("income date {date}");
                ctx.advance(Step::AwaitingCurrency { date });
                return vec![self.currency_prompt()];
            }
            Err(InputError::FutureDate) => Response::FutureDate {
                input: input.trim().to_string(),
            },
            Err(InputError::BeforeRateHistory) => Response::DateBeforeHistory,
            Err(_) => Response::InvalidDate {
                input: input.trim().to_string(),
            },
        };

        vec![rejection.into(), Response::DatePrompt.into()]
    }

    fn accept_currency(
        &self,
        ctx: &mut ConversationContext,
        date: NaiveDate,
        input: &str,
    ) -> Vec<OutboundMessage> {
        let Ok(currency) = validation::check_currency(input, &self.currencies) else {
            return vec![self.currency_prompt()];
        };

        let currency = currency.to_string();
        ctx.advance(Step::AwaitingAmount {
            date,
            currency: currency.clone(),
        });
        vec![Response::AmountPrompt { date, currency }.into()]
    }

    async fn accept_amount(
        &self,
        ctx: &mut ConversationContext,
        date: NaiveDate,
        currency: String,
        input: &str,
    ) -> Vec<OutboundMessage> {
        let Ok(amount) = validation::parse_amount(input) else {
            return vec![Response::InvalidNumber.into()];
        };

        let mut messages: Vec<OutboundMessage> = vec![
            Response::AmountReceived {
                amount,
                currency: currency.clone(),
            }
            .into(),
            Response::FetchingRate.into(),
        ];

        let record = match self.rates.fetch_rate(&currency, date).await {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!("rate lookup for {currency} on {date} failed: {err}");
                messages.push(Response::LookupFailed.into());
                return messages;
            }
        };

        let Some(income) = money::convert(record.rate, amount) else {
            return vec![Response::InvalidNumber.into()];
        };

        tracing::debug!("income {income} {REFERENCE_CURRENCY} at {}", record.rate);
        ctx.advance(Step::AwaitingPriorIncome {
            date,
            currency,
            income,
        });
        messages.extend([
            Response::RateApplied { rate: record }.into(),
            Response::Income { amount: income }.into(),
            Response::PriorIncomePrompt.into(),
        ]);
        messages
    }

    fn currency_prompt(&self) -> OutboundMessage {
        Response::CurrencyPrompt {
            choices: self.currencies.clone(),
        }
        .into()
    }
}

fn accept_prior_income(
    ctx: &mut ConversationContext,
    income: Decimal,
    input: &str,
) -> Vec<OutboundMessage> {
    let Some(summary) = validation::parse_amount(input)
        .ok()
        .and_then(|prior| IncomeSummary::compute(income, prior))
    else {
        return vec![Response::InvalidNumber.into()];
    };

    ctx.reset();
    vec![
        OutboundMessage::pinned(Response::YearTotal {
            amount: summary.year_total,
        }),
        Response::Monthly {
            amount: summary.monthly,
        }
        .into(),
        Response::Tax {
            amount: summary.tax,
        }
        .into(),
        Response::ThankYou.into(),
    ]
}

fn cancel(ctx: &mut ConversationContext) -> Vec<OutboundMessage> {
    if ctx.is_idle() {
        return Vec::new();
    }

    tracing::info!("Cancelling state {:?}", ctx.state());
    ctx.reset();
    vec![Response::Cancelled.into()]
}

/// Today in Tbilisi, the day the rate source publishes for.
fn tbilisi_today() -> NaiveDate {
    Utc::now().with_timezone(&Tbilisi).date_naive()
}

pub struct EngineBuilder<R> {
    rates: Option<R>,
    currencies: Vec<String>,
    clock: Option<Clock>,
}

impl<R> Default for EngineBuilder<R> {
    fn default() -> Self {
        Self {
            rates: None,
            currencies: Vec::new(),
            clock: None,
        }
    }
}

impl<R: RateSource> EngineBuilder<R> {
    /// Pass the required rate source
    pub fn rates(mut self, rates: R) -> EngineBuilder<R> {
        self.rates = Some(rates);
        self
    }

    /// Currencies offered to the user, in display order.
    pub fn currencies<I, S>(mut self, currencies: I) -> EngineBuilder<R>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.currencies = currencies
            .into_iter()
            .map(Into::into)
            .map(|c: String| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        self
    }

    /// Overrides the source of "today". Defaults to the Tbilisi calendar day.
    pub fn clock(
        mut self,
        clock: impl Fn() -> NaiveDate + Send + Sync + 'static,
    ) -> EngineBuilder<R> {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> ResultEngine<Engine<R>> {
        let rates = self.rates.ok_or(EngineError::MissingRateSource)?;
        if self.currencies.is_empty() {
            return Err(EngineError::NoCurrencies);
        }

        Ok(Engine {
            rates,
            currencies: self.currencies,
            clock: self.clock.unwrap_or_else(|| Arc::new(tbilisi_today)),
        })
    }
}
