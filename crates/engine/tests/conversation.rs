use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use engine::{
    ConversationContext, ConversationState, Engine, EngineError, FIRST_RATE_DAY, LookupError,
    OutboundMessage, RateRecord, RateSource, Response, Step,
};

#[derive(Clone, Default)]
struct StubRates {
    rate: Option<Decimal>,
    calls: Arc<Mutex<Vec<(String, NaiveDate)>>>,
}

impl StubRates {
    fn with_rate(rate: &str) -> Self {
        Self {
            rate: Some(dec(rate)),
            ..Self::default()
        }
    }

    fn failing() -> Self {
        Self::default()
    }

    fn calls(&self) -> Vec<(String, NaiveDate)> {
        self.calls.lock().unwrap().clone()
    }
}

impl RateSource for StubRates {
    async fn fetch_rate(
        &self,
        currency_code: &str,
        date: NaiveDate,
    ) -> Result<RateRecord, LookupError> {
        self.calls
            .lock()
            .unwrap()
            .push((currency_code.to_string(), date));
        match self.rate {
            Some(rate) => Ok(RateRecord {
                currency_code: currency_code.to_string(),
                rate,
                effective_date: date,
            }),
            None => Err(LookupError::Network("connection refused".to_string())),
        }
    }
}

fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn income_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 25).unwrap()
}

fn currencies() -> Vec<String> {
    vec!["USD".to_string(), "EUR".to_string(), "GBP".to_string()]
}

fn engine(rates: StubRates) -> Engine<StubRates> {
    Engine::builder()
        .rates(rates)
        .currencies(currencies())
        .clock(today)
        .build()
        .unwrap()
}

fn responses(messages: &[OutboundMessage]) -> Vec<Response> {
    messages.iter().map(|m| m.response.clone()).collect()
}

fn awaiting_amount() -> ConversationContext {
    ConversationContext::from(Step::AwaitingAmount {
        date: income_date(),
        currency: "USD".to_string(),
    })
}

fn awaiting_prior_income() -> ConversationContext {
    ConversationContext::from(Step::AwaitingPriorIncome {
        date: income_date(),
        currency: "USD".to_string(),
        income: dec("1430"),
    })
}

#[tokio::test]
async fn full_conversation_computes_yearly_total_and_tax() {
    let rates = StubRates::with_rate("2.6");
    let engine = engine(rates.clone());
    let mut ctx = ConversationContext::new();

    let reply = engine.handle_input(&mut ctx, "/start").await;
    assert_eq!(reply.state, ConversationState::AwaitingDate);
    assert_eq!(responses(&reply.messages), vec![Response::DatePrompt]);

    let reply = engine.handle_input(&mut ctx, "25.01.2023").await;
    assert_eq!(reply.state, ConversationState::AwaitingCurrency);
    assert_eq!(ctx.income_date(), Some(income_date()));
    assert_eq!(
        responses(&reply.messages),
        vec![Response::CurrencyPrompt {
            choices: currencies()
        }]
    );

    let reply = engine.handle_input(&mut ctx, "USD").await;
    assert_eq!(reply.state, ConversationState::AwaitingAmount);
    assert_eq!(ctx.currency_code(), Some("USD"));
    assert_eq!(
        responses(&reply.messages),
        vec![Response::AmountPrompt {
            date: income_date(),
            currency: "USD".to_string()
        }]
    );

    let reply = engine.handle_input(&mut ctx, "550").await;
    assert_eq!(reply.state, ConversationState::AwaitingPriorIncome);
    assert_eq!(ctx.computed_income(), Some(dec("1430.0")));
    assert_eq!(
        responses(&reply.messages),
        vec![
            Response::AmountReceived {
                amount: dec("550"),
                currency: "USD".to_string()
            },
            Response::FetchingRate,
            Response::RateApplied {
                rate: RateRecord {
                    currency_code: "USD".to_string(),
                    rate: dec("2.6"),
                    effective_date: income_date(),
                }
            },
            Response::Income {
                amount: dec("1430")
            },
            Response::PriorIncomePrompt,
        ]
    );
    assert_eq!(rates.calls(), vec![("USD".to_string(), income_date())]);

    let reply = engine.handle_input(&mut ctx, "1000").await;
    assert_eq!(reply.state, ConversationState::Idle);
    assert!(ctx.is_idle());
    assert_eq!(
        reply.messages,
        vec![
            OutboundMessage::pinned(Response::YearTotal {
                amount: dec("2430.0")
            }),
            Response::Monthly {
                amount: dec("1430.0")
            }
            .into(),
            Response::Tax {
                amount: dec("14.3")
            }
            .into(),
            Response::ThankYou.into(),
        ]
    );
    assert_eq!(reply.messages.iter().filter(|m| m.pinned).count(), 1);
}

#[tokio::test]
async fn malformed_date_is_rejected() {
    let engine = engine(StubRates::with_rate("2.6"));
    let mut ctx = ConversationContext::from(Step::AwaitingDate);

    let reply = engine.handle_input(&mut ctx, "32.13.2023").await;
    assert_eq!(reply.state, ConversationState::AwaitingDate);
    assert_eq!(
        responses(&reply.messages),
        vec![
            Response::InvalidDate {
                input: "32.13.2023".to_string()
            },
            Response::DatePrompt
        ]
    );
}

#[tokio::test]
async fn date_before_2016_is_rejected() {
    let engine = engine(StubRates::with_rate("2.6"));
    let mut ctx = ConversationContext::from(Step::AwaitingDate);

    let reply = engine.handle_input(&mut ctx, "01.01.2010").await;
    assert_eq!(reply.state, ConversationState::AwaitingDate);
    assert_eq!(
        responses(&reply.messages),
        vec![Response::DateBeforeHistory, Response::DatePrompt]
    );
    assert!(ctx.income_date().is_none());
}

#[tokio::test]
async fn future_date_is_rejected() {
    let engine = engine(StubRates::with_rate("2.6"));
    let mut ctx = ConversationContext::from(Step::AwaitingDate);

    let reply = engine.handle_input(&mut ctx, "16.06.2024").await;
    assert_eq!(reply.state, ConversationState::AwaitingDate);
    assert_eq!(
        responses(&reply.messages),
        vec![
            Response::FutureDate {
                input: "16.06.2024".to_string()
            },
            Response::DatePrompt
        ]
    );
}

#[tokio::test]
async fn unknown_currency_shows_the_choices_again() {
    let engine = engine(StubRates::with_rate("2.6"));
    let mut ctx = ConversationContext::from(Step::AwaitingCurrency {
        date: income_date(),
    });

    let reply = engine.handle_input(&mut ctx, "JPY").await;
    assert_eq!(reply.state, ConversationState::AwaitingCurrency);
    assert_eq!(
        responses(&reply.messages),
        vec![Response::CurrencyPrompt {
            choices: currencies()
        }]
    );
    assert_eq!(ctx.income_date(), Some(income_date()));
}

#[tokio::test]
async fn lookup_failure_keeps_the_amount_step() {
    let rates = StubRates::failing();
    let engine = engine(rates.clone());
    let mut ctx = awaiting_amount();

    let reply = engine.handle_input(&mut ctx, "100").await;
    assert_eq!(reply.state, ConversationState::AwaitingAmount);
    assert_eq!(ctx, awaiting_amount());
    assert_eq!(
        responses(&reply.messages),
        vec![
            Response::AmountReceived {
                amount: dec("100"),
                currency: "USD".to_string()
            },
            Response::FetchingRate,
            Response::LookupFailed,
        ]
    );

    // Resending the amount retries the lookup.
    let again = engine.handle_input(&mut ctx, "100").await;
    assert_eq!(again, reply);
    assert_eq!(rates.calls().len(), 2);
}

#[tokio::test]
async fn invalid_amount_does_not_call_the_rate_source() {
    let rates = StubRates::with_rate("2.6");
    let engine = engine(rates.clone());
    let mut ctx = awaiting_amount();

    for input in ["-5", "abc", "", "5 USD"] {
        let reply = engine.handle_input(&mut ctx, input).await;
        assert_eq!(reply.state, ConversationState::AwaitingAmount, "{input}");
        assert_eq!(responses(&reply.messages), vec![Response::InvalidNumber]);
    }
    assert!(rates.calls().is_empty());
}

#[tokio::test]
async fn invalid_prior_income_keeps_the_income() {
    let engine = engine(StubRates::with_rate("2.6"));
    let mut ctx = awaiting_prior_income();

    let reply = engine.handle_input(&mut ctx, "-1000").await;
    assert_eq!(reply.state, ConversationState::AwaitingPriorIncome);
    assert_eq!(responses(&reply.messages), vec![Response::InvalidNumber]);
    assert_eq!(ctx.computed_income(), Some(dec("1430")));
}

#[tokio::test]
async fn cancel_returns_to_idle_from_every_step() {
    let engine = engine(StubRates::with_rate("2.6"));
    let contexts = [
        ConversationContext::from(Step::AwaitingDate),
        ConversationContext::from(Step::AwaitingCurrency {
            date: income_date(),
        }),
        awaiting_amount(),
        awaiting_prior_income(),
    ];

    for input in ["/cancel", "/CANCEL", "cancel", "Cancel"] {
        for ctx in &contexts {
            let mut ctx = ctx.clone();
            let reply = engine.handle_input(&mut ctx, input).await;
            assert_eq!(reply.state, ConversationState::Idle);
            assert_eq!(responses(&reply.messages), vec![Response::Cancelled]);
            assert!(ctx.income_date().is_none());
            assert!(ctx.currency_code().is_none());
            assert!(ctx.computed_income().is_none());
        }
    }
}

#[tokio::test]
async fn idle_ignores_everything_but_start() {
    let engine = engine(StubRates::with_rate("2.6"));
    let mut ctx = ConversationContext::new();

    for input in ["/cancel", "hello", "25.01.2023", "USD"] {
        let reply = engine.handle_input(&mut ctx, input).await;
        assert_eq!(reply.state, ConversationState::Idle);
        assert!(reply.messages.is_empty(), "{input}");
    }
}

#[tokio::test]
async fn start_restarts_an_ongoing_conversation() {
    let engine = engine(StubRates::with_rate("2.6"));
    let mut ctx = awaiting_amount();

    let reply = engine.handle_input(&mut ctx, "/start").await;
    assert_eq!(reply.state, ConversationState::AwaitingDate);
    assert!(ctx.income_date().is_none());
    assert_eq!(responses(&reply.messages), vec![Response::DatePrompt]);
}

#[test]
fn builder_requires_rates_and_currencies() {
    let err = Engine::<StubRates>::builder()
        .currencies(currencies())
        .build()
        .unwrap_err();
    assert_eq!(err, EngineError::MissingRateSource);

    let err = Engine::builder()
        .rates(StubRates::failing())
        .currencies([" ", ""])
        .build()
        .unwrap_err();
    assert_eq!(err, EngineError::NoCurrencies);
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #[test]
    fn rejected_numbers_never_move_the_conversation(input in "-[1-9][0-9]{0,5}(\\.[0-9]{1,3})?|[a-z]{1,8}") {
        prop_assume!(!input.eq_ignore_ascii_case("cancel"));
        let engine = engine(StubRates::with_rate("2.6"));

        for start in [awaiting_amount(), awaiting_prior_income()] {
            let mut ctx = start.clone();
            let first = block_on(engine.handle_input(&mut ctx, &input));
            let second = block_on(engine.handle_input(&mut ctx, &input));

            prop_assert_eq!(&ctx, &start);
            prop_assert_eq!(responses(&first.messages), vec![Response::InvalidNumber]);
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn listed_currencies_advance(index in 0usize..3) {
        let engine = engine(StubRates::with_rate("2.6"));
        let mut ctx = ConversationContext::from(Step::AwaitingCurrency { date: income_date() });
        let currency = currencies()[index].clone();

        let reply = block_on(engine.handle_input(&mut ctx, &currency));
        prop_assert_eq!(reply.state, ConversationState::AwaitingAmount);
        prop_assert_eq!(ctx.currency_code(), Some(currency.as_str()));
    }

    #[test]
    fn dates_in_range_advance(offset in 0i64..=(today() - FIRST_RATE_DAY).num_days()) {
        let engine = engine(StubRates::with_rate("2.6"));
        let mut ctx = ConversationContext::from(Step::AwaitingDate);
        let date = FIRST_RATE_DAY + chrono::Duration::days(offset);

        let reply = block_on(engine.handle_input(&mut ctx, &date.format("%d.%m.%Y").to_string()));
        prop_assert_eq!(reply.state, ConversationState::AwaitingCurrency);
        prop_assert_eq!(ctx.income_date(), Some(date));
    }
}
