//! Telegram rendering of engine responses.
//!
//! Texts are in Russian and use Telegram HTML; user input is escaped.
use engine::{REFERENCE_CURRENCY, Response};
use rust_decimal::Decimal;
use teloxide::{
    types::{KeyboardButton, KeyboardMarkup, KeyboardRemove, ReplyMarkup},
    utils::html,
};

const DATE_PROMPT: &str = "Введите дату получения дохода из банковского приложения в формате ДД.ММ.ГГГГ, например 25.01.2023";
const NUMBER_HINT: &str =
    "Введите целое или дробное число больше 0 без знака валют и других символов";

#[derive(Clone, Debug)]
pub(crate) struct Rendered {
    pub text: String,
    pub markup: Option<ReplyMarkup>,
    /// Send as a reply to the user's message.
    pub quote: bool,
}

impl Rendered {
    fn answer(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: None,
            quote: false,
        }
    }

    fn reply(text: impl Into<String>) -> Self {
        Self {
            quote: true,
            ..Self::answer(text)
        }
    }

    fn remove_keyboard(mut self) -> Self {
        self.markup = Some(ReplyMarkup::KeyboardRemove(KeyboardRemove::new()));
        self
    }
}

pub(crate) fn render(response: &Response) -> Rendered {
    match response {
        Response::DatePrompt => Rendered::answer(DATE_PROMPT).remove_keyboard(),
        Response::InvalidDate { input } => {
            Rendered::answer(format!("Вы ввели неверную дату {}", html::escape(input)))
        }
        Response::FutureDate { input } => Rendered::reply(format!(
            "Эх хотел бы я знать какой курс будет {}, но не могу",
            html::escape(input)
        )),
        Response::DateBeforeHistory => Rendered::reply("Раньше 2016 года я не могу узнать курс"),
        Response::CurrencyPrompt { choices } => Rendered {
            markup: Some(ReplyMarkup::Keyboard(currency_keyboard(choices))),
            ..Rendered::answer("Выберите валюту из предложенных")
        },
        Response::AmountPrompt { date, currency } => Rendered::answer(format!(
            "Введите сумму полученную {} в {}, например 550",
            date.format("%Y-%m-%d"),
            html::escape(currency)
        ))
        .remove_keyboard(),
        Response::InvalidNumber => Rendered::reply(NUMBER_HINT),
        Response::AmountReceived { amount, currency } => Rendered::reply(format!(
            "Вы ввели {} {}",
            format_amount(*amount),
            html::escape(currency)
        )),
        Response::FetchingRate => Rendered::answer("Запрашиваю данные в nbg.gov.ge"),
        Response::RateApplied { rate } => Rendered::answer(format!(
            "По курсу {} на {}: {} ваш доход составил",
            html::italic(&rate.currency_code),
            rate.effective_date.format("%Y-%m-%d"),
            html::bold(&rate.rate.normalize().to_string())
        )),
        Response::Income { amount } => Rendered::answer(format!(
            "{} {REFERENCE_CURRENCY}",
            html::code_inline(&format_amount(*amount))
        )),
        Response::PriorIncomePrompt => {
            Rendered::answer("Введите итоговый доход за прошлый отчетный период (пункт 15)")
        }
        Response::YearTotal { amount } => Rendered::answer(format!(
            "Итого за год (15) = {}",
            html::code_inline(&format_amount(*amount))
        )),
        Response::Monthly { amount } => {
            Rendered::answer(format!("За месяц (17) = {}", format_amount(*amount)))
        }
        Response::Tax { amount } => {
            Rendered::answer(format!("Налог 1% (19) = {}", format_amount(*amount)))
        }
        Response::ThankYou => Rendered::answer("Спасибо, что воспользовались моими услугами"),
        Response::Cancelled => Rendered::answer("Отменено.").remove_keyboard(),
        Response::LookupFailed => Rendered::reply(
            "Не удалось получить курс из nbg.gov.ge, попробуйте отправить сумму ещё раз",
        ),
    }
}

fn currency_keyboard(choices: &[String]) -> KeyboardMarkup {
    let row = choices.iter().map(KeyboardButton::new).collect::<Vec<_>>();
    KeyboardMarkup::new(vec![row]).resize_keyboard()
}

fn format_amount(amount: Decimal) -> String {
    amount.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::NaiveDate;
    use engine::RateRecord;

    use super::*;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    #[test]
    fn date_prompt_removes_keyboard() {
        let rendered = render(&Response::DatePrompt);
        assert!(rendered.text.contains("25.01.2023"));
        assert!(matches!(rendered.markup, Some(ReplyMarkup::KeyboardRemove(_))));
        assert!(!rendered.quote);
    }

    #[test]
    fn currency_prompt_offers_choices() {
        let rendered = render(&Response::CurrencyPrompt {
            choices: vec!["USD".to_string(), "EUR".to_string()],
        });
        let Some(ReplyMarkup::Keyboard(keyboard)) = rendered.markup else {
            panic!("expected a reply keyboard");
        };
        let labels: Vec<_> = keyboard.keyboard[0].iter().map(|b| b.text.as_str()).collect();
        assert_eq!(labels, ["USD", "EUR"]);
        assert!(keyboard.resize_keyboard);
    }

    #[test]
    fn user_input_is_escaped() {
        let rendered = render(&Response::InvalidDate {
            input: "<b>1</b>".to_string(),
        });
        assert_eq!(rendered.text, "Вы ввели неверную дату &lt;b&gt;1&lt;/b&gt;");
    }

    #[test]
    fn figures_are_printed_without_trailing_zeros() {
        assert_eq!(
            render(&Response::YearTotal {
                amount: dec("2430.0")
            })
            .text,
            "Итого за год (15) = <code>2430</code>"
        );
        assert_eq!(
            render(&Response::Tax {
                amount: dec("14.300")
            })
            .text,
            "Налог 1% (19) = 14.3"
        );
    }

    #[test]
    fn rate_breakdown() {
        let rendered = render(&Response::RateApplied {
            rate: RateRecord {
                currency_code: "USD".to_string(),
                rate: dec("2.6558"),
                effective_date: NaiveDate::from_ymd_opt(2023, 1, 26).unwrap(),
            },
        });
        assert_eq!(
            rendered.text,
            "По курсу <i>USD</i> на 2023-01-26: <b>2.6558</b> ваш доход составил"
        );
    }

    #[test]
    fn rejections_quote_the_input() {
        assert!(render(&Response::InvalidNumber).quote);
        assert!(render(&Response::DateBeforeHistory).quote);
        assert!(render(&Response::LookupFailed).quote);
    }
}
