//! Input predicates of the conversation steps.
//!
//! Each predicate takes the raw text and answers with the accepted value or
//! the [`InputError`] kind, so the transition table never deals with text
//! matching directly.
use std::{str::FromStr, sync::LazyLock};

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

use crate::InputError;

/// First day the rate source publishes rates for.
pub const FIRST_RATE_DAY: NaiveDate = match NaiveDate::from_ymd_opt(2016, 1, 1) {
    Some(date) => date,
    None => panic!("invalid first rate day"),
};

pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Smallest positive value `Decimal` holds (scale 28).
const SMALLEST_STEP: f64 = 1e-28;

#[allow(clippy::expect_used)]
static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(0[1-9]|[12]\d|3[01])\.(0[1-9]|1[0-2])\.\d{4}$").expect("valid date pattern")
});

/// Commands recognised in every step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Cancel,
}

/// Recognises `/start`, `/cancel` (optionally addressed as `/cancel@bot`) and
/// a bare `cancel`, ignoring case.
pub fn parse_command(input: &str) -> Option<Command> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("cancel") {
        return Some(Command::Cancel);
    }

    let token = trimmed.split_whitespace().next()?.strip_prefix('/')?;
    let name = token.split_once('@').map_or(token, |(name, _)| name);
    match name.to_ascii_lowercase().as_str() {
        "start" => Some(Command::Start),
        "cancel" => Some(Command::Cancel),
        _ => None,
    }
}

/// Parses a `DD.MM.YYYY` date lying in `[FIRST_RATE_DAY, today]`.
pub fn parse_date(input: &str, today: NaiveDate) -> Result<NaiveDate, InputError> {
    let input = input.trim();
    if !DATE_PATTERN.is_match(input) {
        return Err(InputError::MalformedDate);
    }
    let date =
        NaiveDate::parse_from_str(input, DATE_FORMAT).map_err(|_| InputError::MalformedDate)?;
    check_date_range(date, today)
}

pub fn check_date_range(date: NaiveDate, today: NaiveDate) -> Result<NaiveDate, InputError> {
    if date > today {
        Err(InputError::FutureDate)
    } else if date < FIRST_RATE_DAY {
        Err(InputError::BeforeRateHistory)
    } else {
        Ok(date)
    }
}

/// Returns the offered choice equal to `input`. Matching is exact.
pub fn check_currency<'a>(input: &str, choices: &'a [String]) -> Result<&'a str, InputError> {
    let input = input.trim();
    choices
        .iter()
        .find(|c| c.as_str() == input)
        .map(String::as_str)
        .ok_or(InputError::UnknownCurrency)
}

/// Parses a non-negative number. Accepts `.` or `,` as decimal separator and
/// scientific notation.
///
/// Positive values below `Decimal`'s smallest step read as zero. Values above
/// `Decimal::MAX` are rejected.
pub fn parse_amount(input: &str) -> Result<Decimal, InputError> {
    let normalized = input.trim().replace(',', ".");
    let value = match Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
    {
        Ok(value) => value,
        Err(_) => underflow_to_zero(&normalized)?,
    };

    if value.is_zero() {
        return Ok(Decimal::ZERO);
    }
    if value.is_sign_negative() {
        return Err(InputError::InvalidNumber);
    }
    Ok(value)
}

fn underflow_to_zero(input: &str) -> Result<Decimal, InputError> {
    match input.parse::<f64>() {
        Ok(value) if (0.0..SMALLEST_STEP).contains(&value) => Ok(Decimal::ZERO),
        _ => Err(InputError::InvalidNumber),
    }
}
