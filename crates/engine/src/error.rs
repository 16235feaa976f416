//! The module contains the errors the engine can throw.
//!
//! - [`InputError`] a user input was rejected by the current step. These are
//!   recovered inside the conversation with a corrective prompt.
//! - [`LookupError`] the rate source could not deliver a rate.
//! - [`EngineError`] the engine could not be built.
use thiserror::Error;

/// Engine construction errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EngineError {
    #[error("a rate source is required")]
    MissingRateSource,
    #[error("the currency list is empty")]
    NoCurrencies,
}

/// Why an input was rejected by the step that received it.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputError {
    #[error("date is not a DD.MM.YYYY calendar date")]
    MalformedDate,
    #[error("date is in the future")]
    FutureDate,
    #[error("no rates are published before 2016")]
    BeforeRateHistory,
    #[error("currency is not one of the offered choices")]
    UnknownCurrency,
    #[error("not a non-negative number")]
    InvalidNumber,
}

/// Failure of a single rate lookup.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum LookupError {
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected status: {0}")]
    Status(u16),
    #[error("malformed payload: {0}")]
    Decode(String),
}
