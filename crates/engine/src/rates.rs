use std::{future::Future, sync::Arc};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::LookupError;

/// Official rate of a currency for one day.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateRecord {
    pub currency_code: String,
    /// GEL per unit, used verbatim as a multiplier.
    pub rate: Decimal,
    pub effective_date: NaiveDate,
}

/// Source of official exchange rates.
///
/// Implementations perform exactly one round trip per call: no retry and no
/// caching.
pub trait RateSource: Send + Sync {
    fn fetch_rate(
        &self,
        currency_code: &str,
        date: NaiveDate,
    ) -> impl Future<Output = Result<RateRecord, LookupError>> + Send;
}

impl<T: RateSource> RateSource for Arc<T> {
    fn fetch_rate(
        &self,
        currency_code: &str,
        date: NaiveDate,
    ) -> impl Future<Output = Result<RateRecord, LookupError>> + Send {
        (**self).fetch_rate(currency_code, date)
    }
}
