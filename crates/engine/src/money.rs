//! Income arithmetic.
//!
//! Every figure is rounded to [`ROUND_DP`] places with banker's rounding
//! (half to even), the same rule for all of them.
use rust_decimal::{Decimal, RoundingStrategy};

/// Currency every computed figure is expressed in.
pub const REFERENCE_CURRENCY: &str = "GEL";

pub const ROUND_DP: u32 = 4;

/// Flat tax rate on the monthly income (1%).
pub const TAX_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

pub fn round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(ROUND_DP, RoundingStrategy::MidpointNearestEven)
}

/// Converts `amount` foreign units at `rate` into GEL.
///
/// Returns `None` when the product does not fit a [`Decimal`].
pub fn convert(rate: Decimal, amount: Decimal) -> Option<Decimal> {
    rate.checked_mul(amount).map(round)
}

/// Figures reported at the end of a conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IncomeSummary {
    /// Income of the year so far: this month's income plus the prior total.
    pub year_total: Decimal,
    pub monthly: Decimal,
    pub tax: Decimal,
}

impl IncomeSummary {
    pub fn compute(income: Decimal, prior: Decimal) -> Option<Self> {
        Some(Self {
            year_total: round(income.checked_add(prior)?),
            monthly: round(income),
            tax: round(income.checked_mul(TAX_RATE)?),
        })
    }
}
