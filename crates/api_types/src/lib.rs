//! Wire types of the National Bank of Georgia currency endpoint.
//!
//! The endpoint answers with a JSON array whose first element holds the
//! requested rates:
//!
//! ```json
//! [{
//!   "date": "2023-01-26T00:00:00.000Z",
//!   "currencies": [{
//!     "code": "USD",
//!     "quantity": 1,
//!     "rate": 2.6558,
//!     "date": "2023-01-25T17:45:07.251Z",
//!     "validFromDate": "2023-01-26T00:00:00.000Z"
//!   }]
//! }]
//! ```
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub mod rates {
    use super::*;

    /// Official rate of one currency, expressed in GEL per `quantity` units.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CurrencyRate {
        pub code: String,
        pub quantity: u32,
        pub rate: Decimal,
        /// Publication timestamp.
        pub date: DateTime<Utc>,
        pub valid_from_date: DateTime<Utc>,
        #[serde(default)]
        pub name: Option<String>,
        #[serde(default)]
        pub diff: Option<Decimal>,
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct CurrencyRates {
        pub date: DateTime<Utc>,
        pub currencies: Vec<CurrencyRate>,
    }

    impl CurrencyRates {
        /// Takes the first element of a decoded response, if any.
        pub fn from_nbg(response: Vec<CurrencyRates>) -> Option<CurrencyRates> {
            response.into_iter().next()
        }

        /// Finds the rate published for `code`.
        pub fn find(&self, code: &str) -> Option<&CurrencyRate> {
            self.currencies.iter().find(|c| c.code == code)
        }
    }
}
