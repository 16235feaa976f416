use api_types::rates::CurrencyRates;
use chrono::NaiveDate;
use engine::{LookupError, RateRecord, RateSource};
use reqwest::Client;

pub(crate) const DEFAULT_RATES_URL: &str =
    "https://nbg.gov.ge/gw/api/ct/monetarypolicy/currencies/en/json/";

const CURRENCIES_PARAM: &str = "currencies";
const DATE_PARAM: &str = "date";

/// Client of the National Bank of Georgia rate endpoint.
#[derive(Clone, Debug)]
pub(crate) struct NbgClient {
    client: Client,
    base_url: String,
}

impl NbgClient {
    pub(crate) fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    async fn get_rate(
        &self,
        currency_code: &str,
        date: NaiveDate,
    ) -> Result<RateRecord, LookupError> {
        let date = date.format("%Y-%m-%d").to_string();
        tracing::debug!("requesting {currency_code} rate for {date}");

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[(CURRENCIES_PARAM, currency_code), (DATE_PARAM, date.as_str())])
            .send()
            .await
            .map_err(network_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let body = resp.text().await.map_err(network_error)?;
        decode_rate(&body, currency_code)
    }
}

impl RateSource for NbgClient {
    async fn fetch_rate(
        &self,
        currency_code: &str,
        date: NaiveDate,
    ) -> Result<RateRecord, LookupError> {
        let result = self.get_rate(currency_code, date).await;
        if let Err(err) = &result {
            tracing::warn!("nbg lookup failed: {err}");
        }
        result
    }
}

fn network_error(err: reqwest::Error) -> LookupError {
    LookupError::Network(err.to_string())
}

/// Picks the rate of `currency_code` out of a raw response body.
pub(crate) fn decode_rate(body: &str, currency_code: &str) -> Result<RateRecord, LookupError> {
    let response: Vec<CurrencyRates> =
        serde_json::from_str(body).map_err(|err| LookupError::Decode(err.to_string()))?;
    let rates = CurrencyRates::from_nbg(response)
        .ok_or_else(|| LookupError::Decode("empty response".to_string()))?;
    let rate = rates
        .find(currency_code)
        .ok_or_else(|| LookupError::Decode(format!("no rate for {currency_code}")))?;

    Ok(RateRecord {
        currency_code: rate.code.clone(),
        rate: rate.rate,
        effective_date: rate.valid_from_date.date_naive(),
    })
}
