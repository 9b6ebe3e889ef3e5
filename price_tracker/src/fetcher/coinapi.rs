//! CoinAPI exchange-rate client.
//!
//! Current rate: `GET {base}/v1/exchangerate/{SYMBOL}/{QUOTE}` with the
//! `X-CoinAPI-Key` header, answering `{"rate": ...}`. History:
//! `GET .../history?period_id=1MIN&time_start=..&time_end=..&limit=..`, answering an
//! array of 1-minute periods of which `time_period_start` and `rate_close` are used.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use price_common::defaults::{COINAPI_BASE_URL, HISTORY_CAPACITY, HTTP_TIMEOUT_SECS, QUOTE_CURRENCY};
use price_common::{PriceSample, Result, TrackerError};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::QuoteFetcher;

const API_KEY_HEADER: &str = "X-CoinAPI-Key";

#[derive(Debug, Deserialize)]
struct RateResponse {
    rate: f64,
}

#[derive(Debug, Deserialize)]
struct HistoryPeriod {
    time_period_start: DateTime<Utc>,
    rate_close: f64,
}

/// Blocking CoinAPI client.
#[derive(Clone)]
pub struct CoinApiFetcher {
    client: Client,
    base_url: String,
    api_key: String,
    quote_currency: String,
}

impl CoinApiFetcher {
    /// Build a client against the public endpoint with default timeouts.
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_options(
            COINAPI_BASE_URL,
            api_key,
            QUOTE_CURRENCY,
            Duration::from_secs(HTTP_TIMEOUT_SECS),
        )
    }

    /// Build a client with an explicit base URL, quote currency, and timeout.
    ///
    /// `timeout` bounds both connecting and the whole request.
    pub fn with_options(
        base_url: &str,
        api_key: &str,
        quote_currency: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| TrackerError::Fetch(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            quote_currency: quote_currency.to_uppercase(),
        })
    }

    fn rate_url(&self, symbol: &str) -> String {
        format!(
            "{}/v1/exchangerate/{}/{}",
            self.base_url, symbol, self.quote_currency
        )
    }

    fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(query)
            .send()
            .map_err(|e| TrackerError::Fetch(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(TrackerError::Fetch(format!("{url} answered {status}")));
        }

        let body = response
            .text()
            .map_err(|e| TrackerError::Fetch(format!("could not read body from {url}: {e}")))?;
        decode_body(&body)
    }
}

/// Decode a JSON response body; malformed bodies surface as `TrackerError::SerdeJson`.
fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T> {
    Ok(serde_json::from_str(body)?)
}

impl QuoteFetcher for CoinApiFetcher {
    fn fetch_price(&self, symbol: &str) -> Result<f64> {
        let body: RateResponse = self.get(&self.rate_url(symbol), &[])?;
        if !body.rate.is_finite() {
            return Err(TrackerError::Fetch(format!(
                "non-finite rate for {symbol}: {}",
                body.rate
            )));
        }
        Ok(body.rate)
    }

    fn fetch_history(&self, symbol: &str, window: Duration) -> Result<Vec<PriceSample>> {
        let end = Utc::now();
        let span = chrono::Duration::from_std(window)
            .map_err(|e| TrackerError::Format(format!("window out of range: {e}")))?;
        let start = end - span;

        let url = format!("{}/history", self.rate_url(symbol));
        let query = [
            ("period_id", "1MIN".to_string()),
            ("time_start", format_time(start)),
            ("time_end", format_time(end)),
            ("limit", HISTORY_CAPACITY.to_string()),
        ];
        let periods: Vec<HistoryPeriod> = self.get(&url, &query)?;

        let mut samples: Vec<PriceSample> = periods
            .into_iter()
            .filter(|p| p.rate_close.is_finite())
            .map(|p| PriceSample::new(p.time_period_start, p.rate_close))
            .collect();
        samples.sort_by_key(|s| s.timestamp);
        Ok(samples)
    }
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}
