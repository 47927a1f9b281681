//! Alpha Vantage data provider.
//!
//! Fetches the `TIME_SERIES_DAILY` endpoint and reshapes its date-keyed,
//! string-typed payload into a [`QuoteTable`]. One call issues exactly one
//! request; retrying is the acquisition layer's job.
//!
//! The API reports most failures with HTTP 200 and an explanatory key instead
//! of the time series, so the body is classified before it is parsed.

use super::provider::{DataError, QuoteProvider};
use crate::config::AlphaVantageConfig;
use crate::domain::{Quote, QuoteTable};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// `TIME_SERIES_DAILY` response body.
#[derive(Debug, Deserialize)]
struct DailyResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<BTreeMap<String, DailyEntry>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyEntry {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

/// Alpha Vantage data provider.
pub struct AlphaVantageProvider {
    client: reqwest::blocking::Client,
    config: AlphaVantageConfig,
}

impl AlphaVantageProvider {
    pub fn new(config: AlphaVantageConfig) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Parse a `TIME_SERIES_DAILY` body into a quote table.
    pub fn parse_response(symbol: &str, body: &str) -> Result<QuoteTable, DataError> {
        let resp: DailyResponse = serde_json::from_str(body).map_err(|e| {
            DataError::ResponseFormat(format!("failed to parse response for {symbol}: {e}"))
        })?;

        let series = match resp.time_series {
            Some(series) => series,
            None => {
                if let Some(message) = resp.error_message {
                    return Err(DataError::SymbolNotFound {
                        symbol: symbol.to_string(),
                        message,
                    });
                }
                if let Some(message) = resp.note.or(resp.information) {
                    return Err(DataError::RateLimited(message));
                }
                return Err(DataError::ResponseFormat(format!(
                    "missing 'Time Series (Daily)' for {symbol}"
                )));
            }
        };

        let rows = series
            .into_iter()
            .map(|(date, entry)| parse_entry(&date, &entry))
            .collect::<Result<Vec<_>, _>>()?;

        QuoteTable::from_rows(rows)
    }
}

fn parse_entry(date: &str, entry: &DailyEntry) -> Result<(NaiveDate, Quote), DataError> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| DataError::ResponseFormat(format!("invalid date '{date}': {e}")))?;

    let num = |name: &str, raw: &str| -> Result<f64, DataError> {
        raw.trim().parse::<f64>().map_err(|e| {
            DataError::ResponseFormat(format!("invalid {name} '{raw}' on {date}: {e}"))
        })
    };

    Ok((
        date,
        Quote {
            open: num("open", &entry.open)?,
            high: num("high", &entry.high)?,
            low: num("low", &entry.low)?,
            close: num("close", &entry.close)?,
            volume: num("volume", &entry.volume)?,
        },
    ))
}

impl QuoteProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        "alpha_vantage"
    }

    fn fetch(&self, ticker: &str) -> Result<QuoteTable, DataError> {
        debug!(
            ticker,
            url = %self.config.base_url,
            output_size = self.config.output_size.as_str(),
            "requesting daily series"
        );

        let resp = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", ticker),
                ("outputsize", self.config.output_size.as_str()),
                ("apikey", self.config.api_key.as_str()),
            ])
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::Http {
                status: status.as_u16(),
                symbol: ticker.to_string(),
            });
        }

        let body = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        Self::parse_response(ticker, &body)
    }
}
