use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::models::{DateRange, Fundamentals, PriceBar};

pub mod yahoo;
pub use yahoo::YahooClient;

/// Simple rate limiter for API requests
pub struct RateLimiter {
    delay_ms: u64,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        let delay_ms = if requests_per_minute > 0 {
            60_000 / requests_per_minute as u64
        } else {
            1000 // Default 1 second delay
        };

        Self { delay_ms }
    }

    pub async fn wait(&self) {
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
    }
}

/// Errors surfaced by a market-data provider.
///
/// `Transport` from the bulk history call means the whole batch produced no
/// data; per-ticker problems are expressed by omitting the ticker from the
/// result map instead.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{endpoint} returned status {status}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },
    #[error("unexpected response shape: {0}")]
    Decode(String),
}

/// Contract between the collector and the upstream market-data source.
///
/// `download_history` maps each requested ticker to its ordered daily series;
/// a ticker absent from the map has no data for the range. There is exactly
/// one result shape, so callers never probe alternatives.
#[async_trait]
pub trait MarketDataProvider {
    async fn download_history(
        &self,
        tickers: &[String],
        range: &DateRange,
    ) -> Result<HashMap<String, Vec<PriceBar>>, ProviderError>;

    async fn fetch_fundamentals(&self, ticker: &str) -> Result<Fundamentals, ProviderError>;
}

#[async_trait]
impl<P: MarketDataProvider + Send + Sync> MarketDataProvider for std::sync::Arc<P> {
    async fn download_history(
        &self,
        tickers: &[String],
        range: &DateRange,
    ) -> Result<HashMap<String, Vec<PriceBar>>, ProviderError> {
        (**self).download_history(tickers, range).await
    }

    async fn fetch_fundamentals(&self, ticker: &str) -> Result<Fundamentals, ProviderError> {
        (**self).fetch_fundamentals(ticker).await
    }
}

/// Convert a Unix timestamp (seconds) to the trading date it falls on.
pub(crate) fn timestamp_to_date(ts: i64) -> Option<NaiveDate> {
    chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
}
