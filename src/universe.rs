//! Ticker-universe discovery from exchange listing files
//!
//! NASDAQ symbols come from the datasets mirror on GitHub with the
//! nasdaqtrader symbol directory as fallback; NYSE and other exchanges come
//! from the `otherlisted` symbol directory. A source that cannot be reached
//! contributes zero tickers instead of failing discovery.

use anyhow::{anyhow, Result};
use reqwest::Client;
use std::collections::BTreeSet;
use tracing::{error, info};

use crate::models::Config;

const NASDAQ_PRIMARY_URL: &str =
    "https://raw.githubusercontent.com/datasets/nasdaq-listings/master/data/nasdaq-listed.csv";
const NASDAQ_FALLBACK_URL: &str =
    "https://www.nasdaqtrader.com/dynamic/symdir/nasdaqlisted.txt";
const OTHER_LISTED_URL: &str = "https://www.nasdaqtrader.com/dynamic/symdir/otherlisted.txt";

pub struct UniverseSource {
    client: Client,
    nasdaq_primary_url: String,
    nasdaq_fallback_url: String,
    other_listed_url: String,
}

impl UniverseSource {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_urls(
            config,
            NASDAQ_PRIMARY_URL,
            NASDAQ_FALLBACK_URL,
            OTHER_LISTED_URL,
        )
    }

    /// Construct against explicit listing URLs (used by tests).
    pub fn with_urls(
        config: &Config,
        nasdaq_primary_url: &str,
        nasdaq_fallback_url: &str,
        other_listed_url: &str,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .user_agent("stock-harvest/1.0")
            .build()?;

        Ok(Self {
            client,
            nasdaq_primary_url: nasdaq_primary_url.to_string(),
            nasdaq_fallback_url: nasdaq_fallback_url.to_string(),
            other_listed_url: other_listed_url.to_string(),
        })
    }

    /// Discover the full ticker universe across both exchange sources
    pub async fn fetch_all(&self) -> Result<Vec<String>> {
        info!("Fetching ticker lists from exchanges...");

        let mut all_tickers = Vec::new();
        all_tickers.extend(self.fetch_nasdaq().await);
        all_tickers.extend(self.fetch_other_listed().await);

        let tickers = clean_symbols(all_tickers);
        info!("Total unique tickers found: {}", tickers.len());
        Ok(tickers)
    }

    /// NASDAQ symbols, with fallback to the symbol directory
    async fn fetch_nasdaq(&self) -> Vec<String> {
        match self
            .fetch_listing(&self.nasdaq_primary_url, "Symbol", b',')
            .await
        {
            Ok(tickers) => {
                info!("Found {} NASDAQ tickers", tickers.len());
                tickers
            }
            Err(e) => {
                error!("Failed to fetch NASDAQ tickers: {}", e);
                match self
                    .fetch_listing(&self.nasdaq_fallback_url, "Symbol", b'|')
                    .await
                {
                    Ok(tickers) => {
                        info!("Found {} NASDAQ tickers (fallback)", tickers.len());
                        tickers
                    }
                    Err(e2) => {
                        error!("Failed to fetch NASDAQ tickers from fallback: {}", e2);
                        Vec::new()
                    }
                }
            }
        }
    }

    /// NYSE and other exchange symbols
    async fn fetch_other_listed(&self) -> Vec<String> {
        match self
            .fetch_listing(&self.other_listed_url, "ACT Symbol", b'|')
            .await
        {
            Ok(tickers) => {
                info!("Found {} NYSE/Other tickers", tickers.len());
                tickers
            }
            Err(e) => {
                error!("Failed to fetch NYSE tickers: {}", e);
                Vec::new()
            }
        }
    }

    async fn fetch_listing(&self, url: &str, column: &str, delimiter: u8) -> Result<Vec<String>> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("{} returned status {}", url, response.status()));
        }

        let body = response.text().await?;
        parse_listing(&body, column, delimiter)
    }
}

/// Pull one symbol column out of a delimited listing file.
///
/// The nasdaqtrader directories end with a `File Creation Time` trailer row
/// that is not a symbol; it is dropped here.
pub fn parse_listing(text: &str, column: &str, delimiter: u8) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let index = headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| anyhow!("listing file has no '{}' column", column))?;

    let mut symbols = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(symbol) = record.get(index) {
            if symbol.starts_with("File Creation Time") {
                continue;
            }
            symbols.push(symbol.to_string());
        }
    }

    Ok(symbols)
}

/// Drop empty and special-character symbols, de-duplicate, and sort
pub fn clean_symbols(symbols: Vec<String>) -> Vec<String> {
    let cleaned: BTreeSet<String> = symbols
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .filter(|s| !s.contains(['$', '^', '~']))
        .collect();

    cleaned.into_iter().collect()
}
