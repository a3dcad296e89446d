use anyhow::Result;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;

use crate::models::{Config, DateRange, Fundamentals, PriceBar};
use super::{timestamp_to_date, MarketDataProvider, ProviderError, RateLimiter};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Modules requested from the quote-summary endpoint.
const FUNDAMENTALS_MODULES: &str = "assetProfile,summaryDetail,defaultKeyStatistics,financialData";

/// How many chart requests a bulk download keeps in flight.
const BULK_CONCURRENCY: usize = 8;

/// Chart endpoint response shape
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize, Default)]
struct QuoteBlock {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<i64>>,
}

/// Yahoo Finance API client
pub struct YahooClient {
    client: Client,
    base_url: String,
    rate_limiter: RateLimiter,
}

impl YahooClient {
    /// Create a new Yahoo Finance client
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_base_url(config, DEFAULT_BASE_URL)
    }

    /// Create a client against a non-default endpoint (used by tests).
    pub fn with_base_url(config: &Config, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .user_agent("stock-harvest/1.0")
            .build()?;

        let rate_limiter = RateLimiter::new(config.rate_limit_per_minute);

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter,
        })
    }

    /// Make a rate-limited GET request and decode the JSON body
    async fn make_request(&self, url: Url) -> Result<Value, ProviderError> {
        self.rate_limiter.wait().await;

        debug!("Making request to: {}", url);

        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status {
                endpoint: url.path().to_string(),
                status: response.status(),
            });
        }

        let json: Value = response.json().await?;
        Ok(json)
    }

    /// Fetch the daily chart for one ticker and flatten it into price bars
    async fn fetch_chart(
        &self,
        ticker: &str,
        range: &DateRange,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        let period1 = range
            .start
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp();
        let period2 = range
            .end
            .and_hms_opt(23, 59, 59)
            .unwrap()
            .and_utc()
            .timestamp();

        let url = Url::parse_with_params(
            &format!("{}/v8/finance/chart/{}", self.base_url, ticker),
            &[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ],
        )
        .map_err(|e| ProviderError::Decode(e.to_string()))?;

        let data = self.make_request(url).await?;
        let response: ChartResponse =
            serde_json::from_value(data).map_err(|e| ProviderError::Decode(e.to_string()))?;

        let result = match response.chart.result.and_then(|mut r| {
            if r.is_empty() {
                None
            } else {
                Some(r.remove(0))
            }
        }) {
            Some(result) => result,
            None => return Ok(Vec::new()),
        };

        let timestamps = result.timestamp.unwrap_or_default();
        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .unwrap_or_default();

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, ts) in timestamps.iter().enumerate() {
            let date = match timestamp_to_date(*ts) {
                Some(date) => date,
                None => continue,
            };

            // A row missing any OHLC value is a non-trading placeholder; drop it.
            let (open, high, low, close) = match (
                quote.open.get(i).copied().flatten(),
                quote.high.get(i).copied().flatten(),
                quote.low.get(i).copied().flatten(),
                quote.close.get(i).copied().flatten(),
            ) {
                (Some(o), Some(h), Some(l), Some(c)) => (o, h, l, c),
                _ => continue,
            };

            bars.push(PriceBar {
                date,
                open,
                high,
                low,
                close,
                volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
            });
        }

        debug!(
            "Retrieved {} price bars for {} from {} to {}",
            bars.len(),
            ticker,
            range.start,
            range.end
        );
        Ok(bars)
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooClient {
    /// Download daily history for a batch of tickers.
    ///
    /// Requests fan out with bounded concurrency; a ticker whose request fails
    /// or comes back empty is left out of the map rather than failing the call.
    async fn download_history(
        &self,
        tickers: &[String],
        range: &DateRange,
    ) -> Result<HashMap<String, Vec<PriceBar>>, ProviderError> {
        if tickers.is_empty() {
            return Ok(HashMap::new());
        }

        let results: Vec<(String, Option<Vec<PriceBar>>)> = stream::iter(tickers.iter().cloned())
            .map(|ticker| async move {
                match self.fetch_chart(&ticker, range).await {
                    Ok(bars) => (ticker, Some(bars)),
                    Err(e) => {
                        warn!("No history for {}: {}", ticker, e);
                        (ticker, None)
                    }
                }
            })
            .buffer_unordered(BULK_CONCURRENCY)
            .collect()
            .await;

        let mut history = HashMap::new();
        for (ticker, bars) in results {
            match bars {
                Some(bars) if !bars.is_empty() => {
                    history.insert(ticker, bars);
                }
                _ => {}
            }
        }

        debug!(
            "Bulk download returned data for {}/{} tickers",
            history.len(),
            tickers.len()
        );
        Ok(history)
    }

    /// Fetch the fundamentals snapshot for a single ticker
    async fn fetch_fundamentals(&self, ticker: &str) -> Result<Fundamentals, ProviderError> {
        let url = Url::parse_with_params(
            &format!("{}/v10/finance/quoteSummary/{}", self.base_url, ticker),
            &[("modules", FUNDAMENTALS_MODULES)],
        )
        .map_err(|e| ProviderError::Decode(e.to_string()))?;

        let data = self.make_request(url).await?;

        let result = data
            .get("quoteSummary")
            .and_then(|v| v.get("result"))
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.first())
            .ok_or_else(|| ProviderError::Decode("quoteSummary result missing".to_string()))?;

        let profile = result.get("assetProfile").cloned().unwrap_or(Value::Null);
        let summary = result.get("summaryDetail").cloned().unwrap_or(Value::Null);
        let key_stats = result
            .get("defaultKeyStatistics")
            .cloned()
            .unwrap_or(Value::Null);
        let financial = result.get("financialData").cloned().unwrap_or(Value::Null);

        Ok(Fundamentals {
            ticker: ticker.to_string(),
            timestamp: Some(Utc::now()),
            market_cap: metric(&summary, "marketCap"),
            enterprise_value: metric(&key_stats, "enterpriseValue"),
            trailing_pe: metric(&summary, "trailingPE"),
            forward_pe: metric(&summary, "forwardPE").or_else(|| metric(&key_stats, "forwardPE")),
            peg_ratio: metric(&key_stats, "pegRatio"),
            price_to_book: metric(&key_stats, "priceToBook"),
            price_to_sales: metric(&summary, "priceToSalesTrailing12Months"),
            enterprise_to_revenue: metric(&key_stats, "enterpriseToRevenue"),
            enterprise_to_ebitda: metric(&key_stats, "enterpriseToEbitda"),
            profit_margins: metric(&key_stats, "profitMargins")
                .or_else(|| metric(&financial, "profitMargins")),
            operating_margins: metric(&financial, "operatingMargins"),
            return_on_assets: metric(&financial, "returnOnAssets"),
            return_on_equity: metric(&financial, "returnOnEquity"),
            revenue_growth: metric(&financial, "revenueGrowth"),
            earnings_growth: metric(&financial, "earningsGrowth"),
            current_ratio: metric(&financial, "currentRatio"),
            quick_ratio: metric(&financial, "quickRatio"),
            debt_to_equity: metric(&financial, "debtToEquity"),
            free_cashflow: metric(&financial, "freeCashflow"),
            dividend_yield: metric(&summary, "dividendYield"),
            payout_ratio: metric(&summary, "payoutRatio"),
            beta: metric(&summary, "beta"),
            shares_outstanding: metric(&key_stats, "sharesOutstanding"),
            float_shares: metric(&key_stats, "floatShares"),
            sector: text(&profile, "sector"),
            industry: text(&profile, "industry"),
            country: text(&profile, "country"),
            website: text(&profile, "website"),
            description: text(&profile, "longBusinessSummary"),
        })
    }
}

/// Extract a `{"raw": ...}` wrapped numeric metric from a quote-summary module
fn metric(module: &Value, key: &str) -> Option<f64> {
    module
        .get(key)
        .and_then(|v| v.get("raw"))
        .and_then(|v| v.as_f64())
}

/// Extract a plain string field from a quote-summary module
fn text(module: &Value, key: &str) -> Option<String> {
    module
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
