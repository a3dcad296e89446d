use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// One row of a per-ticker historical price series.
///
/// Field names mirror the CSV header (`Date,Open,High,Low,Close,Volume`) so the
/// on-disk artifacts stay greppable with standard tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Open")]
    pub open: f64,
    #[serde(rename = "High")]
    pub high: f64,
    #[serde(rename = "Low")]
    pub low: f64,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "Volume")]
    pub volume: i64,
}

/// Point-in-time fundamental metrics for one company.
///
/// Every metric is optional: the provider omits whatever it does not know and
/// the snapshot is persisted as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fundamentals {
    pub ticker: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub market_cap: Option<f64>,
    pub enterprise_value: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub forward_pe: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub price_to_book: Option<f64>,
    pub price_to_sales: Option<f64>,
    pub enterprise_to_revenue: Option<f64>,
    pub enterprise_to_ebitda: Option<f64>,
    pub profit_margins: Option<f64>,
    pub operating_margins: Option<f64>,
    pub return_on_assets: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub earnings_growth: Option<f64>,
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub free_cashflow: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub payout_ratio: Option<f64>,
    pub beta: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub float_shares: Option<f64>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
}

/// Persisted checkpoint for a resumable collection run.
///
/// Rewritten after every completed batch. A ticker present in either set is
/// skipped on resume; the two sets stay disjoint because already-classified
/// tickers are filtered out of the input before batching.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub successful_tickers: BTreeSet<String>,
    pub failed_tickers: BTreeSet<String>,
    pub last_batch_index: usize,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// Whether a ticker was already classified in a previous batch or run.
    pub fn is_processed(&self, ticker: &str) -> bool {
        self.successful_tickers.contains(ticker) || self.failed_tickers.contains(ticker)
    }

    pub fn processed_count(&self) -> usize {
        self.successful_tickers.len() + self.failed_tickers.len()
    }
}

/// Final record of a collection run, written once when the batch loop ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub total_tickers: usize,
    pub successful: usize,
    pub failed: usize,
    pub successful_tickers: Vec<String>,
    pub failed_tickers: Vec<String>,
    pub collection_date: DateTime<Utc>,
    pub years_of_history: u32,
    pub data_start_date: NaiveDate,
    pub data_end_date: NaiveDate,
}

/// Date range for historical downloads
#[derive(Debug, Clone, PartialEq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Range ending today and reaching back the given number of years.
    pub fn last_years(years: u32) -> Self {
        let end = Utc::now().date_naive();
        let start = end - Duration::days(years as i64 * 365);
        Self { start, end }
    }

    pub fn days_count(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub batch_size: usize,
    pub years_of_history: u32,
    pub delay_between_batches_ms: u64,
    pub rate_limit_per_minute: u32,
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Ok(Config {
            data_dir: std::env::var("STOCK_DATA_DIR")
                .unwrap_or_else(|_| "./data/raw".to_string())
                .into(),
            batch_size: std::env::var("BATCH_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .unwrap_or(100),
            years_of_history: std::env::var("YEARS_OF_HISTORY")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            delay_between_batches_ms: std::env::var("BATCH_DELAY_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()
                .unwrap_or(2000),
            rate_limit_per_minute: std::env::var("RATE_LIMIT_PER_MINUTE")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .unwrap_or(120),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/raw"),
            batch_size: 100,
            years_of_history: 5,
            delay_between_batches_ms: 2000,
            rate_limit_per_minute: 120,
            request_timeout_secs: 30,
        }
    }
}
