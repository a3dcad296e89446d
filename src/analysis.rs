//! Post-hoc analysis and reporting over the collected file store

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;

use crate::models::{CollectionSummary, PriceBar};
use crate::store::FileStore;

/// Trading-day row counts used as thresholds for the return windows
const ONE_YEAR_ROWS: usize = 252;
const THREE_YEAR_ROWS: usize = 756;
const FIVE_YEAR_ROWS: usize = 1000;

pub struct Analyzer {
    store: FileStore,
}

/// Overview of everything currently on disk
#[derive(Debug, Serialize)]
pub struct DataSummary {
    pub historical_files: usize,
    pub fundamental_files: usize,
    pub total_size_mb: f64,
    pub collection_summary: Option<CollectionSummary>,
}

/// Analysis of a single ticker's collected artifacts
#[derive(Debug, Serialize)]
pub struct TickerAnalysis {
    pub ticker: String,
    pub historical: Option<HistoricalAnalysis>,
    pub fundamentals: Option<FundamentalsOverview>,
}

#[derive(Debug, Serialize)]
pub struct HistoricalAnalysis {
    pub days_of_data: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub avg_daily_volume: f64,
    pub price_min: f64,
    pub price_max: f64,
    pub price_current: f64,
    pub return_1y: Option<f64>,
    pub return_3y: Option<f64>,
    pub return_5y: Option<f64>,
    pub annualized_volatility: f64,
}

#[derive(Debug, Serialize)]
pub struct FundamentalsOverview {
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub sector: Option<String>,
    pub industry: Option<String>,
}

/// One row of the top-performer ranking
#[derive(Debug, Clone, Serialize)]
pub struct Performer {
    pub ticker: String,
    pub return_1y: f64,
    pub current_price: f64,
}

impl Analyzer {
    pub fn new(store: FileStore) -> Self {
        Self { store }
    }

    pub fn data_summary(&self) -> Result<DataSummary> {
        let historical = self.store.collected_tickers()?;
        let fundamentals = self.store.fundamentals_tickers()?;
        let total_size = self.store.total_size_bytes()?;

        Ok(DataSummary {
            historical_files: historical.len(),
            fundamental_files: fundamentals.len(),
            total_size_mb: total_size as f64 / (1024.0 * 1024.0),
            collection_summary: self.store.load_summary()?,
        })
    }

    /// Analyze one ticker's series and fundamentals; either may be absent
    pub fn analyze_ticker(&self, ticker: &str) -> Result<TickerAnalysis> {
        let historical = self
            .store
            .load_history(ticker)
            .ok()
            .and_then(|bars| analyze_series(&bars));

        let fundamentals = self
            .store
            .load_fundamentals(ticker)
            .ok()
            .map(|f| FundamentalsOverview {
                market_cap: f.market_cap,
                pe_ratio: f.trailing_pe,
                dividend_yield: f.dividend_yield,
                sector: f.sector,
                industry: f.industry,
            });

        Ok(TickerAnalysis {
            ticker: ticker.to_string(),
            historical,
            fundamentals,
        })
    }

    /// Ticker counts per sector, most populous first
    pub fn sector_breakdown(&self) -> Result<Vec<(String, usize)>> {
        let mut sectors: HashMap<String, usize> = HashMap::new();

        for ticker in self.store.fundamentals_tickers()? {
            let fundamentals = self.store.load_fundamentals(&ticker)?;
            let sector = fundamentals
                .sector
                .unwrap_or_else(|| "Unknown".to_string());
            *sectors.entry(sector).or_insert(0) += 1;
        }

        let mut breakdown: Vec<(String, usize)> = sectors.into_iter().collect();
        breakdown.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(breakdown)
    }

    /// Top N tickers by one-year return, requiring at least a year of rows
    pub fn top_performers(&self, n: usize) -> Result<Vec<Performer>> {
        let mut performers = Vec::new();

        for ticker in self.store.collected_tickers()? {
            let bars = self.store.load_history(&ticker)?;
            if let Some(return_1y) = one_year_return(&bars) {
                performers.push(Performer {
                    ticker,
                    return_1y,
                    current_price: bars.last().map(|b| b.close).unwrap_or(0.0),
                });
            }
        }

        performers.sort_by(|a, b| {
            b.return_1y
                .partial_cmp(&a.return_1y)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        performers.truncate(n);
        Ok(performers)
    }

    /// Print the full analysis report to stdout
    pub fn print_report(&self) -> Result<()> {
        println!("{}", "=".repeat(60));
        println!("Stock Data Collection Analysis Report");
        println!("{}", "=".repeat(60));
        println!(
            "Report generated: {}\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        );

        let summary = self.data_summary()?;
        println!("Data Summary:");
        println!("  - Historical data files: {}", summary.historical_files);
        println!("  - Fundamental data files: {}", summary.fundamental_files);
        println!("  - Total storage used: {:.2} MB", summary.total_size_mb);

        if let Some(cs) = &summary.collection_summary {
            println!("  - Collection date: {}", cs.collection_date);
            println!("  - Successful tickers: {}", cs.successful);
            println!("  - Failed tickers: {}", cs.failed);
            println!(
                "  - Data period: {} to {}",
                cs.data_start_date, cs.data_end_date
            );
        }
        println!();

        if summary.fundamental_files > 0 {
            println!("Sector Breakdown:");
            for (sector, count) in self.sector_breakdown()?.into_iter().take(10) {
                println!("  - {}: {} stocks", sector, count);
            }
            println!();
        }

        if summary.historical_files > 0 {
            println!("Top Performers (1-Year Return):");
            for (i, performer) in self.top_performers(10)?.iter().enumerate() {
                println!(
                    "  {}. {}: {:.2}% (${:.2})",
                    i + 1,
                    performer.ticker,
                    performer.return_1y,
                    performer.current_price
                );
            }
        }

        println!("\n{}", "=".repeat(60));
        Ok(())
    }

    /// Convert every per-ticker CSV series into a JSON series file.
    ///
    /// Output lands next to the raw tree under `processed/json/`. Returns the
    /// number of converted files.
    pub fn export_json(&self) -> Result<usize> {
        let data_dir = self.store.data_dir();
        let json_dir = data_dir
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| data_dir.to_path_buf())
            .join("processed")
            .join("json");
        fs::create_dir_all(&json_dir)?;

        let mut converted = 0;
        for ticker in self.store.collected_tickers()? {
            let bars = self.store.load_history(&ticker)?;
            let json = serde_json::to_string_pretty(&bars)?;
            fs::write(json_dir.join(format!("{}.json", ticker)), json)?;
            converted += 1;
        }

        println!(
            "Converted {} files to JSON format in {}",
            converted,
            json_dir.display()
        );
        Ok(converted)
    }
}

/// Summarize an ordered series; empty input yields nothing
pub fn analyze_series(bars: &[PriceBar]) -> Option<HistoricalAnalysis> {
    let (first, last) = match (bars.first(), bars.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return None,
    };

    let avg_daily_volume =
        bars.iter().map(|b| b.volume as f64).sum::<f64>() / bars.len() as f64;
    let price_min = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let price_max = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);

    let return_5y = if bars.len() > FIVE_YEAR_ROWS {
        Some(((last.close / first.close) - 1.0) * 100.0)
    } else {
        None
    };

    Some(HistoricalAnalysis {
        days_of_data: bars.len(),
        start_date: first.date,
        end_date: last.date,
        avg_daily_volume,
        price_min,
        price_max,
        price_current: last.close,
        return_1y: trailing_return(bars, ONE_YEAR_ROWS),
        return_3y: trailing_return(bars, THREE_YEAR_ROWS),
        return_5y,
        annualized_volatility: annualized_volatility(bars),
    })
}

/// Percentage return over the trailing `rows` trading days
fn trailing_return(bars: &[PriceBar], rows: usize) -> Option<f64> {
    if bars.len() <= rows {
        return None;
    }
    let current = bars.last()?.close;
    let base = bars[bars.len() - rows].close;
    Some(((current / base) - 1.0) * 100.0)
}

fn one_year_return(bars: &[PriceBar]) -> Option<f64> {
    trailing_return(bars, ONE_YEAR_ROWS)
}

/// Annualized close-to-close volatility in percent (sample std, √252 scaling)
pub fn annualized_volatility(bars: &[PriceBar]) -> f64 {
    if bars.len() < 3 {
        return 0.0;
    }

    let changes: Vec<f64> = bars
        .windows(2)
        .map(|pair| pair[1].close / pair[0].close - 1.0)
        .collect();

    let mean = changes.iter().sum::<f64>() / changes.len() as f64;
    let variance = changes
        .iter()
        .map(|c| (c - mean).powi(2))
        .sum::<f64>()
        / (changes.len() - 1) as f64;

    variance.sqrt() * (ONE_YEAR_ROWS as f64).sqrt() * 100.0
}
