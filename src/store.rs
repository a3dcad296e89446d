//! File-based storage for collected market data
//!
//! Everything lives under one root data directory:
//! - `historical/<TICKER>.csv`  — daily OHLCV series, one file per ticker
//! - `fundamentals/<TICKER>.json` — fundamentals snapshot per ticker
//! - `metadata/` — progress checkpoint, final summary, discovered ticker list

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::models::{CollectionSummary, Fundamentals, PriceBar, ProgressRecord};

const PROGRESS_FILE: &str = "collection_progress.json";
const SUMMARY_FILE: &str = "collection_summary.json";
const TICKER_LIST_FILE: &str = "all_tickers.json";

pub struct FileStore {
    data_dir: PathBuf,
    historical_dir: PathBuf,
    fundamentals_dir: PathBuf,
    metadata_dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `data_dir`, creating the directory tree if needed
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        let historical_dir = data_dir.join("historical");
        let fundamentals_dir = data_dir.join("fundamentals");
        let metadata_dir = data_dir.join("metadata");

        for dir in [&historical_dir, &fundamentals_dir, &metadata_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating data directory {}", dir.display()))?;
        }

        Ok(Self {
            data_dir,
            historical_dir,
            fundamentals_dir,
            metadata_dir,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn history_path(&self, ticker: &str) -> PathBuf {
        self.historical_dir.join(format!("{}.csv", ticker))
    }

    pub fn fundamentals_path(&self, ticker: &str) -> PathBuf {
        self.fundamentals_dir.join(format!("{}.json", ticker))
    }

    /// Write a ticker's full series, replacing any previous artifact
    pub fn save_history(&self, ticker: &str, bars: &[PriceBar]) -> Result<()> {
        if bars.is_empty() {
            return Ok(());
        }

        let path = self.history_path(ticker);
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        for bar in bars {
            writer.serialize(bar)?;
        }
        writer.flush()?;

        debug!("Saved {} price rows for {}", bars.len(), ticker);
        Ok(())
    }

    pub fn load_history(&self, ticker: &str) -> Result<Vec<PriceBar>> {
        let path = self.history_path(ticker);
        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("opening {}", path.display()))?;

        let mut bars = Vec::new();
        for row in reader.deserialize() {
            bars.push(row?);
        }
        Ok(bars)
    }

    pub fn save_fundamentals(&self, fundamentals: &Fundamentals) -> Result<()> {
        if fundamentals.ticker.is_empty() {
            return Ok(());
        }

        let path = self.fundamentals_path(&fundamentals.ticker);
        let json = serde_json::to_string_pretty(fundamentals)?;
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;

        debug!("Saved fundamentals for {}", fundamentals.ticker);
        Ok(())
    }

    pub fn load_fundamentals(&self, ticker: &str) -> Result<Fundamentals> {
        let path = self.fundamentals_path(ticker);
        let content =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load the progress checkpoint; a missing file means a fresh run
    pub fn load_progress(&self) -> Result<ProgressRecord> {
        let path = self.metadata_dir.join(PROGRESS_FILE);
        if !path.exists() {
            return Ok(ProgressRecord::default());
        }

        let content =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Persist the progress checkpoint, stamping it with the current time
    pub fn save_progress(&self, progress: &ProgressRecord) -> Result<()> {
        let record = ProgressRecord {
            timestamp: Some(Utc::now()),
            ..progress.clone()
        };

        let path = self.metadata_dir.join(PROGRESS_FILE);
        let json = serde_json::to_string_pretty(&record)?;
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn save_summary(&self, summary: &CollectionSummary) -> Result<()> {
        let path = self.metadata_dir.join(SUMMARY_FILE);
        let json = serde_json::to_string_pretty(summary)?;
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn load_summary(&self) -> Result<Option<CollectionSummary>> {
        let path = self.metadata_dir.join(SUMMARY_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let content =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save_ticker_list(&self, tickers: &[String]) -> Result<()> {
        let path = self.metadata_dir.join(TICKER_LIST_FILE);
        let json = serde_json::to_string_pretty(tickers)?;
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn load_ticker_list(&self) -> Result<Vec<String>> {
        let path = self.metadata_dir.join(TICKER_LIST_FILE);
        let content =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Tickers with a persisted historical series, sorted
    pub fn collected_tickers(&self) -> Result<Vec<String>> {
        self.tickers_with_extension(&self.historical_dir, "csv")
    }

    /// Tickers with a persisted fundamentals snapshot, sorted
    pub fn fundamentals_tickers(&self) -> Result<Vec<String>> {
        self.tickers_with_extension(&self.fundamentals_dir, "json")
    }

    fn tickers_with_extension(&self, dir: &Path, extension: &str) -> Result<Vec<String>> {
        let mut tickers = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(extension) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    tickers.push(stem.to_string());
                }
            }
        }
        tickers.sort();
        Ok(tickers)
    }

    /// Total bytes used by historical and fundamentals artifacts
    pub fn total_size_bytes(&self) -> Result<u64> {
        let mut total = 0;
        for dir in [&self.historical_dir, &self.fundamentals_dir] {
            for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
                total += entry?.metadata()?.len();
            }
        }
        Ok(total)
    }
}
