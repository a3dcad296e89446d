//! Common test utilities and helpers

use chrono::{Duration, NaiveDate, Utc};

/// Test data utilities
pub mod test_data {
    use super::*;
    use stock_harvest::models::{Fundamentals, PriceBar};

    /// Build an ordered daily series of `days` bars with mildly rising closes
    pub fn sample_bars(days: usize) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        (0..days)
            .map(|i| {
                let close = 100.0 + i as f64;
                PriceBar {
                    date: start + Duration::days(i as i64),
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000_000 + i as i64,
                }
            })
            .collect()
    }

    /// Build a fundamentals snapshot with the given sector
    pub fn sample_fundamentals(ticker: &str, sector: &str) -> Fundamentals {
        Fundamentals {
            ticker: ticker.to_string(),
            timestamp: Some(Utc::now()),
            market_cap: Some(1_000_000_000.0),
            trailing_pe: Some(25.0),
            dividend_yield: Some(0.02),
            sector: Some(sector.to_string()),
            industry: Some("Software".to_string()),
            ..Default::default()
        }
    }
}

/// Scripted providers for driving the collector without a network
pub mod providers {
    use super::test_data;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use stock_harvest::models::{DateRange, Fundamentals, PriceBar};
    use stock_harvest::provider::{MarketDataProvider, ProviderError};

    /// Provider that returns history only for an allow-listed set of tickers.
    ///
    /// Bulk calls are counted so tests can assert how many batches ran;
    /// selected calls can fail wholesale or trip an external stop flag.
    pub struct ScriptedProvider {
        with_data: HashSet<String>,
        bars_per_ticker: usize,
        failing_calls: HashSet<usize>,
        stop_flag: Mutex<Option<Arc<AtomicBool>>>,
        calls: AtomicUsize,
        requested: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        pub fn with_data<I, S>(tickers: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                with_data: tickers.into_iter().map(Into::into).collect(),
                bars_per_ticker: 5,
                failing_calls: HashSet::new(),
                stop_flag: Mutex::new(None),
                calls: AtomicUsize::new(0),
                requested: Mutex::new(Vec::new()),
            }
        }

        /// Make the n-th bulk call (0-based) fail with a transport-style error
        pub fn failing_call(mut self, call_index: usize) -> Self {
            self.failing_calls.insert(call_index);
            self
        }

        /// Trip the given stop flag during the first bulk call, simulating an
        /// interrupt that arrives while batch 1 is in flight
        pub fn arm_stop(&self, flag: Arc<AtomicBool>) {
            *self.stop_flag.lock().unwrap() = Some(flag);
        }

        pub fn bulk_calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Every ticker requested across all bulk calls, in request order
        pub fn requested_tickers(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MarketDataProvider for ScriptedProvider {
        async fn download_history(
            &self,
            tickers: &[String],
            _range: &DateRange,
        ) -> Result<HashMap<String, Vec<PriceBar>>, ProviderError> {
            let call_index = self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().extend(tickers.iter().cloned());

            if call_index == 0 {
                if let Some(flag) = self.stop_flag.lock().unwrap().as_ref() {
                    flag.store(true, Ordering::SeqCst);
                }
            }

            if self.failing_calls.contains(&call_index) {
                return Err(ProviderError::Decode(
                    "simulated bulk download failure".to_string(),
                ));
            }

            Ok(tickers
                .iter()
                .filter(|t| self.with_data.contains(*t))
                .map(|t| (t.clone(), test_data::sample_bars(self.bars_per_ticker)))
                .collect())
        }

        async fn fetch_fundamentals(&self, ticker: &str) -> Result<Fundamentals, ProviderError> {
            Ok(test_data::sample_fundamentals(ticker, "Technology"))
        }
    }
}
