//! Batch collection pipeline with resumable progress tracking
//!
//! The ticker universe is split into fixed-size batches processed strictly in
//! order. One bulk download serves each batch; every ticker is then classified
//! as successful or failed and the progress checkpoint is rewritten, so an
//! interrupted run loses at most one batch of work.

use anyhow::Result;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::{CollectionSummary, Config, DateRange, ProgressRecord};
use crate::provider::MarketDataProvider;
use crate::store::FileStore;

/// Per-batch classification counts, for logging
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOutcome {
    pub successful: usize,
    pub failed: usize,
}

/// Data collection system for fetching and storing stock data
pub struct Collector<P> {
    provider: P,
    store: FileStore,
    config: Config,
    stop_flag: Arc<AtomicBool>,
}

impl<P: MarketDataProvider> Collector<P> {
    pub fn new(provider: P, store: FileStore, config: Config) -> Self {
        Self {
            provider,
            store,
            config,
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops the batch loop at the next batch boundary.
    ///
    /// In-flight batches finish and checkpoint normally; the checkpoint on
    /// disk therefore always describes fully completed batches.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_flag)
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Run the collection loop over the given ticker universe.
    ///
    /// With `resume`, tickers already classified by a previous run are skipped
    /// and batch numbering continues from the recorded index.
    pub async fn collect(&self, tickers: Vec<String>, resume: bool) -> Result<CollectionSummary> {
        let batch_size = self.config.batch_size.max(1);

        let mut progress = if resume {
            let progress = self.store.load_progress()?;
            if progress.processed_count() > 0 {
                info!(
                    "Resuming from batch {}, {} tickers already processed",
                    progress.last_batch_index,
                    progress.processed_count()
                );
            }
            progress
        } else {
            ProgressRecord::default()
        };

        let tickers = remaining_tickers(tickers, &progress);
        let range = DateRange::last_years(self.config.years_of_history);

        info!("Collecting data from {} to {}", range.start, range.end);
        info!("Total tickers to process: {}", tickers.len());

        let total_batches = batch_count(tickers.len(), batch_size);
        let start_index = progress.last_batch_index;
        let mut interrupted = false;

        for (i, batch) in tickers.chunks(batch_size).enumerate() {
            if self.stop_flag.load(Ordering::SeqCst) {
                warn!(
                    "Interrupt received, stopping after {} of {} batches",
                    i, total_batches
                );
                interrupted = true;
                break;
            }

            info!(
                "Processing batch {}/{} ({} tickers)",
                i + 1,
                total_batches,
                batch.len()
            );

            let outcome = self.process_batch(batch, &range, &mut progress).await;

            // The checkpoint only ever advances past fully classified batches.
            progress.last_batch_index = start_index + i + 1;
            self.store.save_progress(&progress)?;

            info!(
                "Batch complete: {} successful, {} failed",
                outcome.successful, outcome.failed
            );

            // Pause between batches to avoid rate limiting
            if i + 1 < total_batches {
                tokio::time::sleep(std::time::Duration::from_millis(
                    self.config.delay_between_batches_ms,
                ))
                .await;
            }
        }

        let summary = CollectionSummary {
            total_tickers: progress.processed_count(),
            successful: progress.successful_tickers.len(),
            failed: progress.failed_tickers.len(),
            successful_tickers: progress.successful_tickers.iter().cloned().collect(),
            failed_tickers: progress.failed_tickers.iter().cloned().collect(),
            collection_date: Utc::now(),
            years_of_history: self.config.years_of_history,
            data_start_date: range.start,
            data_end_date: range.end,
        };
        self.store.save_summary(&summary)?;

        if interrupted {
            info!("Collection interrupted. Progress saved for resume.");
        } else {
            info!("Data collection complete!");
        }
        info!("Successfully collected: {} tickers", summary.successful);
        info!("Failed: {} tickers", summary.failed);

        Ok(summary)
    }

    /// Classify every ticker of one batch against a single bulk download.
    ///
    /// A bulk transport failure degrades to an empty result, so all of the
    /// batch's tickers land in the failed set and the run continues.
    async fn process_batch(
        &self,
        batch: &[String],
        range: &DateRange,
        progress: &mut ProgressRecord,
    ) -> BatchOutcome {
        let history = match self.provider.download_history(batch, range).await {
            Ok(history) => history,
            Err(e) => {
                warn!("Error downloading batch: {}", e);
                HashMap::new()
            }
        };

        let mut outcome = BatchOutcome::default();
        for ticker in batch {
            if let Some(bars) = history.get(ticker) {
                match self.persist_ticker(ticker, bars).await {
                    Ok(()) => {
                        progress.successful_tickers.insert(ticker.clone());
                        outcome.successful += 1;
                    }
                    Err(e) => {
                        warn!("Error processing {}: {}", ticker, e);
                        progress.failed_tickers.insert(ticker.clone());
                        outcome.failed += 1;
                    }
                }
            } else {
                debug!("No data available for {}", ticker);
                progress.failed_tickers.insert(ticker.clone());
                outcome.failed += 1;
            }
        }

        outcome
    }

    /// Persist one ticker's series plus its fundamentals snapshot.
    ///
    /// A fundamentals fetch failure is not an error: the snapshot is simply
    /// skipped and the ticker still counts as successful.
    async fn persist_ticker(&self, ticker: &str, bars: &[crate::models::PriceBar]) -> Result<()> {
        self.store.save_history(ticker, bars)?;

        match self.provider.fetch_fundamentals(ticker).await {
            Ok(fundamentals) => self.store.save_fundamentals(&fundamentals)?,
            Err(e) => debug!("Error fetching fundamentals for {}: {}", ticker, e),
        }

        Ok(())
    }
}

/// Drop tickers already classified in a previous run, keeping input order
pub fn remaining_tickers(tickers: Vec<String>, progress: &ProgressRecord) -> Vec<String> {
    tickers
        .into_iter()
        .filter(|t| !progress.is_processed(t))
        .collect()
}

/// Number of fixed-size batches needed to cover `ticker_count` tickers
pub fn batch_count(ticker_count: usize, batch_size: usize) -> usize {
    ticker_count.div_ceil(batch_size.max(1))
}
