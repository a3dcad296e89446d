//! Analysis over synthetic file stores

use pretty_assertions::assert_eq;
use tempfile::tempdir;
use test_log::test;

use crate::common::test_data;
use stock_harvest::analysis::Analyzer;
use stock_harvest::models::PriceBar;
use stock_harvest::store::FileStore;

/// 253-row series whose 1-year return works out to `return_pct`
fn series_with_return(return_pct: f64) -> Vec<PriceBar> {
    let mut bars = test_data::sample_bars(253);
    for bar in bars.iter_mut() {
        bar.open = 100.0;
        bar.high = 101.0;
        bar.low = 99.0;
        bar.close = 100.0;
    }
    let last = bars.last_mut().unwrap();
    last.close = 100.0 * (1.0 + return_pct / 100.0);
    bars
}

#[test]
fn test_top_performers_ranked_by_one_year_return() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path().join("raw")).unwrap();

    store
        .save_history("AAPL", &series_with_return(12.0))
        .unwrap();
    store
        .save_history("MSFT", &series_with_return(45.0))
        .unwrap();
    store
        .save_history("TSLA", &series_with_return(-30.0))
        .unwrap();
    // Too short for a 1-year return, so excluded from the ranking.
    store
        .save_history("IPO", &test_data::sample_bars(10))
        .unwrap();

    let analyzer = Analyzer::new(store);
    let performers = analyzer.top_performers(2).unwrap();

    assert_eq!(performers.len(), 2);
    assert_eq!(performers[0].ticker, "MSFT");
    assert!((performers[0].return_1y - 45.0).abs() < 1e-9);
    assert_eq!(performers[1].ticker, "AAPL");
}

#[test]
fn test_sector_breakdown_counts_and_order() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path().join("raw")).unwrap();

    for (ticker, sector) in [
        ("AAPL", "Technology"),
        ("MSFT", "Technology"),
        ("GOOGL", "Technology"),
        ("JPM", "Financial Services"),
        ("BAC", "Financial Services"),
        ("XOM", "Energy"),
    ] {
        store
            .save_fundamentals(&test_data::sample_fundamentals(ticker, sector))
            .unwrap();
    }

    let analyzer = Analyzer::new(store);
    let breakdown = analyzer.sector_breakdown().unwrap();

    assert_eq!(
        breakdown,
        vec![
            ("Technology".to_string(), 3),
            ("Financial Services".to_string(), 2),
            ("Energy".to_string(), 1),
        ]
    );
}

#[test]
fn test_analyze_ticker_handles_missing_artifacts() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path().join("raw")).unwrap();

    store
        .save_history("AAPL", &test_data::sample_bars(20))
        .unwrap();

    let analyzer = Analyzer::new(store);

    let with_history = analyzer.analyze_ticker("AAPL").unwrap();
    let historical = with_history.historical.unwrap();
    assert_eq!(historical.days_of_data, 20);
    assert!(with_history.fundamentals.is_none());

    let unknown = analyzer.analyze_ticker("NOPE").unwrap();
    assert!(unknown.historical.is_none());
    assert!(unknown.fundamentals.is_none());
}

#[test]
fn test_export_json_converts_every_series() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path().join("raw")).unwrap();

    store
        .save_history("AAPL", &test_data::sample_bars(5))
        .unwrap();
    store
        .save_history("MSFT", &test_data::sample_bars(5))
        .unwrap();

    let analyzer = Analyzer::new(store);
    let converted = analyzer.export_json().unwrap();

    assert_eq!(converted, 2);
    let json_dir = dir.path().join("processed").join("json");
    assert!(json_dir.join("AAPL.json").exists());
    assert!(json_dir.join("MSFT.json").exists());

    let content = std::fs::read_to_string(json_dir.join("AAPL.json")).unwrap();
    let bars: Vec<PriceBar> = serde_json::from_str(&content).unwrap();
    assert_eq!(bars, test_data::sample_bars(5));
}

#[test]
fn test_data_summary_reflects_store_contents() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path().join("raw")).unwrap();

    store
        .save_history("AAPL", &test_data::sample_bars(5))
        .unwrap();
    store
        .save_fundamentals(&test_data::sample_fundamentals("AAPL", "Technology"))
        .unwrap();

    let analyzer = Analyzer::new(store);
    let summary = analyzer.data_summary().unwrap();

    assert_eq!(summary.historical_files, 1);
    assert_eq!(summary.fundamental_files, 1);
    assert!(summary.total_size_mb > 0.0);
    assert!(summary.collection_summary.is_none());
}
