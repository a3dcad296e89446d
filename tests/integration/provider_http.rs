//! HTTP layer tests against a mock market-data endpoint

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stock_harvest::models::{Config, DateRange};
use stock_harvest::provider::{MarketDataProvider, YahooClient};
use stock_harvest::universe::UniverseSource;

fn fast_config() -> Config {
    Config {
        rate_limit_per_minute: 60_000,
        request_timeout_secs: 5,
        ..Default::default()
    }
}

fn chart_body() -> serde_json::Value {
    json!({
        "chart": {
            "result": [{
                "meta": { "symbol": "AAPL", "currency": "USD" },
                "timestamp": [1704205800i64, 1704292200i64],
                "indicators": {
                    "quote": [{
                        "open": [187.15, 184.22],
                        "high": [188.44, 185.88],
                        "low": [183.89, 183.43],
                        "close": [185.64, 184.25],
                        "volume": [82488700i64, 58414500i64]
                    }]
                }
            }],
            "error": null
        }
    })
}

fn quote_summary_body() -> serde_json::Value {
    json!({
        "quoteSummary": {
            "result": [{
                "assetProfile": {
                    "sector": "Technology",
                    "industry": "Consumer Electronics",
                    "country": "United States",
                    "website": "https://www.apple.com",
                    "longBusinessSummary": "Designs, manufactures and markets smartphones."
                },
                "summaryDetail": {
                    "marketCap": { "raw": 2.9e12, "fmt": "2.9T" },
                    "trailingPE": { "raw": 28.5, "fmt": "28.50" },
                    "dividendYield": { "raw": 0.0055, "fmt": "0.55%" },
                    "beta": { "raw": 1.25, "fmt": "1.25" }
                },
                "defaultKeyStatistics": {
                    "enterpriseValue": { "raw": 2.95e12, "fmt": "2.95T" },
                    "priceToBook": { "raw": 45.1, "fmt": "45.10" },
                    "sharesOutstanding": { "raw": 1.5e10, "fmt": "15B" }
                },
                "financialData": {
                    "returnOnEquity": { "raw": 1.47, "fmt": "147%" },
                    "debtToEquity": { "raw": 176.3, "fmt": "176.30" }
                }
            }],
            "error": null
        }
    })
}

#[tokio::test]
async fn test_bulk_download_omits_missing_tickers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/AAPL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chart_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/NOPE"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "chart": { "result": null, "error": { "code": "Not Found" } }
        })))
        .mount(&server)
        .await;

    let client = YahooClient::with_base_url(&fast_config(), &server.uri()).unwrap();
    let range = DateRange::new(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
    );

    let tickers = vec!["AAPL".to_string(), "NOPE".to_string()];
    let history = client.download_history(&tickers, &range).await.unwrap();

    assert_eq!(history.len(), 1);
    let bars = &history["AAPL"];
    assert_eq!(bars.len(), 2);
    assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    assert_eq!(bars[0].close, 185.64);
    assert_eq!(bars[1].volume, 58_414_500);
}

#[tokio::test]
async fn test_fundamentals_parsing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v10/finance/quoteSummary/AAPL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(quote_summary_body()))
        .mount(&server)
        .await;

    let client = YahooClient::with_base_url(&fast_config(), &server.uri()).unwrap();
    let fundamentals = client.fetch_fundamentals("AAPL").await.unwrap();

    assert_eq!(fundamentals.ticker, "AAPL");
    assert_eq!(fundamentals.market_cap, Some(2.9e12));
    assert_eq!(fundamentals.trailing_pe, Some(28.5));
    assert_eq!(fundamentals.dividend_yield, Some(0.0055));
    assert_eq!(fundamentals.return_on_equity, Some(1.47));
    assert_eq!(fundamentals.sector.as_deref(), Some("Technology"));
    assert_eq!(
        fundamentals.industry.as_deref(),
        Some("Consumer Electronics")
    );
    // Fields the response does not carry stay empty.
    assert_eq!(fundamentals.peg_ratio, None);
    assert!(fundamentals.timestamp.is_some());
}

#[tokio::test]
async fn test_universe_falls_back_when_primary_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nasdaq-listed.csv"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/nasdaqlisted.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "Symbol|Security Name\nAAPL|Apple Inc.\nGOOGL|Alphabet Inc.\nFile Creation Time: 0807202517:30|\n",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/otherlisted.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "ACT Symbol|Security Name\nJPM|JP Morgan Chase & Co.\nBRK$A|Berkshire Hathaway Inc.\nFile Creation Time: 0807202517:30|\n",
        ))
        .mount(&server)
        .await;

    let universe = UniverseSource::with_urls(
        &fast_config(),
        &format!("{}/nasdaq-listed.csv", server.uri()),
        &format!("{}/nasdaqlisted.txt", server.uri()),
        &format!("{}/otherlisted.txt", server.uri()),
    )
    .unwrap();

    let tickers = universe.fetch_all().await.unwrap();
    assert_eq!(tickers, vec!["AAPL", "GOOGL", "JPM"]);
}

#[tokio::test]
async fn test_universe_survives_both_sources_failing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let universe = UniverseSource::with_urls(
        &fast_config(),
        &format!("{}/nasdaq-listed.csv", server.uri()),
        &format!("{}/nasdaqlisted.txt", server.uri()),
        &format!("{}/otherlisted.txt", server.uri()),
    )
    .unwrap();

    let tickers = universe.fetch_all().await.unwrap();
    assert!(tickers.is_empty());
}
