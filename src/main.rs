use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use stock_harvest::analysis::Analyzer;
use stock_harvest::collector::Collector;
use stock_harvest::models::Config;
use stock_harvest::provider::YahooClient;
use stock_harvest::store::FileStore;
use stock_harvest::universe::UniverseSource;

/// Sample tickers used by `collect --test`
const TEST_TICKERS: [&str; 10] = [
    "AAPL", "GOOGL", "MSFT", "AMZN", "TSLA", "META", "NVDA", "NFLX", "JPM", "BAC",
];

#[derive(Parser)]
#[command(name = "stock-harvest")]
#[command(version)]
#[command(about = "Collect and analyze historical stock market data")]
struct Cli {
    /// Root directory for collected data
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download historical prices and fundamentals in resumable batches
    Collect {
        /// Test mode with 10 sample tickers
        #[arg(long)]
        test: bool,

        /// Specific tickers to download (default: all available)
        #[arg(long, num_args = 1..)]
        tickers: Vec<String>,

        /// Run full collection for all discovered tickers (asks for confirmation)
        #[arg(long)]
        full: bool,

        /// Number of tickers per batch
        #[arg(long)]
        batch_size: Option<usize>,

        /// Years of historical data to collect
        #[arg(long)]
        years: Option<u32>,

        /// Delay between batches in seconds
        #[arg(long)]
        delay: Option<f64>,

        /// Start fresh instead of resuming previous collection
        #[arg(long)]
        no_resume: bool,
    },
    /// Analyze collected stock data
    Analyze {
        /// Analyze a specific ticker and print the result as JSON
        #[arg(long)]
        ticker: Option<String>,

        /// Show the sector breakdown
        #[arg(long)]
        sectors: bool,

        /// Show the top N performers by 1-year return
        #[arg(long)]
        top_performers: Option<usize>,

        /// Convert historical CSV data to JSON format
        #[arg(long)]
        export_json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter("stock_harvest=info")
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    match cli.command {
        Command::Collect {
            test,
            tickers,
            full,
            batch_size,
            years,
            delay,
            no_resume,
        } => {
            if let Some(batch_size) = batch_size {
                config.batch_size = batch_size;
            }
            if let Some(years) = years {
                config.years_of_history = years;
            }
            if let Some(delay) = delay {
                config.delay_between_batches_ms = (delay * 1000.0) as u64;
            }
            run_collect(config, test, tickers, full, no_resume).await
        }
        Command::Analyze {
            ticker,
            sectors,
            top_performers,
            export_json,
        } => run_analyze(config, ticker, sectors, top_performers, export_json),
    }
}

async fn run_collect(
    config: Config,
    test: bool,
    tickers: Vec<String>,
    full: bool,
    no_resume: bool,
) -> Result<()> {
    if full {
        info!("{}", "=".repeat(60));
        info!("Starting Full Stock Data Collection");
        info!(
            "This will download {} years of data for all stocks",
            config.years_of_history
        );
        info!("Estimated time: 1-2 hours");
        info!("{}", "=".repeat(60));

        if !prompt_user("\nProceed? (yes/no): ")? {
            info!("Cancelled");
            return Ok(());
        }
    }

    let store = FileStore::new(&config.data_dir)?;
    let client = YahooClient::new(&config)?;

    let tickers: Vec<String> = if !tickers.is_empty() {
        let tickers: Vec<String> = tickers.iter().map(|t| t.to_uppercase()).collect();
        info!("Downloading {} specified tickers", tickers.len());
        tickers
    } else if test {
        info!("Test mode: {} tickers", TEST_TICKERS.len());
        TEST_TICKERS.iter().map(|t| t.to_string()).collect()
    } else {
        let universe = UniverseSource::new(&config)?;
        let tickers = universe.fetch_all().await?;
        store.save_ticker_list(&tickers)?;
        tickers
    };

    let collector = Collector::new(client, store, config);

    // Ctrl-c stops scheduling further batches; the in-flight batch finishes
    // and checkpoints, so the run stays resumable.
    let stop = collector.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted. Finishing current batch, progress will be saved.");
            stop.store(true, Ordering::SeqCst);
        }
    });

    info!("🚀 Starting stock data collection");
    let summary = collector.collect(tickers, !no_resume).await?;
    info!(
        "✅ Run finished: {}/{} tickers collected ({} failed)",
        summary.successful, summary.total_tickers, summary.failed
    );

    Ok(())
}

fn run_analyze(
    config: Config,
    ticker: Option<String>,
    sectors: bool,
    top_performers: Option<usize>,
    export_json: bool,
) -> Result<()> {
    let store = FileStore::new(&config.data_dir)?;
    let analyzer = Analyzer::new(store);

    if let Some(ticker) = ticker {
        let analysis = analyzer.analyze_ticker(&ticker.to_uppercase())?;
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else if export_json {
        analyzer.export_json()?;
    } else if let Some(n) = top_performers {
        let performers = analyzer.top_performers(n)?;
        println!("\nTop {} Performers (1-Year Return):", n);
        for (i, p) in performers.iter().enumerate() {
            println!(
                "{:3}. {:6} {:+7.2}% (${:.2})",
                i + 1,
                p.ticker,
                p.return_1y,
                p.current_price
            );
        }
    } else if sectors {
        println!("\nSector Breakdown:");
        for (sector, count) in analyzer.sector_breakdown()? {
            println!("  {:30} {:5} stocks", sector, count);
        }
    } else {
        analyzer.print_report()?;
    }

    Ok(())
}

/// Prompt user for yes/no input
fn prompt_user(message: &str) -> Result<bool> {
    use std::io::{self, Write};

    print!("{}", message);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}
