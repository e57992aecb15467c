//! signal-scanner: rank every active exchange instrument as Buy / Sell / Hold.
//!
//! Fetches the roster, a year of daily history per instrument and the
//! company disclosures, fuses technical, pressure and sentiment signals per
//! instrument and writes the ranked result set as CSV files.
//!
//! Usage:
//!   cargo run -p signal-scanner
//!   cargo run -p signal-scanner -- --symbols NABIL HDL --dry-run
//!   cargo run -p signal-scanner -- --concurrency 4 --output reports --short-labels

mod config;

use analysis_core::{AnalysisError, ResultSet};
use analysis_orchestrator::{AnalysisOrchestrator, SignalScreener};
use anyhow::Context;
use config::ScannerConfig;
use exchange_client::ExchangeClient;
use signal_report::{ReportOptions, ReportWriter};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Buy and sell names listed in the closing summary.
const SUMMARY_TOP_N: usize = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let mut config = ScannerConfig::from_env().context("invalid configuration")?;
    config.apply_args(&args).context("invalid arguments")?;

    tracing::info!(
        "signal-scanner: source={}, concurrency={}, lookback={}d, output={}, dry_run={}",
        config.base_url,
        config.concurrency,
        config.lookback_days,
        config.output_dir.display(),
        config.dry_run
    );

    let started = Instant::now();

    let client = ExchangeClient::new(config.client_config()).context("failed to build HTTP client")?;
    let orchestrator = Arc::new(AnalysisOrchestrator::new(config.engine_config()));
    let screener = SignalScreener::new(orchestrator, Arc::new(client));

    let set = match screener.screen(&config.screener_options()).await {
        Ok(set) => set,
        Err(AnalysisError::NoResults) => {
            anyhow::bail!("no instrument could be analyzed; nothing to report")
        }
        Err(e) => return Err(e).context("scan failed"),
    };

    log_summary(&set);

    if config.dry_run {
        tracing::info!("Dry run: report not written");
    } else {
        let writer = ReportWriter::new(
            &config.output_dir,
            ReportOptions {
                abbreviate: config.abbreviate_labels,
            },
        );
        let run_dir = writer.write(&set).context("failed to write report")?;
        tracing::info!("Report written to {}", run_dir.display());
    }

    tracing::info!("Done in {:.1}s", started.elapsed().as_secs_f64());
    Ok(())
}

fn init_tracing() {
    let json_logging = std::env::var("JSON_LOGS")
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "signal_scanner=info,analysis_orchestrator=info,exchange_client=warn".into()
    });

    if json_logging {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn log_summary(set: &ResultSet) {
    tracing::info!(
        "{} of {} instruments analyzed: {} buy, {} sell, {} hold",
        set.overall.len(),
        set.total_instruments,
        set.buy.len(),
        set.sell.len(),
        set.hold.len()
    );

    for (label, results) in [("Top buys", &set.buy), ("Top sells", &set.sell)] {
        if results.is_empty() {
            continue;
        }
        let names: Vec<&str> = results
            .iter()
            .take(SUMMARY_TOP_N)
            .map(|r| r.symbol.as_str())
            .collect();
        tracing::info!("{}: {}", label, names.join(", "));
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  signal-scanner                          Scan every active instrument");
    eprintln!("  signal-scanner --symbols NABIL HDL ...  Scan specific symbols");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --concurrency N    Max instruments analyzed in parallel (default: 10)");
    eprintln!("  --output DIR       Report directory (default: output)");
    eprintln!("  --short-labels     Write BY / SL / - / HOLD instead of full labels");
    eprintln!("  --dry-run          Analyze and log without writing the report");
    eprintln!();
    eprintln!("Environment: EXCHANGE_BASE_URL, SCAN_CONCURRENCY, LOOKBACK_DAYS, HISTORY_PAGE_SIZE,");
    eprintln!("  FETCH_MAX_ATTEMPTS, FETCH_BACKOFF_MS, REQUEST_TIMEOUT_SECS, OUTPUT_DIR,");
    eprintln!("  SENTIMENT_THRESHOLD, PRESSURE_DEADBAND, ABBREVIATE_LABELS, JSON_LOGS, RUST_LOG");
}
