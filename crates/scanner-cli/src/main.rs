//! scanner-cli: dual-timeframe channel scanner for the terminal.
//!
//! Scans a catalog of instruments (or explicit tickers), classifies the
//! daily/weekly channel alignment per instrument and prints the results
//! table, with optional CSV export, trade plans, chart rendering and a
//! historical replay mode.
//!
//! Usage:
//!   cargo run -p scanner-cli -- --catalog data
//!   cargo run -p scanner-cli -- --tickers PETR4 VALE3 --period 2y --plans
//!   cargo run -p scanner-cli -- --catalog data --categories etf --export scan.csv
//!   cargo run -p scanner-cli -- --tickers PETR4 --chart PETR4
//!   cargo run -p scanner-cli -- --tickers PETR4 VALE3 --backtest

mod charts;
mod export;
mod table;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use asset_catalog::AssetCatalog;
use channel_indicator::{compute_channel, AtrSmoothing, ChannelConfig};
use convergence_engine::{ScanConfig, ScanEngine, ScanReport, DEFAULT_CONCURRENCY};
use risk_planner::{format_plan, position_size, RiskConfig};
use scanner_core::{AssetCategory, FetchPeriod, Instrument, Market, Timeframe};
use strategy_backtest::{BacktestConfig, BacktestEngine};
use yahoo_client::YahooClient;

const DEFAULT_CATALOG_DIR: &str = "data";
const DEFAULT_CHART_DIR: &str = "charts";
const DEFAULT_RISK_PERCENT: f64 = 1.0;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "scanner_cli=info,convergence_engine=info,yahoo_client=warn".into()
            }),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let channel_defaults = ChannelConfig::default();
    let channel = ChannelConfig {
        upper_window: usize_flag(&args, "--upper", channel_defaults.upper_window)?,
        under_window: usize_flag(&args, "--under", channel_defaults.under_window)?,
        fast_window: usize_flag(&args, "--fast", channel_defaults.fast_window)?,
        atr_window: usize_flag(&args, "--atr", channel_defaults.atr_window)?,
        atr_smoothing: match value_of(&args, "--atr-smoothing") {
            Some("simple") | None => AtrSmoothing::Simple,
            Some("wilder") => AtrSmoothing::Wilder,
            Some(other) => anyhow::bail!(
                "unknown ATR smoothing '{}', expected simple or wilder",
                other
            ),
        },
    };

    let risk_defaults = RiskConfig::default();
    let stop_multiplier = f64_flag(&args, "--stop", risk_defaults.stop_multiplier)?;
    let target_multiplier = f64_flag(&args, "--target", risk_defaults.primary_multiplier)?;
    let risk = RiskConfig {
        stop_multiplier,
        primary_multiplier: target_multiplier,
        ..risk_defaults
    };

    let period = match value_of(&args, "--period") {
        Some(raw) => FetchPeriod::parse(raw).ok_or_else(|| {
            anyhow::anyhow!("unknown period '{}', expected 6mo|1y|2y|3y|5y|10y", raw)
        })?,
        None => FetchPeriod::default(),
    };

    let refresh = args.iter().any(|a| a == "--refresh");
    let backtest = args.iter().any(|a| a == "--backtest");
    let show_plans = args.iter().any(|a| a == "--plans");
    let concurrency = usize_flag(&args, "--concurrency", DEFAULT_CONCURRENCY)?;
    let export_path = value_of(&args, "--export").map(PathBuf::from);
    let chart_symbol = value_of(&args, "--chart").map(|s| s.to_string());
    let chart_dir = PathBuf::from(value_of(&args, "--chart-dir").unwrap_or(DEFAULT_CHART_DIR));
    let capital = match opt_f64_flag(&args, "--capital")? {
        Some(value) => Some(value),
        None => std::env::var("SCANNER_CAPITAL")
            .ok()
            .and_then(|raw| raw.parse().ok()),
    };
    let risk_percent = f64_flag(&args, "--risk-pct", DEFAULT_RISK_PERCENT)?;

    let categories: Vec<AssetCategory> = match value_of(&args, "--categories") {
        Some(raw) => raw
            .split(',')
            .map(|name| {
                AssetCategory::parse(name.trim())
                    .ok_or_else(|| anyhow::anyhow!("unknown category '{}'", name.trim()))
            })
            .collect::<Result<_>>()?,
        None => Vec::new(),
    };

    let instruments: Vec<Instrument> = if let Some(idx) = args.iter().position(|a| a == "--tickers")
    {
        let market = match value_of(&args, "--market") {
            Some(raw) => Market::parse(raw).ok_or_else(|| {
                anyhow::anyhow!("unknown market '{}', expected domestic|foreign|crypto", raw)
            })?,
            None => Market::Domestic,
        };
        args[idx + 1..]
            .iter()
            .take_while(|a| !a.starts_with("--"))
            .map(|ticker| Instrument {
                ticker: ticker.to_uppercase(),
                name: ticker.to_uppercase(),
                market,
                category: AssetCategory::Equity,
            })
            .collect()
    } else {
        let catalog_dir = PathBuf::from(value_of(&args, "--catalog").unwrap_or(DEFAULT_CATALOG_DIR));
        let catalog = AssetCatalog::load_dir(&catalog_dir)?;
        if catalog.is_empty() {
            anyhow::bail!("no instruments found under {}", catalog_dir.display());
        }
        tracing::info!(
            "Catalog: {} instruments from {}",
            catalog.len(),
            catalog_dir.display()
        );

        if let Some(query) = value_of(&args, "--search") {
            for instrument in catalog.search(query, &categories) {
                println!(
                    "{:<8} {:<36} {}",
                    instrument.ticker,
                    instrument.name,
                    instrument.category.label()
                );
            }
            return Ok(());
        }

        catalog.filter(&categories)
    };

    if instruments.is_empty() {
        print_usage();
        std::process::exit(1);
    }

    let scan_config = ScanConfig {
        channel: channel.clone(),
        risk: risk.clone(),
        period,
        max_concurrency: concurrency,
        refresh,
    };
    let provider = Arc::new(YahooClient::new());
    let engine = ScanEngine::new(provider, scan_config)?;

    if backtest {
        let backtester = BacktestEngine::new(BacktestConfig {
            channel: channel.clone(),
            stop_multiplier,
            target_multiplier,
        })?;
        let results = run_backtests(&engine, &backtester, &instruments).await;
        if results.is_empty() {
            anyhow::bail!("no instruments could be replayed");
        }
        if let [only] = results.as_slice() {
            println!("{}", table::render_backtest_report(only));
        } else {
            println!("{}", table::render_backtests(&results));
        }
        return Ok(());
    }

    let report = engine.scan(&instruments).await;
    println!("{}", table::render_report(&report));

    if show_plans {
        for row in report.signal_rows() {
            if let Some(plan) = row.plan.as_ref() {
                let sizing = match capital {
                    Some(capital) => match position_size(capital, risk_percent, plan) {
                        Ok(sizing) => Some(sizing),
                        Err(err) => {
                            tracing::warn!("{}: position sizing: {}", row.ticker, err);
                            None
                        }
                    },
                    None => None,
                };
                println!("{}", format_plan(&row.ticker, plan, sizing.as_ref()));
            }
        }
    }

    if let Some(path) = export_path {
        export::write_report_csv(&path, &report)?;
        tracing::info!("✅ Results exported to {}", path.display());
    }

    if let Some(symbol) = chart_symbol {
        render_chart_for(&engine, &report, &instruments, &symbol, &channel, &chart_dir).await?;
    }

    Ok(())
}

async fn run_backtests(
    engine: &ScanEngine,
    backtester: &BacktestEngine,
    instruments: &[Instrument],
) -> Vec<strategy_backtest::BacktestResult> {
    let mut results = Vec::with_capacity(instruments.len());
    for instrument in instruments {
        let symbol = instrument.provider_symbol();
        let daily = match engine.bars(&symbol, Timeframe::Daily).await {
            Ok(bars) => bars,
            Err(err) => {
                tracing::warn!("{}: {}", instrument.ticker, err);
                continue;
            }
        };
        let weekly = match engine.bars(&symbol, Timeframe::Weekly).await {
            Ok(bars) => bars,
            Err(err) => {
                tracing::warn!("{}: {}", instrument.ticker, err);
                continue;
            }
        };
        match backtester.run(&instrument.ticker, &daily, &weekly) {
            Ok(result) => results.push(result),
            Err(err) => tracing::warn!("{}: replay failed: {}", instrument.ticker, err),
        }
    }
    results
}

async fn render_chart_for(
    engine: &ScanEngine,
    report: &ScanReport,
    instruments: &[Instrument],
    ticker: &str,
    channel: &ChannelConfig,
    out_dir: &Path,
) -> Result<()> {
    let instrument = instruments
        .iter()
        .find(|i| i.ticker.eq_ignore_ascii_case(ticker))
        .ok_or_else(|| anyhow::anyhow!("'{}' is not among the scanned instruments", ticker))?;

    let symbol = instrument.provider_symbol();
    let daily = engine.bars(&symbol, Timeframe::Daily).await?;
    let weekly = engine.bars(&symbol, Timeframe::Weekly).await?;
    let daily_series = compute_channel(&daily, channel)?;
    let weekly_series = compute_channel(&weekly, channel)?;

    let plan = report
        .rows
        .iter()
        .find(|row| row.ticker.eq_ignore_ascii_case(&instrument.ticker))
        .and_then(|row| row.plan.as_ref());

    let path = charts::render_dual_chart(
        &instrument.ticker,
        &daily,
        &daily_series,
        &weekly,
        &weekly_series,
        plan,
        out_dir,
    )?;
    tracing::info!("📊 Chart written to {}", path.display());
    Ok(())
}

fn value_of<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn usize_flag(args: &[String], flag: &str, default: usize) -> Result<usize> {
    match value_of(args, flag) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} expects a whole number, got '{}'", flag, raw)),
        None => Ok(default),
    }
}

fn f64_flag(args: &[String], flag: &str, default: f64) -> Result<f64> {
    match value_of(args, flag) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} expects a number, got '{}'", flag, raw)),
        None => Ok(default),
    }
}

fn opt_f64_flag(args: &[String], flag: &str) -> Result<Option<f64>> {
    value_of(args, flag)
        .map(|raw| {
            raw.parse()
                .with_context(|| format!("{} expects a number, got '{}'", flag, raw))
        })
        .transpose()
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  scanner-cli --catalog DIR                 Scan every instrument in the catalog");
    eprintln!("  scanner-cli --tickers PETR4 VALE3 ...     Scan specific tickers");
    eprintln!("  scanner-cli --search QUERY                Search the catalog and exit");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --categories LIST     Comma separated: equity,fund,etf,receipt");
    eprintln!("  --market NAME         Market for --tickers: domestic|foreign|crypto (default: domestic)");
    eprintln!("  --period P            History window: 6mo|1y|2y|3y|5y|10y (default: 1y)");
    eprintln!("  --upper N             Upper band window over highs (default: 20)");
    eprintln!("  --under N             Under band window over lows (default: 30)");
    eprintln!("  --fast N              Fast EMA span over closes (default: 9)");
    eprintln!("  --atr N               ATR window (default: 14)");
    eprintln!("  --atr-smoothing MODE  simple|wilder (default: simple)");
    eprintln!("  --stop X              Stop distance in ATRs (default: 1.5)");
    eprintln!("  --target X            Primary target in risk multiples (default: 2.0)");
    eprintln!("  --concurrency N       Parallel fetches (default: {})", DEFAULT_CONCURRENCY);
    eprintln!("  --refresh             Ignore cached bars and refetch");
    eprintln!("  --plans               Print a trade plan per actionable row");
    eprintln!("  --capital X           Account size for position sizing (or SCANNER_CAPITAL in .env)");
    eprintln!("  --risk-pct X          Percent of capital risked per trade (default: 1.0)");
    eprintln!("  --export PATH         Write the results as CSV");
    eprintln!("  --chart TICKER        Render the dual timeframe chart for one instrument");
    eprintln!("  --chart-dir DIR       Chart output directory (default: charts)");
    eprintln!("  --backtest            Replay the strategy instead of scanning");
}
