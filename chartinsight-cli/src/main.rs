//! ChartInsight CLI: insight, accuracy and evaluation commands.
//!
//! Commands:
//! - `insight`: build the full insight bundle for a symbol
//! - `accuracy`: holdout backtest of the forecast model
//! - `evaluate`: one-step walk-forward evaluation of the forecast model
//! - `resolve`: look up a ticker or company name in listing CSVs
//!
//! Market data comes from Yahoo Finance by default, or from `--csv` /
//! `--synthetic` for offline use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chartinsight_core::PricePoint;
use chartinsight_runner::telemetry::{init_tracing, LogFormat};
use chartinsight_runner::{
    CsvProvider, EngineConfig, InsightBundle, InsightEngine, InsightRequest, LlmConfig,
    MarketDataProvider, NarrativeRequest, NarrativeSettings, SymbolDirectory, SymbolResolver,
    SyntheticProvider, YahooProvider, DEFAULT_TIMEFRAME,
};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "chartinsight",
    about = "ChartInsight CLI: indicators, forecast band, scores and briefing for a symbol"
)]
struct Cli {
    /// Engine configuration file (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    /// Default log level when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct SourceArgs {
    /// Read rows from a CSV file, or from `<dir>/<SYMBOL>.csv` when a directory is given.
    #[arg(long, conflicts_with = "synthetic")]
    csv: Option<PathBuf>,

    /// Use a deterministic synthetic random walk (offline).
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Number of business days of synthetic history.
    #[arg(long, default_value_t = 500)]
    synthetic_points: usize,

    /// History window requested from Yahoo (e.g. 1y, 2y, 5y).
    #[arg(long, default_value = "2y")]
    range: String,

    /// Bar timeframe.
    #[arg(long, default_value = DEFAULT_TIMEFRAME)]
    timeframe: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the insight bundle for a symbol.
    Insight {
        symbol: String,

        /// Forecast horizon in trading periods. Defaults to the configured horizon.
        #[arg(long)]
        horizon: Option<usize>,

        /// Narrative mode: auto, rule or llm.
        #[arg(long, default_value = "auto")]
        mode: NarrativeRequest,

        /// Print the bundle as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,

        #[command(flatten)]
        source: SourceArgs,
    },
    /// Holdout backtest: fit on all but the last N closes and score the forecast.
    Accuracy {
        symbol: String,

        /// Held-out closes.
        #[arg(long, default_value_t = 63)]
        holdout: usize,

        #[arg(long, default_value_t = false)]
        json: bool,

        #[command(flatten)]
        source: SourceArgs,
    },
    /// One-step walk-forward evaluation over the last N closes.
    Evaluate {
        symbol: String,

        #[arg(long, default_value_t = 60)]
        test_points: usize,

        #[arg(long, default_value_t = false)]
        json: bool,

        #[command(flatten)]
        source: SourceArgs,
    },
    /// Resolve a ticker or company name to its canonical symbol and exchange.
    Resolve {
        query: String,

        /// Listing CSV with symbol and name columns; repeat for several markets.
        #[arg(long = "listing", required = true)]
        listings: Vec<PathBuf>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_tracing(&cli.log_level, format)?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Insight {
            symbol,
            horizon,
            mode,
            json,
            source,
        } => run_insight(config, symbol, horizon, mode, json, source).await,
        Commands::Accuracy {
            symbol,
            holdout,
            json,
            source,
        } => run_accuracy(config, symbol, holdout, json, source).await,
        Commands::Evaluate {
            symbol,
            test_points,
            json,
            source,
        } => run_evaluate(config, symbol, test_points, json, source).await,
        Commands::Resolve {
            query,
            listings,
            json,
        } => run_resolve(&query, &listings, json).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn build_provider(source: &SourceArgs) -> Result<Box<dyn MarketDataProvider>> {
    if let Some(path) = &source.csv {
        let provider = if path.is_dir() {
            CsvProvider::directory(path)
        } else {
            CsvProvider::file(path)
        };
        return Ok(Box::new(provider));
    }
    if source.synthetic {
        let today = chrono::Local::now().date_naive();
        return Ok(Box::new(SyntheticProvider::new(
            today,
            source.synthetic_points,
        )));
    }
    let provider = YahooProvider::new(Duration::from_secs(15))?.with_range(source.range.clone());
    Ok(Box::new(provider))
}

async fn fetch_rows(symbol: &str, source: &SourceArgs) -> Result<Vec<PricePoint>> {
    let provider = build_provider(source)?;
    provider
        .fetch(symbol, &source.timeframe)
        .await
        .with_context(|| format!("fetching {symbol} from {}", provider.name()))
}

async fn run_resolve(query: &str, listings: &[PathBuf], json: bool) -> Result<()> {
    let mut directory = SymbolDirectory::default();
    for path in listings {
        directory
            .load_csv(path)
            .with_context(|| format!("loading listings from {}", path.display()))?;
    }
    let listing = directory.resolve(query).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        println!(
            "{}  {}  ({})",
            listing.symbol, listing.description, listing.exchange
        );
    }
    Ok(())
}

fn rule_only_engine(config: EngineConfig) -> Result<InsightEngine> {
    let max_alerts = config.narrative.max_alerts;
    Ok(InsightEngine::with_defaults(
        config,
        NarrativeSettings::rule_only(max_alerts),
    )?)
}

async fn run_insight(
    config: EngineConfig,
    symbol: String,
    horizon: Option<usize>,
    mode: NarrativeRequest,
    json: bool,
    source: SourceArgs,
) -> Result<()> {
    let llm = LlmConfig::from_env()?;
    let settings = NarrativeSettings::from_llm_config(&config.narrative, &llm)?;
    let engine = InsightEngine::with_defaults(config, settings)?;

    let mut request = InsightRequest::new(symbol)
        .with_narrative(mode)
        .with_timeframe(source.timeframe.clone());
    if let Some(h) = horizon {
        request = request.with_horizon(h);
    }

    let provider = build_provider(&source)?;
    let bundle = engine
        .insight_from_provider(&request, provider.as_ref())
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&*bundle)?);
    } else {
        print_bundle(&bundle);
    }
    Ok(())
}

async fn run_accuracy(
    config: EngineConfig,
    symbol: String,
    holdout: usize,
    json: bool,
    source: SourceArgs,
) -> Result<()> {
    let rows = fetch_rows(&symbol, &source).await?;
    let engine = rule_only_engine(config)?;
    let report = engine.accuracy(&symbol, &rows, holdout).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("=== Holdout accuracy: {} ({} points) ===", symbol.to_uppercase(), report.holdout);
        println!("  MAE:       {:.4}", report.mae);
        println!("  RMSE:      {:.4}", report.rmse);
        println!("  MAPE:      {:.2}%", report.mape);
        println!("  Coverage:  {:.1}%", report.coverage_pct);
    }
    Ok(())
}

async fn run_evaluate(
    config: EngineConfig,
    symbol: String,
    test_points: usize,
    json: bool,
    source: SourceArgs,
) -> Result<()> {
    let rows = fetch_rows(&symbol, &source).await?;
    let engine = rule_only_engine(config)?;
    let report = engine.evaluate(&symbol, &rows, test_points).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "=== Walk-forward evaluation: {} ({} one-step forecasts) ===",
            symbol.to_uppercase(),
            report.test_points
        );
        println!("  Coverage:  {:.1}%", report.coverage_pct);
        println!("  RMSE:      {:.4}", report.rmse);
        println!("  MAPE:      {:.2}%", report.mape);
    }
    Ok(())
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.decimals$}"))
}

fn print_bundle(bundle: &InsightBundle) {
    let meta = &bundle.meta;
    let ind = &bundle.indicators;
    let s = &bundle.scores;

    println!("=== {} · {} · as of {} ===", meta.symbol, meta.timeframe, ind.as_of);
    println!("  Close:        {:.2}", ind.close);
    println!("  SMA20/SMA60:  {} / {}", fmt_opt(ind.sma20, 2), fmt_opt(ind.sma60, 2));
    println!("  RSI14:        {}", fmt_opt(ind.rsi14, 1));
    println!("  HV20:         {}%", fmt_opt(ind.hv20_pct, 1));
    println!("  MDD:          {}%", fmt_opt(ind.mdd_pct, 1));
    println!();
    println!(
        "  Signal:       {:?} (trend {:.0}, risk {:.0} {:?}, confidence {:.0} {:?})",
        s.signal, s.trend_score, s.risk_score, s.risk_label, s.confidence_score, s.confidence_label
    );
    match &bundle.band_summary {
        Some(b) => println!(
            "  Band:         {} {:.2} .. {:.2} (center {:.2})",
            b.horizon_label, b.lower, b.upper, b.center
        ),
        None => println!("  Band:         unavailable (forecast degraded)"),
    }
    if let Some(acc) = &bundle.accuracy {
        println!(
            "  Accuracy:     MAPE {:.2}%, coverage {:.1}% over {} points",
            acc.mape, acc.coverage_pct, acc.holdout
        );
    }
    println!();
    println!("  [{}] {}", bundle.narrative.mode, bundle.narrative.summary);
    for note in &bundle.narrative.quick_notes {
        println!("   - {note}");
    }
    println!("  Actions:");
    for action in &bundle.narrative.actions {
        println!("   {action}");
    }
    if !bundle.narrative.alerts.is_empty() {
        println!("  Alerts:");
        for alert in &bundle.narrative.alerts {
            println!("   ! {alert}");
        }
    }
}
