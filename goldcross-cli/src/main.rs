//! Goldcross CLI — backtest, config validation, and live trading commands.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config and save artifacts
//! - `validate` — parse and validate a config without running anything
//! - `live` — drive the polling live loop against a quote directory,
//!   with per-order console approval

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use goldcross_core::domain::Quote;
use goldcross_core::live::{
    ApprovalError, FeedError, LiveConfig, LiveDriver, PriceFeed, SinkError, TradeApprover,
    TradeEvent, TradeRequest, TradeSink,
};
use goldcross_runner::{
    load_market_data, run_single_backtest, save_artifacts, BacktestResult, RunConfig,
};

#[derive(Parser)]
#[command(name = "goldcross", about = "Golden-cross strategy engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file and save artifacts.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for artifacts (result.json, trades.csv, equity.csv).
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Parse and validate a config file without running anything.
    Validate {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,
    },
    /// Run the live polling loop. Quotes are read from `{quote_dir}/{SYMBOL}.json`,
    /// refreshed by an external fetcher; each order asks for console approval
    /// unless --auto-approve is set. Answer `q` to any prompt to stop the loop.
    Live {
        /// Path to a TOML config file (data section supplies the bar history).
        #[arg(long)]
        config: PathBuf,

        /// Directory of per-symbol quote JSON files.
        #[arg(long)]
        quote_dir: PathBuf,

        /// Append trade events to this JSONL file.
        #[arg(long, default_value = "live_trades.jsonl")]
        journal: PathBuf,

        /// Seconds between polling cycles.
        #[arg(long, default_value_t = 300)]
        poll_secs: u64,

        /// Skip the console prompt and approve every order.
        #[arg(long, default_value_t = false)]
        auto_approve: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config, output_dir } => run_cmd(&config, &output_dir),
        Commands::Validate { config } => validate_cmd(&config),
        Commands::Live {
            config,
            quote_dir,
            journal,
            poll_secs,
            auto_approve,
        } => live_cmd(&config, quote_dir, journal, poll_secs, auto_approve),
    }
}

fn run_cmd(config_path: &Path, output_dir: &Path) -> Result<()> {
    let config = RunConfig::load(config_path)?;
    let result = run_single_backtest(&config)?;
    print_summary(&result);
    let run_dir = save_artifacts(&result, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn validate_cmd(config_path: &Path) -> Result<()> {
    let config = RunConfig::load(config_path)?;
    println!("Config OK");
    println!("  run id:     {}", config.run_id());
    println!("  universe:   {}", config.universe.join(", "));
    println!(
        "  benchmark:  {}",
        config.benchmark.as_deref().unwrap_or("(none)")
    );
    println!(
        "  crossover:  {}/{} SMA, {} slots",
        config.strategy.fast_period, config.strategy.slow_period, config.strategy.max_positions
    );
    Ok(())
}

fn live_cmd(
    config_path: &Path,
    quote_dir: PathBuf,
    journal: PathBuf,
    poll_secs: u64,
    auto_approve: bool,
) -> Result<()> {
    let config = RunConfig::load(config_path)?;
    let history = load_market_data(&config)?;
    info!(
        symbols = history.symbols().len(),
        bars = history.len(),
        "bar history loaded"
    );

    let stop = Arc::new(AtomicBool::new(false));
    let live_config = LiveConfig {
        poll_interval: Duration::from_secs(poll_secs),
        manual_approval: !auto_approve,
        ..LiveConfig::default()
    };

    let mut driver = LiveDriver::new(
        config.strategy.clone(),
        live_config,
        history,
        QuoteFileFeed { dir: quote_dir },
        ConsoleApprover {
            stop: Arc::clone(&stop),
        },
        JsonlSink::open(&journal)?,
        Arc::clone(&stop),
    )?;

    driver.run()?;
    println!(
        "Stopped with {} open position(s); journal at {}",
        driver.ledger().open_count(),
        journal.display()
    );
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!("Run {}", result.run_id);
    println!(
        "  {} bars, {} warmup, {} trades",
        result.bar_count, result.warmup_bars, m.trade_count
    );
    println!(
        "  return: {:+.2}% total, {:+.2}% annualized",
        m.total_return_pct, m.annualized_return_pct
    );
    println!(
        "  sharpe {:.2}  sortino {:.2}  calmar {:.2}  max drawdown {:.2}%",
        m.sharpe, m.sortino, m.calmar, m.max_drawdown_pct
    );
    println!(
        "  win rate {:.1}%  profit factor {}",
        m.win_rate * 100.0,
        m.profit_factor
            .map(|pf| format!("{pf:.2}"))
            .unwrap_or_else(|| "n/a (no losses)".into())
    );
    for (reason, count) in &m.exits_by_reason {
        println!("    {reason}: {count}");
    }
    if !result.breaker_trips.is_empty() {
        println!("  circuit breaker trips: {}", result.breaker_trips.len());
    }
}

/// Reads `{dir}/{SYMBOL}.json`, a serialized [`Quote`] refreshed by an
/// external fetcher process. A missing or unparsable file means no quote
/// this cycle; staleness is handled by the driver.
struct QuoteFileFeed {
    dir: PathBuf,
}

impl PriceFeed for QuoteFileFeed {
    fn fetch(&mut self, symbol: &str) -> Result<Quote, FeedError> {
        let path = self.dir.join(format!("{symbol}.json"));
        let text = std::fs::read_to_string(&path)
            .map_err(|_| FeedError::NoQuote(symbol.to_string()))?;
        serde_json::from_str(&text)
            .map_err(|err| FeedError::Unavailable(format!("{}: {err}", path.display())))
    }
}

/// Console y/n prompt per order. `q` denies the order and sets the stop
/// flag, so the loop winds down after the current cycle.
struct ConsoleApprover {
    stop: Arc<AtomicBool>,
}

impl TradeApprover for ConsoleApprover {
    fn approve(&mut self, request: &TradeRequest) -> Result<bool, ApprovalError> {
        match request {
            TradeRequest::Enter {
                symbol,
                price,
                quantity,
                strength,
            } => print!(
                "BUY {quantity} {symbol} @ {price:.2} (strength {strength:.2}) [y/n/q] "
            ),
            TradeRequest::Exit {
                symbol,
                price,
                quantity,
                reason,
            } => print!("SELL {quantity} {symbol} @ {price:.2} ({reason}) [y/n/q] "),
        }
        std::io::stdout()
            .flush()
            .map_err(|err| ApprovalError::ChannelClosed(err.to_string()))?;

        let mut answer = String::new();
        let read = std::io::stdin()
            .read_line(&mut answer)
            .map_err(|err| ApprovalError::ChannelClosed(err.to_string()))?;
        if read == 0 {
            // stdin closed: stop the loop, approve nothing.
            self.stop.store(true, Ordering::SeqCst);
            return Ok(false);
        }
        match answer.trim() {
            "y" | "Y" | "yes" => Ok(true),
            "q" | "Q" => {
                self.stop.store(true, Ordering::SeqCst);
                Ok(false)
            }
            _ => Ok(false),
        }
    }
}

/// Appends one JSON line per trade event. The driver treats write failures
/// as non-fatal, so a full disk degrades to log noise, not a halted loop.
struct JsonlSink {
    file: std::fs::File,
}

impl JsonlSink {
    fn open(path: &Path) -> Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open journal {}", path.display()))?;
        Ok(Self { file })
    }
}

impl TradeSink for JsonlSink {
    fn record(&mut self, event: &TradeEvent) -> Result<(), SinkError> {
        let line = serde_json::to_string(event).map_err(|err| SinkError::Write(err.to_string()))?;
        writeln!(self.file, "{line}").map_err(|err| SinkError::Write(err.to_string()))
    }
}
