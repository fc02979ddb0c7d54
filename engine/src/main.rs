// Engine main entry point: replays a CSV candle feed and prints snapshots as JSON lines
use anyhow::{Context, Result};
use clap::Parser;
use engine::config::EngineSettings;
use engine::data::FeedCsvParser;
use engine::services::{replay_concurrently, IndicatorService};
use shared::utils::rank_by_buy_signals;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "engine", about = "Replay a candle feed through the WaveTrend/RSI indicator engine")]
struct Cli {
    /// CSV feed with columns symbol,timeframe,timestamp,high,low,close
    #[arg(long)]
    feed: PathBuf,

    /// JSON settings file (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Process each (symbol, timeframe) pair on its own task
    #[arg(long)]
    concurrent: bool,

    /// Only print snapshots whose WaveTrend is ready
    #[arg(long)]
    ready_only: bool,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the snapshots.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = match &cli.config {
        Some(path) => EngineSettings::load(path).with_context(|| format!("loading settings from {}", path.display()))?,
        None => EngineSettings::default(),
    };

    let events = FeedCsvParser::load_events_from_csv(&cli.feed)
        .with_context(|| format!("reading candle feed {}", cli.feed.display()))?;
    info!(events = events.len(), concurrent = cli.concurrent, "Loaded candle feed");

    let snapshots = if cli.concurrent {
        replay_concurrently(events, Arc::new(settings)).await?
    } else {
        let mut service = IndicatorService::new(settings)?;
        service
            .process_batch(events)
            .into_iter()
            .filter_map(Result::ok)
            .collect()
    };

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut printed = 0usize;
    for snapshot in snapshots.iter().filter(|s| !cli.ready_only || s.is_ready()) {
        serde_json::to_writer(&mut out, snapshot)?;
        writeln!(out)?;
        printed += 1;
    }
    out.flush()?;

    for (symbol, buys) in rank_by_buy_signals(&snapshots) {
        info!(%symbol, buy_timeframes = buys, "Buy-signal ranking");
    }
    info!(snapshots = snapshots.len(), printed, "Replay finished");
    Ok(())
}
