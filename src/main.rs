use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use venue_arb::config::Settings;
use venue_arb::engine::ArbitrageAnalyzer;
use venue_arb::market_data::{CsvQuoteStore, QuoteSource};
use venue_arb::report::{self, OutputFormat};
use venue_arb::telemetry;
use venue_arb::LatencyMode;

/// Detect cross-venue arbitrage in historical quote files.
#[derive(Debug, Parser)]
#[command(name = "venue-arb", version)]
struct Args {
    /// Directory searched recursively for QTE_/STS_ files
    #[arg(long)]
    data: PathBuf,

    /// Instrument ISIN, e.g. ES0113900J37
    #[arg(long)]
    isin: String,

    /// Settings file (defaults to ./venue_arb.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    tolerance_us: Option<i64>,

    #[arg(long)]
    latency_us: Option<i64>,

    #[arg(long)]
    persistence_us: Option<i64>,

    #[arg(long, value_enum)]
    latency_mode: Option<LatencyMode>,

    /// Keep quotes outside continuous trading
    #[arg(long)]
    no_session_trim: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Write results here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // load .env
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref()).context("loading settings")?;
    if let Some(v) = args.tolerance_us {
        settings.tolerance_us = v;
    }
    if let Some(v) = args.latency_us {
        settings.latency_us = v;
    }
    if let Some(v) = args.persistence_us {
        settings.persistence_us = v;
    }
    if let Some(m) = args.latency_mode {
        settings.latency_mode = m;
    }

    telemetry::init_tracing(&settings.log_filter);
    info!(?settings, "starting");

    let analyzer = ArbitrageAnalyzer::new(settings.analyzer())?;

    let mut store = CsvQuoteStore::new(&args.data);
    if args.no_session_trim {
        store = store.without_session_trim();
    }
    let quotes = store
        .load_quotes(&args.isin)
        .with_context(|| format!("loading quotes for {} from {}", args.isin, args.data.display()))?;

    let events = analyzer.find_arbitrage(&quotes)?;

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    report::write(&mut out, args.format, &args.isin, &events)?;
    out.flush()?;
    Ok(())
}
