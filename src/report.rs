// Rendering of detected opportunities

use std::io::Write;

use serde::Serialize;

use crate::engine::summary::OpportunitySummary;
use crate::engine::types::ArbitrageEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    instrument: &'a str,
    summary: &'a OpportunitySummary,
    events: &'a [ArbitrageEvent],
}

pub fn write_csv<W: Write>(out: W, events: &[ArbitrageEvent]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    for e in events {
        wtr.serialize(e)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(out: W, instrument: &str, events: &[ArbitrageEvent]) -> anyhow::Result<()> {
    let summary = OpportunitySummary::from_events(events);
    serde_json::to_writer_pretty(out, &JsonReport { instrument, summary: &summary, events })?;
    Ok(())
}

pub fn write_table<W: Write>(mut out: W, instrument: &str, events: &[ArbitrageEvent]) -> anyhow::Result<()> {
    let summary = OpportunitySummary::from_events(events);
    writeln!(out, "=== {} ===", instrument)?;
    writeln!(
        out,
        "{:>18} {:>10} {:>10} {:>6} {:>6} {:>10} {:>12}",
        "timestamp_us", "ask", "bid", "from", "to", "volume", "profit"
    )?;
    for e in events {
        writeln!(
            out,
            "{:>18} {:>10.4} {:>10.4} {:>6} {:>6} {:>10.2} {:>12.4}",
            e.timestamp, e.ask_price, e.bid_price, e.from_venue, e.to_venue, e.tradable_volume, e.profit
        )?;
    }
    writeln!(
        out,
        "events: {}  volume: {:.2}  profit: {:.4}",
        summary.events, summary.total_volume, summary.total_profit
    )?;
    for p in &summary.pairs {
        writeln!(out, "  {} -> {}: {} events, profit {:.4}", p.from_venue, p.to_venue, p.events, p.profit)?;
    }
    Ok(())
}

pub fn write<W: Write>(out: W, format: OutputFormat, instrument: &str, events: &[ArbitrageEvent]) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => write_table(out, instrument, events),
        OutputFormat::Csv => write_csv(out, events),
        OutputFormat::Json => write_json(out, instrument, events),
    }
}
