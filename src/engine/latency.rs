//! Bid-side latency simulation.
//!
//! A bid observed at `T` can only be hit by a remote participant at
//! `T + latency_us`, so the bid and bid size used at row `T` must describe
//! the venue's book `latency_us` later. Asks are never delayed.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::engine::types::{ConsolidatedBook, Micros};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LatencyMode {
    /// Resolve each venue's bid from its raw update series with an as-of
    /// lookup at `T + latency_us`, staleness measured from that instant.
    #[default]
    QueryOffset,
    /// Shift the consolidated bid columns and re-align them on the original
    /// axis, carrying the last grid row at or before `T + latency_us`.
    /// Rows whose shifted instant falls past the last grid row get no bid.
    ShiftAlign,
}

#[instrument(level = "debug", skip(book), fields(rows = book.rows.len()))]
pub fn apply_latency(book: &ConsolidatedBook, latency_us: Micros, mode: LatencyMode) -> ConsolidatedBook {
    if latency_us == 0 {
        return book.clone();
    }

    let mut delayed = book.clone();
    match mode {
        LatencyMode::QueryOffset => {
            for row in &mut delayed.rows {
                let at = row.timestamp.saturating_add(latency_us);
                for (quote, series) in row.quotes.iter_mut().zip(&book.series) {
                    quote.bid = series.as_of(at, book.tolerance_us).and_then(|top| top.bid);
                }
            }
        }
        LatencyMode::ShiftAlign => {
            let last_ts = book.rows.last().map(|r| r.timestamp);
            let mut source = 0usize;
            for row in &mut delayed.rows {
                let at = row.timestamp.saturating_add(latency_us);
                // rows are strictly increasing, so the source cursor only moves forward
                while source + 1 < book.rows.len() && book.rows[source + 1].timestamp <= at {
                    source += 1;
                }
                let covered = last_ts.is_some_and(|last| at <= last);
                for (v, quote) in row.quotes.iter_mut().enumerate() {
                    quote.bid = if covered { book.rows[source].best_bid(v) } else { None };
                }
            }
        }
    }

    let bids_before = count_bids(book);
    let bids_after = count_bids(&delayed);
    debug!(latency_us, ?mode, bids_before, bids_after, "applied bid-side latency");
    delayed
}

fn count_bids(book: &ConsolidatedBook) -> usize {
    book.rows
        .iter()
        .map(|r| r.quotes.iter().filter(|q| q.bid.is_some()).count())
        .sum()
}
