use std::cmp::Reverse;

use ordered_float::OrderedFloat;
use tracing::{debug, instrument, trace};

use crate::engine::types::{
    ArbitrageEvent, BookLevel, ConsolidatedBook, ConsolidatedRow, Crossing, VenueQuote,
};

// Lowest present ask; ties go to the earliest venue
fn min_ask(row: &ConsolidatedRow) -> Option<(usize, BookLevel)> {
    row.quotes
        .iter()
        .enumerate()
        .filter_map(|(v, q)| q.ask.map(|l| (v, l)))
        .min_by_key(|(_, l)| OrderedFloat(l.price))
}

// Highest present bid; ties go to the earliest venue
fn max_bid(row: &ConsolidatedRow) -> Option<(usize, BookLevel)> {
    row.quotes
        .iter()
        .enumerate()
        .filter_map(|(v, q)| q.bid.map(|l| (v, l)))
        .min_by_key(|(_, l)| Reverse(OrderedFloat(l.price)))
}

/// Flag every row where the best bid across venues beats the best ask
/// across venues and the two belong to different venues.
#[instrument(level = "debug", skip(book), fields(rows = book.rows.len(), venues = book.venues.len()))]
pub fn scan(book: &ConsolidatedBook) -> Vec<Crossing> {
    let mut crossings = Vec::new();
    let mut same_venue = 0usize;

    for row in &book.rows {
        let (Some((ask_venue, ask)), Some((bid_venue, bid))) = (min_ask(row), max_bid(row)) else {
            continue;
        };
        if bid.price <= ask.price {
            continue;
        }
        if ask_venue == bid_venue {
            same_venue += 1;
            trace!(ts = row.timestamp, venue = %book.venues[ask_venue], "discarding locked venue book");
            continue;
        }

        trace!(
            ts = row.timestamp,
            from = %book.venues[ask_venue],
            to = %book.venues[bid_venue],
            ask = ask.price,
            bid = bid.price,
            "crossing"
        );
        crossings.push(Crossing {
            timestamp: row.timestamp,
            ask: VenueQuote { venue: book.venues[ask_venue].clone(), price: ask.price, size: ask.size },
            bid: VenueQuote { venue: book.venues[bid_venue].clone(), price: bid.price, size: bid.size },
        });
    }

    debug!(crossings = crossings.len(), same_venue, "scan finished");
    metrics::counter!("venue_arb_crossings").increment(crossings.len() as u64);
    crossings
}

/// Convenience wrapper: crossings priced as events, one per flagged row.
pub fn scan_events(book: &ConsolidatedBook) -> Vec<ArbitrageEvent> {
    scan(book).into_iter().map(ArbitrageEvent::from).collect()
}
