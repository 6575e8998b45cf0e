//! Venue consolidation: per-venue top-of-book series merged onto one shared
//! timestamp axis with a backward, staleness-bounded as-of join.

use ahash::AHashMap;
use itertools::Itertools;
use smallvec::SmallVec;
use tracing::{debug, instrument, trace, warn};

use crate::engine::types::{
    AnalysisError, AnalysisResult, ConsolidatedBook, ConsolidatedRow, Micros, QuoteSnapshot,
    TopOfBook, VenueId, VenueSeries,
};

/// Reject data the engine cannot reason about: negative or non-finite
/// prices/sizes and per-venue timestamps going backwards.
#[instrument(level = "debug", skip_all, fields(snapshots = snapshots.len()))]
pub fn validate(snapshots: &[QuoteSnapshot]) -> AnalysisResult<()> {
    let mut last_seen: AHashMap<&VenueId, Micros> = AHashMap::new();

    for (row, snap) in snapshots.iter().enumerate() {
        let fail = |reason: String| AnalysisError::InvalidSnapshot {
            row,
            venue: snap.venue.clone(),
            timestamp: snap.timestamp,
            reason,
        };

        for (side, levels) in [("ask", &snap.asks), ("bid", &snap.bids)] {
            for (i, level) in levels.iter().enumerate() {
                if !level.price.is_finite() || level.price < 0.0 {
                    return Err(fail(format!("{side} price at level {i} is {}", level.price)));
                }
                if !level.size.is_finite() || level.size < 0.0 {
                    return Err(fail(format!("{side} size at level {i} is {}", level.size)));
                }
            }
        }

        if let Some(prev) = last_seen.insert(&snap.venue, snap.timestamp) {
            if snap.timestamp < prev {
                return Err(fail(format!(
                    "timestamp goes backwards (previous update at {prev})"
                )));
            }
        }
    }
    Ok(())
}

/// Distinct venues in order of first appearance.
pub fn venues_in_order(snapshots: &[QuoteSnapshot]) -> Vec<VenueId> {
    let mut venues: Vec<VenueId> = Vec::new();
    for snap in snapshots {
        if !venues.contains(&snap.venue) {
            venues.push(snap.venue.clone());
        }
    }
    venues
}

// Sorted by timestamp, one point per timestamp (last write wins)
fn build_series(mut points: Vec<(Micros, TopOfBook)>) -> VenueSeries {
    points.sort_by_key(|(ts, _)| *ts);
    let points = points
        .into_iter()
        .coalesce(|prev, next| if prev.0 == next.0 { Ok(next) } else { Err((prev, next)) })
        .collect();
    VenueSeries { points }
}

/// Build the aligned view. The axis is every distinct timestamp in
/// `snapshots`; each venue contributes its latest update at or before the
/// row timestamp when that update is at most `tolerance_us` old, otherwise
/// nothing.
#[instrument(level = "debug", skip(snapshots, venues), fields(snapshots = snapshots.len(), venues = venues.len()))]
pub fn consolidate(
    snapshots: &[QuoteSnapshot],
    venues: &[VenueId],
    tolerance_us: Micros,
) -> ConsolidatedBook {
    let index: AHashMap<&VenueId, usize> = venues.iter().enumerate().map(|(i, v)| (v, i)).collect();

    let mut raw: Vec<Vec<(Micros, TopOfBook)>> = vec![Vec::new(); venues.len()];
    let mut axis: Vec<Micros> = Vec::with_capacity(snapshots.len());
    for snap in snapshots {
        axis.push(snap.timestamp);
        if let Some(&i) = index.get(&snap.venue) {
            raw[i].push((snap.timestamp, snap.top_of_book()));
        }
    }
    axis.sort_unstable();
    axis.dedup();

    let series: Vec<VenueSeries> = raw.into_iter().map(build_series).collect();
    for (venue, s) in venues.iter().zip(&series) {
        if s.is_empty() {
            warn!(%venue, "venue has no updates in this window");
        } else {
            trace!(%venue, points = s.points.len(), "built venue series");
        }
    }

    // Single forward pass: one cursor per venue
    let mut cursors = vec![0usize; venues.len()];
    let mut rows = Vec::with_capacity(axis.len());
    for &ts in &axis {
        let mut quotes: SmallVec<[TopOfBook; 8]> = SmallVec::with_capacity(venues.len());
        for (v, s) in series.iter().enumerate() {
            let cursor = &mut cursors[v];
            while *cursor < s.points.len() && s.points[*cursor].0 <= ts {
                *cursor += 1;
            }
            let value = match *cursor {
                0 => None,
                c => {
                    let (updated_at, top) = s.points[c - 1];
                    (ts.saturating_sub(updated_at) <= tolerance_us).then_some(top)
                }
            };
            quotes.push(value.unwrap_or_default());
        }
        rows.push(ConsolidatedRow { timestamp: ts, quotes });
    }

    debug!(rows = rows.len(), "consolidated venues");
    metrics::counter!("venue_arb_rows_consolidated").increment(rows.len() as u64);

    ConsolidatedBook {
        venues: venues.to_vec(),
        tolerance_us,
        series,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::BookLevel;
    use smallvec::smallvec;

    fn snap(venue: &str, ts: Micros, ask: f64, bid: f64) -> QuoteSnapshot {
        QuoteSnapshot {
            instrument_id: "ES0113900J37".into(),
            venue: venue.into(),
            timestamp: ts,
            asks: smallvec![BookLevel::new(ask, 10.0), BookLevel::new(ask + 0.01, 20.0)],
            bids: smallvec![BookLevel::new(bid, 10.0), BookLevel::new(bid - 0.01, 20.0)],
        }
    }

    fn venues(codes: &[&str]) -> Vec<VenueId> {
        codes.iter().map(|c| VenueId::from(*c)).collect()
    }

    #[test]
    fn test_axis_is_sorted_union_of_timestamps() {
        let snaps = vec![
            snap("XMAD", 10, 5.0, 4.9),
            snap("AQEU", 5, 5.1, 4.8),
            snap("XMAD", 20, 5.0, 4.9),
            snap("AQEU", 20, 5.1, 4.8),
        ];
        let book = consolidate(&snaps, &venues(&["XMAD", "AQEU"]), 1000);
        let axis: Vec<Micros> = book.rows.iter().map(|r| r.timestamp).collect();
        assert_eq!(axis, vec![5, 10, 20]);
    }

    #[test]
    fn test_staleness_bound() {
        let snaps = vec![
            snap("XMAD", 0, 5.0, 4.9),
            snap("AQEU", 500, 5.1, 4.8),
            snap("AQEU", 999, 5.1, 4.8),
            snap("AQEU", 1000, 5.1, 4.8),
            snap("AQEU", 1001, 5.1, 4.8),
            snap("AQEU", 3000, 5.1, 4.8),
            snap("XMAD", 5000, 5.2, 5.0),
        ];
        let book = consolidate(&snaps, &venues(&["XMAD", "AQEU"]), 1000);
        let xmad_ask = |ts: Micros| {
            book.rows.iter().find(|r| r.timestamp == ts).unwrap().best_ask(0).map(|l| l.price)
        };
        assert_eq!(xmad_ask(0), Some(5.0));
        assert_eq!(xmad_ask(500), Some(5.0));
        assert_eq!(xmad_ask(999), Some(5.0));
        assert_eq!(xmad_ask(1000), Some(5.0));
        assert_eq!(xmad_ask(1001), None);
        assert_eq!(xmad_ask(3000), None);
        assert_eq!(xmad_ask(5000), Some(5.2));
    }

    #[test]
    fn test_zero_tolerance_is_exact_match() {
        let snaps = vec![snap("XMAD", 0, 5.0, 4.9), snap("AQEU", 1, 5.1, 4.8)];
        let book = consolidate(&snaps, &venues(&["XMAD", "AQEU"]), 0);
        assert!(book.rows[0].best_ask(0).is_some());
        assert!(book.rows[0].best_ask(1).is_none());
        assert!(book.rows[1].best_ask(0).is_none());
        assert!(book.rows[1].best_ask(1).is_some());
    }

    #[test]
    fn test_last_write_wins_on_duplicate_timestamp() {
        let snaps = vec![snap("XMAD", 7, 5.0, 4.9), snap("XMAD", 7, 5.5, 5.4)];
        let book = consolidate(&snaps, &venues(&["XMAD"]), 1000);
        assert_eq!(book.rows.len(), 1);
        assert_eq!(book.rows[0].best_ask(0).unwrap().price, 5.5);
        assert_eq!(book.series[0].points.len(), 1);
    }

    #[test]
    fn test_venue_without_snapshots_is_absent_everywhere() {
        let snaps = vec![snap("XMAD", 0, 5.0, 4.9), snap("XMAD", 10, 5.0, 4.9)];
        let book = consolidate(&snaps, &venues(&["XMAD", "CEUX"]), 1000);
        assert!(book.series[1].is_empty());
        for row in &book.rows {
            assert_eq!(row.quotes[1], TopOfBook::default());
        }
    }

    #[test]
    fn test_validate_rejects_backwards_timestamps() {
        let snaps = vec![snap("XMAD", 10, 5.0, 4.9), snap("AQEU", 3, 5.0, 4.9), snap("XMAD", 9, 5.0, 4.9)];
        match validate(&snaps) {
            Err(AnalysisError::InvalidSnapshot { row, venue, .. }) => {
                assert_eq!(row, 2);
                assert_eq!(venue, VenueId::from("XMAD"));
            }
            other => panic!("expected InvalidSnapshot, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_negative_values() {
        let mut bad = snap("XMAD", 0, 5.0, 4.9);
        bad.bids[1].size = -1.0;
        assert!(validate(&[bad]).is_err());

        let mut bad = snap("XMAD", 0, 5.0, 4.9);
        bad.asks[0].price = -5.0;
        assert!(validate(&[bad]).is_err());

        assert!(validate(&[snap("XMAD", 0, 5.0, 4.9), snap("XMAD", 0, 5.0, 4.9)]).is_ok());
    }

    #[test]
    fn test_venues_in_first_appearance_order() {
        let snaps = vec![snap("CEUX", 0, 5.0, 4.9), snap("XMAD", 1, 5.0, 4.9), snap("CEUX", 2, 5.0, 4.9)];
        assert_eq!(venues_in_order(&snaps), venues(&["CEUX", "XMAD"]));
    }
}
