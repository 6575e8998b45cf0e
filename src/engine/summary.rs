use ahash::AHashMap;
use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::engine::types::{ArbitrageEvent, Micros, VenueId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairStats {
    pub from_venue: VenueId,
    pub to_venue: VenueId,
    pub events: usize,
    pub volume: f64,
    pub profit: f64,
}

// Aggregate view over the retained opportunities of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunitySummary {
    pub events: usize,
    pub total_volume: f64,
    pub total_profit: f64,
    pub max_profit: Option<f64>,
    pub first_timestamp: Option<Micros>,
    pub last_timestamp: Option<Micros>,
    /// Sorted by profit, highest first.
    pub pairs: Vec<PairStats>,
}

impl OpportunitySummary {
    pub fn from_events(events: &[ArbitrageEvent]) -> Self {
        let mut pairs: AHashMap<(&VenueId, &VenueId), PairStats> = AHashMap::new();
        for e in events {
            let stats = pairs.entry((&e.from_venue, &e.to_venue)).or_insert_with(|| PairStats {
                from_venue: e.from_venue.clone(),
                to_venue: e.to_venue.clone(),
                events: 0,
                volume: 0.0,
                profit: 0.0,
            });
            stats.events += 1;
            stats.volume += e.tradable_volume;
            stats.profit += e.profit;
        }

        let mut pairs: Vec<PairStats> = pairs.into_iter().map(|(_, stats)| stats).collect();
        pairs.sort_by(|a, b| {
            OrderedFloat(b.profit)
                .cmp(&OrderedFloat(a.profit))
                .then_with(|| a.from_venue.cmp(&b.from_venue))
                .then_with(|| a.to_venue.cmp(&b.to_venue))
        });

        Self {
            events: events.len(),
            total_volume: events.iter().map(|e| e.tradable_volume).sum(),
            total_profit: events.iter().map(|e| e.profit).sum(),
            max_profit: events.iter().map(|e| OrderedFloat(e.profit)).max().map(|p| p.0),
            first_timestamp: events.first().map(|e| e.timestamp),
            last_timestamp: events.last().map(|e| e.timestamp),
            pairs,
        }
    }
}
