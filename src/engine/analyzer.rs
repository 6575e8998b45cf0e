//! End-to-end pipeline for one instrument, plus a fan-out across instruments.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, info_span, instrument, warn};

use crate::engine::collapser::{collapse, DEFAULT_PERSISTENCE_US};
use crate::engine::consolidator::{consolidate, validate, venues_in_order};
use crate::engine::latency::{apply_latency, LatencyMode};
use crate::engine::scanner::scan;
use crate::engine::types::{
    AnalysisError, AnalysisResult, ArbitrageEvent, Micros, QuoteSnapshot, VenueId,
};

pub const DEFAULT_TOLERANCE_US: Micros = 1_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub tolerance_us: Micros,
    pub latency_us: Micros,
    pub persistence_us: Micros,
    pub latency_mode: LatencyMode,
    /// Fixed venue order; `None` uses first appearance in the data.
    pub venues: Option<Vec<VenueId>>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            tolerance_us: DEFAULT_TOLERANCE_US,
            latency_us: 0,
            persistence_us: DEFAULT_PERSISTENCE_US,
            latency_mode: LatencyMode::default(),
            venues: None,
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        for (name, value) in [
            ("tolerance_us", self.tolerance_us),
            ("latency_us", self.latency_us),
            ("persistence_us", self.persistence_us),
        ] {
            if value < 0 {
                return Err(AnalysisError::InvalidConfig(format!("{name} must be >= 0, got {value}")));
            }
        }
        if let Some(venues) = &self.venues {
            for (i, venue) in venues.iter().enumerate() {
                if venues[..i].contains(venue) {
                    return Err(AnalysisError::InvalidConfig(format!("venue {venue} listed more than once")));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ArbitrageAnalyzer {
    config: AnalyzerConfig,
}

impl ArbitrageAnalyzer {
    pub fn new(config: AnalyzerConfig) -> AnalysisResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Run validate -> consolidate -> latency -> scan -> collapse over the
    /// snapshots of a single instrument.
    #[instrument(skip_all, fields(snapshots = snapshots.len(), latency_us = self.config.latency_us))]
    pub fn find_arbitrage(&self, snapshots: &[QuoteSnapshot]) -> AnalysisResult<Vec<ArbitrageEvent>> {
        if let Some(first) = snapshots.first() {
            if let Some((row, other)) = snapshots
                .iter()
                .enumerate()
                .find(|(_, s)| s.instrument_id != first.instrument_id)
            {
                return Err(AnalysisError::InvalidSnapshot {
                    row,
                    venue: other.venue.clone(),
                    timestamp: other.timestamp,
                    reason: format!(
                        "instrument {} mixed into run for {}",
                        other.instrument_id, first.instrument_id
                    ),
                });
            }
        }
        validate(snapshots)?;

        let venues = match &self.config.venues {
            Some(v) => v.clone(),
            None => venues_in_order(snapshots),
        };
        let book = consolidate(snapshots, &venues, self.config.tolerance_us);
        let book = apply_latency(&book, self.config.latency_us, self.config.latency_mode);
        let raw: Vec<ArbitrageEvent> = scan(&book).into_iter().map(ArbitrageEvent::from).collect();
        let events = collapse(&raw, self.config.persistence_us);

        info!(
            venues = venues.len(),
            rows = book.rows.len(),
            crossings = raw.len(),
            events = events.len(),
            "arbitrage scan complete"
        );
        Ok(events)
    }

    /// Split by instrument id and analyse each on its own scoped thread.
    /// Errors stay local to the instrument that produced them.
    pub fn analyze_instruments(
        &self,
        snapshots: &[QuoteSnapshot],
    ) -> BTreeMap<String, AnalysisResult<Vec<ArbitrageEvent>>> {
        let mut groups: BTreeMap<String, Vec<QuoteSnapshot>> = BTreeMap::new();
        for snap in snapshots {
            groups.entry(snap.instrument_id.clone()).or_default().push(snap.clone());
        }

        let outcome = crossbeam::scope(|scope| {
            let handles: Vec<_> = groups
                .iter()
                .map(|(id, snaps)| {
                    let handle = scope.spawn(move |_| {
                        let _span = info_span!("instrument", id = %id).entered();
                        self.find_arbitrage(snaps)
                    });
                    (id.clone(), handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(id, handle)| {
                    let result = handle.join().unwrap_or_else(|_| {
                        warn!(instrument = %id, "analysis worker panicked");
                        Err(AnalysisError::WorkerPanicked(id.clone()))
                    });
                    (id, result)
                })
                .collect::<BTreeMap<_, _>>()
        });

        outcome.unwrap_or_default()
    }
}
