//! Continuous-trading windows derived from venue status records.

use ahash::AHashMap;
use tracing::{debug, warn};

use crate::engine::types::{Micros, QuoteSnapshot, VenueId};

// Status codes meaning "continuous trading", union over the supported venues
pub const CONTINUOUS_TRADING_STATUSES: [u64; 5] = [5308427, 5832713, 5832756, 12255233, 7608181];

/// Continuous-trading codes a venue publishes. Venues outside the known
/// set fall back to the union.
pub fn continuous_codes(venue: &VenueId) -> &'static [u64] {
    match venue.as_str() {
        "AQEU" => &[5308427],
        "XMAD" => &[5832713, 5832756],
        "CEUX" => &[12255233],
        "TQEX" => &[7608181],
        _ => &CONTINUOUS_TRADING_STATUSES,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    pub venue: VenueId,
    pub timestamp: Micros,
    pub status: u64,
}

impl StatusRecord {
    pub fn is_continuous(&self) -> bool {
        continuous_codes(&self.venue).contains(&self.status)
    }
}

// [open, close); an open-ended window has no close
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub open: Micros,
    pub close: Option<Micros>,
}

impl Window {
    pub fn contains(&self, ts: Micros) -> bool {
        ts >= self.open && self.close.map_or(true, |c| ts < c)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TradingSessions {
    windows: AHashMap<VenueId, Vec<Window>>,
}

impl TradingSessions {
    /// Each maximal run of continuous-status records opens a window at its
    /// first record; the next non-continuous record closes it.
    pub fn from_statuses(records: &[StatusRecord]) -> Self {
        let mut by_venue: AHashMap<&VenueId, Vec<&StatusRecord>> = AHashMap::new();
        for r in records {
            by_venue.entry(&r.venue).or_default().push(r);
        }

        let mut windows = AHashMap::new();
        for (venue, mut recs) in by_venue {
            recs.sort_by_key(|r| r.timestamp);
            let mut venue_windows: Vec<Window> = Vec::new();
            let mut open: Option<Micros> = None;
            for r in recs {
                match (open, r.is_continuous()) {
                    (None, true) => open = Some(r.timestamp),
                    (Some(start), false) => {
                        venue_windows.push(Window { open: start, close: Some(r.timestamp) });
                        open = None;
                    }
                    _ => {}
                }
            }
            if let Some(start) = open {
                venue_windows.push(Window { open: start, close: None });
            }
            debug!(%venue, windows = venue_windows.len(), "trading windows");
            windows.insert(venue.clone(), venue_windows);
        }
        Self { windows }
    }

    pub fn windows(&self, venue: &VenueId) -> Option<&[Window]> {
        self.windows.get(venue).map(Vec::as_slice)
    }

    /// Venues without any status record are not restricted.
    pub fn is_trading(&self, venue: &VenueId, ts: Micros) -> bool {
        match self.windows.get(venue) {
            Some(ws) => ws.iter().any(|w| w.contains(ts)),
            None => true,
        }
    }

    pub fn trim(&self, snapshots: Vec<QuoteSnapshot>) -> Vec<QuoteSnapshot> {
        let before = snapshots.len();
        let mut unrestricted: Vec<&VenueId> = Vec::new();
        for s in &snapshots {
            if !self.windows.contains_key(&s.venue) && !unrestricted.contains(&&s.venue) {
                unrestricted.push(&s.venue);
            }
        }
        for venue in &unrestricted {
            warn!(%venue, "no trading status records, keeping all quotes");
        }

        let kept: Vec<QuoteSnapshot> = snapshots
            .into_iter()
            .filter(|s| self.is_trading(&s.venue, s.timestamp))
            .collect();
        debug!(before, after = kept.len(), "trimmed to continuous trading");
        kept
    }
}
