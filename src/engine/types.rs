use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// Microseconds since the Unix epoch
pub type Micros = i64;

// Maximum depth carried by a venue snapshot
pub const MAX_LEVELS: usize = 10;

// Short uppercase market code, e.g. "XMAD"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VenueId(pub String);

impl VenueId {
    pub fn new(code: impl Into<String>) -> Self {
        VenueId(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VenueId {
    fn from(code: &str) -> Self {
        VenueId(code.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: f64,
    pub size: f64,
}

impl BookLevel {
    pub fn new(price: f64, size: f64) -> Self {
        Self { price, size }
    }
}

pub type Levels = SmallVec<[BookLevel; MAX_LEVELS]>;

// One venue update as handed over by the quote store.
// Levels are pre-sorted: index 0 is the lowest ask / highest bid.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteSnapshot {
    pub instrument_id: String,
    pub venue: VenueId,
    pub timestamp: Micros,
    pub asks: Levels,
    pub bids: Levels,
}

impl QuoteSnapshot {
    pub fn top_of_book(&self) -> TopOfBook {
        TopOfBook {
            ask: self.asks.first().copied(),
            bid: self.bids.first().copied(),
        }
    }
}

// Level-0 view of a single venue
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TopOfBook {
    pub ask: Option<BookLevel>,
    pub bid: Option<BookLevel>,
}

/// Per-venue values at one aligned timestamp. `quotes[i]` belongs to the
/// i-th venue of the owning [`ConsolidatedBook`]; `None` means the venue has
/// no update within the staleness tolerance.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedRow {
    pub timestamp: Micros,
    pub quotes: SmallVec<[TopOfBook; 8]>,
}

impl ConsolidatedRow {
    pub fn best_ask(&self, venue: usize) -> Option<BookLevel> {
        self.quotes.get(venue).and_then(|q| q.ask)
    }

    pub fn best_bid(&self, venue: usize) -> Option<BookLevel> {
        self.quotes.get(venue).and_then(|q| q.bid)
    }
}

// Time-sorted top-of-book updates of one venue, one entry per timestamp
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VenueSeries {
    pub points: Vec<(Micros, TopOfBook)>,
}

impl VenueSeries {
    /// Most recent update at or before `ts`, provided it is no older than
    /// `tolerance_us`.
    pub fn as_of(&self, ts: Micros, tolerance_us: Micros) -> Option<TopOfBook> {
        let idx = self.points.partition_point(|(t, _)| *t <= ts);
        if idx == 0 {
            return None;
        }
        let (t, top) = self.points[idx - 1];
        (ts.saturating_sub(t) <= tolerance_us).then_some(top)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

// Output of the consolidator, input of every later stage
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedBook {
    pub venues: Vec<VenueId>,
    pub tolerance_us: Micros,
    pub series: Vec<VenueSeries>,
    pub rows: Vec<ConsolidatedRow>,
}

// Side of a crossing attributed to a single venue
#[derive(Debug, Clone, PartialEq)]
pub struct VenueQuote {
    pub venue: VenueId,
    pub price: f64,
    pub size: f64,
}

// A timestamp where some venue bids above another venue's ask
#[derive(Debug, Clone, PartialEq)]
pub struct Crossing {
    pub timestamp: Micros,
    pub ask: VenueQuote,
    pub bid: VenueQuote,
}

impl Crossing {
    pub fn tradable_volume(&self) -> f64 {
        self.ask.size.min(self.bid.size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageEvent {
    pub timestamp: Micros,
    pub ask_price: f64,
    pub bid_price: f64,
    /// Venue selling at `ask_price`.
    pub from_venue: VenueId,
    /// Venue buying at `bid_price`.
    pub to_venue: VenueId,
    pub tradable_volume: f64,
    pub profit: f64,
}

impl ArbitrageEvent {
    /// Equal in every attribute except the timestamp.
    pub fn same_opportunity(&self, other: &ArbitrageEvent) -> bool {
        self.ask_price == other.ask_price
            && self.bid_price == other.bid_price
            && self.from_venue == other.from_venue
            && self.to_venue == other.to_venue
            && self.tradable_volume == other.tradable_volume
            && self.profit == other.profit
    }
}

impl From<Crossing> for ArbitrageEvent {
    fn from(c: Crossing) -> Self {
        let volume = c.tradable_volume();
        let profit = (c.bid.price - c.ask.price) * volume;
        ArbitrageEvent {
            timestamp: c.timestamp,
            ask_price: c.ask.price,
            bid_price: c.bid.price,
            from_venue: c.ask.venue,
            to_venue: c.bid.venue,
            tradable_volume: volume,
            profit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("invalid snapshot #{row} ({venue} @ {timestamp}): {reason}")]
    InvalidSnapshot {
        row: usize,
        venue: VenueId,
        timestamp: Micros,
        reason: String,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("worker for instrument {0} panicked")]
    WorkerPanicked(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
