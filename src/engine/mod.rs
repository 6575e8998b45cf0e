// Consolidation-and-detection engine
pub mod types;        // snapshots, aligned rows, events, errors
pub mod consolidator; // per-venue series -> shared, staleness-bounded axis
pub mod latency;      // bid-side delay
pub mod scanner;      // cross-venue bid > ask detection
pub mod collapser;    // one event per persisting opportunity
pub mod analyzer;     // pipeline + per-instrument fan-out
pub mod summary;      // aggregates for reporting

pub use analyzer::{AnalyzerConfig, ArbitrageAnalyzer};
pub use latency::LatencyMode;
pub use types::*;
